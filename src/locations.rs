use std::path::Path;
use crate::errors::LocationsError;
use crate::models::location::Location;

const REQUIRED_COLUMNS: [&str; 3] = ["Name", "Lat", "Lon"];

/// Loads the list of locations to fetch forecasts for.
///
/// The file is a CSV with a header row holding at least the columns Name, Lat and Lon.
/// Order of rows is preserved. Any problem with the file is an error since a run
/// can't do anything meaningful without its locations.
///
/// # Arguments
///
/// * 'locations_file' - path to the CSV file
pub fn load_locations(locations_file: &str) -> Result<Vec<Location>, LocationsError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(Path::new(locations_file))
        .map_err(|e| LocationsError::Open(locations_file.to_string(), e))?;

    let headers = reader.headers()
        .map_err(|e| LocationsError::Parse { file: locations_file.to_string(), line: 1, source: e })?
        .clone();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LocationsError::MissingColumn { file: locations_file.to_string(), column });
        }
    }

    let mut locations: Vec<Location> = Vec::new();
    for result in reader.deserialize::<Location>() {
        let location = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            LocationsError::Parse { file: locations_file.to_string(), line, source: e }
        })?;
        locations.push(location);
    }

    Ok(locations)
}
