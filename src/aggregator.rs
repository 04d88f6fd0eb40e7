use chrono::DateTime;
use chrono_tz::Tz;
use log::warn;
use crate::manager_nws::FetchForecast;
use crate::models::forecast_record::ForecastRecord;
use crate::models::location::Location;

/// Records collected over all locations of a run
pub struct Collected {
    pub records: Vec<ForecastRecord>,
    pub empty_locations: Vec<String>,
}

/// Fetches forecasts for every location, one after the other, and concatenates the records
/// in location order. A location that yields nothing is noted but doesn't stop the run.
///
/// # Arguments
///
/// * 'fetcher' - the forecast source
/// * 'locations' - locations to fetch forecasts for
/// * 'retrieved_at' - the run's retrieval timestamp
pub fn collect_forecasts(fetcher: &dyn FetchForecast, locations: &[Location], retrieved_at: DateTime<Tz>) -> Collected {
    let mut records: Vec<ForecastRecord> = Vec::new();
    let mut empty_locations: Vec<String> = Vec::new();

    for location in locations {
        let location_records = fetcher.fetch(location, retrieved_at);
        if location_records.is_empty() {
            warn!("no forecast records for {}", location.name);
            empty_locations.push(location.name.clone());
        }
        records.extend(location_records);
    }

    Collected { records, empty_locations }
}
