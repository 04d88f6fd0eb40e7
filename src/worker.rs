use chrono::{SubsecRound, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use crate::aggregator::collect_forecasts;
use crate::errors::ForecastRunError;
use crate::locations::load_locations;
use crate::manager_nws::FetchForecast;
use crate::sink::Sink;

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunSummary {
    pub locations: usize,
    pub empty_locations: usize,
    pub records: usize,
    pub persisted: usize,
}

/// Runs one batch: read locations, fetch forecasts for all of them and persist the result.
///
/// Locations are read before anything else so that a broken locations file stops the run
/// before any request is made. Failing locations only reduce the output, whereas a failing
/// sink or a run where every location failed are returned as errors.
///
/// # Arguments
///
/// * 'locations_file' - path to the locations CSV file
/// * 'fetcher' - the forecast source
/// * 'sink' - where to persist the records
/// * 'time_zone' - time zone for the run's retrieval timestamp
pub fn run(locations_file: &str, fetcher: &dyn FetchForecast, sink: &dyn Sink, time_zone: Tz)
    -> Result<RunSummary, ForecastRunError> {

    let locations = load_locations(locations_file)?;
    if locations.is_empty() {
        warn!("no locations in {}", locations_file);
    }

    let run_time = Utc::now().with_timezone(&time_zone).trunc_subsecs(0);
    info!("fetching forecasts for {} locations, retrieval time {}", locations.len(), run_time.format("%Y-%m-%d %H:%M:%S %Z"));

    let collected = collect_forecasts(fetcher, &locations, run_time);

    let persisted = sink.persist(&collected.records, run_time)
        .map_err(|e| ForecastRunError::Sink { sink: sink.describe(), source: e })?;

    if collected.records.is_empty() && !locations.is_empty() {
        return Err(ForecastRunError::NoRecords(locations.len()));
    }

    Ok(RunSummary {
        locations: locations.len(),
        empty_locations: collected.empty_locations.len(),
        records: collected.records.len(),
        persisted,
    })
}
