use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;
use crate::config::MissingPrecipitation;
use crate::errors::PeriodError;
use crate::models::nws_forecast::Period;

/// Format used when the retrieval timestamp is stored as text
pub const RETRIEVED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted column names, in storage order.
///
/// `Retreive_DT` is misspelled in every existing table, so it stays that way.
pub const COLUMNS: [&str; 12] = [
    "Name",
    "Retreive_DT",
    "startTime",
    "endTime",
    "isDaytime",
    "temperature",
    "temperatureUnit",
    "temperatureTrend",
    "probabilityOfPrecipitation",
    "windSpeed",
    "windDirection",
    "shortForecast",
];

/// One forecast period for one location, normalized for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub name: String,
    pub retrieved_at: DateTime<Tz>,
    pub start_time: String,
    pub end_time: String,
    pub is_daytime: bool,
    pub temperature: f64,
    pub temperature_unit: String,
    pub temperature_trend: String,
    pub probability_of_precipitation: Option<f64>,
    pub wind_speed: String,
    pub wind_direction: String,
    pub short_forecast: String,
}

impl ForecastRecord {
    /// Builds a record from a raw NWS period
    ///
    /// # Arguments
    ///
    /// * 'name' - name of the location the period belongs to
    /// * 'retrieved_at' - the run's retrieval timestamp
    /// * 'period' - raw period JSON as found in the forecast document
    /// * 'policy' - what to do when the period lacks a precipitation probability
    pub fn from_period(
        name: &str,
        retrieved_at: DateTime<Tz>,
        period: Value,
        policy: MissingPrecipitation) -> Result<ForecastRecord, PeriodError> {

        let period: Period = serde_json::from_value(period)?;

        let probability_of_precipitation = match (&period.probability_of_precipitation, policy) {
            (Some(pop), _) => pop.value,
            (None, MissingPrecipitation::Null) => None,
            (None, MissingPrecipitation::DropPeriod) => {
                return Err(PeriodError::MissingPrecipitation(period.start_time));
            }
        };

        Ok(ForecastRecord {
            name: name.to_string(),
            retrieved_at,
            start_time: period.start_time,
            end_time: period.end_time,
            is_daytime: period.is_daytime,
            temperature: period.temperature,
            temperature_unit: period.temperature_unit,
            temperature_trend: period.temperature_trend.unwrap_or_default(),
            probability_of_precipitation,
            wind_speed: period.wind_speed,
            wind_direction: period.wind_direction,
            short_forecast: period.short_forecast,
        })
    }

    /// Retrieval timestamp rendered as local wall-clock text
    pub fn retrieved_text(&self) -> String {
        self.retrieved_at.format(RETRIEVED_FORMAT).to_string()
    }
}
