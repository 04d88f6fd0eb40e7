use serde::Deserialize;
use serde_json::Value;

/// Forecast document from NWS.
///
/// Periods are kept as raw JSON values so that each one can be extracted on its own,
/// a malformed period must not spoil its siblings.
#[derive(Deserialize, Debug)]
pub struct ForecastDocument {
    pub properties: ForecastProperties,
}

#[derive(Deserialize, Debug)]
pub struct ForecastProperties {
    pub periods: Vec<Value>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct QuantitativeValue {
    pub value: Option<f64>,
}

/// One forecast period as delivered by NWS, trimmed to the fields that are persisted
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Period {
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "isDaytime")]
    pub is_daytime: bool,
    pub temperature: f64,
    #[serde(rename = "temperatureUnit")]
    pub temperature_unit: String,
    #[serde(rename = "temperatureTrend")]
    pub temperature_trend: Option<String>,
    #[serde(rename = "probabilityOfPrecipitation")]
    pub probability_of_precipitation: Option<QuantitativeValue>,
    #[serde(rename = "windSpeed")]
    pub wind_speed: String,
    #[serde(rename = "windDirection")]
    pub wind_direction: String,
    #[serde(rename = "shortForecast")]
    pub short_forecast: String,
}
