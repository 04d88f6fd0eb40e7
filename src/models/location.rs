use serde::Deserialize;

/// A named point to retrieve forecasts for, as listed in the locations file
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
}
