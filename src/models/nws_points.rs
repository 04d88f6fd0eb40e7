use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct PointProperties {
    pub forecast: Option<String>,
}

/// Response from the NWS points endpoint, only the forecast link is of interest
#[derive(Deserialize, Debug)]
pub struct Points {
    pub properties: PointProperties,
}
