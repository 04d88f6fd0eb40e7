pub mod location;
pub mod nws_points;
pub mod nws_forecast;
pub mod forecast_record;
