use log::info;
use crate::config::{load_config, Config};
use crate::errors::ForecastInitError;
use crate::logging::setup_logger;
use crate::manager_nws::Nws;
use crate::sink::{build_sink, Sink};

/// Everything a run needs to talk to the outside world
pub struct Mgr {
    pub nws: Nws,
    pub sink: Box<dyn Sink>,
}

/// Loads configuration, sets up logging and instantiates the forecast client and the sink
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn init(config_path: &str) -> Result<(Config, Mgr), ForecastInitError> {
    let config = load_config(config_path)?;
    setup_logger(&config.general)?;

    info!("nbm-forecast version: {}", env!("CARGO_PKG_VERSION"));

    let nws = Nws::new(&config.forecast);
    let sink = build_sink(&config.sink)?;
    info!("forecasts will be persisted to {}", sink.describe());

    Ok((config, Mgr { nws, sink }))
}
