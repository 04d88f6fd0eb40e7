use std::error::Error as StdError;
use log::error;
use thiserror::Error;
use crate::sink::SinkError;

/// Logs an error with a caption followed by every cause in its source chain
///
/// This is the one place where failures are turned into log lines, recovered or not.
///
/// # Arguments
///
/// * 'caption' - short description of what was being done
/// * 'e' - the error to report
pub fn report(caption: &str, e: &dyn StdError) {
    error!("{}", describe(caption, e));
}

/// Renders a caption, an error and its causes as one multi line message
///
/// # Arguments
///
/// * 'caption' - short description of what was being done
/// * 'e' - the error to describe
pub fn describe(caption: &str, e: &dyn StdError) -> String {
    let mut msg = format!("{}: {}", caption, e);
    let mut source = e.source();
    while let Some(s) = source {
        msg += &format!("\n    caused by: {}", s);
        source = s.source();
    }
    msg
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read configuration file")]
    Io(#[from] std::io::Error),
    #[error("unable to parse configuration")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError::Invalid(e.to_string()) }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("unable to open log file {0}")]
    File(String, #[source] std::io::Error),
    #[error("invalid logger configuration")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error("logger already initialized")]
    Init(#[from] log::SetLoggerError),
}

#[derive(Error, Debug)]
pub enum LocationsError {
    #[error("unable to open locations file {0}")]
    Open(String, #[source] csv::Error),
    #[error("locations file {file} lacks required column {column}")]
    MissingColumn { file: String, column: &'static str },
    #[error("unable to parse line {line} of locations file {file}")]
    Parse { file: String, line: u64, #[source] source: csv::Error },
}

#[derive(Error, Debug)]
pub enum PeriodError {
    #[error("malformed forecast period")]
    Malformed(#[from] serde_json::Error),
    #[error("forecast period starting {0} has no probabilityOfPrecipitation")]
    MissingPrecipitation(String),
}

#[derive(Error, Debug)]
pub enum ForecastInitError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("logging setup error")]
    Logging(#[from] LoggingError),
    #[error("unable to set up sink")]
    Sink(#[from] SinkError),
}

#[derive(Error, Debug)]
pub enum ForecastRunError {
    #[error("unable to load locations")]
    Locations(#[from] LocationsError),
    #[error("unable to persist forecasts to {sink}")]
    Sink { sink: String, #[source] source: SinkError },
    #[error("no forecast records collected for any of {0} configured locations")]
    NoRecords(usize),
}

impl ForecastRunError {
    /// Process exit status for the error
    pub fn exit_code(&self) -> u8 {
        match self {
            ForecastRunError::Locations(_) => 1,
            ForecastRunError::Sink { .. } => 2,
            ForecastRunError::NoRecords(_) => 3,
        }
    }
}
