use std::fs;
use chrono_tz::Tz;
use log::LevelFilter;
use serde::Deserialize;
use crate::errors::ConfigError;

#[derive(Deserialize, Debug)]
pub struct General {
    pub log_path: Option<String>,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

#[derive(Deserialize, Debug)]
pub struct Files {
    pub locations_file: String,
}

/// What to do with a forecast period that lacks a precipitation probability
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingPrecipitation {
    /// Keep the period and record the probability as null
    #[default]
    Null,
    /// Skip the period altogether
    DropPeriod,
}

#[derive(Deserialize, Debug)]
pub struct ForecastParameters {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub user_agent: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: Tz,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Time budget shared by all attempts of one request
    #[serde(default = "default_retry_budget_ms")]
    pub retry_budget_ms: u64,
    #[serde(default)]
    pub missing_precipitation: MissingPrecipitation,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Sqlite,
    ObjectStore,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SqliteParameters {
    pub db_path: String,
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ObjectStoreParameters {
    /// Base location, e.g. s3://bucket/nbm_forecasts or file:///var/lib/nbm
    pub url: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

#[derive(Deserialize, Debug)]
pub struct SinkParameters {
    pub kind: SinkKind,
    pub sqlite: Option<SqliteParameters>,
    pub object_store: Option<ObjectStoreParameters>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub general: General,
    pub files: Files,
    pub forecast: ForecastParameters,
    pub sink: SinkParameters,
}

fn default_base_url() -> String { "https://api.weather.gov".to_string() }
fn default_time_zone() -> Tz { chrono_tz::America::Denver }
fn default_timeout_secs() -> u64 { 3 }
fn default_max_retries() -> u32 { 2 }
fn default_backoff_ms() -> u64 { 250 }
fn default_retry_budget_ms() -> u64 { 4000 }
fn default_table() -> String { "nbm_forecasts".to_string() }
fn default_file_prefix() -> String { "forecast".to_string() }

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let toml = fs::read_to_string(config_path)?;
    parse_config(&toml)
}

/// Parses and validates configuration given as TOML text
///
/// # Arguments
///
/// * 'toml' - the configuration document
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml)?;

    match config.sink.kind {
        SinkKind::Sqlite if config.sink.sqlite.is_none() => {
            return Err(ConfigError::from("sink kind sqlite requires a [sink.sqlite] section"));
        }
        SinkKind::ObjectStore if config.sink.object_store.is_none() => {
            return Err(ConfigError::from("sink kind object_store requires a [sink.object_store] section"));
        }
        _ => (),
    }

    if config.forecast.user_agent.trim().is_empty() {
        return Err(ConfigError::from("forecast user_agent must identify the caller"));
    }

    Ok(config)
}
