use std::env;
use std::process::ExitCode;
use log::info;
use crate::errors::{describe, report};
use crate::initialization::init;

mod aggregator;
mod config;
mod errors;
mod initialization;
mod locations;
mod logging;
mod manager_nws;
mod manager_object_store;
mod manager_sqlite;
mod models;
mod sink;
mod worker;

/// Retries a call returning a Result as long as the error is transient and the
/// policy allows, sleeping with exponential backoff in between.
/// The call is given the deadline shared by all attempts.
#[macro_export]
macro_rules! retry {
    ($policy:expr, $f:expr) => {{
        let policy = &$policy;
        let deadline = policy.deadline();
        let mut attempt: u32 = 0;
        loop {
            match $f(deadline) {
                Ok(v) => break Ok(v),
                Err(e) if e.is_transient() && policy.allows(attempt, deadline) => {
                    let delay = policy.delay(attempt);
                    log::warn!("attempt {} of {} failed, retrying in {} ms: {}",
                        attempt + 1, policy.max_retries + 1, delay.as_millis(), e);
                    std::thread::sleep(delay);
                    attempt += 1;
                },
                Err(e) => break Err(e),
            }
        }
    }};
}

fn main() -> ExitCode {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    // Logging isn't up until init succeeds, so init errors go to stderr
    let (config, mgr) = match init(&config_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", describe("Initialization failed", &e));
            return ExitCode::from(1);
        }
    };

    match worker::run(&config.files.locations_file, &mgr.nws, mgr.sink.as_ref(), config.forecast.time_zone) {
        Ok(summary) => {
            info!("run complete: {} locations ({} without forecast), {} records collected, {} persisted",
                summary.locations, summary.empty_locations, summary.records, summary.persisted);
            ExitCode::SUCCESS
        },
        Err(e) => {
            report("Forecast run failed", &e);
            ExitCode::from(e.exit_code())
        }
    }
}
