pub mod errors;

use std::time::{Duration, Instant};
use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, info};
use serde::de::DeserializeOwned;
use ureq::Agent;
use crate::config::{ForecastParameters, MissingPrecipitation};
use crate::errors::report;
use crate::manager_nws::errors::NwsError;
use crate::models::forecast_record::ForecastRecord;
use crate::models::location::Location;
use crate::models::nws_forecast::ForecastDocument;
use crate::models::nws_points::Points;
use crate::retry;

/// Anything that can turn a location into forecast records.
///
/// Failures are dealt with inside, an implementation returns what it managed to collect,
/// possibly nothing.
pub trait FetchForecast {
    fn fetch(&self, location: &Location, retrieved_at: DateTime<Tz>) -> Vec<ForecastRecord>;
}

/// Bounded retry with exponential backoff for calls to NWS.
///
/// All attempts of one call, backoff included, share a time budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub budget: Duration,
}

impl RetryPolicy {
    /// Point in time when a call started now must have given up
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.budget
    }

    /// Tells if another attempt may follow the given (zero based) failed attempt
    ///
    /// # Arguments
    ///
    /// * 'attempt' - number of the attempt that just failed
    /// * 'deadline' - the call's deadline
    pub fn allows(&self, attempt: u32, deadline: Instant) -> bool {
        attempt < self.max_retries && Instant::now() + self.delay(attempt) < deadline
    }

    /// Delay before the retry following the given (zero based) failed attempt
    ///
    /// # Arguments
    ///
    /// * 'attempt' - number of the attempt that just failed
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Struct for fetching point forecasts from the National Weather Service API
pub struct Nws {
    agent: Agent,
    base_url: String,
    user_agent: String,
    timeout: Duration,
    retry: RetryPolicy,
    missing_precipitation: MissingPrecipitation,
}

impl Nws {
    /// Returns a Nws struct ready for fetching forecasts
    ///
    /// # Arguments
    ///
    /// * 'config' - forecast section of the configuration
    pub fn new(config: &ForecastParameters) -> Nws {
        let timeout = Duration::from_secs(config.timeout_secs);
        let agent_config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let agent = agent_config.into();

        Nws {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.backoff_ms),
                budget: Duration::from_millis(config.retry_budget_ms),
            },
            missing_precipitation: config.missing_precipitation,
        }
    }

    /// Resolves the url of the forecast resource covering the given point.
    ///
    /// NWS only accepts 4 decimals of precision, anything beyond that is rounded away.
    ///
    /// # Arguments
    ///
    /// * 'lat' - latitude of the point
    /// * 'lon' - longitude of the point
    pub fn get_forecast_url(&self, lat: f64, lon: f64) -> Result<String, NwsError> {
        let url = format!("{}/points/{},{}", self.base_url, round4(lat), round4(lon));

        let points: Points = retry!(self.retry, |deadline|self.get_json(&url, deadline))?;

        points.properties.forecast.ok_or(NwsError::NoForecastUrl(url))
    }

    /// Retrieves the forecast periods from a forecast url, each period is left as raw JSON
    ///
    /// # Arguments
    ///
    /// * 'forecast_url' - url as given by the points endpoint
    pub fn get_periods(&self, forecast_url: &str) -> Result<Vec<serde_json::Value>, NwsError> {
        let document: ForecastDocument = retry!(self.retry, |deadline|self.get_json(forecast_url, deadline))?;

        Ok(document.properties.periods)
    }

    /// Performs the complete two-step lookup for a location and extracts one record per period.
    ///
    /// A period that can't be extracted is reported and skipped, the rest are kept.
    ///
    /// # Arguments
    ///
    /// * 'location' - the location to get a forecast for
    /// * 'retrieved_at' - retrieval timestamp to stamp on each record
    pub fn try_fetch(&self, location: &Location, retrieved_at: DateTime<Tz>) -> Result<Vec<ForecastRecord>, NwsError> {
        let forecast_url = self.get_forecast_url(location.lat, location.lon)?;
        debug!("{}: forecast url {}", location.name, forecast_url);

        let periods = self.get_periods(&forecast_url)?;

        let mut records: Vec<ForecastRecord> = Vec::with_capacity(periods.len());
        for (i, period) in periods.into_iter().enumerate() {
            match ForecastRecord::from_period(&location.name, retrieved_at, period, self.missing_precipitation) {
                Ok(record) => records.push(record),
                Err(e) => report(&format!("Skipping period {} for {}", i, location.name), &e),
            }
        }

        Ok(records)
    }

    /// Single GET returning a deserialized JSON document.
    ///
    /// The request times out at the configured timeout or at the deadline, whichever comes first.
    ///
    /// # Arguments
    ///
    /// * 'url' - the url to get
    /// * 'deadline' - deadline of the call this attempt belongs to
    fn get_json<T: DeserializeOwned>(&self, url: &str, deadline: Instant) -> Result<T, NwsError> {
        let timeout = self.timeout.min(deadline.saturating_duration_since(Instant::now()));

        let json = self.agent
            .get(url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", "application/geo+json")
            .call()
            .map_err(|e| NwsError::from_ureq(url, e))?
            .body_mut()
            .read_to_string()
            .map_err(|e| NwsError::from_ureq(url, e))?;

        serde_json::from_str(&json).map_err(|e| NwsError::Document { url: url.to_string(), source: e })
    }
}

impl FetchForecast for Nws {
    fn fetch(&self, location: &Location, retrieved_at: DateTime<Tz>) -> Vec<ForecastRecord> {
        match self.try_fetch(location, retrieved_at) {
            Ok(records) => {
                info!("{}: {} forecast periods", location.name, records.len());
                records
            },
            Err(e) => {
                report(&format!("Forecast lookup failed for {}", location.name), &e);
                Vec::new()
            }
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Denver;
    use serde_json::{json, Value};
    use tokio::runtime::Runtime;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_AGENT: &str = "nbm-forecast-test (ops@example.com)";
    const POINTS_PATH: &str = "/points/39.7392,-104.9903";
    const FORECAST_PATH: &str = "/gridpoints/BOU/63,62/forecast";

    fn nws(base_url: &str) -> Nws {
        nws_with_retry(base_url, 2, 1, 2000)
    }

    fn nws_with_retry(base_url: &str, max_retries: u32, backoff_ms: u64, retry_budget_ms: u64) -> Nws {
        Nws::new(&ForecastParameters {
            base_url: base_url.to_string(),
            user_agent: USER_AGENT.to_string(),
            time_zone: Denver,
            timeout_secs: 5,
            max_retries,
            backoff_ms,
            retry_budget_ms,
            missing_precipitation: MissingPrecipitation::Null,
        })
    }

    fn denver() -> Location {
        Location { name: "Denver".to_string(), lat: 39.7392, lon: -104.9903 }
    }

    fn period(n: u32) -> Value {
        json!({
            "number": n,
            "startTime": format!("2024-06-0{}T06:00:00-06:00", n),
            "endTime": format!("2024-06-0{}T18:00:00-06:00", n),
            "isDaytime": true,
            "temperature": 70 + n,
            "temperatureUnit": "F",
            "temperatureTrend": "",
            "probabilityOfPrecipitation": { "unitCode": "wmoUnit:percent", "value": 10 },
            "windSpeed": "10 mph",
            "windDirection": "N",
            "shortForecast": "Sunny"
        })
    }

    /// Starts a mock NWS server on its own runtime, the client under test is blocking
    fn start_server(rt: &Runtime) -> MockServer {
        rt.block_on(MockServer::start())
    }

    fn mount_points(rt: &Runtime, server: &MockServer) {
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .and(header("User-Agent", USER_AGENT))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "properties": { "forecast": format!("{}{}", server.uri(), FORECAST_PATH) }
                })))
                .mount(server));
    }

    fn mount_forecast(rt: &Runtime, server: &MockServer, periods: Vec<Value>) {
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(FORECAST_PATH))
                .and(header("User-Agent", USER_AGENT))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "properties": { "periods": periods }
                })))
                .mount(server));
    }

    #[test]
    fn one_record_per_period_with_shared_timestamp() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        mount_points(&rt, &server);
        mount_forecast(&rt, &server, (1..=7).map(period).collect());

        let retrieved_at = Denver.with_ymd_and_hms(2024, 6, 1, 14, 30, 5).unwrap();
        let records = nws(&server.uri()).fetch(&denver(), retrieved_at);

        assert_eq!(records.len(), 7);
        assert!(records.iter().all(|r| r.name == "Denver" && r.retrieved_at == retrieved_at));
        assert_eq!(records[0].temperature, 71.0);
        assert_eq!(records[6].start_time, "2024-06-07T06:00:00-06:00");
    }

    #[test]
    fn failed_points_lookup_gives_no_records() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(404))
                .expect(2)
                .mount(&server));

        let nws = nws(&server.uri());
        let res = nws.try_fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(matches!(res, Err(NwsError::Status { status: 404, .. })));

        let records = nws.fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(records.is_empty());
    }

    #[test]
    fn failed_forecast_lookup_gives_no_records() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        mount_points(&rt, &server);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(FORECAST_PATH))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server));

        let records = nws(&server.uri()).fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(records.is_empty());
    }

    #[test]
    fn unexpected_document_gives_no_records() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "not a point" })))
                .mount(&server));

        let res = nws(&server.uri()).try_fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(matches!(res, Err(NwsError::Document { .. })));
    }

    #[test]
    fn malformed_period_is_skipped() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        mount_points(&rt, &server);
        let mut broken = period(2);
        broken.as_object_mut().unwrap().remove("temperature");
        mount_forecast(&rt, &server, vec![period(1), broken, period(3)]);

        let records = nws(&server.uri()).fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].start_time, "2024-06-01T06:00:00-06:00");
        assert_eq!(records[1].start_time, "2024-06-03T06:00:00-06:00");
    }

    #[test]
    fn transient_failure_is_retried() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(1)
                .expect(1)
                .mount(&server));
        mount_points(&rt, &server);
        mount_forecast(&rt, &server, vec![period(1)]);

        let records = nws(&server.uri()).fetch(&denver(), Denver.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn retries_are_bounded() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(503))
                .expect(3)
                .mount(&server));

        let res = nws(&server.uri()).get_forecast_url(39.7392, -104.9903);
        assert!(matches!(res, Err(NwsError::Status { status: 503, .. })));

        rt.block_on(server.verify());
    }

    #[test]
    fn null_forecast_link_is_an_error() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "properties": { "forecast": null } })))
                .mount(&server));

        let res = nws(&server.uri()).get_forecast_url(39.73921234, -104.99028);
        assert!(matches!(res, Err(NwsError::NoForecastUrl(_))));
    }

    #[test]
    fn budget_stops_retries_early() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(503))
                .expect(1)
                .mount(&server));

        // the first backoff alone is beyond the budget
        let res = nws_with_retry(&server.uri(), 5, 1000, 200).get_forecast_url(39.7392, -104.9903);
        assert!(matches!(res, Err(NwsError::Status { status: 503, .. })));

        rt.block_on(server.verify());
    }

    #[test]
    fn slow_server_is_cut_off_at_budget() {
        let rt = Runtime::new().unwrap();
        let server = start_server(&rt);
        rt.block_on(
            Mock::given(method("GET"))
                .and(path(POINTS_PATH))
                .respond_with(ResponseTemplate::new(200)
                    .set_body_json(json!({ "properties": { "forecast": "x" } }))
                    .set_delay(Duration::from_secs(5)))
                .mount(&server));

        let started = Instant::now();
        let res = nws_with_retry(&server.uri(), 2, 1, 300).get_forecast_url(39.7392, -104.9903);

        assert!(matches!(res, Err(NwsError::Transport { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn unreachable_host_is_a_transient_transport_error() {
        // bind and release a port so nothing listens on it
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

        let res = nws(&format!("http://127.0.0.1:{}", port)).get_forecast_url(39.7392, -104.9903);

        match res {
            Err(e @ NwsError::Transport { .. }) => assert!(e.is_transient()),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn policy_allows_retry_within_budget_only() {
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(250),
            budget: Duration::from_secs(4),
        };

        assert!(policy.allows(0, policy.deadline()));
        assert!(!policy.allows(2, policy.deadline()));
        assert!(!policy.allows(0, Instant::now() + Duration::from_millis(100)));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy { max_retries: 2, backoff: Duration::from_millis(250), budget: Duration::from_secs(4) };

        assert_eq!(policy.delay(0), Duration::from_millis(250));
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
    }
}
