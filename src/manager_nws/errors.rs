use thiserror::Error;

#[derive(Error, Debug)]
pub enum NwsError {
    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("request to {url} failed")]
    Transport { url: String, #[source] source: ureq::Error },
    #[error("unexpected document from {url}")]
    Document { url: String, #[source] source: serde_json::Error },
    #[error("no forecast link for point {0}")]
    NoForecastUrl(String),
}

impl NwsError {
    /// Maps a ureq error for the given url, pulling out http status errors
    ///
    /// # Arguments
    ///
    /// * 'url' - the url that was requested
    /// * 'e' - the error from ureq
    pub fn from_ureq(url: &str, e: ureq::Error) -> NwsError {
        match e {
            ureq::Error::StatusCode(status) => NwsError::Status { status, url: url.to_string() },
            e => NwsError::Transport { url: url.to_string(), source: e },
        }
    }

    /// Returns true if the failure may go away by itself, i.e. it is worth a retry
    pub fn is_transient(&self) -> bool {
        match self {
            NwsError::Status { status, .. } => *status == 429 || *status >= 500,
            NwsError::Transport { source, .. } => matches!(source,
                ureq::Error::Io(_) |
                ureq::Error::Timeout(_) |
                ureq::Error::ConnectionFailed |
                ureq::Error::HostNotFound),
            NwsError::Document { .. } | NwsError::NoForecastUrl(_) => false,
        }
    }
}
