//! Error handling - One hierarchy for the whole request lifecycle

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// ICObench client error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (credentials, base URI, proxy, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/IO errors from the bundled HTTP transport
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failure reported by a custom transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with anything other than 200
    #[error("IcoBench replied with non-success status ({0})")]
    UpstreamStatus(u16),

    /// The service answered 200 with an `error` field in the envelope
    #[error("IcoBench error: {0}")]
    UpstreamApi(String),

    /// The service answered 200 with a body that is not JSON
    #[error("IcoBench replied with malformed JSON: {0}")]
    UpstreamFormat(#[source] serde_json::Error),

    /// Request body encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// HTTP status carried by the error, if the service produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::UpstreamStatus(code) => Some(*code),
            Error::UpstreamApi(_) | Error::UpstreamFormat(_) => Some(200),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the remote service answered and the answer was a failure.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamStatus(_) | Error::UpstreamApi(_) | Error::UpstreamFormat(_)
        )
    }
}
