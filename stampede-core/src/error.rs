use serde::Serialize;
use thiserror::Error;

/// Malformed or inconsistent configuration. Always fatal, raised before any traffic is sent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("target `{0}` must be an absolute http(s) address")]
    InvalidTarget(String),

    #[error("endpoint path `{0}` must start with `/`")]
    InvalidPath(String),

    #[error("maximum run duration must be greater than zero")]
    ZeroDuration,

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("accepted status set must not be empty")]
    EmptyAcceptedSet,

    #[error("status {0} is listed as both accepted and rejected")]
    OverlappingStatus(u16),

    #[error("invalid status code `{0}`")]
    InvalidStatus(String),

    #[error("invalid latency threshold `{0}`, expected something like `p(95)<1500ms`")]
    InvalidThreshold(String),

    #[error("percentile {0} is outside (0, 100]")]
    PercentileOutOfRange(f64),
}

/// A request that never produced a complete response.
///
/// Returned by transports instead of being raised; the classifier turns every variant into an
/// unexpected failure.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    /// The server accepted the request but the connection dropped before the response body was
    /// fully read.
    #[error("response interrupted: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}
