//! Typed errors for the coverage library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors raised by a region probe.
///
/// The search treats every variant as "no signal" for the probed box.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// Request did not complete within the configured timeout
    #[error("timeout probing: {url}")]
    Timeout { url: String },

    /// Feed answered with a non-success status
    #[error("feed returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Feed served an anti-automation page instead of JSON
    #[error("blocked by feed (captcha page) at {url}")]
    Blocked { url: String },

    /// Response body was not the expected JSON
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Feed base URL is not a valid URL
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Catch-all for probe implementations outside this crate
    #[error("probe failed: {0}")]
    Other(String),
}

impl ProbeError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProbeError::Timeout { .. } => true,
            ProbeError::Http(e) => e.is_connect() || e.is_request() || e.is_body(),
            _ => false,
        }
    }
}

/// A bounding-box string or coordinate set that cannot form a box.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoxError {
    /// Not exactly four comma-separated fields
    #[error("expected 4 comma-separated coordinates, got {count} in {input:?}")]
    FieldCount { input: String, count: usize },

    /// A field is not a number
    #[error("invalid coordinate {field:?} in {input:?}")]
    InvalidNumber { input: String, field: String },

    /// NaN or infinite coordinate
    #[error("non-finite coordinate in box")]
    NonFinite,

    /// latMin >= latMax or lonMin >= lonMax
    #[error("empty extent: lat {lat_min}..{lat_max}, lon {lon_min}..{lon_max}")]
    EmptyExtent {
        lat_min: f64,
        lon_min: f64,
        lat_max: f64,
        lon_max: f64,
    },
}

/// Invalid search configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Span threshold that is zero, negative or not finite
    #[error("{name} must be positive and finite, got {value}")]
    InvalidSpan { name: &'static str, value: f64 },
}

/// Result type alias for probe operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
