//! Configuration types for the coverage search and the feed probe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Default feed endpoint for rental listings on the map view.
pub const DEFAULT_FEED_URL: &str = "https://gw.yad2.co.il/realestate-feed/rent/map";

/// Whole milliseconds, rounding any sub-millisecond remainder up.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Configuration for a coverage search session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Boxes shorter than this (degrees of latitude) are discarded unprobed.
    ///
    /// Default: 0.001.
    pub min_lat_span: f64,

    /// Boxes narrower than this (degrees of longitude) are discarded unprobed.
    ///
    /// Default: 0.001.
    pub min_lon_span: f64,

    /// Pause before every probe except the first, in milliseconds.
    ///
    /// The feed tolerates slow sequential traffic only. Zero disables pacing.
    /// Default: 500.
    pub probe_delay_ms: u64,

    /// Subdivide boxes whose probe succeeded but saw nothing.
    ///
    /// When false, an empty box is taken as evidence that nothing of interest
    /// lies below it. That keeps the probe count low at the price of
    /// possibly missing sparse regions. Failed probes never subdivide.
    ///
    /// Default: false.
    pub subdivide_empty: bool,

    /// Stop after this many probes, keeping whatever was found so far.
    ///
    /// Default: None (run until the frontier drains).
    pub max_probes: Option<usize>,

    /// Log a progress line every N explored boxes.
    ///
    /// Default: 20.
    pub progress_interval: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_lat_span: 0.001,
            min_lon_span: 0.001,
            probe_delay_ms: 500,
            subdivide_empty: false,
            max_probes: None,
            progress_interval: 20,
        }
    }
}

impl SearchConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both span thresholds.
    pub fn with_min_spans(mut self, min_lat_span: f64, min_lon_span: f64) -> Self {
        self.min_lat_span = min_lat_span;
        self.min_lon_span = min_lon_span;
        self
    }

    /// Set the delay between probes.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay_ms = millis(delay);
        self
    }

    /// Enable or disable subdividing empty boxes.
    pub fn with_subdivide_empty(mut self, subdivide: bool) -> Self {
        self.subdivide_empty = subdivide;
        self
    }

    /// Cap the number of probes.
    pub fn with_max_probes(mut self, max: usize) -> Self {
        self.max_probes = Some(max);
        self
    }

    /// Set the progress logging interval.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    /// Check the thresholds that bound recursion depth.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("min_lat_span", self.min_lat_span),
            ("min_lon_span", self.min_lon_span),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidSpan { name, value });
            }
        }
        Ok(())
    }
}

/// Configuration for the HTTP feed probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Map endpoint, without query parameters.
    pub base_url: String,

    /// Extra query parameters sent with every probe (e.g. `minPrice`).
    ///
    /// `bBox` is always set from the probed box and overrides any entry here.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Per-request timeout in milliseconds.
    ///
    /// Default: 10000.
    pub timeout_ms: u64,

    /// Attempts per probe, including the first.
    ///
    /// Default: 3.
    pub max_retries: u32,

    /// Wait between attempts in milliseconds.
    ///
    /// Default: 5000.
    pub retry_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            params: BTreeMap::new(),
            timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 5_000,
        }
    }
}

impl FeedConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Add a query parameter sent with every probe.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis(timeout);
        self
    }

    /// Set retry attempts and the wait between them.
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = millis(delay);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
