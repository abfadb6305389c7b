use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use geo_coverage::types::config::DEFAULT_FEED_URL;
use geo_coverage::{FeedConfig, SearchConfig};

/// Runtime configuration loaded from environment variables
///
/// `MIN_PRICE` and `MAX_PRICE` default to 1000 and 25000. Setting either to
/// an empty value drops that filter from feed requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub feed_url: String,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub probe_delay_ms: u64,
    pub min_lat_span: f64,
    pub min_lon_span: f64,
    pub max_probes: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let search = SearchConfig::default();
        let feed = FeedConfig::default();

        Ok(Self {
            feed_url: lookup("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            min_price: price_var(&lookup, "MIN_PRICE", 1000)?,
            max_price: price_var(&lookup, "MAX_PRICE", 25000)?,
            timeout_secs: parse_var(&lookup, "PROBE_TIMEOUT_SECS")?
                .unwrap_or(feed.timeout().as_secs()),
            max_retries: parse_var(&lookup, "PROBE_MAX_RETRIES")?.unwrap_or(feed.max_retries),
            retry_delay_secs: parse_var(&lookup, "PROBE_RETRY_DELAY_SECS")?
                .unwrap_or(feed.retry_delay().as_secs()),
            probe_delay_ms: parse_var(&lookup, "PROBE_DELAY_MS")?.unwrap_or(search.probe_delay_ms),
            min_lat_span: parse_var(&lookup, "MIN_LAT_SPAN")?.unwrap_or(search.min_lat_span),
            min_lon_span: parse_var(&lookup, "MIN_LON_SPAN")?.unwrap_or(search.min_lon_span),
            max_probes: parse_var(&lookup, "MAX_PROBES")?,
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        let mut feed = FeedConfig::new()
            .with_base_url(&self.feed_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retries(self.max_retries, Duration::from_secs(self.retry_delay_secs));

        if let Some(min) = self.min_price {
            feed = feed.with_param("minPrice", min);
        }
        if let Some(max) = self.max_price {
            feed = feed.with_param("maxPrice", max);
        }
        feed
    }

    pub fn search_config(&self, subdivide_empty: bool) -> SearchConfig {
        let mut search = SearchConfig::new()
            .with_min_spans(self.min_lat_span, self.min_lon_span)
            .with_probe_delay(Duration::from_millis(self.probe_delay_ms))
            .with_subdivide_empty(subdivide_empty);

        if let Some(max) = self.max_probes {
            search = search.with_max_probes(max);
        }
        search
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("{key} must be a valid number, got {raw:?}"))
        })
        .transpose()
}

/// Unset means `default`; set but empty means no filter.
fn price_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
) -> Result<Option<u32>> {
    match lookup(key) {
        None => Ok(Some(default)),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(_) => parse_var(lookup, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.min_price, Some(1000));
        assert_eq!(config.max_price, Some(25000));
        assert_eq!(config.probe_delay_ms, 500);
        assert_eq!(config.min_lat_span, 0.001);
        assert_eq!(config.max_probes, None);
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FEED_URL", "http://localhost:9000/map"),
            ("PROBE_DELAY_MS", "50"),
            ("MIN_LAT_SPAN", " 0.01 "),
            ("MAX_PROBES", "200"),
        ]))
        .unwrap();

        assert_eq!(config.feed_url, "http://localhost:9000/map");
        assert_eq!(config.probe_delay_ms, 50);
        assert_eq!(config.min_lat_span, 0.01);
        assert_eq!(config.max_probes, Some(200));

        let search = config.search_config(true);
        assert_eq!(search.max_probes, Some(200));
        assert!(search.subdivide_empty);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("PROBE_DELAY_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("PROBE_DELAY_MS"));
    }

    #[test]
    fn test_feed_config_carries_price_params() {
        let config = Config::from_lookup(lookup(&[("MAX_PRICE", "8000")])).unwrap();
        let feed = config.feed_config();

        assert_eq!(feed.params.get("minPrice").map(String::as_str), Some("1000"));
        assert_eq!(feed.params.get("maxPrice").map(String::as_str), Some("8000"));
    }

    #[test]
    fn test_empty_price_drops_filter() {
        let config = Config::from_lookup(lookup(&[("MIN_PRICE", ""), ("MAX_PRICE", " ")])).unwrap();
        assert_eq!(config.min_price, None);
        assert_eq!(config.max_price, None);
        assert!(config.feed_config().params.is_empty());
    }
}
