//! HTTP probe against the listing feed's map endpoint.
//!
//! One probe is one `GET <base_url>?bBox=<box>&<params>`. The response looks
//! like `{"data": {"markers": [...], "clusters": [...]}}`. Markers may carry a
//! `neighborhood_id` and clusters are keyed by neighborhood id, so both
//! contribute signals.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{ProbeError, ProbeResult};
use crate::traits::probe::RegionProbe;
use crate::types::{
    bbox::BoundingBox,
    config::FeedConfig,
    signals::{SignalId, SignalSet},
};

/// Browser-like User-Agent; the feed rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Markers that the feed served its anti-automation page.
const BLOCK_PAGE_MARKERS: [&str; 2] = ["Captcha", "Are you for real"];

/// Top-level map endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapResponse {
    #[serde(default)]
    pub data: Option<MapData>,
}

/// Listing markers and neighborhood clusters inside the queried box.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapData {
    #[serde(default)]
    pub markers: Option<Vec<Value>>,
    #[serde(default)]
    pub clusters: Option<Vec<Value>>,
}

/// Accepts integers, integral floats and integer strings.
fn signal_id(value: &Value) -> Option<SignalId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Collect neighborhood ids from markers and cluster keys.
pub fn extract_signals(response: &MapResponse) -> SignalSet {
    let Some(data) = &response.data else {
        return SignalSet::new();
    };

    let from_markers = data
        .markers
        .iter()
        .flatten()
        .filter_map(|marker| marker.get("neighborhood_id"))
        .filter_map(signal_id);

    let from_clusters = data
        .clusters
        .iter()
        .flatten()
        .filter_map(|cluster| cluster.get("key"))
        .filter_map(signal_id);

    from_markers.chain(from_clusters).collect()
}

/// Decode a map response body into its signal set.
pub fn parse_map_response(body: &str) -> Result<SignalSet, serde_json::Error> {
    let response: MapResponse = serde_json::from_str(body)?;
    Ok(extract_signals(&response))
}

fn is_block_page(content_type: &str, body: &str) -> bool {
    content_type.contains("text/html") && BLOCK_PAGE_MARKERS.iter().any(|m| body.contains(m))
}

/// Region probe backed by the listing feed.
pub struct FeedProbe {
    client: reqwest::Client,
    base_url: Url,
    config: FeedConfig,
}

impl FeedProbe {
    pub fn new(config: FeedConfig) -> ProbeResult<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://www.yad2.co.il"),
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://www.yad2.co.il/"),
        );
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ProbeError::Http)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Full request URL for one box: configured params plus `bBox`.
    pub fn request_url(&self, bbox: &BoundingBox) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.config.params {
                if key != "bBox" {
                    query.append_pair(key, value);
                }
            }
            query.append_pair("bBox", &bbox.to_string());
        }
        url
    }

    fn transport_error(e: reqwest::Error, url: &Url) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout {
                url: url.to_string(),
            }
        } else {
            ProbeError::Http(e)
        }
    }

    async fn fetch_once(&self, url: &Url) -> ProbeResult<SignalSet> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::transport_error(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = resp
            .text()
            .await
            .map_err(|e| Self::transport_error(e, url))?;

        if !content_type.contains("application/json") {
            if is_block_page(&content_type, &body) {
                return Err(ProbeError::Blocked {
                    url: url.to_string(),
                });
            }
            tracing::warn!(%url, %content_type, "Unexpected content type, parsing as JSON anyway");
        }

        parse_map_response(&body).map_err(|e| {
            tracing::debug!(%url, body = %body.chars().take(500).collect::<String>(), "Undecodable feed response");
            ProbeError::Decode(e)
        })
    }
}

#[async_trait]
impl RegionProbe for FeedProbe {
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet> {
        let url = self.request_url(bbox);
        let attempts = self.config.max_retries.max(1);

        let mut attempt = 1;
        loop {
            tracing::debug!(%url, attempt, attempts, "Probing feed");

            match self.fetch_once(&url).await {
                Ok(signals) => {
                    tracing::debug!(%bbox, signals = ?signals, "Feed probe succeeded");
                    return Ok(signals);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        %url,
                        attempt,
                        attempts,
                        error = %e,
                        "Feed probe failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
