// HTTP transport for stats.nba.com.
//
// The stats API rejects or silently drops requests that do not look like they
// come from the nba.com web app, so every request carries a fixed set of
// browser headers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("unexpected {endpoint} response: {message}")]
    Shape { endpoint: String, message: String },
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; rv:68.0) Gecko/20100101 Firefox/68.0";
const REFERER: &str = "http://stats.nba.com/";

const STATIC_HEADERS: &[(&str, &str)] = &[
    ("user-agent", USER_AGENT),
    ("referer", REFERER),
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "en-US,en;q=0.5"),
    ("x-nba-stats-origin", "stats"),
    ("x-nba-stats-token", "true"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("pragma", "no-cache"),
    ("cache-control", "no-cache"),
];

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in STATIC_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

// ---------------------------------------------------------------------------
// NbaStatsClient
// ---------------------------------------------------------------------------

/// Thin client over the stats.nba.com JSON endpoints.
#[derive(Debug, Clone)]
pub struct NbaStatsClient {
    http: reqwest::Client,
    base_url: String,
    league_id: String,
}

impl NbaStatsClient {
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(api.timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            league_id: api.league_id.clone(),
        })
    }

    pub fn league_id(&self) -> &str {
        &self.league_id
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    /// GET `endpoint` with `query` and decode the JSON body. Non-2xx statuses
    /// are errors; nothing is retried.
    pub async fn get_json<K, V>(&self, endpoint: &str, query: &[(K, V)]) -> Result<Value, FetchError>
    where
        K: serde::Serialize,
        V: serde::Serialize,
    {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint, "GET {url}");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let response = response.error_for_status().map_err(|e| FetchError::Status {
            endpoint: endpoint.to_string(),
            status: e.status().map(|s| s.as_u16()).unwrap_or_default(),
        })?;

        response.json::<Value>().await.map_err(|source| FetchError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_include_stats_origin_and_token() {
        let headers = default_headers();
        assert_eq!(headers["x-nba-stats-origin"], "stats");
        assert_eq!(headers["x-nba-stats-token"], "true");
        assert_eq!(headers["referer"], REFERER);
        assert_eq!(headers.len(), STATIC_HEADERS.len());
    }

    #[test]
    fn endpoint_url_joins_without_double_slash() {
        let api = ApiConfig {
            base_url: "https://stats.nba.com/stats/".to_string(),
            ..ApiConfig::default()
        };
        let client = NbaStatsClient::new(&api).unwrap();
        assert_eq!(
            client.endpoint_url("leaguedashptstats"),
            "https://stats.nba.com/stats/leaguedashptstats"
        );
        assert_eq!(client.league_id(), "00");
    }

    #[tokio::test]
    async fn connection_failure_is_a_request_error() {
        // Nothing listens on port 9 of the loopback interface.
        let api = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        };
        let client = NbaStatsClient::new(&api).unwrap();
        let err = client
            .get_json("scoreboardV3", &[("GameDate", "2020-01-05")])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request { ref endpoint, .. } if endpoint == "scoreboardV3"));
    }
}
