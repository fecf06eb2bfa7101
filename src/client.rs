//! HTTP access to the cache server's stats and image endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use reqwest::Url;

use crate::stats::StatsResponse;

/// Errors from talking to the cache server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Invalid server or endpoint URL.
    Url(String),
    /// Connection or transport failure.
    Http(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Response body could not be decoded.
    Decode(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Url(msg) => write!(f, "Invalid URL: {}", msg),
            ClientError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ClientError::Status(code) => write!(f, "Server returned status {}", code),
            ClientError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

/// Produces a distinct, increasing query value for every request so no
/// cache between us and the server can answer with a stale body.
///
/// Values are wall-clock milliseconds, bumped by one whenever two requests
/// land in the same millisecond (or the clock steps backwards).
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let prev = self
            .last
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

/// Parses a server address into a directory-style base URL: trailing
/// slash added, query and fragment dropped.
pub fn base_url(base: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base).map_err(|e| ClientError::Url(format!("{}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Url(format!("{}: not a base URL", base)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Client for one cache server.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    base: Url,
    http: reqwest::Client,
}

impl DashboardClient {
    /// Creates a client for the server at `base` (e.g. `http://localhost:5000`).
    ///
    /// A base with a path prefix is treated as a directory, with or without
    /// the trailing slash.
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let url = base_url(base)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("ctdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self { base: url, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves `path` against the server base and appends the cache buster
    /// as the bare query string (`/stats?1712345678901`).
    pub fn endpoint(&self, path: &str, buster: u64) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Url(format!("{}: {}", path, e)))?;
        url.set_query(Some(&buster.to_string()));
        Ok(url)
    }

    /// `GET /stats`.
    pub async fn fetch_stats(&self, url: Url) -> Result<StatsResponse, ClientError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        StatsResponse::from_json(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Downloads an image and returns its size in bytes.
    pub async fn fetch_image(&self, url: Url) -> Result<usize, ClientError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_buster_strictly_increases() {
        let buster = CacheBuster::new();
        let mut prev = buster.next();
        for _ in 0..1000 {
            let next = buster.next();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_cache_buster_tracks_wall_clock() {
        let buster = CacheBuster::new();
        let now = Utc::now().timestamp_millis() as u64;
        assert!(buster.next() >= now);
    }

    #[test]
    fn test_endpoint_on_root() {
        let client = DashboardClient::new("http://localhost:5000").unwrap();
        let url = client.endpoint("stats", 42).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/stats?42");

        let url = client.endpoint("/image/hits_histogram.svg", 7).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/image/hits_histogram.svg?7");
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        for base in ["http://proxy/ctcache", "http://proxy/ctcache/"] {
            let client = DashboardClient::new(base).unwrap();
            let url = client.endpoint("stats", 1).unwrap();
            assert_eq!(url.as_str(), "http://proxy/ctcache/stats?1");
        }
    }

    #[test]
    fn test_base_drops_query_and_fragment() {
        let client = DashboardClient::new("http://localhost:5000/?x=1#top").unwrap();
        assert_eq!(client.base().as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_base_url_without_client() {
        let url = base_url("http://proxy/ctcache?x=1").unwrap();
        assert_eq!(url.as_str(), "http://proxy/ctcache/");
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(matches!(
            DashboardClient::new("not a url"),
            Err(ClientError::Url(_))
        ));
        assert!(matches!(
            DashboardClient::new("mailto:ops@example.com"),
            Err(ClientError::Url(_))
        ));
    }
}
