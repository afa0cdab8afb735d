use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::cache::{CacheKey, CacheStore};
use crate::error::{AppError, AppResult};

/// Low-resolution artwork size the search service returns by default
const ARTWORK_LOW_RES: &str = "100x100";
/// Resolution we upgrade artwork URLs to by string substitution
const ARTWORK_HIGH_RES: &str = "600x600";

/// Cover-art lookup against an external catalog/search service.
///
/// Failures never propagate into the pipeline: a provider that cannot
/// answer yields an empty URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolves a cover-art URL for `title` by `artist`, or `""` when no
    /// artwork can be found
    async fn fetch_cover(&self, title: &str, artist: &str) -> String;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "resultCount")]
    result_count: u32,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "artworkUrl100")]
    artwork_url_100: Option<String>,
}

/// iTunes Search API provider (free, no authentication).
///
/// Resolved lookups, including "not found", are cached for the store's TTL so
/// a repeated unmatched title does not hit the network again. Transport and
/// upstream failures are not cached.
pub struct ItunesMetadataProvider {
    http_client: HttpClient,
    search_url: String,
    cache: Arc<CacheStore>,
}

impl ItunesMetadataProvider {
    pub fn new(search_url: String, cache: Arc<CacheStore>) -> Self {
        Self {
            http_client: HttpClient::new(),
            search_url,
            cache,
        }
    }

    async fn lookup(&self, title: &str, artist: &str) -> AppResult<String> {
        let term = format!("{} {}", title, artist);
        let response = self
            .http_client
            .get(&self.search_url)
            .query(&[("term", term.trim()), ("media", "music"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("metadata search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "metadata search returned status {}",
                response.status()
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("malformed metadata response: {}", e)))?;

        if search.result_count == 0 {
            return Ok(String::new());
        }

        Ok(search
            .results
            .first()
            .and_then(|r| r.artwork_url_100.as_deref())
            .map(upgrade_artwork_url)
            .unwrap_or_default())
    }
}

/// Upgrades the provider's low-resolution artwork URL to the higher fixed
/// resolution variant it also hosts
fn upgrade_artwork_url(url: &str) -> String {
    url.replace(ARTWORK_LOW_RES, ARTWORK_HIGH_RES)
}

#[async_trait]
impl MetadataProvider for ItunesMetadataProvider {
    async fn fetch_cover(&self, title: &str, artist: &str) -> String {
        let key = CacheKey::Cover {
            title: title.to_string(),
            artist: artist.to_string(),
        };

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(title, artist, "Cover art served from cache");
            return cached;
        }

        match self.lookup(title, artist).await {
            Ok(url) => {
                // cache resolved lookups, not-found included; transient
                // failures are left uncached so the next request retries
                self.cache.set(&key, url.clone()).await;
                url
            }
            Err(e) => {
                tracing::warn!(title, artist, error = %e, "Cover art lookup failed, substituting empty");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_artwork_url() {
        assert_eq!(
            upgrade_artwork_url("https://is1.mzstatic.com/a/100x100bb.jpg"),
            "https://is1.mzstatic.com/a/600x600bb.jpg"
        );
    }

    #[test]
    fn test_upgrade_artwork_url_without_marker_is_untouched() {
        assert_eq!(upgrade_artwork_url("https://x/a.jpg"), "https://x/a.jpg");
    }

    #[test]
    fn test_search_response_deserialization() {
        let body = r#"{
            "resultCount": 1,
            "results": [{"artworkUrl100": "https://a/100x100bb.jpg", "trackName": "Dynamite"}]
        }"#;
        let search: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(search.result_count, 1);
        assert_eq!(
            search.results[0].artwork_url_100.as_deref(),
            Some("https://a/100x100bb.jpg")
        );
    }

    #[test]
    fn test_search_response_no_results() {
        let search: SearchResponse = serde_json::from_str(r#"{"resultCount": 0}"#).unwrap();
        assert_eq!(search.result_count, 0);
        assert!(search.results.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_cache_empty() {
        let cache = Arc::new(CacheStore::new(std::time::Duration::from_secs(3600)));
        let provider =
            ItunesMetadataProvider::new("http://127.0.0.1:1/search".to_string(), cache.clone());

        assert_eq!(provider.fetch_cover("Dynamite", "BTS").await, "");
        assert_eq!(cache.len().await, 0);
    }
}
