//! Trakt ranked list client.
//!
//! Public lists (trending, watched, charts) only need the client id;
//! personal lists additionally need an OAuth access token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::types::{CutoffKind, RawListItem};
use super::{RankedSource, SourceError};
use crate::config::TraktApiConfig;
use crate::recipe::LibraryKind;

const API_VERSION: &str = "2";

/// Trakt API client.
pub struct TraktSource {
    client: Client,
    client_id: String,
    access_token: Option<String>,
}

impl TraktSource {
    /// Create a new Trakt client.
    pub fn new(config: TraktApiConfig) -> Result<Self, SourceError> {
        if config.client_id.is_empty() {
            return Err(SourceError::NotConfigured(
                "Trakt client id is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            client_id: config.client_id,
            access_token: config.access_token,
        })
    }
}

#[async_trait]
impl RankedSource for TraktSource {
    fn name(&self) -> &str {
        "trakt"
    }

    fn cutoff(&self) -> CutoffKind {
        // Trakt list entries only expose a release year.
        CutoffKind::Year
    }

    async fn fetch(&self, kind: LibraryKind, url: &str) -> Result<Vec<RawListItem>, SourceError> {
        debug!("Retrieving the trakt list: {}", url);

        let mut request = self
            .client
            .get(url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.client_id);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let entries: Vec<TraktEntry> = response.json().await.map_err(|e| {
            SourceError::ParseError(format!("Failed to parse trakt list response: {}", e))
        })?;

        let mut items = Vec::new();
        for entry in entries {
            let media = match kind {
                LibraryKind::Movie => entry.movie,
                LibraryKind::Tv => entry.show,
            };
            let Some(media) = media else { continue };
            // The primary identifier is required; entries without one cannot
            // be matched and are dropped here.
            let Some(imdb_id) = media.ids.imdb.filter(|id| !id.is_empty()) else {
                debug!("Skipping '{}': no imdb id on the list entry", media.title);
                continue;
            };
            items.push(RawListItem {
                imdb_id,
                tmdb_id: media.ids.tmdb,
                tvdb_id: media.ids.tvdb,
                title: media.title,
                year: media.year,
                release_date: None,
            });
        }

        Ok(items)
    }
}

// ============================================================================
// Trakt API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TraktEntry {
    #[serde(default)]
    movie: Option<TraktMedia>,
    #[serde(default)]
    show: Option<TraktMedia>,
}

#[derive(Debug, Deserialize)]
struct TraktMedia {
    title: String,
    year: Option<i32>,
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct TraktIds {
    imdb: Option<String>,
    tmdb: Option<u64>,
    tvdb: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trending_entry() {
        let json = r#"[
            {"watchers": 35, "movie": {"title": "The Matrix", "year": 1999,
             "ids": {"trakt": 481, "slug": "the-matrix-1999",
                     "imdb": "tt0133093", "tmdb": 603}}},
            {"watchers": 12, "movie": {"title": "No Ids", "year": 2024,
             "ids": {"trakt": 999, "imdb": null, "tmdb": null}}}
        ]"#;
        let entries: Vec<TraktEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);

        let first = entries[0].movie.as_ref().unwrap();
        assert_eq!(first.title, "The Matrix");
        assert_eq!(first.ids.imdb.as_deref(), Some("tt0133093"));
        assert_eq!(first.ids.tmdb, Some(603));

        // Second entry has no usable primary identifier
        assert!(entries[1].movie.as_ref().unwrap().ids.imdb.is_none());
    }

    #[test]
    fn test_parse_show_entry() {
        let json = r#"[
            {"watcher_count": 100, "show": {"title": "Breaking Bad", "year": 2008,
             "ids": {"imdb": "tt0903747", "tmdb": 1396, "tvdb": 81189}}}
        ]"#;
        let entries: Vec<TraktEntry> = serde_json::from_str(json).unwrap();
        let show = entries[0].show.as_ref().unwrap();
        assert_eq!(show.ids.tvdb, Some(81189));
        assert!(entries[0].movie.is_none());
    }

    #[test]
    fn test_requires_client_id() {
        let result = TraktSource::new(TraktApiConfig {
            client_id: String::new(),
            client_secret: String::new(),
            access_token: None,
        });
        assert!(matches!(result, Err(SourceError::NotConfigured(_))));
    }
}
