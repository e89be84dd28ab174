//! Ranked list sources: thin clients that turn an external trending/watched
//! chart URL into raw candidate items.

mod imdb;
mod trakt;
mod types;

pub use imdb::ImdbChartSource;
pub use trakt::TraktSource;
pub use types::{CutoffKind, RawListItem};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::recipe::LibraryKind;

/// Errors that can occur fetching a ranked list.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Source not configured: {0}")]
    NotConfigured(String),

    /// No client handles the given list URL. Fails the whole aggregation.
    #[error("Unsupported source list: {0}")]
    UnsupportedSource(String),
}

/// A ranked list source collaborator.
///
/// Implementations only return item metadata; deduplication and age
/// filtering happen in the aggregator.
#[async_trait]
pub trait RankedSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Which age-cutoff semantics apply to this source's items.
    fn cutoff(&self) -> CutoffKind;

    /// Fetch the ranked list at `url`, in list order.
    async fn fetch(&self, kind: LibraryKind, url: &str) -> Result<Vec<RawListItem>, SourceError>;
}

/// Maps a source list URL to the client that handles it.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, url: &str) -> Result<Arc<dyn RankedSource>, SourceError>;
}

/// Resolver over the configured source clients, dispatching on the URL host.
#[derive(Default)]
pub struct SourceSet {
    trakt: Option<Arc<TraktSource>>,
    imdb: Option<Arc<ImdbChartSource>>,
}

impl SourceSet {
    pub fn new(trakt: Option<Arc<TraktSource>>, imdb: Option<Arc<ImdbChartSource>>) -> Self {
        Self { trakt, imdb }
    }
}

impl SourceResolver for SourceSet {
    fn resolve(&self, url: &str) -> Result<Arc<dyn RankedSource>, SourceError> {
        if url.contains("api.trakt.tv") {
            return match &self.trakt {
                Some(client) => Ok(Arc::clone(client) as Arc<dyn RankedSource>),
                None => Err(SourceError::NotConfigured(
                    "Trakt credentials are required for trakt.tv lists".to_string(),
                )),
            };
        }
        if url.contains("imdb.com") {
            return match &self.imdb {
                Some(client) => Ok(Arc::clone(client) as Arc<dyn RankedSource>),
                None => Err(SourceError::NotConfigured(
                    "A TMDb API key is required for IMDb chart lists".to_string(),
                )),
            };
        }
        Err(SourceError::UnsupportedSource(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_set_rejects_unknown_host() {
        let set = SourceSet::default();
        let result = set.resolve("https://example.com/some/list");
        assert!(matches!(result, Err(SourceError::UnsupportedSource(_))));
    }

    #[test]
    fn test_source_set_requires_configured_client() {
        let set = SourceSet::default();
        let result = set.resolve("https://api.trakt.tv/movies/trending");
        assert!(matches!(result, Err(SourceError::NotConfigured(_))));
        let result = set.resolve("https://www.imdb.com/chart/top");
        assert!(matches!(result, Err(SourceError::NotConfigured(_))));
    }
}
