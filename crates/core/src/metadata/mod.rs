//! Metadata providers: TMDb details/lookups and TVDb identifier lookups,
//! used for weighted sorting and cross-namespace identifier resolution.

mod tmdb;
mod tvdb;
mod types;

pub use tmdb::TmdbClient;
pub use tvdb::TvdbClient;
pub use types::{FoundItem, ItemDetails, TvdbSeries};

use async_trait::async_trait;
use thiserror::Error;

use crate::recipe::LibraryKind;

/// Errors that can occur querying a metadata provider.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Provides popularity/vote/genre/date details for ranking.
///
/// `Ok(None)` means the provider has no data for the item; ranking then
/// degrades to the index weight rather than excluding the item.
#[async_trait]
pub trait DetailsProvider: Send + Sync {
    async fn details(
        &self,
        tmdb_id: u64,
        kind: LibraryKind,
    ) -> Result<Option<ItemDetails>, MetadataError>;
}
