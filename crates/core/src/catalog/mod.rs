//! Media catalog collaborator: the server that owns the physical media
//! sections the engine matches against and converges.

mod plex;
mod traits;
mod types;

pub use plex::PlexCatalog;
pub use traits::MediaCatalog;
pub use types::{CatalogAccount, CatalogItem, CatalogSection};

use thiserror::Error;

/// Errors that can occur talking to the media catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server unreachable or otherwise unusable. Fatal.
    #[error("Catalog server unavailable: {0}")]
    Unavailable(String),

    /// A section that must already exist is missing. Fatal.
    #[error("The '{0}' library does not exist")]
    SectionNotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}
