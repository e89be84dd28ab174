//! Trait definition for the media catalog collaborator.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::types::{CatalogAccount, CatalogItem, CatalogSection};
use super::CatalogError;
use crate::recipe::LibraryKind;

/// A media catalog server.
///
/// The engine only requires this contract, not the transport; the shipped
/// implementation speaks the Plex HTTP API.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Returns the name of this catalog implementation.
    fn name(&self) -> &str;

    /// Look up a section by name.
    async fn section_by_name(&self, name: &str)
        -> Result<Option<CatalogSection>, CatalogError>;

    /// List all items in a section.
    async fn section_items(&self, section_id: &str) -> Result<Vec<CatalogItem>, CatalogError>;

    /// The full external-reference list for one item (one entry per
    /// identifier namespace the server knows).
    async fn external_ids(&self, rating_key: &str) -> Result<Vec<String>, CatalogError>;

    /// Constituent media file paths for one item. For episodic items this
    /// is every episode file.
    async fn item_files(
        &self,
        rating_key: &str,
        kind: LibraryKind,
    ) -> Result<Vec<PathBuf>, CatalogError>;

    /// Create a new section rooted at `folder`.
    async fn create_section(
        &self,
        name: &str,
        folder: &Path,
        kind: LibraryKind,
    ) -> Result<(), CatalogError>;

    /// Trigger an asynchronous scan/refresh of a section.
    async fn refresh_section(&self, section_id: &str) -> Result<(), CatalogError>;

    /// Whether a section's scan/refresh is still running.
    async fn section_refreshing(&self, section_id: &str) -> Result<bool, CatalogError>;

    /// Empty a section's trash (deleted items pending removal).
    async fn empty_trash(&self, section_id: &str) -> Result<(), CatalogError>;

    /// Assign an item's sort-order number and title.
    #[allow(clippy::too_many_arguments)]
    async fn set_sort_title(
        &self,
        section_id: &str,
        rating_key: &str,
        number: u32,
        title: &str,
        kind: LibraryKind,
        format: &str,
        visible: bool,
    ) -> Result<(), CatalogError>;

    /// Replace the named playlist with the given items, in order. With an
    /// account token the playlist is written for that account instead of
    /// the admin account.
    async fn replace_playlist(
        &self,
        name: &str,
        rating_keys: &[String],
        account_token: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// Enumerate accounts with access to this server, tokens included.
    async fn accounts(&self) -> Result<Vec<CatalogAccount>, CatalogError>;
}
