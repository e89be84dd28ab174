//! Mock media catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{
    CatalogAccount, CatalogError, CatalogItem, CatalogSection, MediaCatalog,
};
use crate::recipe::LibraryKind;

/// A recorded sort-title assignment.
#[derive(Debug, Clone)]
pub struct SortTitleCall {
    pub section_id: String,
    pub rating_key: String,
    pub number: u32,
    pub title: String,
    pub visible: bool,
}

/// A recorded playlist replacement.
#[derive(Debug, Clone)]
pub struct PlaylistCall {
    pub name: String,
    pub rating_keys: Vec<String>,
    pub account_token: Option<String>,
}

/// Mock implementation of the MediaCatalog trait.
///
/// Sections, items, files and external references are seeded by the test;
/// mutations are recorded for assertions. A refresh makes the section
/// report as refreshing for a configurable number of polls.
#[derive(Default)]
pub struct MockCatalog {
    sections: Arc<RwLock<Vec<CatalogSection>>>,
    items: Arc<RwLock<HashMap<String, Vec<CatalogItem>>>>,
    files: Arc<RwLock<HashMap<String, Vec<PathBuf>>>>,
    external: Arc<RwLock<HashMap<String, Vec<String>>>>,
    accounts: Arc<RwLock<Vec<CatalogAccount>>>,

    refresh_poll_count: Arc<RwLock<u32>>,
    pending_polls: Arc<RwLock<HashMap<String, u32>>>,

    external_calls: Arc<RwLock<usize>>,
    refresh_calls: Arc<RwLock<Vec<String>>>,
    trash_calls: Arc<RwLock<Vec<String>>>,
    sort_calls: Arc<RwLock<Vec<SortTitleCall>>>,
    playlist_calls: Arc<RwLock<Vec<PlaylistCall>>>,
    created_sections: Arc<RwLock<Vec<(String, PathBuf)>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub async fn add_section(&self, id: &str, title: &str) {
        self.sections.write().await.push(CatalogSection {
            id: id.to_string(),
            title: title.to_string(),
            refreshing: false,
        });
    }

    pub async fn set_section_items(&self, section_id: &str, items: Vec<CatalogItem>) {
        self.items
            .write()
            .await
            .insert(section_id.to_string(), items);
    }

    pub async fn set_item_files(&self, rating_key: &str, files: Vec<PathBuf>) {
        self.files
            .write()
            .await
            .insert(rating_key.to_string(), files);
    }

    pub async fn set_external_ids(&self, rating_key: &str, references: Vec<String>) {
        self.external
            .write()
            .await
            .insert(rating_key.to_string(), references);
    }

    pub async fn set_accounts(&self, accounts: Vec<CatalogAccount>) {
        *self.accounts.write().await = accounts;
    }

    /// How many `section_refreshing` polls report true after a refresh.
    pub async fn set_refresh_poll_count(&self, polls: u32) {
        *self.refresh_poll_count.write().await = polls;
    }

    // =========================================================================
    // Recorded calls
    // =========================================================================

    pub async fn external_ids_calls(&self) -> usize {
        *self.external_calls.read().await
    }

    pub async fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.read().await.clone()
    }

    pub async fn empty_trash_calls(&self) -> Vec<String> {
        self.trash_calls.read().await.clone()
    }

    pub async fn sort_title_calls(&self) -> Vec<SortTitleCall> {
        self.sort_calls.read().await.clone()
    }

    pub async fn playlist_calls(&self) -> Vec<PlaylistCall> {
        self.playlist_calls.read().await.clone()
    }

    pub async fn created_sections(&self) -> Vec<(String, PathBuf)> {
        self.created_sections.read().await.clone()
    }
}

#[async_trait]
impl MediaCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn section_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CatalogSection>, CatalogError> {
        Ok(self
            .sections
            .read()
            .await
            .iter()
            .find(|s| s.title == name)
            .cloned())
    }

    async fn section_items(&self, section_id: &str) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self
            .items
            .read()
            .await
            .get(section_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn external_ids(&self, rating_key: &str) -> Result<Vec<String>, CatalogError> {
        *self.external_calls.write().await += 1;
        Ok(self
            .external
            .read()
            .await
            .get(rating_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn item_files(
        &self,
        rating_key: &str,
        _kind: LibraryKind,
    ) -> Result<Vec<PathBuf>, CatalogError> {
        Ok(self
            .files
            .read()
            .await
            .get(rating_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_section(
        &self,
        name: &str,
        folder: &Path,
        _kind: LibraryKind,
    ) -> Result<(), CatalogError> {
        let id = (self.sections.read().await.len() + 1).to_string();
        self.sections.write().await.push(CatalogSection {
            id,
            title: name.to_string(),
            refreshing: false,
        });
        self.created_sections
            .write()
            .await
            .push((name.to_string(), folder.to_path_buf()));
        Ok(())
    }

    async fn refresh_section(&self, section_id: &str) -> Result<(), CatalogError> {
        self.refresh_calls.write().await.push(section_id.to_string());
        let polls = *self.refresh_poll_count.read().await;
        self.pending_polls
            .write()
            .await
            .insert(section_id.to_string(), polls);
        Ok(())
    }

    async fn section_refreshing(&self, section_id: &str) -> Result<bool, CatalogError> {
        let mut pending = self.pending_polls.write().await;
        match pending.get_mut(section_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn empty_trash(&self, section_id: &str) -> Result<(), CatalogError> {
        self.trash_calls.write().await.push(section_id.to_string());
        Ok(())
    }

    async fn set_sort_title(
        &self,
        section_id: &str,
        rating_key: &str,
        number: u32,
        title: &str,
        _kind: LibraryKind,
        _format: &str,
        visible: bool,
    ) -> Result<(), CatalogError> {
        self.sort_calls.write().await.push(SortTitleCall {
            section_id: section_id.to_string(),
            rating_key: rating_key.to_string(),
            number,
            title: title.to_string(),
            visible,
        });
        Ok(())
    }

    async fn replace_playlist(
        &self,
        name: &str,
        rating_keys: &[String],
        account_token: Option<&str>,
    ) -> Result<(), CatalogError> {
        self.playlist_calls.write().await.push(PlaylistCall {
            name: name.to_string(),
            rating_keys: rating_keys.to_vec(),
            account_token: account_token.map(|t| t.to_string()),
        });
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<CatalogAccount>, CatalogError> {
        Ok(self.accounts.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_sections_and_items() {
        let catalog = MockCatalog::new();
        catalog.add_section("1", "Movies").await;
        catalog
            .set_section_items(
                "1",
                vec![fixtures::catalog_item("10", Some("imdb://tt1"), "A", 2020)],
            )
            .await;

        let section = catalog.section_by_name("Movies").await.unwrap().unwrap();
        assert_eq!(section.id, "1");
        assert_eq!(catalog.section_items("1").await.unwrap().len(), 1);
        assert!(catalog.section_by_name("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_poll_countdown() {
        let catalog = MockCatalog::new();
        catalog.add_section("1", "Movies").await;
        catalog.set_refresh_poll_count(2).await;

        assert!(!catalog.section_refreshing("1").await.unwrap());

        catalog.refresh_section("1").await.unwrap();
        assert!(catalog.section_refreshing("1").await.unwrap());
        assert!(catalog.section_refreshing("1").await.unwrap());
        assert!(!catalog.section_refreshing("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_records_sort_titles() {
        let catalog = MockCatalog::new();
        catalog
            .set_sort_title("1", "10", 3, "A", LibraryKind::Movie, "{number} {title}", false)
            .await
            .unwrap();

        let calls = catalog.sort_title_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].number, 3);
        assert_eq!(calls[0].rating_key, "10");
    }
}
