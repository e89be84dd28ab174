//! Mock ranked list source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::recipe::LibraryKind;
use crate::sources::{CutoffKind, RankedSource, RawListItem, SourceError, SourceResolver};

/// Mock implementation of the RankedSource trait.
///
/// Returns configurable items, records fetched URLs and can fail the next
/// fetch with an injected error.
pub struct MockSource {
    name: String,
    cutoff: CutoffKind,
    items: Arc<RwLock<Vec<RawListItem>>>,
    fetched_urls: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<SourceError>>>,
}

impl MockSource {
    pub fn new(name: &str, cutoff: CutoffKind) -> Self {
        Self {
            name: name.to_string(),
            cutoff,
            items: Arc::new(RwLock::new(Vec::new())),
            fetched_urls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the items every fetch returns.
    pub async fn set_items(&self, items: Vec<RawListItem>) {
        *self.items.write().await = items;
    }

    /// URLs fetched so far, in order.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.read().await.clone()
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl RankedSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn cutoff(&self) -> CutoffKind {
        self.cutoff
    }

    async fn fetch(&self, _kind: LibraryKind, url: &str) -> Result<Vec<RawListItem>, SourceError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        self.fetched_urls.write().await.push(url.to_string());
        Ok(self.items.read().await.clone())
    }
}

/// Resolver over an explicit URL-to-source table.
#[derive(Default)]
pub struct TableSourceResolver {
    sources: HashMap<String, Arc<dyn RankedSource>>,
}

impl TableSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, source: Arc<dyn RankedSource>) {
        self.sources.insert(url.into(), source);
    }
}

impl SourceResolver for TableSourceResolver {
    fn resolve(&self, url: &str) -> Result<Arc<dyn RankedSource>, SourceError> {
        self.sources
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::UnsupportedSource(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_mock_source_returns_items_and_records_urls() {
        let source = MockSource::new("mock", CutoffKind::Year);
        source
            .set_items(vec![fixtures::raw_item("tt1", None, "A", 2020)])
            .await;

        let items = source.fetch(LibraryKind::Movie, "url-a").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(source.fetched_urls().await, vec!["url-a"]);
    }

    #[tokio::test]
    async fn test_error_injection_is_one_shot() {
        let source = MockSource::new("mock", CutoffKind::Year);
        source
            .set_next_error(SourceError::ParseError("boom".to_string()))
            .await;

        assert!(source.fetch(LibraryKind::Movie, "u").await.is_err());
        assert!(source.fetch(LibraryKind::Movie, "u").await.is_ok());
    }
}
