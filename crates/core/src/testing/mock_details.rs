//! Mock ranking details provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{DetailsProvider, ItemDetails, MetadataError};
use crate::recipe::LibraryKind;

/// Mock implementation of the DetailsProvider trait. Unknown ids resolve
/// to `Ok(None)`, the "no data" degradation path.
#[derive(Default)]
pub struct MockDetails {
    details: Arc<RwLock<HashMap<u64, ItemDetails>>>,
    next_error: Arc<RwLock<Option<MetadataError>>>,
}

impl MockDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, details: ItemDetails) {
        self.details.write().await.insert(details.tmdb_id, details);
    }

    /// Configure the next lookup to fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl DetailsProvider for MockDetails {
    async fn details(
        &self,
        tmdb_id: u64,
        _kind: LibraryKind,
    ) -> Result<Option<ItemDetails>, MetadataError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(self.details.read().await.get(&tmdb_id).cloned())
    }
}
