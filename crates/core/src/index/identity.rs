//! The identity index: bidirectional mapping between external identifiers
//! and catalog items, built fresh each run from a catalog snapshot.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::cache::{CacheEntry, IdentifierCache};
use super::guid::{IdNamespace, IdentityKey};
use crate::catalog::{CatalogItem, MediaCatalog};

/// Per-namespace identifier allow-lists for matching-only index builds.
///
/// Built from the aggregator's seen-token set: raw ids for imdb,
/// `tmdb<id>` / `tvdb<id>` tokens for the rest.
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    imdb: HashSet<String>,
    tmdb: HashSet<String>,
    tvdb: HashSet<String>,
}

impl AllowList {
    pub fn from_tokens(tokens: &HashSet<String>) -> Self {
        let mut allow = Self::default();
        for token in tokens {
            if let Some(id) = token.strip_prefix("tmdb") {
                allow.tmdb.insert(id.to_string());
            } else if let Some(id) = token.strip_prefix("tvdb") {
                allow.tvdb.insert(id.to_string());
            } else {
                allow.imdb.insert(token.clone());
            }
        }
        allow
    }

    fn permits(&self, key: &IdentityKey) -> bool {
        match key.namespace {
            IdNamespace::Imdb => self.imdb.contains(&key.id),
            IdNamespace::Tmdb => self.tmdb.contains(&key.id),
            IdNamespace::Tvdb => self.tvdb.contains(&key.id),
        }
    }
}

/// Bidirectional identifier-to-item index: one map per namespace plus the
/// canonical set of indexed items.
///
/// The unrestricted flavor also retains items that resolve to no
/// identifier at all, so convergence can still remove or re-number them;
/// those are only reachable through [`IdentityIndex::drain_remaining`].
#[derive(Debug, Default)]
pub struct IdentityIndex {
    restrict: Option<AllowList>,
    by_imdb: HashMap<String, Vec<String>>,
    by_tmdb: HashMap<String, Vec<String>>,
    by_tvdb: HashMap<String, Vec<String>>,
    items: HashMap<String, CatalogItem>,
    /// Insertion order, for a deterministic drain.
    order: Vec<String>,
}

impl IdentityIndex {
    /// An unrestricted index: registers everything it is given.
    pub fn new() -> Self {
        Self::default()
    }

    /// A matching-only index: registers only identifiers on the allow-list
    /// and drops items with no permitted identifier, bounding memory when
    /// scanning a large catalog against a small candidate set.
    pub fn matching_only(allow: AllowList) -> Self {
        Self {
            restrict: Some(allow),
            ..Self::default()
        }
    }

    /// Register an item under every identifier it resolves to.
    pub fn add(&mut self, item: CatalogItem, keys: &[IdentityKey]) {
        let permitted: Vec<&IdentityKey> = match &self.restrict {
            Some(allow) => keys.iter().filter(|k| allow.permits(k)).collect(),
            None => keys.iter().collect(),
        };

        if permitted.is_empty() && self.restrict.is_some() {
            return;
        }

        let rating_key = item.rating_key.clone();
        if self.items.contains_key(&rating_key) {
            debug!("Item {} already indexed", rating_key);
            return;
        }

        for key in permitted {
            self.map_mut(key.namespace)
                .entry(key.id.clone())
                .or_default()
                .push(rating_key.clone());
        }
        self.order.push(rating_key.clone());
        self.items.insert(rating_key, item);
    }

    /// All items registered under the first identifier that matches,
    /// trying namespaces in priority order imdb > tmdb > tvdb.
    pub fn get_all(
        &self,
        imdb: Option<&str>,
        tmdb: Option<u64>,
        tvdb: Option<u64>,
    ) -> Vec<&CatalogItem> {
        self.first_hit(imdb, tmdb, tvdb)
            .map(|keys| {
                keys.iter()
                    .filter_map(|rk| self.items.get(rk))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove and return the first item found under the identifiers, in
    /// priority order. The item leaves every namespace map and the
    /// canonical set together; no partial state remains observable.
    pub fn pop(
        &mut self,
        imdb: Option<&str>,
        tmdb: Option<u64>,
        tvdb: Option<u64>,
    ) -> Option<CatalogItem> {
        let rating_key = self
            .first_hit(imdb, tmdb, tvdb)
            .and_then(|keys| keys.first().cloned())?;
        self.remove(&rating_key)
    }

    /// Remove and return the remaining items, in insertion order.
    pub fn drain_remaining(&mut self) -> Vec<CatalogItem> {
        let keys: Vec<String> = self.order.clone();
        keys.iter().filter_map(|rk| self.remove(rk)).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn first_hit(
        &self,
        imdb: Option<&str>,
        tmdb: Option<u64>,
        tvdb: Option<u64>,
    ) -> Option<&Vec<String>> {
        if let Some(id) = imdb {
            if let Some(keys) = self.by_imdb.get(id).filter(|v| !v.is_empty()) {
                return Some(keys);
            }
        }
        if let Some(id) = tmdb {
            if let Some(keys) = self.by_tmdb.get(&id.to_string()).filter(|v| !v.is_empty()) {
                return Some(keys);
            }
        }
        if let Some(id) = tvdb {
            if let Some(keys) = self.by_tvdb.get(&id.to_string()).filter(|v| !v.is_empty()) {
                return Some(keys);
            }
        }
        None
    }

    fn remove(&mut self, rating_key: &str) -> Option<CatalogItem> {
        let item = self.items.remove(rating_key)?;
        for map in [&mut self.by_imdb, &mut self.by_tmdb, &mut self.by_tvdb] {
            map.retain(|_, keys| {
                keys.retain(|rk| rk != rating_key);
                !keys.is_empty()
            });
        }
        self.order.retain(|rk| rk != rating_key);
        Some(item)
    }

    fn map_mut(&mut self, namespace: IdNamespace) -> &mut HashMap<String, Vec<String>> {
        match namespace {
            IdNamespace::Imdb => &mut self.by_imdb,
            IdNamespace::Tmdb => &mut self.by_tmdb,
            IdNamespace::Tvdb => &mut self.by_tvdb,
        }
    }
}

/// Resolve the identity keys of one catalog item.
///
/// A reference in a recognized scheme resolves directly. Anything else
/// (legacy internal agents, `plex://`, `local://`) routes through the
/// item's full external-reference list, memoized in the persistent cache:
/// the cached list is reused only while its stored timestamp is not older
/// than the item's last-modified timestamp.
pub async fn resolve_identities(
    item: &CatalogItem,
    catalog: &dyn MediaCatalog,
    cache: &IdentifierCache,
    section_id: &str,
) -> Vec<IdentityKey> {
    let Some(guid) = item.guid.as_deref() else {
        return Vec::new();
    };

    if let Some(key) = IdentityKey::parse(guid) {
        return vec![key];
    }

    let updated_at = match item.updated_at {
        Some(ts) => Some(ts),
        None => {
            warn!(
                "Item '{}' has no last-modified timestamp; resolving every run",
                item.title
            );
            None
        }
    };

    // Items without a timestamp are always stale: skip the cache read
    if let Some(ts) = updated_at {
        match cache.get(section_id, guid) {
            Ok(Some(entry)) if entry.updated_at >= ts => {
                return entry
                    .identifiers
                    .iter()
                    .filter_map(|r| IdentityKey::parse(r))
                    .collect();
            }
            Ok(_) => {}
            Err(e) => warn!("Identifier cache read failed for '{}': {}", guid, e),
        }
    }

    let references = match catalog.external_ids(&item.rating_key).await {
        Ok(references) => references,
        Err(e) => {
            warn!(
                "Failed to fetch external references for '{}': {}",
                item.title, e
            );
            return Vec::new();
        }
    };

    let entry = CacheEntry {
        identifiers: references.clone(),
        updated_at: updated_at.unwrap_or(0),
    };
    if let Err(e) = cache.put(section_id, guid, &entry) {
        warn!("Identifier cache write failed for '{}': {}", guid, e);
    }

    references
        .iter()
        .filter_map(|r| IdentityKey::parse(r))
        .collect()
}

/// Build an index over a catalog section snapshot. With an allow-list the
/// index is matching-only; without one it is unrestricted.
pub async fn build_index(
    catalog: &dyn MediaCatalog,
    cache: &IdentifierCache,
    section_id: &str,
    items: Vec<CatalogItem>,
    allow: Option<AllowList>,
) -> IdentityIndex {
    let mut index = match allow {
        Some(allow) => IdentityIndex::matching_only(allow),
        None => IdentityIndex::new(),
    };

    for item in items {
        let keys = resolve_identities(&item, catalog, cache, section_id).await;
        index.add(item, &keys);
    }

    debug!("Indexed {} items from section {}", index.len(), section_id);
    index
}
