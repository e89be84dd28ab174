//! Identity resolution: guid parsing, the persistent identifier cache and
//! the per-run identity index.

mod cache;
mod guid;
mod identity;

pub use cache::{CacheEntry, IdentifierCache};
pub use guid::{IdNamespace, IdentityKey};
pub use identity::{build_index, resolve_identities, AllowList, IdentityIndex};

use thiserror::Error;

/// Errors for identifier cache operations. Recovered locally wherever
/// possible: an unreadable store is reset, a failed read or write only
/// costs a re-resolution.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),
}
