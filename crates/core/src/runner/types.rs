use std::path::PathBuf;
use thiserror::Error;

use crate::aggregate::CandidateItem;
use crate::catalog::CatalogError;
use crate::index::CacheError;
use crate::recipe::RecipeError;
use crate::sources::SourceError;

/// Result of one recipe run.
#[derive(Debug)]
pub struct RunReport {
    /// Candidates that could not be matched, as (0-based aggregated
    /// index, item). Reported, never treated as a failure.
    pub missing: Vec<(usize, CandidateItem)>,
    /// Number of items in the destination after convergence.
    pub item_count: usize,
    pub created_links: usize,
    pub removed_links: usize,
}

/// Fatal errors for a recipe run. Recoverable conditions (individual link
/// failures, cache resets, missing metadata) are logged inside the run
/// instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The recipe cannot drive this operation.
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    /// The destination folder could not be created.
    #[error("Unable to create the new library folder '{path}'")]
    DestinationFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog refresh wait exceeded the configured bound.
    #[error("The '{section}' library did not finish refreshing within {waited_secs}s")]
    RefreshTimeout { section: String, waited_secs: u64 },
}
