//! frontrow-core: the reconciliation and identity-resolution engine behind
//! the `frontrow` library curator.
//!
//! A recipe run aggregates candidate items from external ranked lists,
//! optionally re-ranks them with a weighted heuristic, matches them against
//! a media catalog across several identifier namespaces, converges a
//! symlink-based derived library to the desired membership and pushes the
//! computed ordering back to the catalog.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod index;
pub mod linker;
pub mod matcher;
pub mod metadata;
pub mod ranking;
pub mod recipe;
pub mod runner;
pub mod sources;
pub mod testing;

pub use aggregate::{aggregate, Aggregated, CandidateItem, ItemWeights};
pub use catalog::{
    CatalogAccount, CatalogError, CatalogItem, CatalogSection, MediaCatalog, PlexCatalog,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use index::{
    build_index, AllowList, CacheEntry, CacheError, IdNamespace, IdentifierCache, IdentityIndex,
    IdentityKey,
};
pub use linker::{LinkError, LinkOps, NativeLinkOps, Reconciler};
pub use matcher::{match_candidates, MatchReport};
pub use metadata::{DetailsProvider, ItemDetails, MetadataError, TmdbClient, TvdbClient};
pub use ranking::{RankingOptions, WeightedRanking};
pub use recipe::{list_recipes, load_recipe, LibraryKind, Recipe, RecipeError};
pub use runner::{RecipeRunner, RunError, RunReport};
pub use sources::{
    CutoffKind, ImdbChartSource, RankedSource, RawListItem, SourceError, SourceResolver,
    SourceSet, TraktSource,
};
