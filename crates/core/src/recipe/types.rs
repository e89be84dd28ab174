use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::RecipeError;

/// Kind of items a library holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    #[serde(alias = "movies")]
    Movie,
    #[serde(alias = "show", alias = "shows")]
    Tv,
}

/// A recipe: one source-to-destination sync job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recipe {
    pub library_type: LibraryKind,
    /// Ranked list URLs, consumed in order.
    pub source_list_urls: Vec<String>,
    /// Existing catalog libraries to match candidates against.
    pub source_libraries: Vec<SourceLibrary>,
    /// Destination library sink. Mutually exclusive with `playlist`.
    #[serde(default)]
    pub new_library: Option<NewLibrary>,
    /// Playlist sink. Mutually exclusive with `new_library`.
    #[serde(default)]
    pub playlist: Option<PlaylistSink>,
    #[serde(default)]
    pub weighted_sorting: WeightedSorting,
}

impl Recipe {
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.source_list_urls.is_empty() {
            return Err(RecipeError::ValidationError(
                "source_list_urls must not be empty".to_string(),
            ));
        }
        if self.source_libraries.is_empty() {
            return Err(RecipeError::ValidationError(
                "source_libraries must not be empty".to_string(),
            ));
        }
        match (&self.new_library, &self.playlist) {
            (None, None) => Err(RecipeError::ValidationError(
                "recipe must declare either new_library or playlist".to_string(),
            )),
            (Some(_), Some(_)) => Err(RecipeError::ValidationError(
                "new_library and playlist are mutually exclusive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Retention window in years (0 = unlimited), from whichever sink is set.
    pub fn max_age(&self) -> u32 {
        self.new_library
            .as_ref()
            .map(|l| l.max_age)
            .or_else(|| self.playlist.as_ref().map(|p| p.max_age))
            .unwrap_or(0)
    }

    /// Maximum matched item count (0 = unlimited), from whichever sink is set.
    pub fn max_count(&self) -> usize {
        self.new_library
            .as_ref()
            .map(|l| l.max_count)
            .or_else(|| self.playlist.as_ref().map(|p| p.max_count))
            .unwrap_or(0)
    }
}

/// An existing catalog library candidates are matched against.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceLibrary {
    /// Section name on the catalog server.
    pub name: String,
    /// Filesystem folders backing the section.
    pub folders: Vec<PathBuf>,
}

/// Destination library configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewLibrary {
    /// Section name on the catalog server.
    pub name: String,
    /// Folder the symlinks are created under.
    pub folder: PathBuf,
    /// Whether to push sort titles to the catalog.
    #[serde(default = "default_true")]
    pub sort: bool,
    /// Retention window in years (0 = unlimited).
    #[serde(default)]
    pub max_age: u32,
    /// Maximum number of items to keep (0 = unlimited).
    #[serde(default)]
    pub max_count: usize,
    #[serde(default)]
    pub sort_title: SortTitle,
    /// Remove symlinks for items that no longer qualify, unconditionally.
    #[serde(default)]
    pub remove_from_library: bool,
    /// Remove non-qualifying items only when older than the retention window.
    #[serde(default)]
    pub remove_older_than_max_age: bool,
    /// Bound on the catalog refresh wait, in seconds (0 = wait forever).
    #[serde(default)]
    pub refresh_timeout_secs: u64,
}

/// Sort title assignment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SortTitle {
    /// Number by original list position instead of a running counter.
    #[serde(default)]
    pub absolute: bool,
    #[serde(default = "default_sort_title_format")]
    pub format: String,
    /// Also rewrite the visible title, not just the sort key.
    #[serde(default)]
    pub visible: bool,
}

impl Default for SortTitle {
    fn default() -> Self {
        Self {
            absolute: false,
            format: default_sort_title_format(),
            visible: false,
        }
    }
}

/// Playlist sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistSink {
    /// Playlist name.
    pub name: String,
    /// Also write the playlist for every account with server access.
    #[serde(default)]
    pub shared: bool,
    /// Retention window in years (0 = unlimited).
    #[serde(default)]
    pub max_age: u32,
    /// Maximum number of items to keep (0 = unlimited).
    #[serde(default)]
    pub max_count: usize,
}

/// Weighted sorting configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeightedSorting {
    #[serde(default)]
    pub enabled: bool,
    /// Prefer the earliest US non-theatrical release date for movie ages.
    #[serde(default)]
    pub better_release_date: bool,
    #[serde(default)]
    pub weights: Weights,
}

/// Component weight factors. Think of these as percentages, but they do not
/// have to add up to 1.0; higher means more important.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Weights {
    #[serde(default = "default_index_weight")]
    pub index: f64,
    #[serde(default)]
    pub vote: f64,
    #[serde(default)]
    pub age: f64,
    #[serde(default)]
    pub random: f64,
    /// Per-genre multiplicative bias (<1 penalizes, >1 rewards).
    #[serde(default)]
    pub genre_bias: HashMap<String, f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            index: default_index_weight(),
            vote: 0.0,
            age: 0.0,
            random: 0.0,
            genre_bias: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sort_title_format() -> String {
    "{number} {title}".to_string()
}

fn default_index_weight() -> f64 {
    1.0
}
