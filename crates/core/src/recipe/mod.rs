//! Recipes: declarative descriptions of one source-to-destination library
//! sync job (ranked sources, filters, weights, destination, removal policy).

mod loader;
mod types;

pub use loader::{list_recipes, load_recipe, load_recipe_from_str};
pub use types::{
    LibraryKind, NewLibrary, PlaylistSink, Recipe, SortTitle, SourceLibrary, WeightedSorting,
    Weights,
};

use thiserror::Error;

/// Errors that can occur loading or validating a recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// Recipe file not found.
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// Failed to parse the recipe.
    #[error("Failed to parse recipe: {0}")]
    ParseError(String),

    /// Recipe failed validation.
    #[error("Invalid recipe: {0}")]
    ValidationError(String),
}
