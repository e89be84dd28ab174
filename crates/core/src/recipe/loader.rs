use figment::{
    providers::{Format, Yaml},
    Figment,
};
use std::path::Path;

use super::{types::Recipe, RecipeError};

/// Load a recipe by name from a directory. The name may carry a `.yml` or
/// `.yaml` extension, which is stripped.
pub fn load_recipe(dir: &Path, name: &str) -> Result<Recipe, RecipeError> {
    let stem = name.trim_end_matches(".yml").trim_end_matches(".yaml");

    let path = ["yml", "yaml"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.exists())
        .ok_or_else(|| RecipeError::NotFound(stem.to_string()))?;

    let recipe: Recipe = Figment::new()
        .merge(Yaml::file(&path))
        .extract()
        .map_err(|e| RecipeError::ParseError(e.to_string()))?;

    recipe.validate()?;
    Ok(recipe)
}

/// Load a recipe from a YAML string (useful for testing)
pub fn load_recipe_from_str(yaml_str: &str) -> Result<Recipe, RecipeError> {
    let recipe: Recipe = Figment::new()
        .merge(Yaml::string(yaml_str))
        .extract()
        .map_err(|e| RecipeError::ParseError(e.to_string()))?;
    recipe.validate()?;
    Ok(recipe)
}

/// List the recipe names available in a directory, sorted.
pub fn list_recipes(dir: &Path) -> Result<Vec<String>, RecipeError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RecipeError::NotFound(format!("{}: {}", dir.display(), e)))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("yml") | Some("yaml") => path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string()),
                _ => None,
            }
        })
        .collect();
    names.sort();

    Ok(names)
}
