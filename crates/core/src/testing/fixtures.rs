//! Shared test fixtures.

use chrono::NaiveDate;

use crate::catalog::CatalogItem;
use crate::sources::RawListItem;

/// A catalog item with sensible defaults: available Jan 1 of `year`,
/// last modified at a fixed timestamp.
pub fn catalog_item(
    rating_key: &str,
    guid: Option<&str>,
    title: &str,
    year: i32,
) -> CatalogItem {
    CatalogItem {
        rating_key: rating_key.to_string(),
        guid: guid.map(|g| g.to_string()),
        title: title.to_string(),
        year: Some(year),
        originally_available: NaiveDate::from_ymd_opt(year, 1, 1),
        updated_at: Some(1_000),
    }
}

/// A raw ranked-list item.
pub fn raw_item(imdb: &str, tmdb: Option<u64>, title: &str, year: i32) -> RawListItem {
    RawListItem {
        imdb_id: imdb.to_string(),
        tmdb_id: tmdb,
        tvdb_id: None,
        title: title.to_string(),
        year: Some(year),
        release_date: None,
    }
}
