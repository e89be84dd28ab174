use chrono::NaiveDate;

/// A library section on the catalog server.
#[derive(Debug, Clone)]
pub struct CatalogSection {
    /// Section identifier, opaque to the engine.
    pub id: String,
    pub title: String,
    /// Whether an asynchronous scan/refresh is currently running.
    pub refreshing: bool,
}

/// An item in a catalog section.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    /// Native item identifier, opaque to the engine.
    pub rating_key: String,
    /// Native reference string, typically URI-shaped (`imdb://…`).
    pub guid: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    /// Original availability date, used by age-based removal.
    pub originally_available: Option<NaiveDate>,
    /// Last-modified timestamp (unix seconds). Items without one are
    /// resolved every run instead of through the identifier cache.
    pub updated_at: Option<i64>,
}

/// A server account with library access.
#[derive(Debug, Clone)]
pub struct CatalogAccount {
    pub id: String,
    pub name: String,
    /// Per-account access token for the same server.
    pub token: String,
}
