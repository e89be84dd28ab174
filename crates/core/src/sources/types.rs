use chrono::NaiveDate;

/// Age-cutoff semantics for a source's items. Sources differ in date
/// granularity, so both must be supported by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffKind {
    /// Coarse calendar-year comparison.
    Year,
    /// Exact comparison against "now shifted back N years".
    Date,
}

/// A raw item from a ranked list, before deduplication and filtering.
#[derive(Debug, Clone)]
pub struct RawListItem {
    /// Primary identifier (imdb namespace).
    pub imdb_id: String,
    pub tmdb_id: Option<u64>,
    pub tvdb_id: Option<u64>,
    pub title: String,
    pub year: Option<i32>,
    pub release_date: Option<NaiveDate>,
}
