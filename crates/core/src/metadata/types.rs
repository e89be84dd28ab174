use chrono::NaiveDate;

/// Ranking-relevant details for one item.
#[derive(Debug, Clone)]
pub struct ItemDetails {
    pub tmdb_id: u64,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub genres: Vec<String>,
    /// Theatrical release date (movies) or first air date (shows).
    pub release_date: Option<NaiveDate>,
    /// Last air date (shows only).
    pub last_air_date: Option<NaiveDate>,
    /// Earliest US digital/physical/TV release date (movies only).
    pub non_theatrical_release: Option<NaiveDate>,
}

/// An item located through a cross-namespace find.
#[derive(Debug, Clone)]
pub struct FoundItem {
    pub tmdb_id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub release_date: Option<NaiveDate>,
}

/// A TVDb series record.
#[derive(Debug, Clone)]
pub struct TvdbSeries {
    pub id: u64,
    pub name: Option<String>,
    pub first_aired: Option<NaiveDate>,
    pub imdb_id: Option<String>,
}
