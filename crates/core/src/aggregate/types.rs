use chrono::NaiveDate;

use crate::sources::RawListItem;

/// A desired library entry derived from an external ranked source.
///
/// Created during aggregation, annotated in place by the ranking engine,
/// read by the matcher and sort-order applier, discarded at end of run.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    /// Primary identifier (imdb namespace). Unique within one run.
    pub imdb_id: String,
    pub tmdb_id: Option<u64>,
    pub tvdb_id: Option<u64>,
    pub title: String,
    pub year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    /// 1-based position in the aggregated (pre-ranking) order.
    pub original_idx: usize,
    /// Filled by the ranking engine from the details provider.
    pub genres: Vec<String>,
    pub age_days: Option<i64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub weights: ItemWeights,
}

/// Component weights attached by the ranking engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemWeights {
    pub index: f64,
    pub vote: f64,
    pub age: f64,
    pub random: f64,
    pub combined: f64,
}

impl CandidateItem {
    pub fn from_raw(raw: RawListItem, original_idx: usize) -> Self {
        Self {
            imdb_id: raw.imdb_id,
            tmdb_id: raw.tmdb_id,
            tvdb_id: raw.tvdb_id,
            title: raw.title,
            year: raw.year,
            release_date: raw.release_date,
            original_idx,
            genres: Vec::new(),
            age_days: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
            weights: ItemWeights::default(),
        }
    }
}
