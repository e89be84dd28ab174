//! Weighted ranking: re-scores the aggregated sequence with position,
//! popularity-percentile, recency and randomness signals plus per-genre
//! bias, then re-orders it.

use chrono::Local;
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::aggregate::CandidateItem;
use crate::metadata::DetailsProvider;
use crate::recipe::{LibraryKind, Weights};

/// Vote counts at or below this are a thin sample for a recent release.
const VOTE_COUNT_THRESHOLD: u64 = 150;

/// Items older than this many days trust their vote sample regardless of
/// its size.
const NEW_ITEM_AGE_DAYS: i64 = 50;

/// Placeholder vote fraction for new items with a thin vote sample:
/// assume below-average rather than trusting the few votes present.
const THIN_SAMPLE_VOTE_FRACTION: f64 = 0.25;

/// Ranking engine configuration.
#[derive(Debug, Clone)]
pub struct RankingOptions {
    pub weights: Weights,
    /// Prefer the earliest US non-theatrical release date for movie ages.
    pub better_release_date: bool,
    /// Retention window in years; derives the age-decay ceiling.
    pub max_age_years: u32,
    pub kind: LibraryKind,
}

/// Weighted ranking engine.
pub struct WeightedRanking {
    opts: RankingOptions,
}

impl WeightedRanking {
    pub fn new(opts: RankingOptions) -> Self {
        Self { opts }
    }

    /// Annotate every item with its component weights and return the
    /// sequence re-sorted by combined weight, descending (stable).
    ///
    /// Items the provider has no data for keep the index weight as their
    /// combined weight; they are never excluded.
    pub async fn rank(
        &self,
        mut items: Vec<CandidateItem>,
        provider: &dyn DetailsProvider,
    ) -> Vec<CandidateItem> {
        let total = items.len();
        if total == 0 {
            return items;
        }

        let today = Local::now().date_naive();

        // First pass: pull details and collect the vote population of items
        // whose sample is trustworthy. Shows have no threshold exemption.
        let mut trusted_votes: Vec<f64> = Vec::new();
        for item in items.iter_mut() {
            let Some(tmdb_id) = item.tmdb_id else {
                warn!("No TMDb id for '{}'", item.title);
                continue;
            };
            let details = match provider.details(tmdb_id, self.opts.kind).await {
                Ok(Some(details)) => details,
                Ok(None) => {
                    warn!("No TMDb data for '{}'", item.title);
                    continue;
                }
                Err(e) => {
                    warn!("TMDb details failed for '{}': {}", item.title, e);
                    continue;
                }
            };

            item.popularity = details.popularity;
            item.vote_average = details.vote_average;
            item.vote_count = details.vote_count;
            item.genres = details.genres.iter().map(|g| g.to_lowercase()).collect();

            let effective_date = match self.opts.kind {
                LibraryKind::Movie => {
                    if self.opts.better_release_date {
                        details.non_theatrical_release.or(details.release_date)
                    } else {
                        details.release_date
                    }
                }
                // Episodic content ages from its most recent episode
                LibraryKind::Tv => details.last_air_date,
            };
            if let Some(date) = effective_date {
                item.release_date = Some(date);
                item.age_days = Some((today - date).num_days());
            }

            if self.trusts_vote_sample(item) {
                if let Some(vote) = item.vote_average {
                    trusted_votes.push(vote);
                }
            }
        }
        trusted_votes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        // Second pass: component weights. All fractions are distributed
        // over 0..=1 before their configured factor is applied.
        for (i, item) in items.iter_mut().enumerate() {
            let index_fraction = (total - i) as f64 / total as f64;
            item.weights.index = index_fraction * self.opts.weights.index;

            let has_metadata = item.popularity.is_some()
                && item.vote_average.is_some()
                && item.age_days.is_some();
            if !has_metadata {
                item.weights.vote = 0.0;
                item.weights.age = 0.0;
                item.weights.random = 0.0;
                item.weights.combined = item.weights.index;
                warn!(
                    "'{}' is missing ranking metadata, keeping index weight only",
                    item.title
                );
                continue;
            }

            let vote = item.vote_average.expect("checked above");
            let vote_fraction = if self.trusts_vote_sample(item) && !trusted_votes.is_empty() {
                // Percentile rank within the trusted vote population; ties
                // resolve to the first occurrence
                let position = trusted_votes.iter().position(|v| *v == vote).unwrap_or(0);
                (position + 1) as f64 / trusted_votes.len() as f64
            } else {
                THIN_SAMPLE_VOTE_FRACTION
            };

            let age_fraction = self.age_fraction(item.age_days.expect("checked above") as f64);

            item.weights.vote = vote_fraction * self.opts.weights.vote;
            item.weights.age = age_fraction * self.opts.weights.age;
            item.weights.random = if self.opts.weights.random > 0.0 {
                rand::random::<f64>() * self.opts.weights.random
            } else {
                0.0
            };

            let mut combined =
                item.weights.index + item.weights.vote + item.weights.age + item.weights.random;
            for (genre, factor) in &self.opts.weights.genre_bias {
                if item.genres.iter().any(|g| *g == genre.to_lowercase()) {
                    combined *= factor;
                }
            }
            item.weights.combined = combined;
        }

        items.sort_by(|a, b| {
            b.weights
                .combined
                .partial_cmp(&a.weights.combined)
                .unwrap_or(Ordering::Equal)
        });

        for (i, item) in items.iter().enumerate() {
            debug!(
                "{:>3}: was {:>3}; w_idx:{:.3} vote:{} w_vote:{:.3} age:{} w_age:{:.3} \
                 w_rnd:{:.3} w_cmb:{:.3} {} ({})",
                i + 1,
                item.original_idx,
                item.weights.index,
                item.vote_average.unwrap_or(0.0),
                item.weights.vote,
                item.age_days.unwrap_or(0),
                item.weights.age,
                item.weights.random,
                item.weights.combined,
                item.title,
                item.year.unwrap_or(0),
            );
        }

        items
    }

    /// Whether an item's vote sample is large (or old) enough to trust.
    /// Shows always qualify.
    fn trusts_vote_sample(&self, item: &CandidateItem) -> bool {
        self.opts.kind == LibraryKind::Tv
            || item.vote_count.unwrap_or(0) > VOTE_COUNT_THRESHOLD
            || item.age_days.unwrap_or(0) > NEW_ITEM_AGE_DAYS
    }

    /// Linear decay from 1.0 at the per-kind floor to 0.0 at a ceiling
    /// derived from the retention window.
    fn age_fraction(&self, days: f64) -> f64 {
        let (min_days, fallback_max) = match self.opts.kind {
            LibraryKind::Movie => (180.0, 360.0),
            // Episodic content ages slower
            LibraryKind::Tv => (14.0, 180.0),
        };
        let max_days = if self.opts.max_age_years == 0 {
            fallback_max
        } else {
            self.opts.max_age_years as f64 / 4.0 * 365.25
        };

        if days <= min_days {
            1.0
        } else if days >= max_days {
            0.0
        } else {
            1.0 - (days - min_days) / (max_days - min_days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ItemDetails;
    use crate::sources::RawListItem;
    use crate::testing::MockDetails;
    use chrono::Duration;

    fn candidate(imdb: &str, tmdb: u64, title: &str, idx: usize) -> CandidateItem {
        CandidateItem::from_raw(
            RawListItem {
                imdb_id: imdb.to_string(),
                tmdb_id: Some(tmdb),
                tvdb_id: None,
                title: title.to_string(),
                year: Some(2020),
                release_date: None,
            },
            idx,
        )
    }

    fn details(tmdb_id: u64, vote: f64, count: u64, age_days: i64) -> ItemDetails {
        let date = Local::now().date_naive() - Duration::days(age_days);
        ItemDetails {
            tmdb_id,
            popularity: Some(50.0),
            vote_average: Some(vote),
            vote_count: Some(count),
            genres: vec![],
            release_date: Some(date),
            last_air_date: Some(date),
            non_theatrical_release: None,
        }
    }

    fn options(weights: Weights) -> RankingOptions {
        RankingOptions {
            weights,
            better_release_date: false,
            max_age_years: 3,
            kind: LibraryKind::Movie,
        }
    }

    #[tokio::test]
    async fn test_position_monotonicity() {
        // Identical vote/age metadata: the better source position must
        // produce the greater combined weight
        let provider = MockDetails::new();
        provider.insert(details(1, 7.0, 1000, 400)).await;
        provider.insert(details(2, 7.0, 1000, 400)).await;

        let ranking = WeightedRanking::new(options(Weights {
            index: 0.75,
            vote: 0.10,
            age: 0.15,
            random: 0.0,
            genre_bias: Default::default(),
        }));

        let items = vec![candidate("tt1", 1, "First", 1), candidate("tt2", 2, "Second", 2)];
        let ranked = ranking.rank(items, &provider).await;

        assert_eq!(ranked[0].imdb_id, "tt1");
        assert!(ranked[0].weights.combined >= ranked[1].weights.combined);
    }

    #[tokio::test]
    async fn test_thin_sample_placeholder_vote() {
        // A new item with few votes gets the fixed below-average fraction
        // instead of a percentile over one sample
        let provider = MockDetails::new();
        provider.insert(details(1, 9.8, 12, 10)).await;
        provider.insert(details(2, 6.0, 5000, 400)).await;

        let ranking = WeightedRanking::new(options(Weights {
            index: 0.0,
            vote: 1.0,
            age: 0.0,
            random: 0.0,
            genre_bias: Default::default(),
        }));

        let items = vec![candidate("tt1", 1, "Hyped", 1), candidate("tt2", 2, "Seasoned", 2)];
        let ranked = ranking.rank(items, &provider).await;

        // Seasoned is the only trusted vote: percentile 1.0; Hyped gets 0.25
        let hyped = ranked.iter().find(|i| i.imdb_id == "tt1").unwrap();
        let seasoned = ranked.iter().find(|i| i.imdb_id == "tt2").unwrap();
        assert!((hyped.weights.vote - 0.25).abs() < 1e-9);
        assert!((seasoned.weights.vote - 1.0).abs() < 1e-9);
        assert_eq!(ranked[0].imdb_id, "tt2");
    }

    #[tokio::test]
    async fn test_vote_percentile_distribution() {
        let provider = MockDetails::new();
        provider.insert(details(1, 6.0, 1000, 400)).await;
        provider.insert(details(2, 7.0, 1000, 400)).await;
        provider.insert(details(3, 8.0, 1000, 400)).await;

        let ranking = WeightedRanking::new(options(Weights {
            index: 0.0,
            vote: 1.0,
            age: 0.0,
            random: 0.0,
            genre_bias: Default::default(),
        }));

        let items = vec![
            candidate("tt1", 1, "Low", 1),
            candidate("tt2", 2, "Mid", 2),
            candidate("tt3", 3, "High", 3),
        ];
        let ranked = ranking.rank(items, &provider).await;

        let by_id = |id: &str| ranked.iter().find(|i| i.imdb_id == id).unwrap();
        assert!((by_id("tt1").weights.vote - 1.0 / 3.0).abs() < 1e-9);
        assert!((by_id("tt2").weights.vote - 2.0 / 3.0).abs() < 1e-9);
        assert!((by_id("tt3").weights.vote - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_metadata_degrades_to_index_weight() {
        let provider = MockDetails::new(); // knows nothing

        let ranking = WeightedRanking::new(options(Weights {
            index: 0.75,
            vote: 0.10,
            age: 0.15,
            random: 0.5,
            genre_bias: Default::default(),
        }));

        let items = vec![candidate("tt1", 1, "Unknown", 1), candidate("tt2", 2, "Also", 2)];
        let ranked = ranking.rank(items, &provider).await;

        // Never excluded; combined weight falls back to the index weight
        assert_eq!(ranked.len(), 2);
        assert!((ranked[0].weights.combined - 0.75).abs() < 1e-9);
        assert_eq!(ranked[0].weights.vote, 0.0);
        assert_eq!(ranked[0].weights.random, 0.0);
        assert!((ranked[1].weights.combined - 0.375).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_genre_bias_compounds() {
        let provider = MockDetails::new();
        let mut d = details(1, 7.0, 1000, 400);
        d.genres = vec!["Animation".to_string(), "TV Movie".to_string()];
        provider.insert(d).await;

        let mut genre_bias = std::collections::HashMap::new();
        genre_bias.insert("animation".to_string(), 0.5);
        genre_bias.insert("TV Movie".to_string(), 0.5);

        let ranking = WeightedRanking::new(options(Weights {
            index: 1.0,
            vote: 0.0,
            age: 0.0,
            random: 0.0,
            genre_bias,
        }));

        let ranked = ranking
            .rank(vec![candidate("tt1", 1, "Cartoon", 1)], &provider)
            .await;

        // Both biases match and compound multiplicatively: 1.0 * 0.5 * 0.5
        assert!((ranked[0].weights.combined - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_age_fraction_decay() {
        let ranking = WeightedRanking::new(options(Weights::default()));
        // 3-year window: ceiling = 3 / 4 * 365.25 ≈ 274 days
        assert_eq!(ranking.age_fraction(10.0), 1.0);
        assert_eq!(ranking.age_fraction(180.0), 1.0);
        assert_eq!(ranking.age_fraction(400.0), 0.0);
        let mid = ranking.age_fraction(220.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_age_fraction_fallback_ceiling() {
        let mut opts = options(Weights::default());
        opts.max_age_years = 0;
        let ranking = WeightedRanking::new(opts);
        // No retention window: movies decay to zero at 360 days
        assert_eq!(ranking.age_fraction(360.0), 0.0);
        assert!(ranking.age_fraction(359.0) > 0.0);
    }
}
