//! Candidate matching: resolves each candidate against the source-side
//! identity index and splits the sequence into matched and missing.

use tracing::{debug, info};

use crate::aggregate::CandidateItem;
use crate::catalog::CatalogItem;
use crate::index::IdentityIndex;

/// Outcome of matching one candidate sequence against a catalog snapshot.
#[derive(Debug)]
pub struct MatchReport {
    /// Matched catalog items in candidate order. A candidate with several
    /// registered items (multi-edition content) contributes all of them.
    pub matched_items: Vec<CatalogItem>,
    /// The final ordered candidate sequence. Relative ordering drops
    /// unmatched candidates so numbering stays contiguous; absolute
    /// ordering keeps them as placeholders.
    pub candidates: Vec<CandidateItem>,
    /// Unmatched candidates as (0-based aggregated index, item).
    pub missing: Vec<(usize, CandidateItem)>,
    /// Number of matched candidates, counted once per candidate.
    pub matched_total: usize,
}

/// Match candidates in order against the index.
///
/// Once `max_count` candidates have matched, every further candidate is
/// treated as a miss regardless of whether it would otherwise match.
pub fn match_candidates(
    candidates: Vec<CandidateItem>,
    index: &IdentityIndex,
    max_count: usize,
    absolute_order: bool,
) -> MatchReport {
    let mut matched_items = Vec::new();
    let mut missing = Vec::new();
    let mut kept = Vec::new();
    let mut matched_total = 0usize;

    for (i, candidate) in candidates.into_iter().enumerate() {
        if max_count > 0 && matched_total >= max_count {
            debug!("'{}' is beyond the library size cap", candidate.title);
            if absolute_order {
                kept.push(candidate.clone());
            }
            missing.push((i, candidate));
            continue;
        }

        let hits = index.get_all(
            Some(&candidate.imdb_id),
            candidate.tmdb_id,
            candidate.tvdb_id,
        );

        if hits.is_empty() {
            if absolute_order {
                kept.push(candidate.clone());
            }
            missing.push((i, candidate));
            continue;
        }

        matched_items.extend(hits.into_iter().cloned());
        matched_total += 1;

        let shown_number = if absolute_order { i + 1 } else { matched_total };
        info!(
            "{} {} ({})",
            shown_number,
            candidate.title,
            candidate.year.unwrap_or(0)
        );
        kept.push(candidate);
    }

    MatchReport {
        matched_items,
        candidates: kept,
        missing,
        matched_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IdentityKey;
    use crate::sources::RawListItem;
    use crate::testing::fixtures;

    fn candidate(imdb: &str, tmdb: Option<u64>, title: &str, idx: usize) -> CandidateItem {
        CandidateItem::from_raw(
            RawListItem {
                imdb_id: imdb.to_string(),
                tmdb_id: tmdb,
                tvdb_id: None,
                title: title.to_string(),
                year: Some(2020),
                release_date: None,
            },
            idx,
        )
    }

    fn index_with(refs: &[(&str, &str)]) -> IdentityIndex {
        let mut index = IdentityIndex::new();
        for (rating_key, guid) in refs {
            let keys: Vec<IdentityKey> = IdentityKey::parse(guid).into_iter().collect();
            index.add(
                fixtures::catalog_item(rating_key, Some(guid), "Item", 2020),
                &keys,
            );
        }
        index
    }

    #[test]
    fn test_every_candidate_is_matched_or_missing() {
        let index = index_with(&[("1", "imdb://tt2")]);
        let candidates = vec![
            candidate("tt1", None, "A", 1),
            candidate("tt2", None, "B", 2),
            candidate("tt3", None, "C", 3),
        ];

        let report = match_candidates(candidates, &index, 0, false);

        assert_eq!(report.matched_total, 1);
        assert_eq!(report.matched_items.len(), 1);
        assert_eq!(report.missing.len(), 2);
        // Exhaustive and exclusive: 1 matched + 2 missing = 3 candidates
        let missing_ids: Vec<&str> =
            report.missing.iter().map(|(_, c)| c.imdb_id.as_str()).collect();
        assert_eq!(missing_ids, vec!["tt1", "tt3"]);
        assert_eq!(report.missing[0].0, 0);
        assert_eq!(report.missing[1].0, 2);
    }

    #[test]
    fn test_relative_order_compacts_candidates() {
        let index = index_with(&[("1", "imdb://tt2")]);
        let candidates = vec![candidate("tt1", None, "A", 1), candidate("tt2", None, "B", 2)];

        let report = match_candidates(candidates, &index, 0, false);

        let kept: Vec<&str> = report.candidates.iter().map(|c| c.imdb_id.as_str()).collect();
        assert_eq!(kept, vec!["tt2"]);
    }

    #[test]
    fn test_absolute_order_keeps_placeholders() {
        let index = index_with(&[("1", "imdb://tt2")]);
        let candidates = vec![candidate("tt1", None, "A", 1), candidate("tt2", None, "B", 2)];

        let report = match_candidates(candidates, &index, 0, true);

        let kept: Vec<&str> = report.candidates.iter().map(|c| c.imdb_id.as_str()).collect();
        assert_eq!(kept, vec!["tt1", "tt2"]);
        assert_eq!(report.missing.len(), 1);
    }

    #[test]
    fn test_multi_edition_counts_once() {
        let index = index_with(&[("1", "imdb://tt1"), ("2", "imdb://tt1?lang=en")]);
        let candidates = vec![candidate("tt1", None, "Both editions", 1)];

        let report = match_candidates(candidates, &index, 0, false);

        assert_eq!(report.matched_items.len(), 2);
        assert_eq!(report.matched_total, 1);
    }

    #[test]
    fn test_max_count_treats_overflow_as_miss() {
        let index = index_with(&[("1", "imdb://tt1"), ("2", "imdb://tt2")]);
        let candidates = vec![candidate("tt1", None, "A", 1), candidate("tt2", None, "B", 2)];

        let report = match_candidates(candidates, &index, 1, false);

        assert_eq!(report.matched_total, 1);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].1.imdb_id, "tt2");
    }

    #[test]
    fn test_secondary_identifier_match() {
        let index = index_with(&[("1", "themoviedb://603")]);
        let candidates = vec![candidate("tt-unknown", Some(603), "Via tmdb", 1)];

        let report = match_candidates(candidates, &index, 0, false);
        assert_eq!(report.matched_total, 1);
    }
}
