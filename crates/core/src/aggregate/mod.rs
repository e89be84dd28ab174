//! List aggregation: pulls candidate items from the configured ranked
//! sources into a single deduplicated, age-filtered candidate sequence.

mod types;

pub use types::{CandidateItem, ItemWeights};

use chrono::{Datelike, Local, NaiveDate};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::recipe::LibraryKind;
use crate::sources::{CutoffKind, SourceError, SourceResolver};

/// The aggregated candidate sequence plus the seen-identifier tokens used
/// for deduplication across sources.
#[derive(Debug)]
pub struct Aggregated {
    pub items: Vec<CandidateItem>,
    pub seen: HashSet<String>,
}

/// Pull every configured list in order into one deduplicated sequence.
///
/// An unresolvable source descriptor fails the whole aggregation; per-item
/// anomalies only skip the item.
pub async fn aggregate(
    resolver: &dyn SourceResolver,
    urls: &[String],
    kind: LibraryKind,
    max_age_years: u32,
) -> Result<Aggregated, SourceError> {
    let today = Local::now().date_naive();

    let mut items: Vec<CandidateItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for url in urls {
        let source = resolver.resolve(url)?;
        info!("Retrieving the {} list: {}", source.name(), url);

        let raw_items = source.fetch(kind, url).await?;
        let cutoff = source.cutoff();

        for raw in raw_items {
            let tokens: Vec<String> = {
                let mut t = vec![raw.imdb_id.clone()];
                if let Some(id) = raw.tmdb_id {
                    t.push(format!("tmdb{}", id));
                }
                if let Some(id) = raw.tvdb_id {
                    t.push(format!("tvdb{}", id));
                }
                t
            };

            // Skip items already contributed by an earlier source
            if tokens.iter().any(|t| seen.contains(t)) {
                debug!("Skipping duplicate '{}'", raw.title);
                continue;
            }

            if !retained(&raw, cutoff, max_age_years, today) {
                debug!("Skipping '{}': outside the retention window", raw.title);
                continue;
            }

            for token in tokens {
                seen.insert(token);
            }
            let idx = items.len() + 1;
            items.push(CandidateItem::from_raw(raw, idx));
        }
    }

    info!("Aggregated {} candidate items", items.len());
    Ok(Aggregated { items, seen })
}

/// Whether an item falls inside the retention window. Sources differ in
/// date granularity, so both cutoff semantics are supported.
fn retained(
    raw: &crate::sources::RawListItem,
    cutoff: CutoffKind,
    max_age_years: u32,
    today: NaiveDate,
) -> bool {
    if max_age_years == 0 {
        return true;
    }

    match cutoff {
        CutoffKind::Year => match raw.year {
            // Coarse calendar-year comparison
            Some(year) => today.year() - (max_age_years as i32 - 1) <= year,
            None => true,
        },
        CutoffKind::Date => {
            // Effective date: release date when resolvable, else year-end
            // fallback, else today (always retained)
            let effective = raw
                .release_date
                .or_else(|| raw.year.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)))
                .unwrap_or(today);
            effective >= shift_years_back(today, max_age_years)
        }
    }
}

/// `date` shifted back by `years`, clamping Feb 29 to Feb 28.
pub(crate) fn shift_years_back(date: NaiveDate, years: u32) -> NaiveDate {
    let year = date.year() - years as i32;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 2, 28).expect("valid date"))
}
