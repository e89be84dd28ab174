//! IMDb chart client.
//!
//! IMDb has no list API; chart pages embed the ranked title ids in the
//! markup. The ids are extracted and resolved to full metadata through
//! TMDb (and TVDb for shows).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{CutoffKind, RawListItem};
use super::{RankedSource, SourceError};
use crate::metadata::{TmdbClient, TvdbClient};
use crate::recipe::LibraryKind;

/// IMDb chart page client.
pub struct ImdbChartSource {
    client: Client,
    tmdb: Arc<TmdbClient>,
    tvdb: Option<Arc<TvdbClient>>,
    id_pattern: Regex,
}

impl ImdbChartSource {
    /// Create a new IMDb chart client. TMDb resolves chart ids to titles
    /// and dates; TVDb additionally supplies show identifiers when present.
    pub fn new(tmdb: Arc<TmdbClient>, tvdb: Option<Arc<TvdbClient>>) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        // Chart rows carry their ranked title id in a data attribute.
        let id_pattern = Regex::new(r#"data-titleid="(tt\d+)""#)
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        Ok(Self {
            client,
            tmdb,
            tvdb,
            id_pattern,
        })
    }

    async fn chart_ids(&self, url: &str) -> Result<Vec<String>, SourceError> {
        debug!("Retrieving the IMDb list: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let page = response.text().await?;
        let ids = self
            .id_pattern
            .captures_iter(&page)
            .map(|c| c[1].to_string())
            .collect();

        Ok(ids)
    }
}

#[async_trait]
impl RankedSource for ImdbChartSource {
    fn name(&self) -> &str {
        "imdb"
    }

    fn cutoff(&self) -> CutoffKind {
        // Resolved through TMDb, so exact release dates are available.
        CutoffKind::Date
    }

    async fn fetch(&self, kind: LibraryKind, url: &str) -> Result<Vec<RawListItem>, SourceError> {
        let ids = self.chart_ids(url).await?;

        let mut items = Vec::new();
        for imdb_id in ids {
            let found = match self.tmdb.find_by_imdb(&imdb_id, kind).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("TMDb lookup failed for {}: {}", imdb_id, e);
                    None
                }
            };
            let Some(found) = found else {
                debug!("Skipping {}: not resolvable through TMDb", imdb_id);
                continue;
            };

            let mut item = RawListItem {
                imdb_id: imdb_id.clone(),
                tmdb_id: Some(found.tmdb_id),
                tvdb_id: None,
                title: found.title,
                year: found.year,
                release_date: found.release_date,
            };

            if kind == LibraryKind::Tv {
                if let Some(tvdb) = &self.tvdb {
                    match tvdb.series_by_imdb(&imdb_id).await {
                        Ok(Some(series)) => {
                            item.tvdb_id = Some(series.id);
                            if item.release_date.is_none() {
                                item.release_date = series.first_aired;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("TVDb lookup failed for {}: {}", imdb_id, e),
                    }
                }
            }

            items.push(item);
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_extraction() {
        let pattern = Regex::new(r#"data-titleid="(tt\d+)""#).unwrap();
        let page = r#"
            <table class="chart">
            <td class="ratingColumn"><div data-titleid="tt0111161"></div></td>
            <td class="ratingColumn"><div data-titleid="tt0068646"></div></td>
            <td class="other"><div data-titleid="tt0071562"></div></td>
            </table>
        "#;
        let ids: Vec<String> = pattern
            .captures_iter(page)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(ids, vec!["tt0111161", "tt0068646", "tt0071562"]);
    }
}
