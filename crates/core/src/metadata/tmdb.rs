//! TMDb (The Movie Database) API client.
//!
//! TMDb caps clients at roughly 40 requests per window; the client keeps a
//! request counter and backs off for 10 seconds when the budget is spent.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{FoundItem, ItemDetails};
use super::{DetailsProvider, MetadataError};
use crate::config::TmdbApiConfig;
use crate::recipe::LibraryKind;

const RATE_LIMIT_REQUESTS: u32 = 40;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

/// US release types that count as non-theatrical: digital, physical, TV.
const NON_THEATRICAL_TYPES: [u8; 3] = [4, 5, 6];

/// TMDb API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_count: Mutex<u32>,
    details_memo: Mutex<HashMap<(u64, LibraryKind), Option<ItemDetails>>>,
}

impl TmdbClient {
    /// Create a new TMDb client.
    pub fn new(config: TmdbApiConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDb API key is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            request_count: Mutex::new(0),
            details_memo: Mutex::new(HashMap::new()),
        })
    }

    /// Sleep out the rate limit when the request budget is spent, then
    /// charge one request. The counter lock is held across the sleep so a
    /// concurrent caller cannot skip the reset.
    async fn throttle(&self) {
        let mut count = self.request_count.lock().await;
        if *count >= RATE_LIMIT_REQUESTS {
            warn!(
                "Waiting {} seconds for the TMDb rate limit...",
                RATE_LIMIT_BACKOFF.as_secs()
            );
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            *count = 0;
        }
        *count += 1;
    }

    /// Look up the imdb identifier for a TMDb id.
    pub async fn imdb_id(
        &self,
        tmdb_id: u64,
        kind: LibraryKind,
    ) -> Result<Option<String>, MetadataError> {
        let path = match kind {
            LibraryKind::Movie => format!("movie/{}/external_ids", tmdb_id),
            LibraryKind::Tv => format!("tv/{}/external_ids", tmdb_id),
        };
        let url = format!("{}/{}", self.base_url, path);

        debug!("TMDb external ids: id={}", tmdb_id);
        self.throttle().await;

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", &self.api_key)])
            .send()
            .await?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let ids: ExternalIdsResult = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse external ids response: {}", e))
        })?;

        Ok(ids.imdb_id.filter(|id| !id.is_empty()))
    }

    /// Find an item by its imdb identifier.
    pub async fn find_by_imdb(
        &self,
        imdb_id: &str,
        kind: LibraryKind,
    ) -> Result<Option<FoundItem>, MetadataError> {
        let url = format!("{}/find/{}", self.base_url, imdb_id);

        debug!("TMDb find: imdb_id={}", imdb_id);
        self.throttle().await;

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("external_source", "imdb_id"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let found: FindResult = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse find response: {}", e))
        })?;

        let item = match kind {
            LibraryKind::Movie => found.movie_results.into_iter().next().map(|m| {
                let release_date = parse_date(m.release_date.as_deref());
                FoundItem {
                    tmdb_id: m.id,
                    title: m.title,
                    year: release_date.map(|d| d.year()),
                    release_date,
                }
            }),
            LibraryKind::Tv => found.tv_results.into_iter().next().map(|t| {
                let first_air_date = parse_date(t.first_air_date.as_deref());
                FoundItem {
                    tmdb_id: t.id,
                    title: t.name,
                    year: first_air_date.map(|d| d.year()),
                    release_date: first_air_date,
                }
            }),
        };

        Ok(item)
    }

    async fn fetch_details(
        &self,
        tmdb_id: u64,
        kind: LibraryKind,
    ) -> Result<Option<ItemDetails>, MetadataError> {
        let url = match kind {
            LibraryKind::Movie => format!("{}/movie/{}", self.base_url, tmdb_id),
            LibraryKind::Tv => format!("{}/tv/{}", self.base_url, tmdb_id),
        };

        debug!("TMDb details: id={}", tmdb_id);
        self.throttle().await;

        let mut request = self.client.get(&url).query(&[("api_key", &self.api_key)]);
        if kind == LibraryKind::Movie {
            request = request.query(&[("append_to_response", "release_dates")]);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let details: DetailsResult = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse details response: {}", e))
        })?;

        Ok(Some(details.into_item_details(tmdb_id)))
    }
}

#[async_trait]
impl DetailsProvider for TmdbClient {
    async fn details(
        &self,
        tmdb_id: u64,
        kind: LibraryKind,
    ) -> Result<Option<ItemDetails>, MetadataError> {
        if let Some(cached) = self.details_memo.lock().await.get(&(tmdb_id, kind)) {
            return Ok(cached.clone());
        }

        let details = self.fetch_details(tmdb_id, kind).await?;
        self.details_memo
            .lock()
            .await
            .insert((tmdb_id, kind), details.clone());

        Ok(details)
    }
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}

// ============================================================================
// TMDb API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExternalIdsResult {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindResult {
    #[serde(default)]
    movie_results: Vec<FindMovieResult>,
    #[serde(default)]
    tv_results: Vec<FindTvResult>,
}

#[derive(Debug, Deserialize)]
struct FindMovieResult {
    id: u64,
    title: String,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindTvResult {
    id: u64,
    name: String,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    popularity: Option<f64>,
    vote_average: Option<f64>,
    vote_count: Option<u64>,
    #[serde(default)]
    genres: Vec<GenreResult>,
    release_date: Option<String>,
    last_air_date: Option<String>,
    release_dates: Option<ReleaseDatesResult>,
}

#[derive(Debug, Deserialize)]
struct GenreResult {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseDatesResult {
    #[serde(default)]
    results: Vec<CountryReleases>,
}

#[derive(Debug, Deserialize)]
struct CountryReleases {
    iso_3166_1: String,
    #[serde(default)]
    release_dates: Vec<ReleaseDateEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDateEntry {
    #[serde(rename = "type")]
    release_type: u8,
    release_date: Option<String>,
}

impl DetailsResult {
    fn into_item_details(self, tmdb_id: u64) -> ItemDetails {
        let non_theatrical_release = self
            .release_dates
            .as_ref()
            .and_then(earliest_us_non_theatrical);

        ItemDetails {
            tmdb_id,
            popularity: self.popularity,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            release_date: parse_date(self.release_date.as_deref()),
            last_air_date: parse_date(self.last_air_date.as_deref()),
            non_theatrical_release,
        }
    }
}

/// Earliest US release date that is digital, physical or TV.
fn earliest_us_non_theatrical(releases: &ReleaseDatesResult) -> Option<NaiveDate> {
    let us = releases.results.iter().find(|c| c.iso_3166_1 == "US")?;

    us.release_dates
        .iter()
        .filter(|d| NON_THEATRICAL_TYPES.contains(&d.release_type))
        .filter_map(|d| {
            d.release_date
                .as_deref()
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|dt| dt.date_naive())
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_conversion() {
        let json = r#"{
            "popularity": 81.2,
            "vote_average": 8.2,
            "vote_count": 24000,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "release_date": "1999-03-30",
            "release_dates": {"results": [
                {"iso_3166_1": "DE", "release_dates": [
                    {"type": 4, "release_date": "1999-05-01T00:00:00.000Z"}]},
                {"iso_3166_1": "US", "release_dates": [
                    {"type": 3, "release_date": "1999-03-31T00:00:00.000Z"},
                    {"type": 5, "release_date": "1999-09-21T00:00:00.000Z"},
                    {"type": 4, "release_date": "1999-08-15T00:00:00.000Z"}]}
            ]}
        }"#;
        let result: DetailsResult = serde_json::from_str(json).unwrap();
        let details = result.into_item_details(603);

        assert_eq!(details.tmdb_id, 603);
        assert_eq!(details.vote_count, Some(24000));
        assert_eq!(details.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(
            details.release_date,
            NaiveDate::from_ymd_opt(1999, 3, 30)
        );
        // Theatrical (type 3) is ignored; earliest of digital/physical wins
        assert_eq!(
            details.non_theatrical_release,
            NaiveDate::from_ymd_opt(1999, 8, 15)
        );
    }

    #[test]
    fn test_details_without_release_dates() {
        let json = r#"{
            "popularity": 15.0,
            "vote_average": 7.5,
            "vote_count": 320,
            "last_air_date": "2013-09-29"
        }"#;
        let result: DetailsResult = serde_json::from_str(json).unwrap();
        let details = result.into_item_details(1396);

        assert!(details.non_theatrical_release.is_none());
        assert_eq!(
            details.last_air_date,
            NaiveDate::from_ymd_opt(2013, 9, 29)
        );
        assert!(details.genres.is_empty());
    }

    #[test]
    fn test_requires_api_key() {
        let result = TmdbClient::new(TmdbApiConfig {
            api_key: String::new(),
            base_url: None,
        });
        assert!(matches!(result, Err(MetadataError::NotConfigured(_))));
    }
}
