//! TVDb API client.
//!
//! Authentication is a login call exchanging the api/user keys for a bearer
//! token; the token is refreshed once on a 401 and the request retried.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::types::TvdbSeries;
use super::MetadataError;
use crate::config::TvdbApiConfig;

/// TVDb API client.
pub struct TvdbClient {
    client: Client,
    base_url: String,
    username: String,
    api_key: String,
    user_key: String,
    token: Mutex<Option<String>>,
}

impl TvdbClient {
    /// Create a new TVDb client.
    pub fn new(config: TvdbApiConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TVDb API key is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.thetvdb.com".to_string());

        Ok(Self {
            client,
            base_url,
            username: config.username,
            api_key: config.api_key,
            user_key: config.user_key,
            token: Mutex::new(None),
        })
    }

    /// Look up the imdb identifier for a TVDb series id.
    pub async fn imdb_id(&self, tvdb_id: u64) -> Result<Option<String>, MetadataError> {
        let url = format!("{}/series/{}", self.base_url, tvdb_id);
        debug!("TVDb series: id={}", tvdb_id);

        let Some(body) = self.get_with_auth::<SeriesEnvelope>(&url, &[]).await? else {
            return Ok(None);
        };

        Ok(body.data.imdb_id.filter(|id| !id.is_empty()))
    }

    /// Find a series by its imdb identifier.
    pub async fn series_by_imdb(
        &self,
        imdb_id: &str,
    ) -> Result<Option<TvdbSeries>, MetadataError> {
        let url = format!("{}/search/series", self.base_url);
        debug!("TVDb search: imdb_id={}", imdb_id);

        let Some(body) = self
            .get_with_auth::<SearchEnvelope>(&url, &[("imdbId", imdb_id)])
            .await?
        else {
            return Ok(None);
        };

        Ok(body.data.into_iter().next().map(|s| TvdbSeries {
            id: s.id,
            name: s.series_name,
            first_aired: s
                .first_aired
                .as_deref()
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()),
            imdb_id: Some(imdb_id.to_string()),
        }))
    }

    /// Authenticated GET with one token refresh on 401. `Ok(None)` on 404.
    async fn get_with_auth<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, MetadataError> {
        let mut refreshed = false;
        loop {
            let token = self.ensure_token().await?;

            let response = self
                .client
                .get(url)
                .query(query)
                .bearer_auth(&token)
                .send()
                .await?;

            let status = response.status();
            if status == 401 && !refreshed {
                // Token expired; refresh once and retry
                *self.token.lock().await = None;
                refreshed = true;
                continue;
            }
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

            let body = response.json::<T>().await.map_err(|e| {
                MetadataError::ParseError(format!("Failed to parse TVDb response: {}", e))
            })?;
            return Ok(Some(body));
        }
    }

    async fn ensure_token(&self) -> Result<String, MetadataError> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let url = format!("{}/login", self.base_url);
        debug!("TVDb login");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "apikey": self.api_key,
                "userkey": self.user_key,
                "username": self.username,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let login: LoginResult = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse TVDb login response: {}", e))
        })?;

        *token = Some(login.token.clone());
        Ok(login.token)
    }
}

// ============================================================================
// TVDb API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginResult {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SeriesEnvelope {
    data: SeriesResult,
}

#[derive(Debug, Deserialize)]
struct SeriesResult {
    #[serde(rename = "imdbId")]
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    #[serde(rename = "seriesName")]
    series_name: Option<String>,
    #[serde(rename = "firstAired")]
    first_aired: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series_envelope() {
        let json = r#"{"data": {"id": 81189, "seriesName": "Breaking Bad", "imdbId": "tt0903747"}}"#;
        let envelope: SeriesEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.imdb_id.as_deref(), Some("tt0903747"));
    }

    #[test]
    fn test_parse_search_envelope() {
        let json = r#"{"data": [
            {"id": 81189, "seriesName": "Breaking Bad", "firstAired": "2008-01-20"}
        ]}"#;
        let envelope: SearchEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data[0].id, 81189);
        assert_eq!(envelope.data[0].first_aired.as_deref(), Some("2008-01-20"));
    }

    #[test]
    fn test_requires_api_key() {
        let result = TvdbClient::new(TvdbApiConfig {
            username: "user".to_string(),
            api_key: String::new(),
            user_key: "key".to_string(),
            base_url: None,
        });
        assert!(matches!(result, Err(MetadataError::NotConfigured(_))));
    }
}
