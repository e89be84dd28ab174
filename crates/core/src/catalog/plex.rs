//! Plex implementation of the media catalog collaborator.
//!
//! Speaks the Plex HTTP API with JSON responses. All mutations are plain
//! query-parameter requests, matching what the web client issues.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use super::types::{CatalogAccount, CatalogItem, CatalogSection};
use super::{CatalogError, MediaCatalog};
use crate::config::CatalogServerConfig;
use crate::recipe::LibraryKind;

/// Plex media server client.
pub struct PlexCatalog {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexCatalog {
    /// Create a new Plex client without contacting the server.
    pub fn new(config: CatalogServerConfig) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Create a new Plex client and verify the server is reachable.
    pub async fn connect(config: CatalogServerConfig) -> Result<Self, CatalogError> {
        let base_url = config.base_url.clone();
        let catalog = Self::new(config)?;
        catalog.machine_identifier().await.map_err(|_| {
            CatalogError::Unavailable(format!("No server found at: {}", base_url))
        })?;
        Ok(catalog)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header("Accept", "application/json")
            .header("X-Plex-Token", token.unwrap_or(&self.token))
    }

    async fn send_ok(&self, request: RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, CatalogError> {
        let response = self.send_ok(self.request(Method::GET, path, None)).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("{}: {}", path, e)))
    }

    async fn machine_identifier(&self) -> Result<String, CatalogError> {
        let root: Envelope<ServerRoot> = self.get_json("/").await?;
        root.media_container
            .machine_identifier
            .ok_or_else(|| CatalogError::ParseError("missing machineIdentifier".to_string()))
    }

    async fn sections(&self) -> Result<Vec<CatalogSection>, CatalogError> {
        let body: Envelope<SectionContainer> = self.get_json("/library/sections").await?;
        Ok(body
            .media_container
            .directory
            .into_iter()
            .map(CatalogSection::from)
            .collect())
    }

    async fn playlist_key(
        &self,
        name: &str,
        token: Option<&str>,
    ) -> Result<Option<String>, CatalogError> {
        let response = self
            .send_ok(self.request(Method::GET, "/playlists", token))
            .await?;
        let body: Envelope<ItemContainer> = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("/playlists: {}", e)))?;
        Ok(body
            .media_container
            .metadata
            .into_iter()
            .find(|m| m.title.as_deref() == Some(name))
            .map(|m| m.rating_key))
    }
}

#[async_trait]
impl MediaCatalog for PlexCatalog {
    fn name(&self) -> &str {
        "plex"
    }

    async fn section_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CatalogSection>, CatalogError> {
        Ok(self.sections().await?.into_iter().find(|s| s.title == name))
    }

    async fn section_items(&self, section_id: &str) -> Result<Vec<CatalogItem>, CatalogError> {
        let path = format!("/library/sections/{}/all?includeGuids=1", section_id);
        let body: Envelope<ItemContainer> = self.get_json(&path).await?;
        Ok(body
            .media_container
            .metadata
            .into_iter()
            .map(CatalogItem::from)
            .collect())
    }

    async fn external_ids(&self, rating_key: &str) -> Result<Vec<String>, CatalogError> {
        let path = format!("/library/metadata/{}?includeGuids=1", rating_key);
        let body: Envelope<ItemContainer> = self.get_json(&path).await?;
        Ok(body
            .media_container
            .metadata
            .into_iter()
            .next()
            .map(|m| m.guids.into_iter().map(|g| g.id).collect())
            .unwrap_or_default())
    }

    async fn item_files(
        &self,
        rating_key: &str,
        kind: LibraryKind,
    ) -> Result<Vec<PathBuf>, CatalogError> {
        let path = match kind {
            LibraryKind::Movie => format!("/library/metadata/{}", rating_key),
            // Episodic items report files per episode leaf
            LibraryKind::Tv => format!("/library/metadata/{}/allLeaves", rating_key),
        };
        let body: Envelope<ItemContainer> = self.get_json(&path).await?;

        let files = body
            .media_container
            .metadata
            .into_iter()
            .flat_map(|m| m.media)
            .flat_map(|m| m.part)
            .filter_map(|p| p.file)
            .map(PathBuf::from)
            .collect();
        Ok(files)
    }

    async fn create_section(
        &self,
        name: &str,
        folder: &Path,
        kind: LibraryKind,
    ) -> Result<(), CatalogError> {
        debug!("Creating section '{}' at {}", name, folder.display());

        let (section_type, agent, scanner) = match kind {
            LibraryKind::Movie => ("movie", "com.plexapp.agents.imdb", "Plex Movie Scanner"),
            LibraryKind::Tv => ("show", "com.plexapp.agents.thetvdb", "Plex Series Scanner"),
        };

        let request = self
            .request(Method::POST, "/library/sections", None)
            .query(&[
                ("name", name),
                ("language", "en"),
                ("location", &folder.display().to_string()),
                ("type", section_type),
                ("agent", agent),
                ("scanner", scanner),
            ]);
        self.send_ok(request).await?;
        Ok(())
    }

    async fn refresh_section(&self, section_id: &str) -> Result<(), CatalogError> {
        let path = format!("/library/sections/{}/refresh", section_id);
        self.send_ok(self.request(Method::GET, &path, None)).await?;
        Ok(())
    }

    async fn section_refreshing(&self, section_id: &str) -> Result<bool, CatalogError> {
        Ok(self
            .sections()
            .await?
            .into_iter()
            .find(|s| s.id == section_id)
            .map(|s| s.refreshing)
            .unwrap_or(false))
    }

    async fn empty_trash(&self, section_id: &str) -> Result<(), CatalogError> {
        let path = format!("/library/sections/{}/emptyTrash", section_id);
        self.send_ok(self.request(Method::PUT, &path, None)).await?;
        Ok(())
    }

    async fn set_sort_title(
        &self,
        section_id: &str,
        rating_key: &str,
        number: u32,
        title: &str,
        kind: LibraryKind,
        format: &str,
        visible: bool,
    ) -> Result<(), CatalogError> {
        let search_type = match kind {
            LibraryKind::Movie => "1",
            LibraryKind::Tv => "2",
        };
        let sort_value = format_sort_title(format, number, title, true);

        let mut params = vec![
            ("type".to_string(), search_type.to_string()),
            ("id".to_string(), rating_key.to_string()),
            ("titleSort.value".to_string(), sort_value),
            ("titleSort.locked".to_string(), "1".to_string()),
        ];
        if visible {
            params.push((
                "title.value".to_string(),
                format_sort_title(format, number, title, false),
            ));
            params.push(("title.locked".to_string(), "1".to_string()));
        } else {
            params.push(("title.value".to_string(), title.to_string()));
            params.push(("title.locked".to_string(), "0".to_string()));
        }

        let path = format!("/library/sections/{}/all", section_id);
        let request = self.request(Method::PUT, &path, None).query(&params);
        self.send_ok(request).await?;
        Ok(())
    }

    async fn replace_playlist(
        &self,
        name: &str,
        rating_keys: &[String],
        account_token: Option<&str>,
    ) -> Result<(), CatalogError> {
        // Delete and remake rather than diffing: playlists are small and
        // the server keeps no useful state across the replace.
        if let Some(key) = self.playlist_key(name, account_token).await? {
            let path = format!("/playlists/{}", key);
            self.send_ok(self.request(Method::DELETE, &path, account_token))
                .await?;
        }

        let machine = self.machine_identifier().await?;
        let uri = format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            machine,
            rating_keys.join(",")
        );
        let request = self
            .request(Method::POST, "/playlists", account_token)
            .query(&[
                ("type", "video"),
                ("title", name),
                ("smart", "0"),
                ("uri", &uri),
            ]);
        self.send_ok(request).await?;
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<CatalogAccount>, CatalogError> {
        let body: Envelope<AccountContainer> = self.get_json("/accounts").await?;
        Ok(body
            .media_container
            .account
            .into_iter()
            .filter_map(|a| {
                // Accounts without a usable token cannot be written to
                let token = a.token.filter(|t| !t.is_empty())?;
                Some(CatalogAccount {
                    id: a.id.to_string(),
                    name: a.name,
                    token,
                })
            })
            .collect())
    }
}

/// Apply a sort-title format template. The sort key zero-pads the number to
/// six digits so lexicographic order matches numeric order; the visible
/// title uses the plain number.
fn format_sort_title(format: &str, number: u32, title: &str, padded: bool) -> String {
    let number = if padded {
        format!("{:06}", number)
    } else {
        number.to_string()
    };
    format.replace("{number}", &number).replace("{title}", title)
}

// ============================================================================
// Plex API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize)]
struct ServerRoot {
    #[serde(rename = "machineIdentifier")]
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionContainer {
    #[serde(rename = "Directory", default)]
    directory: Vec<SectionResult>,
}

#[derive(Debug, Deserialize)]
struct SectionResult {
    key: String,
    title: String,
    #[serde(default)]
    refreshing: bool,
}

#[derive(Debug, Deserialize)]
struct ItemContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<ItemResult>,
}

#[derive(Debug, Deserialize)]
struct ItemResult {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    guid: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    #[serde(rename = "originallyAvailableAt")]
    originally_available_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<i64>,
    #[serde(rename = "Guid", default)]
    guids: Vec<GuidResult>,
    #[serde(rename = "Media", default)]
    media: Vec<MediaResult>,
}

#[derive(Debug, Deserialize)]
struct GuidResult {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaResult {
    #[serde(rename = "Part", default)]
    part: Vec<PartResult>,
}

#[derive(Debug, Deserialize)]
struct PartResult {
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountContainer {
    #[serde(rename = "Account", default)]
    account: Vec<AccountResult>,
}

#[derive(Debug, Deserialize)]
struct AccountResult {
    id: u64,
    name: String,
    token: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<SectionResult> for CatalogSection {
    fn from(s: SectionResult) -> Self {
        Self {
            id: s.key,
            title: s.title,
            refreshing: s.refreshing,
        }
    }
}

impl From<ItemResult> for CatalogItem {
    fn from(m: ItemResult) -> Self {
        Self {
            rating_key: m.rating_key,
            guid: m.guid,
            title: m.title.unwrap_or_default(),
            year: m.year,
            originally_available: m
                .originally_available_at
                .as_deref()
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()),
            updated_at: m.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_parsing() {
        let json = r#"{"MediaContainer": {"Directory": [
            {"key": "1", "title": "Movies", "refreshing": false, "type": "movie"},
            {"key": "5", "title": "Movies - Trending", "refreshing": true}
        ]}}"#;
        let body: Envelope<SectionContainer> = serde_json::from_str(json).unwrap();
        let sections: Vec<CatalogSection> = body
            .media_container
            .directory
            .into_iter()
            .map(CatalogSection::from)
            .collect();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id, "1");
        assert!(!sections[0].refreshing);
        assert!(sections[1].refreshing);
    }

    #[test]
    fn test_item_parsing() {
        let json = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "101", "guid": "imdb://tt0133093?lang=en",
             "title": "The Matrix", "year": 1999,
             "originallyAvailableAt": "1999-03-30", "updatedAt": 1690000000,
             "Guid": [{"id": "imdb://tt0133093"}, {"id": "tmdb://603"}],
             "Media": [{"Part": [{"file": "/mnt/media/Movies/The Matrix (1999)/matrix.mkv"}]}]}
        ]}}"#;
        let body: Envelope<ItemContainer> = serde_json::from_str(json).unwrap();
        let raw = body.media_container.metadata.into_iter().next().unwrap();
        assert_eq!(raw.guids.len(), 2);
        assert_eq!(
            raw.media[0].part[0].file.as_deref(),
            Some("/mnt/media/Movies/The Matrix (1999)/matrix.mkv")
        );

        let item = CatalogItem::from(raw);
        assert_eq!(item.rating_key, "101");
        assert_eq!(item.updated_at, Some(1690000000));
        assert_eq!(
            item.originally_available,
            NaiveDate::from_ymd_opt(1999, 3, 30)
        );
    }

    #[test]
    fn test_format_sort_title() {
        assert_eq!(
            format_sort_title("{number} {title}", 7, "The Matrix", true),
            "000007 The Matrix"
        );
        assert_eq!(
            format_sort_title("{number} {title}", 7, "The Matrix", false),
            "7 The Matrix"
        );
        assert_eq!(
            format_sort_title("{number}. {title}", 42, "Heat", true),
            "000042. Heat"
        );
    }
}
