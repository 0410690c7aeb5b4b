//! Plex Media Server HTTP client
//!
//! Only the endpoints the sync needs: library sections and their shows,
//! collection membership, and video playlists. All responses are requested
//! as JSON (`Accept: application/json`); the token travels in the
//! `X-Plex-Token` header, never in the URL.

use crate::matcher::{Candidate, ItemKey};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Plex metadata type for TV shows
const SHOW_TYPE: &str = "2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PlexError {
    #[error("Invalid Plex URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Plex returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("Unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Library '{name}' not found (available: {available})")]
    LibraryNotFound { name: String, available: String },

    #[error("Plex response from {url} is missing {what}")]
    Missing { url: String, what: &'static str },
}

pub type Result<T> = std::result::Result<T, PlexError>;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MediaContainer", default)]
    media_container: Container,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    #[serde(rename = "Directory", default)]
    directory: Vec<Directory>,
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Directory {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    rating_key: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    grandparent_rating_key: Option<String>,
    grandparent_title: Option<String>,
    #[serde(rename = "playlistItemID")]
    playlist_item_id: Option<u64>,
}

impl Metadata {
    fn into_candidate(self) -> Candidate {
        Candidate::new(self.rating_key, self.title)
    }
}

/// A library section (e.g. "TV Shows")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
}

/// One playlist entry, folded to the show it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub entry_id: u64,
    pub show: Candidate,
}

/// Shows of every configured library, plus which library owns each show
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub sections: Vec<LibrarySection>,
    pub shows: Vec<Candidate>,
    pub owners: HashMap<ItemKey, String>,
}

pub struct PlexClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl PlexClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|source| PlexError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("kodi2plex/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PlexError::Client)?;

        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", prefix, path));
        url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        debug!(%method, %url, "Plex request");

        let response = self
            .http
            .request(method, url.clone())
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|source| PlexError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlexError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn fetch(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Container> {
        let response = self.request(method, path, query).await?;
        let url = response.url().to_string();
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|source| PlexError::Decode { url, source })?;
        Ok(envelope.media_container)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Container> {
        self.fetch(Method::GET, path, query).await
    }

    /// Server machine identifier, needed to build library URIs.
    pub async fn machine_identifier(&self) -> Result<String> {
        let container = self.get("/identity", &[]).await?;
        container.machine_identifier.ok_or_else(|| PlexError::Missing {
            url: self.endpoint("/identity").to_string(),
            what: "machineIdentifier",
        })
    }

    pub async fn sections(&self) -> Result<Vec<LibrarySection>> {
        let container = self.get("/library/sections", &[]).await?;
        Ok(container
            .directory
            .into_iter()
            .map(|d| LibrarySection {
                key: d.key,
                title: d.title,
            })
            .collect())
    }

    /// Look up a library section by exact title.
    pub async fn section(&self, name: &str) -> Result<LibrarySection> {
        let sections = self.sections().await?;
        let available = sections
            .iter()
            .map(|s| s.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        sections
            .into_iter()
            .find(|s| s.title == name)
            .ok_or_else(|| PlexError::LibraryNotFound {
                name: name.to_string(),
                available,
            })
    }

    /// All shows in a library section.
    pub async fn shows(&self, section: &LibrarySection) -> Result<Vec<Candidate>> {
        let path = format!("/library/sections/{}/all", section.key);
        let container = self.get(&path, &[("type", SHOW_TYPE.to_string())]).await?;
        Ok(container
            .metadata
            .into_iter()
            .map(Metadata::into_candidate)
            .collect())
    }

    /// Shows of every named library, concatenated in configuration order.
    pub async fn load_catalog(&self, library_names: &[String]) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        for name in library_names {
            let section = self.section(name).await?;
            let shows = self.shows(&section).await?;
            info!("Library '{}' contains {} shows", name, shows.len());
            for show in &shows {
                catalog
                    .owners
                    .entry(show.key.clone())
                    .or_insert_with(|| section.key.clone());
            }
            catalog.shows.extend(shows);
            catalog.sections.push(section);
        }
        Ok(catalog)
    }

    /// Members of the collection titled exactly `name` in `section`.
    ///
    /// A section without such a collection yields an empty list.
    pub async fn collection_items(
        &self,
        section: &LibrarySection,
        name: &str,
    ) -> Result<Vec<Candidate>> {
        let path = format!("/library/sections/{}/collections", section.key);
        let container = self.get(&path, &[]).await?;

        let mut items = Vec::new();
        for collection in container.metadata.into_iter().filter(|c| c.title == name) {
            let path = format!("/library/collections/{}/children", collection.rating_key);
            let children = self.get(&path, &[]).await?;
            items.extend(children.metadata.into_iter().map(Metadata::into_candidate));
        }
        Ok(items)
    }

    pub async fn add_to_collection(
        &self,
        section_key: &str,
        item: &ItemKey,
        name: &str,
    ) -> Result<()> {
        let path = format!("/library/sections/{}/all", section_key);
        let query = [
            ("type", SHOW_TYPE.to_string()),
            ("id", item.to_string()),
            ("includeExternalMedia", "1".to_string()),
            ("collection[0].tag.tag", name.to_string()),
            ("collection.locked", "1".to_string()),
        ];
        self.request(Method::PUT, &path, &query).await?;
        Ok(())
    }

    pub async fn remove_from_collection(
        &self,
        section_key: &str,
        item: &ItemKey,
        name: &str,
    ) -> Result<()> {
        let path = format!("/library/sections/{}/all", section_key);
        let query = [
            ("type", SHOW_TYPE.to_string()),
            ("id", item.to_string()),
            ("includeExternalMedia", "1".to_string()),
            ("collection[].tag.tag-", name.to_string()),
        ];
        self.request(Method::PUT, &path, &query).await?;
        Ok(())
    }

    /// Rating key of the video playlist titled exactly `name`.
    pub async fn find_playlist(&self, name: &str) -> Result<Option<String>> {
        let container = self
            .get("/playlists", &[("playlistType", "video".to_string())])
            .await?;
        Ok(container
            .metadata
            .into_iter()
            .find(|p| p.title == name)
            .map(|p| p.rating_key))
    }

    /// Playlist entries; episodes are folded to their show.
    pub async fn playlist_entries(&self, playlist_id: &str) -> Result<Vec<PlaylistEntry>> {
        let path = format!("/playlists/{}/items", playlist_id);
        let url = self.endpoint(&path).to_string();
        let container = self.get(&path, &[]).await?;

        container
            .metadata
            .into_iter()
            .map(|m| {
                let entry_id = m.playlist_item_id.ok_or_else(|| PlexError::Missing {
                    url: url.clone(),
                    what: "playlistItemID",
                })?;
                let show = match (m.kind.as_deref(), m.grandparent_rating_key) {
                    (Some("episode"), Some(show_key)) => {
                        Candidate::new(show_key, m.grandparent_title.unwrap_or(m.title))
                    }
                    (_, _) => Candidate::new(m.rating_key, m.title),
                };
                Ok(PlaylistEntry { entry_id, show })
            })
            .collect()
    }

    fn item_uri(machine_id: &str, item: &ItemKey) -> String {
        format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            machine_id, item
        )
    }

    /// Create a video playlist seeded with one item; returns its rating key.
    pub async fn create_playlist(
        &self,
        name: &str,
        machine_id: &str,
        first: &ItemKey,
    ) -> Result<String> {
        let query = [
            ("type", "video".to_string()),
            ("title", name.to_string()),
            ("smart", "0".to_string()),
            ("uri", Self::item_uri(machine_id, first)),
        ];
        let container = self.fetch(Method::POST, "/playlists", &query).await?;
        container
            .metadata
            .into_iter()
            .next()
            .map(|p| p.rating_key)
            .ok_or_else(|| PlexError::Missing {
                url: self.endpoint("/playlists").to_string(),
                what: "created playlist",
            })
    }

    pub async fn add_to_playlist(
        &self,
        playlist_id: &str,
        machine_id: &str,
        item: &ItemKey,
    ) -> Result<()> {
        let path = format!("/playlists/{}/items", playlist_id);
        self.request(Method::PUT, &path, &[("uri", Self::item_uri(machine_id, item))])
            .await?;
        Ok(())
    }

    pub async fn remove_playlist_entry(&self, playlist_id: &str, entry_id: u64) -> Result<()> {
        let path = format!("/playlists/{}/items/{}", playlist_id, entry_id);
        self.request(Method::DELETE, &path, &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = PlexClient::new("http://nas:32400/plex/", "t").unwrap();
        assert_eq!(
            client.endpoint("/library/sections").as_str(),
            "http://nas:32400/plex/library/sections"
        );

        let client = PlexClient::new("http://nas:32400", "t").unwrap();
        assert_eq!(client.endpoint("/identity").as_str(), "http://nas:32400/identity");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            PlexClient::new("not a url", "t"),
            Err(PlexError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_item_uri() {
        assert_eq!(
            PlexClient::item_uri("abc123", &ItemKey::from(42)),
            "server://abc123/com.plexapp.plugins.library/library/metadata/42"
        );
    }

    #[test]
    fn test_decode_container_without_lists() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"MediaContainer": {"size": 0}}"#).unwrap();
        assert!(envelope.media_container.metadata.is_empty());
        assert!(envelope.media_container.directory.is_empty());
    }
}
