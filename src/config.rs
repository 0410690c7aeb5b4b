//! config.json schema and loading
//!
//! Accepts both singular and plural spellings of the list keys:
//! `library_name` / `library_names` and `sync_mode` / `sync_modes`, each
//! holding either a string or a list of strings.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_THRESHOLD: u8 = 80;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error reading config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where matched shows are synced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Collection,
    Playlist,
}

impl SyncMode {
    pub const ALL: [SyncMode; 2] = [SyncMode::Collection, SyncMode::Playlist];

    pub fn label(&self) -> &'static str {
        match self {
            SyncMode::Collection => "Collection",
            SyncMode::Playlist => "Playlist",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Collection => write!(f, "collection"),
            SyncMode::Playlist => write!(f, "playlist"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collection" => Ok(SyncMode::Collection),
            "playlist" => Ok(SyncMode::Playlist),
            other => Err(ConfigError::Invalid(format!(
                "Invalid sync_mode '{}'. Must be one of: collection, playlist",
                other
            ))),
        }
    }
}

/// Tool configuration loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub plex_url: String,
    pub plex_token: String,
    #[serde(alias = "library_name", deserialize_with = "one_or_many")]
    pub library_names: Vec<String>,
    pub playlist_path: PathBuf,
    #[serde(
        default = "default_sync_modes",
        alias = "sync_mode",
        deserialize_with = "sync_modes"
    )]
    pub sync_modes: Vec<SyncMode>,
    /// Target name; defaults to the playlist's own name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_threshold")]
    pub fuzzy_threshold: u8,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_sync_modes() -> Vec<SyncMode> {
    vec![SyncMode::Collection]
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

fn sync_modes<'de, D>(deserializer: D) -> Result<Vec<SyncMode>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::from(OneOrMany::deserialize(deserializer)?)
        .iter()
        .map(|s| s.parse::<SyncMode>().map_err(de::Error::custom))
        .collect()
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Not validated: CLI overrides may still fix values, so callers run
    /// [`Config::validate`] once they are applied.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fuzzy_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "fuzzy_threshold must be between 0 and 100, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.library_names.is_empty() {
            return Err(ConfigError::Invalid(
                "library_names must name at least one library".to_string(),
            ));
        }
        if self.sync_modes.is_empty() {
            return Err(ConfigError::Invalid(
                "sync_modes must contain at least one mode".to_string(),
            ));
        }
        Ok(())
    }

    /// Remove repeated modes, keeping first occurrence order.
    pub fn dedup_modes(&mut self) {
        let mut seen = Vec::with_capacity(SyncMode::ALL.len());
        self.sync_modes.retain(|m| {
            if seen.contains(m) {
                false
            } else {
                seen.push(*m);
                true
            }
        });
    }

    /// Template written by `kodi2plex init`
    pub fn template() -> Self {
        Config {
            plex_url: "http://localhost:32400".to_string(),
            plex_token: "YOUR_PLEX_TOKEN".to_string(),
            library_names: vec!["TV Shows".to_string()],
            playlist_path: PathBuf::from("shows.xsp"),
            sync_modes: default_sync_modes(),
            collection_name: None,
            log_file: None,
            fuzzy_threshold: DEFAULT_THRESHOLD,
            dry_run: false,
        }
    }
}
