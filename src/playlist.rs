//! Kodi Smart Playlist (.xsp) reader
//!
//! Extracts the playlist name and every `<value>` of `<rule field="title">`
//! rules:
//!
//! ```xml
//! <smartplaylist type="tvshows">
//!   <name>Comfort Shows</name>
//!   <rule field="title" operator="is">
//!     <value>The Wire</value>
//!     <value>Kin</value>
//!   </rule>
//! </smartplaylist>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_NAME: &str = "Unnamed Playlist";

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Playlist file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read playlist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid playlist XML at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Parsed smart playlist data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistInfo {
    pub name: String,
    pub titles: Vec<String>,
}

impl PlaylistInfo {
    /// Titles sorted, with exact duplicates removed
    pub fn sorted_titles(&self) -> Vec<String> {
        let mut titles = self.titles.clone();
        titles.sort();
        titles.dedup();
        titles
    }
}

/// Read and parse a smart playlist file.
pub async fn parse_playlist(path: &Path) -> Result<PlaylistInfo, PlaylistError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PlaylistError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(PlaylistError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_playlist_str(&content)
}

enum Capture {
    Name,
    Value,
}

/// Parse smart playlist XML content.
pub fn parse_playlist_str(xml: &str) -> Result<PlaylistInfo, PlaylistError> {
    let mut reader = Reader::from_str(xml);
    // Keep whitespace around entity references ("Law &amp; Order")
    reader.config_mut().trim_text(false);

    let mut name: Option<String> = None;
    let mut titles = Vec::new();

    let mut depth = 0usize;
    let mut title_rule_depth: Option<usize> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| PlaylistError::Xml {
            position: reader.error_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(ref e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"name" if depth == 2 && name.is_none() => {
                        capture = Some(Capture::Name);
                        text.clear();
                    }
                    b"rule" if is_title_rule(e) => title_rule_depth = Some(depth),
                    b"value" if title_rule_depth == Some(depth - 1) => {
                        capture = Some(Capture::Value);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                match (e.name().as_ref(), capture.take()) {
                    (b"name", Some(Capture::Name)) => name = Some(text.trim().to_string()),
                    (b"value", Some(Capture::Value)) => {
                        let value = text.trim();
                        if !value.is_empty() {
                            titles.push(value.to_string());
                        }
                    }
                    (b"rule", other) => {
                        if title_rule_depth == Some(depth) {
                            title_rule_depth = None;
                        }
                        capture = other;
                    }
                    (_, other) => capture = other,
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(ref e) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Event::CData(ref e) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Event::GeneralRef(ref e) if capture.is_some() => {
                let entity = String::from_utf8_lossy(e);
                match resolve_entity(&entity) {
                    Some(resolved) => text.push_str(&resolved),
                    None => {
                        text.push('&');
                        text.push_str(&entity);
                        text.push(';');
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(PlaylistInfo {
        name: name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string()),
        titles,
    })
}

fn is_title_rule(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"field" && a.value.as_ref() == b"title")
}

/// Resolve a predefined or numeric character entity (without `&` and `;`)
fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let resolved = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    };
    Some(resolved.to_string())
}
