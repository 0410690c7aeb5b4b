//! Plex-backed sync targets: a collection tag or a video playlist

use crate::matcher::{Candidate, ItemKey};
use crate::plex::{Catalog, LibrarySection, PlexClient};
use crate::reconcile::SyncTarget;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use tracing::debug;

/// A collection with the same name in every configured library.
pub struct CollectionTarget<'a> {
    client: &'a PlexClient,
    name: String,
    sections: Vec<LibrarySection>,
    /// Item -> owning library section key
    owners: HashMap<ItemKey, String>,
}

impl<'a> CollectionTarget<'a> {
    pub fn new(client: &'a PlexClient, name: &str, catalog: &Catalog) -> Self {
        Self {
            client,
            name: name.to_string(),
            sections: catalog.sections.clone(),
            owners: catalog.owners.clone(),
        }
    }

    fn owner(&self, item: &Candidate) -> Result<String> {
        self.owners
            .get(&item.key)
            .cloned()
            .ok_or_else(|| {
                anyhow!("'{}' ({}) is not in any configured library", item.title, item.key)
            })
    }
}

impl SyncTarget for CollectionTarget<'_> {
    async fn snapshot(&mut self) -> Result<Vec<Candidate>> {
        let mut items = Vec::new();
        for section in &self.sections {
            let members = self
                .client
                .collection_items(section, &self.name)
                .await
                .with_context(|| {
                    format!("Failed to read collection '{}' in '{}'", self.name, section.title)
                })?;
            debug!(library = %section.title, count = members.len(), "Collection members");
            for member in &members {
                self.owners
                    .entry(member.key.clone())
                    .or_insert_with(|| section.key.clone());
            }
            items.extend(members);
        }
        Ok(items)
    }

    async fn add(&mut self, item: &Candidate) -> Result<()> {
        let section = self.owner(item)?;
        self.client
            .add_to_collection(&section, &item.key, &self.name)
            .await
            .with_context(|| {
                format!("Failed to add '{}' to collection '{}'", item.title, self.name)
            })
    }

    async fn remove(&mut self, item: &Candidate) -> Result<()> {
        let section = self.owner(item)?;
        self.client
            .remove_from_collection(&section, &item.key, &self.name)
            .await
            .with_context(|| {
                format!("Failed to remove '{}' from collection '{}'", item.title, self.name)
            })
    }
}

/// A video playlist, tracked per show.
///
/// Plex stores a show added to a playlist as its episodes; entries are folded
/// back to their show and removing a show deletes all of its entries. The
/// playlist is created by the first add if it does not exist yet.
pub struct PlaylistTarget<'a> {
    client: &'a PlexClient,
    name: String,
    playlist_id: Option<String>,
    machine_id: Option<String>,
    entries: HashMap<ItemKey, Vec<u64>>,
}

impl<'a> PlaylistTarget<'a> {
    pub fn new(client: &'a PlexClient, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
            playlist_id: None,
            machine_id: None,
            entries: HashMap::new(),
        }
    }

    async fn machine_id(&mut self) -> Result<String> {
        if let Some(id) = &self.machine_id {
            return Ok(id.clone());
        }
        let id = self
            .client
            .machine_identifier()
            .await
            .context("Failed to read Plex server identity")?;
        self.machine_id = Some(id.clone());
        Ok(id)
    }
}

impl SyncTarget for PlaylistTarget<'_> {
    async fn snapshot(&mut self) -> Result<Vec<Candidate>> {
        self.entries.clear();
        self.playlist_id = self
            .client
            .find_playlist(&self.name)
            .await
            .with_context(|| format!("Failed to look up playlist '{}'", self.name))?;

        let Some(playlist_id) = self.playlist_id.clone() else {
            debug!(playlist = %self.name, "Playlist does not exist yet");
            return Ok(Vec::new());
        };

        let entries = self
            .client
            .playlist_entries(&playlist_id)
            .await
            .with_context(|| format!("Failed to read playlist '{}'", self.name))?;

        let mut shows = Vec::new();
        for entry in entries {
            let ids = self.entries.entry(entry.show.key.clone()).or_default();
            if ids.is_empty() {
                shows.push(entry.show);
            }
            ids.push(entry.entry_id);
        }
        Ok(shows)
    }

    async fn add(&mut self, item: &Candidate) -> Result<()> {
        let machine_id = self.machine_id().await?;
        match self.playlist_id.clone() {
            Some(playlist_id) => self
                .client
                .add_to_playlist(&playlist_id, &machine_id, &item.key)
                .await
                .with_context(|| {
                    format!("Failed to add '{}' to playlist '{}'", item.title, self.name)
                }),
            None => {
                let playlist_id = self
                    .client
                    .create_playlist(&self.name, &machine_id, &item.key)
                    .await
                    .with_context(|| format!("Failed to create playlist '{}'", self.name))?;
                debug!(playlist = %self.name, id = %playlist_id, "Created playlist");
                self.playlist_id = Some(playlist_id);
                Ok(())
            }
        }
    }

    async fn remove(&mut self, item: &Candidate) -> Result<()> {
        let playlist_id = self
            .playlist_id
            .clone()
            .ok_or_else(|| anyhow!("Playlist '{}' does not exist", self.name))?;
        let entry_ids = self
            .entries
            .remove(&item.key)
            .ok_or_else(|| anyhow!("'{}' is not in playlist '{}'", item.title, self.name))?;

        for entry_id in entry_ids {
            self.client
                .remove_playlist_entry(&playlist_id, entry_id)
                .await
                .with_context(|| {
                    format!("Failed to remove '{}' from playlist '{}'", item.title, self.name)
                })?;
        }
        Ok(())
    }
}
