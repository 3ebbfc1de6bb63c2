//! Playlist Store
//!
//! Named playlists shared by all sessions, one JSON file per playlist under
//! the configured directory. Writes go to `<name>.json.tmp` and are renamed
//! into place; the in-memory copy changes only after the rename succeeds.
//! Saving an empty playlist removes its file, but the name stays known
//! until it is deleted.

use super::merge::union_by_reference;
use crate::error::{Error, Result};
use crate::state::SharedState;
use playbot_common::{PlaybotEvent, TrackEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Longest accepted playlist name, in characters
pub const MAX_NAME_LEN: usize = 64;

/// On-disk form of one playlist track
///
/// `webpage_url` is the canonical reference. Older files also carry a
/// `stream_url`, which is ignored.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTrack {
    title: String,
    #[serde(rename = "webpage_url")]
    canonical_reference: String,
    #[serde(default)]
    requester: String,
}

impl From<&TrackEntry> for StoredTrack {
    fn from(entry: &TrackEntry) -> Self {
        Self {
            title: entry.title.clone(),
            canonical_reference: entry.canonical_reference.clone(),
            requester: entry.requester.clone(),
        }
    }
}

impl From<StoredTrack> for TrackEntry {
    fn from(stored: StoredTrack) -> Self {
        Self {
            title: stored.title,
            canonical_reference: stored.canonical_reference,
            stream_locator: None,
            requester: stored.requester,
        }
    }
}

/// Check a playlist name, returning it trimmed
///
/// Names become file names, so anything that could escape the playlist
/// directory or hide the file is rejected.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Playlist name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "Playlist name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::Validation(
            "Playlist name must not contain path separators".to_string(),
        ));
    }
    if name.starts_with('.') {
        return Err(Error::Validation(
            "Playlist name must not start with '.'".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::Validation(
            "Playlist name must not contain control characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Storage(format!("failed to {} {}: {}", action, path.display(), err))
}

pub struct PlaylistStore {
    dir: PathBuf,
    playlists: RwLock<BTreeMap<String, Vec<TrackEntry>>>,
    shared: Arc<SharedState>,
}

impl PlaylistStore {
    /// Load every `*.json` playlist in `dir`, creating the directory if needed
    ///
    /// Unreadable files are logged and skipped so one bad file cannot keep
    /// the service from starting.
    pub async fn load(dir: impl Into<PathBuf>, shared: Arc<SharedState>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("create", &dir, e))?;

        let mut playlists = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| storage_error("read", &dir, e))?;

        while let Some(file) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("read", &dir, e))?
        {
            let path = file.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                warn!(path = %path.display(), "Skipping playlist with non-UTF-8 name");
                continue;
            };
            let name = match validate_name(stem) {
                Ok(name) if name == stem => name,
                _ => {
                    warn!(path = %path.display(), "Skipping playlist with invalid name");
                    continue;
                }
            };

            match read_playlist(&path).await {
                Ok(tracks) => {
                    info!("Loaded playlist '{}' with {} tracks", name, tracks.len());
                    playlists.insert(name, tracks);
                }
                Err(e) => warn!(path = %path.display(), "Skipping unreadable playlist: {}", e),
            }
        }

        info!(dir = %dir.display(), count = playlists.len(), "Playlists loaded");
        Ok(Self {
            dir,
            playlists: RwLock::new(playlists),
            shared,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Playlist names in sorted order
    pub async fn list(&self) -> Vec<String> {
        self.playlists.read().await.keys().cloned().collect()
    }

    /// Register an empty playlist; nothing is written until it has tracks
    pub async fn create(&self, name: &str) -> Result<String> {
        let name = validate_name(name)?;
        let mut playlists = self.playlists.write().await;
        if playlists.contains_key(&name) {
            return Err(Error::AlreadyExists(format!("Playlist '{}'", name)));
        }
        playlists.insert(name.clone(), Vec::new());
        drop(playlists);

        info!("Created playlist '{}'", name);
        self.emit_changed(&name, Some(0));
        Ok(name)
    }

    pub async fn show(&self, name: &str) -> Result<Vec<TrackEntry>> {
        let name = name.trim();
        self.playlists
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Playlist '{}'", name)))
    }

    /// Forget a playlist and remove its file
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = name.trim();
        let mut playlists = self.playlists.write().await;
        if !playlists.contains_key(name) {
            return Err(Error::NotFound(format!("Playlist '{}'", name)));
        }
        self.persist(name, &[]).await?;
        playlists.remove(name);
        drop(playlists);

        info!("Deleted playlist '{}'", name);
        self.emit_changed(name, None);
        Ok(())
    }

    /// Remove the track at a 1-based position
    pub async fn remove_track(&self, name: &str, position: usize) -> Result<TrackEntry> {
        let name = name.trim();
        let mut playlists = self.playlists.write().await;
        let tracks = playlists
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Playlist '{}'", name)))?;

        if position == 0 || position > tracks.len() {
            return Err(Error::Validation(format!(
                "Invalid track number {}: playlist '{}' has {} tracks",
                position,
                name,
                tracks.len()
            )));
        }

        let mut updated = tracks.clone();
        let removed = updated.remove(position - 1);
        self.persist(name, &updated).await?;
        let length = updated.len();
        playlists.insert(name.to_string(), updated);
        drop(playlists);

        info!("Removed '{}' from playlist '{}'", removed.title, name);
        self.emit_changed(name, Some(length));
        Ok(removed)
    }

    /// Append tracks whose canonical reference is not yet in the playlist
    ///
    /// Returns how many were added. Locators are never stored.
    pub async fn add_tracks(&self, name: &str, tracks: &[TrackEntry]) -> Result<usize> {
        let name = name.trim();
        let mut playlists = self.playlists.write().await;
        let existing = playlists
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Playlist '{}'", name)))?;

        let added = union_by_reference(
            existing.iter().map(|e| e.canonical_reference.as_str()),
            tracks,
        );
        if added.is_empty() {
            debug!("Nothing new to add to playlist '{}'", name);
            return Ok(0);
        }

        let count = added.len();
        let mut updated = existing.clone();
        updated.extend(added);
        self.persist(name, &updated).await?;
        let length = updated.len();
        playlists.insert(name.to_string(), updated);
        drop(playlists);

        info!("Added {} tracks to playlist '{}'", count, name);
        self.emit_changed(name, Some(length));
        Ok(count)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Write a playlist to disk, or remove its file when empty
    async fn persist(&self, name: &str, tracks: &[TrackEntry]) -> Result<()> {
        let path = self.file_path(name);

        if tracks.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed playlist file");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => {
                    error!(path = %path.display(), "Failed to remove playlist file: {}", e);
                    Err(storage_error("remove", &path, e))
                }
            };
        }

        let stored: Vec<StoredTrack> = tracks.iter().map(StoredTrack::from).collect();
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| storage_error("serialize", &path, e))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error("create", &self.dir, e))?;

        let tmp = self.dir.join(format!("{}.json.tmp", name));
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            error!(path = %tmp.display(), "Failed to write playlist: {}", e);
            return Err(storage_error("write", &tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            error!(path = %path.display(), "Failed to replace playlist file: {}", e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_error("rename", &tmp, e));
        }

        debug!(path = %path.display(), tracks = tracks.len(), "Saved playlist");
        Ok(())
    }

    fn emit_changed(&self, name: &str, length: Option<usize>) {
        self.shared.broadcast_event(PlaybotEvent::PlaylistChanged {
            name: name.to_string(),
            length,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Parse one playlist file, dropping repeated references
async fn read_playlist(path: &Path) -> Result<Vec<TrackEntry>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| storage_error("read", path, e))?;
    let stored: Vec<StoredTrack> =
        serde_json::from_slice(&bytes).map_err(|e| storage_error("parse", path, e))?;

    let total = stored.len();
    let entries: Vec<TrackEntry> = stored.into_iter().map(TrackEntry::from).collect();
    let tracks = union_by_reference(std::iter::empty(), &entries);
    if tracks.len() != total {
        warn!(
            path = %path.display(),
            duplicates = total - tracks.len(),
            "Ignoring duplicate tracks in playlist"
        );
    }
    Ok(tracks)
}
