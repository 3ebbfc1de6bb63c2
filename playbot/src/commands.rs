//! Command service
//!
//! The user-facing command set, independent of any transport (HTTP today).
//! Each method validates its input, talks to the session registry or the
//! playlist store, and returns a serializable outcome.

use crate::config::PlaybackSettings;
use crate::error::{Error, Result};
use crate::playback::{EnqueueReceipt, SessionRegistry, SessionStatus};
use crate::playlist::PlaylistStore;
use crate::resolver::{resolve_bounded, TrackResolver};
use playbot_common::{SessionId, SessionState, TrackEntry};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueOutcome {
    pub track: TrackEntry,
    /// 1-based queue position
    pub position: usize,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipOutcome {
    pub skipped: TrackEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearOutcome {
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedTrack {
    pub removed: TrackEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistListing {
    pub playlists: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetail {
    pub name: String,
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedCount {
    pub added: usize,
}

pub struct CommandService {
    registry: Arc<SessionRegistry>,
    playlists: Arc<PlaylistStore>,
    resolver: Arc<dyn TrackResolver>,
    settings: PlaybackSettings,
}

impl CommandService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        playlists: Arc<PlaylistStore>,
        resolver: Arc<dyn TrackResolver>,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            registry,
            playlists,
            resolver,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn playlists(&self) -> &Arc<PlaylistStore> {
        &self.playlists
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn join(&self, session_id: SessionId) -> Result<SessionSummary> {
        self.registry.join(session_id).await?;
        Ok(SessionSummary {
            session_id,
            active: true,
        })
    }

    pub async fn leave(&self, session_id: SessionId) -> Result<SessionSummary> {
        if !self.registry.leave(session_id).await {
            return Err(Error::NotFound(format!("Session {}", session_id)));
        }
        Ok(SessionSummary {
            session_id,
            active: false,
        })
    }

    /// Resolve a reference and append it to the session queue
    ///
    /// Resolution happens before the session is touched, so a bad reference
    /// leaves the queue unchanged and reports the failure to the caller.
    pub async fn enqueue(
        &self,
        session_id: SessionId,
        reference: &str,
        requester: &str,
    ) -> Result<EnqueueOutcome> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::Validation("Reference must not be empty".to_string()));
        }

        let info = resolve_bounded(
            self.resolver.as_ref(),
            reference,
            self.settings.resolve_timeout(),
        )
        .await?;
        let track = TrackEntry::from_info(info, requester);
        info!(session = %session_id, title = %track.title, requester, "Enqueue requested");

        let handle = self.registry.join(session_id).await?;
        let EnqueueReceipt { position, state } = handle.enqueue(track.clone()).await?;
        Ok(EnqueueOutcome {
            track,
            position,
            state,
        })
    }

    pub async fn skip(&self, session_id: SessionId) -> Result<SkipOutcome> {
        let nothing_playing = || Error::Validation("Nothing is playing".to_string());
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(nothing_playing)?;
        let skipped = handle.skip().await?.ok_or_else(nothing_playing)?;
        Ok(SkipOutcome { skipped })
    }

    pub async fn clear(&self, session_id: SessionId) -> Result<ClearOutcome> {
        let removed = match self.registry.get(session_id).await {
            Some(handle) => handle.clear().await?,
            None => 0,
        };
        Ok(ClearOutcome { removed })
    }

    pub async fn shuffle(&self, session_id: SessionId) -> Result<SessionStatus> {
        let too_short = || Error::Validation("Not enough tracks in the queue to shuffle".to_string());
        let handle = self.registry.get(session_id).await.ok_or_else(too_short)?;
        if !handle.shuffle().await? {
            return Err(too_short());
        }
        handle.status().await
    }

    /// Queue contents; an unknown session has an empty queue
    pub async fn list_queue(&self, session_id: SessionId) -> Result<SessionStatus> {
        self.status(session_id).await
    }

    pub async fn status(&self, session_id: SessionId) -> Result<SessionStatus> {
        match self.registry.get(session_id).await {
            Some(handle) => handle.status().await,
            None => Ok(SessionStatus::idle(session_id)),
        }
    }

    pub async fn remove_from_queue(
        &self,
        session_id: SessionId,
        position: usize,
    ) -> Result<RemovedTrack> {
        let handle = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| Error::Validation("Queue is empty".to_string()))?;
        let removed = handle.remove(position).await?;
        Ok(RemovedTrack { removed })
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn list_playlists(&self) -> PlaylistListing {
        PlaylistListing {
            playlists: self.playlists.list().await,
        }
    }

    pub async fn create_playlist(&self, name: &str) -> Result<PlaylistDetail> {
        let name = self.playlists.create(name).await?;
        Ok(PlaylistDetail {
            name,
            tracks: Vec::new(),
        })
    }

    pub async fn show_playlist(&self, name: &str) -> Result<PlaylistDetail> {
        let tracks = self.playlists.show(name).await?;
        Ok(PlaylistDetail {
            name: name.trim().to_string(),
            tracks,
        })
    }

    pub async fn delete_playlist(&self, name: &str) -> Result<()> {
        self.playlists.delete(name).await
    }

    pub async fn remove_from_playlist(&self, name: &str, position: usize) -> Result<RemovedTrack> {
        let removed = self.playlists.remove_track(name, position).await?;
        Ok(RemovedTrack { removed })
    }

    /// Add the session's current queue to a playlist, skipping known tracks
    pub async fn add_queue_to_playlist(
        &self,
        session_id: SessionId,
        name: &str,
    ) -> Result<AddedCount> {
        // Fail on an unknown playlist before looking at the queue
        self.playlists.show(name).await?;

        let queue = match self.registry.get(session_id).await {
            Some(handle) => handle.status().await?.queue,
            None => Vec::new(),
        };
        if queue.is_empty() {
            return Err(Error::Validation("Queue is empty".to_string()));
        }

        let added = self.playlists.add_tracks(name, &queue).await?;
        Ok(AddedCount { added })
    }

    /// Append a playlist's tracks to the session queue, skipping queued ones
    pub async fn enqueue_playlist(&self, session_id: SessionId, name: &str) -> Result<AddedCount> {
        let tracks = self.playlists.show(name).await?;
        if tracks.is_empty() {
            return Err(Error::Validation(format!(
                "Playlist '{}' is empty",
                name.trim()
            )));
        }

        let handle = self.registry.join(session_id).await?;
        let added = handle.merge(tracks).await?;
        info!(session = %session_id, playlist = %name.trim(), added, "Playlist enqueued");
        Ok(AddedCount { added })
    }
}
