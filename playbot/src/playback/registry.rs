//! Session registry
//!
//! Maps session ids to live session actors. A session is created on first
//! join (explicit or implied by an enqueue) and destroyed on leave.

use super::controller::{PlaybackController, SessionHandle};
use crate::config::PlaybackSettings;
use crate::error::Result;
use crate::resolver::TrackResolver;
use crate::state::SharedState;
use crate::transport::TransportFactory;
use playbot_common::{PlaybotEvent, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    resolver: Arc<dyn TrackResolver>,
    transports: Arc<dyn TransportFactory>,
    shared: Arc<SharedState>,
    settings: PlaybackSettings,
}

impl SessionRegistry {
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        transports: Arc<dyn TransportFactory>,
        shared: Arc<SharedState>,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            resolver,
            transports,
            shared,
            settings,
        }
    }

    /// Live session, if one exists
    pub async fn get(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Existing session, or a new one bound to a freshly connected transport
    pub async fn join(&self, session_id: SessionId) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&session_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let transport = self.transports.connect(session_id)?;
        let handle = PlaybackController::spawn(
            session_id,
            Arc::clone(&self.resolver),
            transport,
            Arc::clone(&self.shared),
            self.settings.clone(),
        );
        sessions.insert(session_id, handle.clone());
        drop(sessions);

        info!(session = %session_id, "Session opened");
        self.shared.broadcast_event(PlaybotEvent::SessionOpened {
            session_id,
            timestamp: chrono::Utc::now(),
        });
        Ok(handle)
    }

    /// Tear down a session; returns false if it did not exist
    ///
    /// Returns once the actor has stopped its transport and exited.
    pub async fn leave(&self, session_id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&session_id);
        match removed {
            Some(handle) => {
                handle.shutdown().await;
                info!(session = %session_id, "Session closed");
                true
            }
            None => false,
        }
    }

    /// Ids of all live sessions, sorted
    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Tear down every session (service shutdown)
    pub async fn shutdown_all(&self) {
        let handles: Vec<SessionHandle> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        info!(count = handles.len(), "Shutting down sessions");
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
