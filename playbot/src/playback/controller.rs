//! Playback Controller
//!
//! One tokio task per session owns the session's [`QueueStore`] and state
//! machine. Every mutation arrives as a [`SessionCommand`] on the actor's
//! channel: user commands from [`SessionHandle`], finish signals re-marshalled
//! from the transport's thread, and results of background prefetches.
//!
//! **State machine:**
//! ```text
//! Idle ──enqueue──▶ Resolving ──start ok──▶ Playing ──skip/clear──▶ Stopping
//!  ▲                   │                       │                        │
//!  └── queue drained ◀─┘       finish signal ──┴────────────────────────┘
//! ```
//!
//! Each successful transport start is tagged with a fresh play token. A
//! finish signal carrying any other token is stale and ignored, which makes
//! duplicate or late signals harmless.
//!
//! Resolution never runs on the actor itself. The head and the prefetched
//! next entry are resolved in spawned tasks that post their result back,
//! tagged with the [`EntryId`] of the slot they belong to, so commands stay
//! responsive while a resolver hangs.

use super::queue::{EntryId, QueueStore};
use crate::config::PlaybackSettings;
use crate::error::{Error, ResolutionError, Result, TransportError};
use crate::playlist::merge_into_queue;
use crate::resolver::{resolve_bounded, TrackResolver};
use crate::state::SharedState;
use crate::transport::{FinishNotifier, TransportAdapter};
use playbot_common::{PlaybotEvent, SessionId, SessionState, TrackEntry, TrackInfo};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifies one successful transport start
pub type PlayToken = u64;

type Resolution = std::result::Result<TrackInfo, ResolutionError>;

/// Messages processed by a session actor
enum SessionCommand {
    Enqueue {
        track: TrackEntry,
        reply: oneshot::Sender<EnqueueReceipt>,
    },
    Merge {
        entries: Vec<TrackEntry>,
        reply: oneshot::Sender<usize>,
    },
    Skip {
        reply: oneshot::Sender<Option<TrackEntry>>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
    Shuffle {
        reply: oneshot::Sender<bool>,
    },
    Remove {
        position: usize,
        reply: oneshot::Sender<Result<TrackEntry>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    TransportFinished {
        token: PlayToken,
        error: Option<TransportError>,
    },
    HeadResolved {
        entry_id: EntryId,
        result: Resolution,
    },
    PrefetchResolved {
        entry_id: EntryId,
        result: Resolution,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Outcome of adding one track to a session queue
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueReceipt {
    /// 1-based queue position of the new entry
    pub position: usize,
    /// Session state once the enqueue was processed
    pub state: SessionState,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub state: SessionState,
    /// Track the transport is rendering, if any
    pub now_playing: Option<TrackEntry>,
    /// Token of the outstanding transport start, if any
    pub play_token: Option<PlayToken>,
    pub queue: Vec<TrackEntry>,
}

impl SessionStatus {
    /// Status of a session that has never been joined
    pub fn idle(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: SessionState::Idle,
            now_playing: None,
            play_token: None,
            queue: Vec::new(),
        }
    }
}

/// Cloneable client side of a session actor
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether the actor has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn closed(&self) -> Error {
        Error::SessionClosed(format!("session {} is no longer active", self.session_id))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// Append a track, starting playback if the session is idle
    pub async fn enqueue(&self, track: TrackEntry) -> Result<EnqueueReceipt> {
        self.request(|reply| SessionCommand::Enqueue { track, reply })
            .await
    }

    /// Append tracks not already queued; returns how many were added
    pub async fn merge(&self, entries: Vec<TrackEntry>) -> Result<usize> {
        self.request(|reply| SessionCommand::Merge { entries, reply })
            .await
    }

    /// Stop the current track; `None` if nothing was playing
    pub async fn skip(&self) -> Result<Option<TrackEntry>> {
        self.request(|reply| SessionCommand::Skip { reply }).await
    }

    /// Empty the queue and stop playback; returns how many entries were removed
    pub async fn clear(&self) -> Result<usize> {
        self.request(|reply| SessionCommand::Clear { reply }).await
    }

    /// Shuffle everything behind the head; false if the queue was too short
    pub async fn shuffle(&self) -> Result<bool> {
        self.request(|reply| SessionCommand::Shuffle { reply }).await
    }

    /// Remove the entry at a 1-based position
    pub async fn remove(&self, position: usize) -> Result<TrackEntry> {
        self.request(|reply| SessionCommand::Remove { position, reply })
            .await?
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Deliver a transport finish signal for the start tagged `token`
    ///
    /// Safe to call from any thread. Signals for a token that is not the
    /// outstanding one are ignored by the actor.
    pub fn notify_finished(&self, token: PlayToken, error: Option<TransportError>) {
        let _ = self
            .tx
            .send(SessionCommand::TransportFinished { token, error });
    }

    /// Stop playback and wait for the actor to exit
    pub async fn shutdown(&self) {
        if self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await
            .is_err()
        {
            debug!(session = %self.session_id, "Session already shut down");
        }
    }
}

/// Transport start currently outstanding
struct NowPlaying {
    token: PlayToken,
    entry_id: EntryId,
}

/// Resolution running in a background task
struct PendingResolve {
    entry_id: EntryId,
    task: JoinHandle<()>,
}

/// Per-session actor
pub struct PlaybackController {
    session_id: SessionId,
    queue: QueueStore,
    state: SessionState,
    resolver: Arc<dyn TrackResolver>,
    transport: Arc<dyn TransportAdapter>,
    shared: Arc<SharedState>,
    settings: PlaybackSettings,
    rx: mpsc::UnboundedReceiver<SessionCommand>,
    /// Weak so that finish callbacks and resolve tasks never keep a
    /// torn-down session alive
    self_tx: mpsc::WeakUnboundedSender<SessionCommand>,
    playing: Option<NowPlaying>,
    next_token: PlayToken,
    /// Head resolution, only while Resolving
    resolving: Option<PendingResolve>,
    /// Background resolution of index 1, only while Playing
    prefetch: Option<PendingResolve>,
}

impl PlaybackController {
    /// Spawn the actor for a session and return its handle
    pub fn spawn(
        session_id: SessionId,
        resolver: Arc<dyn TrackResolver>,
        transport: Arc<dyn TransportAdapter>,
        shared: Arc<SharedState>,
        settings: PlaybackSettings,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            session_id,
            queue: QueueStore::new(),
            state: SessionState::Idle,
            resolver,
            transport,
            shared,
            settings,
            rx,
            self_tx: tx.downgrade(),
            playing: None,
            next_token: 1,
            resolving: None,
            prefetch: None,
        };
        tokio::spawn(controller.run());
        SessionHandle { session_id, tx }
    }

    async fn run(mut self) {
        info!(session = %self.session_id, "Session actor started");

        loop {
            match self.rx.recv().await {
                Some(SessionCommand::Shutdown { reply }) => {
                    self.teardown();
                    let _ = reply.send(());
                    break;
                }
                Some(command) => self.handle(command),
                None => {
                    self.teardown();
                    break;
                }
            }
        }

        info!(session = %self.session_id, "Session actor stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Enqueue { track, reply } => {
                let _ = reply.send(self.enqueue(track));
            }
            SessionCommand::Merge { entries, reply } => {
                let _ = reply.send(self.merge(entries));
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip());
            }
            SessionCommand::Clear { reply } => {
                let _ = reply.send(self.clear());
            }
            SessionCommand::Shuffle { reply } => {
                let _ = reply.send(self.shuffle());
            }
            SessionCommand::Remove { position, reply } => {
                let _ = reply.send(self.remove(position));
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SessionCommand::TransportFinished { token, error } => {
                self.on_transport_finished(token, error);
            }
            SessionCommand::HeadResolved { entry_id, result } => {
                self.on_head_resolved(entry_id, result);
            }
            SessionCommand::PrefetchResolved { entry_id, result } => {
                self.on_prefetch_resolved(entry_id, result);
            }
            SessionCommand::Shutdown { .. } => {
                // Intercepted in run()
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn enqueue(&mut self, track: TrackEntry) -> EnqueueReceipt {
        debug!(session = %self.session_id, title = %track.title, "Enqueue");
        self.queue.enqueue(track);
        let position = self.queue.len();
        self.shared.emit_queue_changed(self.session_id, position);

        if self.state == SessionState::Idle {
            self.start_playback();
        } else {
            self.maybe_prefetch();
        }

        EnqueueReceipt {
            position,
            state: self.state,
        }
    }

    fn merge(&mut self, entries: Vec<TrackEntry>) -> usize {
        let added = merge_into_queue(&mut self.queue, &entries);
        info!(session = %self.session_id, added, offered = entries.len(), "Merged tracks into queue");

        if added > 0 {
            self.shared.emit_queue_changed(self.session_id, self.queue.len());
            if self.state == SessionState::Idle {
                self.start_playback();
            } else {
                self.maybe_prefetch();
            }
        }
        added
    }

    fn skip(&mut self) -> Option<TrackEntry> {
        if self.state != SessionState::Playing {
            debug!(session = %self.session_id, state = %self.state, "Skip ignored");
            return None;
        }

        let current = self.queue.peek_head().map(|slot| slot.track.clone());
        info!(session = %self.session_id, "Skipping current track");
        self.transport.stop();
        self.set_state(SessionState::Stopping);
        current
    }

    fn clear(&mut self) -> usize {
        let removed = self.queue.len();
        self.queue.clear();
        self.cancel_prefetch();

        match self.state {
            SessionState::Playing => {
                self.transport.stop();
                self.set_state(SessionState::Stopping);
            }
            SessionState::Resolving => {
                self.cancel_head_resolve();
                self.set_state(SessionState::Idle);
            }
            SessionState::Idle | SessionState::Stopping => {}
        }

        info!(session = %self.session_id, removed, "Queue cleared");
        self.shared.emit_queue_changed(self.session_id, 0);
        removed
    }

    fn shuffle(&mut self) -> bool {
        if !self.queue.shuffle_tail() {
            return false;
        }
        self.shared.emit_queue_changed(self.session_id, self.queue.len());
        // Index 1 probably changed
        self.maybe_prefetch();
        true
    }

    fn remove(&mut self, position: usize) -> Result<TrackEntry> {
        if position == 1 && self.head_is_playing() {
            return Err(Error::Validation(
                "Track 1 is playing; use skip instead".to_string(),
            ));
        }

        let removed = self.queue.remove_at(position)?;
        if self
            .prefetch
            .as_ref()
            .is_some_and(|p| p.entry_id == removed.id)
        {
            self.cancel_prefetch();
        }
        self.shared.emit_queue_changed(self.session_id, self.queue.len());

        if self
            .resolving
            .as_ref()
            .is_some_and(|r| r.entry_id == removed.id)
        {
            debug!(session = %self.session_id, "Head removed while resolving");
            self.cancel_head_resolve();
            self.advance();
        } else {
            self.maybe_prefetch();
        }
        Ok(removed.track)
    }

    fn status(&self) -> SessionStatus {
        let now_playing = if self.head_is_playing() {
            self.queue.peek_head().map(|slot| slot.track.clone())
        } else {
            None
        };

        SessionStatus {
            session_id: self.session_id,
            state: self.state,
            now_playing,
            play_token: self.playing.as_ref().map(|p| p.token),
            queue: self.queue.snapshot(),
        }
    }

    /// Whether index 0 is the entry the transport was started with
    ///
    /// False while Stopping after a clear, when the outstanding start belongs
    /// to an entry that has already left the queue.
    fn head_is_playing(&self) -> bool {
        self.playing
            .as_ref()
            .is_some_and(|now| self.queue.head_id() == Some(now.entry_id))
    }

    // ========================================================================
    // Playback
    // ========================================================================

    fn start_playback(&mut self) {
        if self.state != SessionState::Idle || self.playing.is_some() || self.queue.is_empty() {
            return;
        }
        self.set_state(SessionState::Resolving);
        self.advance();
    }

    /// Start the head, or hand it to a resolve task if it needs a locator
    ///
    /// Entries whose start fails are dropped. Each pass either returns or
    /// removes one entry, so the loop is bounded by the queue length.
    fn advance(&mut self) {
        let max_age = self.settings.locator_max_age();
        let attempts = self.queue.len();

        for _ in 0..attempts {
            let Some(head) = self.queue.peek_head() else {
                break;
            };
            let head_id = head.id;
            let fresh = head
                .has_fresh_locator(max_age)
                .then(|| head.track.stream_locator.clone())
                .flatten();

            match fresh {
                Some(locator) => {
                    if self.try_begin(head_id, &locator) {
                        return;
                    }
                }
                None => {
                    let reference = head.track.canonical_reference.clone();
                    self.spawn_head_resolve(head_id, reference);
                    return;
                }
            }
        }

        self.set_state(SessionState::Idle);
    }

    fn spawn_head_resolve(&mut self, entry_id: EntryId, reference: String) {
        // The head is resolved here; a prefetch for it is redundant
        if self.prefetch.as_ref().is_some_and(|p| p.entry_id == entry_id) {
            self.cancel_prefetch();
        }

        debug!(session = %self.session_id, %reference, "Resolving head of queue");
        let task = self.spawn_resolve(entry_id, reference, |entry_id, result| {
            SessionCommand::HeadResolved { entry_id, result }
        });
        self.resolving = Some(PendingResolve { entry_id, task });
    }

    fn on_head_resolved(&mut self, entry_id: EntryId, result: Resolution) {
        if !self
            .resolving
            .as_ref()
            .is_some_and(|r| r.entry_id == entry_id)
        {
            debug!(session = %self.session_id, entry_id, "Ignoring stale head resolution");
            return;
        }
        self.resolving = None;

        match result {
            Ok(info) if self.queue.head_id() == Some(entry_id) => {
                let locator = info.stream_locator.clone();
                if let Some(head) = self.queue.head_mut() {
                    head.apply_resolution(info);
                }
                if self.try_begin(entry_id, &locator) {
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => self.drop_head(entry_id, e.to_string()),
        }

        self.advance();
    }

    /// Start the head's locator; on failure the head is dropped
    fn try_begin(&mut self, entry_id: EntryId, locator: &str) -> bool {
        match self.begin(entry_id, locator) {
            Ok(()) => {
                self.set_state(SessionState::Playing);
                self.announce_start();
                self.maybe_prefetch();
                true
            }
            Err(e) => {
                self.drop_head(entry_id, e.to_string());
                false
            }
        }
    }

    /// Hand the locator to the transport under a fresh play token
    fn begin(&mut self, entry_id: EntryId, locator: &str) -> std::result::Result<(), TransportError> {
        let token = self.next_token;
        self.next_token += 1;

        let tx = self.self_tx.clone();
        let on_finish = FinishNotifier::new(move |error| {
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SessionCommand::TransportFinished { token, error });
            }
        });

        self.transport.start(locator, on_finish)?;
        self.playing = Some(NowPlaying { token, entry_id });
        Ok(())
    }

    fn announce_start(&self) {
        if let Some(head) = self.queue.peek_head() {
            info!(session = %self.session_id, title = %head.track.title, "Now playing");
            self.shared.broadcast_event(PlaybotEvent::TrackStarted {
                session_id: self.session_id,
                title: head.track.title.clone(),
                canonical_reference: head.track.canonical_reference.clone(),
                requester: head.track.requester.clone(),
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Remove the head after a failed resolution or start
    fn drop_head(&mut self, head_id: EntryId, reason: String) {
        if self.queue.head_id() != Some(head_id) {
            return;
        }
        let Ok(dropped) = self.queue.pop_head() else {
            return;
        };

        warn!(
            session = %self.session_id,
            title = %dropped.track.title,
            reference = %dropped.track.canonical_reference,
            "Dropping track: {}", reason
        );
        self.shared.broadcast_event(PlaybotEvent::TrackDropped {
            session_id: self.session_id,
            title: dropped.track.title,
            canonical_reference: dropped.track.canonical_reference,
            reason,
            timestamp: chrono::Utc::now(),
        });
        self.shared.emit_queue_changed(self.session_id, self.queue.len());
    }

    fn on_transport_finished(&mut self, token: PlayToken, error: Option<TransportError>) {
        let entry_id = match &self.playing {
            Some(now) if now.token == token => now.entry_id,
            _ => {
                debug!(session = %self.session_id, token, "Ignoring stale finish signal");
                return;
            }
        };
        self.playing = None;

        if let Some(e) = &error {
            warn!(session = %self.session_id, "Track ended with error: {}", e);
        }

        // After a clear the head may be a newer entry that must not be popped
        if self.queue.head_id() == Some(entry_id) {
            if let Ok(finished) = self.queue.pop_head() {
                debug!(session = %self.session_id, title = %finished.track.title, "Track finished");
                self.shared.broadcast_event(PlaybotEvent::TrackFinished {
                    session_id: self.session_id,
                    title: finished.track.title,
                    error: error.map(|e| e.to_string()),
                    timestamp: chrono::Utc::now(),
                });
                self.shared.emit_queue_changed(self.session_id, self.queue.len());
            }
        }

        self.set_state(SessionState::Idle);
        self.start_playback();
    }

    // ========================================================================
    // Resolution tasks
    // ========================================================================

    /// Resolve in the background and post the result back to this actor
    fn spawn_resolve(
        &self,
        entry_id: EntryId,
        reference: String,
        deliver: fn(EntryId, Resolution) -> SessionCommand,
    ) -> JoinHandle<()> {
        let resolver = Arc::clone(&self.resolver);
        let limit = self.settings.resolve_timeout();
        let tx = self.self_tx.clone();

        tokio::spawn(async move {
            let result = resolve_bounded(resolver.as_ref(), &reference, limit).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(deliver(entry_id, result));
            }
        })
    }

    /// Resolve index 1 in the background if it needs a locator
    fn maybe_prefetch(&mut self) {
        if !self.settings.prefetch || self.state != SessionState::Playing {
            return;
        }
        let Some(next) = self.queue.get(1) else {
            return;
        };
        if next.has_fresh_locator(self.settings.locator_max_age()) {
            return;
        }

        let entry_id = next.id;
        let reference = next.track.canonical_reference.clone();
        if let Some(current) = &self.prefetch {
            if current.entry_id == entry_id && !current.task.is_finished() {
                return;
            }
        }
        self.cancel_prefetch();

        debug!(session = %self.session_id, %reference, "Prefetching next track");
        let task = self.spawn_resolve(entry_id, reference, |entry_id, result| {
            SessionCommand::PrefetchResolved { entry_id, result }
        });
        self.prefetch = Some(PendingResolve { entry_id, task });
    }

    fn on_prefetch_resolved(&mut self, entry_id: EntryId, result: Resolution) {
        if self.prefetch.as_ref().is_some_and(|p| p.entry_id == entry_id) {
            self.prefetch = None;
        }

        match result {
            Ok(info) => {
                let max_age = self.settings.locator_max_age();
                if let Some(slot) = self.queue.find_mut(entry_id) {
                    if !slot.has_fresh_locator(max_age) {
                        debug!(session = %self.session_id, title = %info.title, "Prefetched locator");
                        slot.apply_resolution(info);
                    }
                }
            }
            Err(e) => {
                // Left unresolved; retried when it reaches the head
                warn!(session = %self.session_id, entry_id, "Prefetch failed: {}", e);
            }
        }
    }

    fn cancel_prefetch(&mut self) {
        if let Some(prefetch) = self.prefetch.take() {
            prefetch.task.abort();
        }
    }

    fn cancel_head_resolve(&mut self) {
        if let Some(pending) = self.resolving.take() {
            pending.task.abort();
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(session = %self.session_id, from = %self.state, to = %state, "State change");
            self.state = state;
            self.shared.emit_state(self.session_id, state);
        }
    }

    /// Abort background work and stop the transport
    ///
    /// Any finish signal still in flight finds no outstanding token (or no
    /// actor at all) and is discarded.
    fn teardown(&mut self) {
        self.cancel_head_resolve();
        self.cancel_prefetch();
        if self.playing.take().is_some() {
            self.transport.stop();
        }
        self.queue.clear();
        self.state = SessionState::Idle;
        self.shared.broadcast_event(PlaybotEvent::SessionClosed {
            session_id: self.session_id,
            timestamp: chrono::Utc::now(),
        });
    }
}
