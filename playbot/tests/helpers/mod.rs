//! Shared test doubles for playbot integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use playbot::config::PlaybackSettings;
use playbot::error::{ResolutionError, TransportError};
use playbot::playback::{SessionRegistry, SessionStatus};
use playbot::resolver::TrackResolver;
use playbot::transport::{FinishNotifier, TransportAdapter, TransportFactory};
use playbot::SharedState;
use playbot_common::{SessionId, SessionState, TrackEntry, TrackInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Resolver
// ============================================================================

#[derive(Clone)]
enum Behavior {
    Resolve(TrackInfo),
    Fail,
    Hang,
}

/// Scripted resolver
///
/// References resolve to `stream://<reference>` unless marked as failing or
/// hanging. Every call is recorded.
#[derive(Default)]
pub struct MockResolver {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, reference: &str) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(reference.to_string(), Behavior::Fail);
    }

    pub fn hang(&self, reference: &str) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(reference.to_string(), Behavior::Hang);
    }

    /// Resolve `reference` to a different canonical reference
    pub fn alias(&self, reference: &str, canonical: &str) {
        self.behaviors.lock().unwrap().insert(
            reference.to_string(),
            Behavior::Resolve(info_for(canonical)),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, reference: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.as_str() == reference)
            .count()
    }
}

#[async_trait]
impl TrackResolver for MockResolver {
    async fn resolve(&self, reference: &str) -> Result<TrackInfo, ResolutionError> {
        self.calls.lock().unwrap().push(reference.to_string());
        let behavior = self.behaviors.lock().unwrap().get(reference).cloned();

        match behavior {
            Some(Behavior::Resolve(info)) => Ok(info),
            Some(Behavior::Fail) => Err(ResolutionError::Unavailable(format!(
                "{} is private",
                reference
            ))),
            Some(Behavior::Hang) => std::future::pending().await,
            None => Ok(info_for(reference)),
        }
    }
}

pub fn info_for(reference: &str) -> TrackInfo {
    TrackInfo {
        title: format!("Title of {}", reference),
        canonical_reference: reference.to_string(),
        stream_locator: locator_for(reference),
    }
}

pub fn locator_for(reference: &str) -> String {
    format!("stream://{}", reference)
}

/// Queue entry that still needs resolving
pub fn unresolved(reference: &str) -> TrackEntry {
    TrackEntry {
        title: format!("Title of {}", reference),
        canonical_reference: reference.to_string(),
        stream_locator: None,
        requester: "tester".to_string(),
    }
}

/// Queue entry with a fresh locator
pub fn resolved(reference: &str) -> TrackEntry {
    TrackEntry::from_info(info_for(reference), "tester")
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
struct TransportInner {
    started: Vec<String>,
    pending: Option<FinishNotifier>,
    refused: Vec<String>,
    overlapping_starts: usize,
}

/// Transport that records calls and finishes only when told to
///
/// `stop` does not finish the track by itself; tests deliver the finish
/// signal with [`MockTransport::finish`], from another OS thread, the way a
/// real transport would.
#[derive(Default)]
pub struct MockTransport {
    inner: Mutex<TransportInner>,
    stops: AtomicUsize,
}

impl MockTransport {
    /// Make `start` fail for this locator
    pub fn refuse(&self, locator: &str) {
        self.inner.lock().unwrap().refused.push(locator.to_string());
    }

    pub fn started(&self) -> Vec<String> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().pending.is_some()
    }

    /// Starts issued while a previous start had not yet finished
    pub fn overlapping_starts(&self) -> usize {
        self.inner.lock().unwrap().overlapping_starts
    }

    /// Fire the outstanding finish notifier from a foreign thread
    ///
    /// Returns false if nothing was playing. The signal has been posted to
    /// the session when this returns.
    pub fn finish(&self, error: Option<TransportError>) -> bool {
        let notifier = self.inner.lock().unwrap().pending.take();
        match notifier {
            Some(notifier) => {
                std::thread::spawn(move || notifier.notify(error))
                    .join()
                    .unwrap();
                true
            }
            None => false,
        }
    }
}

impl TransportAdapter for MockTransport {
    fn start(&self, locator: &str, on_finish: FinishNotifier) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.refused.iter().any(|l| l == locator) {
            return Err(TransportError::Spawn(format!("cannot play {}", locator)));
        }
        if inner.pending.is_some() {
            inner.overlapping_starts += 1;
        }
        inner.started.push(locator.to_string());
        inner.pending = Some(on_finish);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one [`MockTransport`] per session and keeps it for inspection
#[derive(Default)]
pub struct MockTransportFactory {
    transports: Mutex<HashMap<SessionId, Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn transport(&self, session_id: SessionId) -> Arc<MockTransport> {
        Arc::clone(
            self.transports
                .lock()
                .unwrap()
                .entry(session_id)
                .or_default(),
        )
    }
}

impl TransportFactory for MockTransportFactory {
    fn connect(&self, session_id: SessionId) -> Result<Arc<dyn TransportAdapter>, TransportError> {
        Ok(self.transport(session_id))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn test_settings() -> PlaybackSettings {
    PlaybackSettings {
        resolve_timeout_ms: 200,
        prefetch: false,
        locator_max_age_secs: 3600,
    }
}

pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<MockResolver>,
    pub transports: Arc<MockTransportFactory>,
    pub state: Arc<SharedState>,
}

impl Harness {
    pub fn new(settings: PlaybackSettings) -> Self {
        let resolver = MockResolver::new();
        let transports = Arc::new(MockTransportFactory::default());
        let state = Arc::new(SharedState::new());
        let registry = Arc::new(SessionRegistry::new(
            resolver.clone(),
            transports.clone(),
            Arc::clone(&state),
            settings,
        ));
        Self {
            registry,
            resolver,
            transports,
            state,
        }
    }

    pub fn transport(&self, session_id: SessionId) -> Arc<MockTransport> {
        self.transports.transport(session_id)
    }
}

pub fn references(status: &SessionStatus) -> Vec<String> {
    status
        .queue
        .iter()
        .map(|t| t.canonical_reference.clone())
        .collect()
}

/// Poll a session until `predicate` holds or two seconds pass
pub async fn wait_for_status(
    handle: &playbot::playback::SessionHandle,
    predicate: impl Fn(&SessionStatus) -> bool,
) -> SessionStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = handle.status().await.unwrap();
        if predicate(&status) || tokio::time::Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn is_idle(status: &SessionStatus) -> bool {
    status.state == SessionState::Idle
}

/// Wait until the session is no longer resolving its head
pub async fn settled(handle: &playbot::playback::SessionHandle) -> SessionStatus {
    let status = wait_for_status(handle, |s| s.state != SessionState::Resolving).await;
    assert_ne!(status.state, SessionState::Resolving, "session never settled");
    status
}
