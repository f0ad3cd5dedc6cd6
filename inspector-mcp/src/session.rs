// Debug session management
//
// One session at a time. The connection handle and last endpoint live behind
// a single async mutex, which also serialises every protocol request. The
// object cache and event history are separate short-lock structures.
//
// Detach is local-only: the JDWP Dispose command is never sent, because the
// upstream proxy would tear down every peer's session on receiving it.

use crate::error::{DebugError, DebugResult};
use jdwp_client::events::{EventKind, EventSet};
use jdwp_client::types::ObjectId;
use jdwp_client::JdwpConnection;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// At most this many protocol events are retained.
const EVENT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object,
    Array,
}

/// What we knew about a remote object when it was last rendered. The id is
/// only valid within the session that produced it; entries are re-validated
/// against the live VM before use.
#[derive(Debug, Clone)]
pub struct CachedObject {
    pub kind: ObjectKind,
    pub type_name: String,
}

#[derive(Debug, Default)]
struct SessionState {
    connection: Option<JdwpConnection>,
    last_endpoint: Option<(String, u16)>,
}

/// Result of an attach call: whether a new session was created.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub fresh: bool,
    pub message: String,
}

pub struct SessionManager {
    state: Mutex<SessionState>,
    objects: StdMutex<HashMap<ObjectId, CachedObject>>,
    events: StdMutex<VecDeque<String>>,
}

/// Exclusive access to a live connection. Holding this guard serialises all
/// protocol traffic, which the single debug channel requires.
pub struct SessionGuard<'a> {
    state: MutexGuard<'a, SessionState>,
}

impl SessionGuard<'_> {
    pub fn connection(&mut self) -> &mut JdwpConnection {
        // ensure_live established Some before the guard was handed out
        self.state.connection.as_mut().expect("live connection")
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            objects: StdMutex::new(HashMap::new()),
            events: StdMutex::new(VecDeque::new()),
        }
    }

    /// Attach to an endpoint. Re-attaching while a live session exists is a
    /// no-op that reports the existing VM.
    pub async fn attach(&self, host: &str, port: u16) -> DebugResult<AttachOutcome> {
        let mut state = self.state.lock().await;

        if let Some(conn) = state.connection.as_mut() {
            match conn.get_version().await {
                Ok(version) => {
                    return Ok(AttachOutcome {
                        fresh: false,
                        message: format!("Already connected to {}", version.vm_name),
                    });
                }
                Err(_) => {
                    // Dead handle; fall through and attach fresh
                    state.connection = None;
                }
            }
        }

        let connection = connect(host, port).await?;
        state.connection = Some(connection);
        state.last_endpoint = Some((host.to_string(), port));

        let version = state
            .connection
            .as_mut()
            .expect("just attached")
            .get_version()
            .await
            .map_err(DebugError::from)?;

        info!("Attached to {} ({})", version.vm_name, version.vm_version);
        Ok(AttachOutcome {
            fresh: true,
            message: format!(
                "Connected to {} (version {})",
                version.vm_name, version.vm_version
            ),
        })
    }

    /// Local cleanup only; never transmits Dispose.
    pub async fn detach(&self) -> String {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return "Not connected".to_string();
        }
        state.connection = None;
        state.last_endpoint = None;
        "Disconnected".to_string()
    }

    /// Cheap liveness probe; a failed probe invalidates the handle.
    pub async fn is_alive(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.connection.as_mut() {
            Some(conn) => {
                if conn.get_version().await.is_ok() {
                    true
                } else {
                    state.connection = None;
                    false
                }
            }
            None => false,
        }
    }

    /// Acquire a live connection, probing first and re-attaching to the last
    /// endpoint when the handle is dead. `NotAttached` when there was never
    /// a successful attach.
    pub async fn acquire(&self) -> DebugResult<SessionGuard<'_>> {
        let mut state = self.state.lock().await;

        if let Some(conn) = state.connection.as_mut() {
            if conn.get_version().await.is_ok() {
                return Ok(SessionGuard { state });
            }
            warn!("Connection probe failed; dropping dead handle");
            state.connection = None;
        }

        let Some((host, port)) = state.last_endpoint.clone() else {
            return Err(DebugError::NotAttached);
        };

        info!("Re-attaching to last endpoint {}:{}", host, port);
        let connection = connect(&host, port).await?;
        state.connection = Some(connection);

        Ok(SessionGuard { state })
    }

    // --- object cache ---

    pub fn cache_object(&self, id: ObjectId, kind: ObjectKind, type_name: String) {
        if id == 0 {
            return;
        }
        self.objects
            .lock()
            .unwrap()
            .insert(id, CachedObject { kind, type_name });
    }

    pub fn cached_object(&self, id: ObjectId) -> Option<CachedObject> {
        self.objects.lock().unwrap().get(&id).cloned()
    }

    /// Drop a cache entry whose id turned out to be stale.
    pub fn evict_object(&self, id: ObjectId) {
        self.objects.lock().unwrap().remove(&id);
    }

    // --- event history ---

    /// Drain pending events from the connection into the bounded history.
    pub async fn pump_events(&self, guard: &mut SessionGuard<'_>) {
        while let Some(set) = guard.connection().try_recv_event().await {
            self.record_event_set(&set);
        }
    }

    pub fn record_event_set(&self, set: &EventSet) {
        let mut events = self.events.lock().unwrap();
        for event in &set.events {
            if events.len() == EVENT_HISTORY_LIMIT {
                events.pop_front();
            }
            events.push_back(format_event(event.request_id, &event.kind));
        }
    }

    /// Most recent events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<String> {
        let events = self.events.lock().unwrap();
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn connect(host: &str, port: u16) -> DebugResult<JdwpConnection> {
    JdwpConnection::connect(host, port)
        .await
        .map_err(DebugError::from)
}

fn format_event(request_id: i32, kind: &EventKind) -> String {
    match kind {
        EventKind::VmStart { thread } => format!("VM started (thread {})", thread),
        EventKind::VmDeath => "VM death".to_string(),
        EventKind::ThreadStart { thread } => format!("Thread {} started", thread),
        EventKind::ThreadDeath { thread } => format!("Thread {} died", thread),
        EventKind::ClassPrepare { signature, .. } => {
            format!("Class prepared: {}", signature)
        }
        EventKind::ClassUnload { signature } => format!("Class unloaded: {}", signature),
        EventKind::Breakpoint { thread, location } => format!(
            "Breakpoint hit (request {}) on thread {} at index {}",
            request_id, thread, location.index
        ),
        EventKind::Step { thread, location } => format!(
            "Step completed (request {}) on thread {} at index {}",
            request_id, thread, location.index
        ),
        EventKind::Exception {
            thread,
            catch_location,
            ..
        } => format!(
            "Exception on thread {} ({})",
            thread,
            if catch_location.is_some() {
                "caught"
            } else {
                "uncaught"
            }
        ),
        EventKind::MethodEntry { thread, .. } => format!("Method entry on thread {}", thread),
        EventKind::MethodExit { thread, .. } => format!("Method exit on thread {}", thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdwp_client::events::Event;
    use jdwp_client::types::Location;

    fn breakpoint_set(request_id: i32, thread: u64) -> EventSet {
        EventSet {
            suspend_policy: 2,
            events: vec![Event {
                request_id,
                kind: EventKind::Breakpoint {
                    thread,
                    location: Location {
                        type_tag: 1,
                        class_id: 1,
                        method_id: 2,
                        index: 0,
                    },
                },
            }],
        }
    }

    #[tokio::test]
    async fn operations_before_attach_report_not_attached() {
        let manager = SessionManager::new();
        match manager.acquire().await {
            Err(DebugError::NotAttached) => {}
            other => panic!("expected NotAttached, got {:?}", other.err()),
        };
    }

    #[tokio::test]
    async fn detach_without_session_is_benign() {
        let manager = SessionManager::new();
        assert_eq!(manager.detach().await, "Not connected");
        assert!(!manager.is_alive().await);
    }

    #[test]
    fn event_history_is_bounded() {
        let manager = SessionManager::new();
        for i in 0..150 {
            manager.record_event_set(&breakpoint_set(i, 1));
        }
        let recent = manager.recent_events(200);
        assert_eq!(recent.len(), EVENT_HISTORY_LIMIT);
        // Oldest entries were dropped
        assert!(recent[0].contains("request 50"));
        assert!(recent.last().unwrap().contains("request 149"));
    }

    #[test]
    fn recent_events_returns_newest_slice() {
        let manager = SessionManager::new();
        for i in 0..10 {
            manager.record_event_set(&breakpoint_set(i, 1));
        }
        let recent = manager.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert!(recent[0].contains("request 7"));
    }

    #[test]
    fn object_cache_insert_lookup_evict() {
        let manager = SessionManager::new();
        manager.cache_object(42, ObjectKind::Object, "demo.Svc".into());
        assert!(manager.cached_object(42).is_some());

        manager.evict_object(42);
        assert!(manager.cached_object(42).is_none());

        // The null reference is never cached
        manager.cache_object(0, ObjectKind::Object, "x".into());
        assert!(manager.cached_object(0).is_none());
    }
}
