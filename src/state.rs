use crate::config::DashboardConfig;
use crate::fetcher::TimeEntriesClient;
use crate::models::{DateRange, RawTimeEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

/// Result of the most recent fetch for one browser session.
#[derive(Debug, Clone)]
pub struct Session {
    pub range: DateRange,
    pub entries: Vec<RawTimeEntry>,
    pub fetch_error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionSlot {
    pub session: Option<Session>,
}

/// A checked-out session: its id, whether it was just created, and its slot.
pub struct SessionLease {
    pub id: String,
    pub created: bool,
    pub slot: Arc<Mutex<SessionSlot>>,
}

struct SessionHandle {
    slot: Arc<Mutex<SessionSlot>>,
    last_seen: Instant,
}

/// Per-session caches keyed by the session cookie. Each session gets its own
/// lock so a slow upstream call only holds up that session. At most
/// `max_sessions` are kept; the least recently seen one is evicted first.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Looks up `id`, starting a fresh session when it is unknown or expired.
    pub async fn checkout(&self, id: Option<&str>) -> SessionLease {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, handle| now.duration_since(handle.last_seen) <= self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "discarded idle sessions");
        }

        if let Some(id) = id {
            if let Some(handle) = sessions.get_mut(id) {
                handle.last_seen = now;
                return SessionLease {
                    id: id.to_string(),
                    created: false,
                    slot: Arc::clone(&handle.slot),
                };
            }
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, handle)| handle.last_seen)
                .map(|(id, _)| id.clone());
            let Some(oldest) = oldest else { break };
            sessions.remove(&oldest);
            debug!(session = %oldest, "evicted least recently seen session");
        }

        let id = Uuid::new_v4().to_string();
        let slot = Arc::new(Mutex::new(SessionSlot::default()));
        sessions.insert(
            id.clone(),
            SessionHandle {
                slot: Arc::clone(&slot),
                last_seen: now,
            },
        );
        debug!(session = %id, active = sessions.len(), "created session");
        SessionLease {
            id,
            created: true,
            slot,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub client: TimeEntriesClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: DashboardConfig, client: TimeEntriesClient) -> Self {
        let sessions = SessionStore::new(config.session_ttl, config.max_sessions);
        Self {
            config: Arc::new(config),
            client,
            sessions,
        }
    }

    /// Fetches `range` and wraps the outcome as a fresh session. Failures
    /// become an empty entry list plus the error text.
    pub async fn load(&self, range: DateRange) -> Session {
        let (entries, fetch_error) = match self.client.fetch(&range).await {
            Ok(entries) => (entries, None),
            Err(err) => {
                error!(
                    start = %range.start_label(),
                    end = %range.end_label(),
                    "failed to fetch time entries: {err}"
                );
                (Vec::new(), Some(format!("API Error: {err}")))
            }
        };
        Session {
            range,
            entries,
            fetch_error,
            fetched_at: Utc::now(),
        }
    }
}
