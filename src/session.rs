use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::calculator::CalculationEntry;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime, refreshed on every write
pub const SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-client key-value storage
///
/// Values live under an opaque session id presented by the client. An
/// expired or unknown session behaves as an empty one.
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str, key: &str) -> Option<Value>;
    fn set(&self, session_id: &str, key: &str, value: Value);
}

/// Generate a fresh, unguessable session id
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone)]
struct Session {
    values: HashMap<String, Value>,
    expires_at: SystemTime,
}

/// Sessions held in process memory; they do not survive a restart
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_DURATION)
    }
}

impl MemorySessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of sessions that have not yet expired
    pub fn live_sessions(&self) -> usize {
        let now = SystemTime::now();
        match self.sessions.read() {
            Ok(sessions) => sessions.values().filter(|s| s.expires_at > now).count(),
            Err(_) => 0,
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Option<Value> {
        let sessions = self.sessions.read().ok()?;
        let session = sessions.get(session_id)?;
        if session.expires_at <= SystemTime::now() {
            return None;
        }
        session.values.get(key).cloned()
    }

    fn set(&self, session_id: &str, key: &str, value: Value) {
        let Ok(mut sessions) = self.sessions.write() else {
            log::error!("session store lock poisoned; dropping write to {}", key);
            return;
        };

        let now = SystemTime::now();
        sessions.retain(|id, s| s.expires_at > now || id == session_id);

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                values: HashMap::new(),
                expires_at: now,
            });
        if session.expires_at <= now {
            session.values.clear();
        }
        session.values.insert(key.to_string(), value);
        session.expires_at = now + self.ttl;
    }
}

/// Calculation history of one session, stored under the `history` key
pub struct History<'a> {
    store: &'a dyn SessionStore,
    session_id: &'a str,
}

impl<'a> History<'a> {
    pub const KEY: &'static str = "history";

    /// Bind to a session, creating an empty history on first contact
    pub fn open(store: &'a dyn SessionStore, session_id: &'a str) -> Self {
        let history = Self { store, session_id };
        if store.get(session_id, Self::KEY).is_none() {
            store.set(session_id, Self::KEY, Value::Array(Vec::new()));
        }
        history
    }

    /// Entries in the order they were calculated
    pub fn entries(&self) -> Vec<CalculationEntry> {
        match self.store.get(self.session_id, Self::KEY) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("discarding unreadable history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn push(&self, entry: CalculationEntry) {
        let mut entries = self.entries();
        entries.push(entry);
        self.save(&entries);
    }

    pub fn clear(&self) {
        self.save(&[]);
    }

    fn save(&self, entries: &[CalculationEntry]) {
        match serde_json::to_value(entries) {
            Ok(value) => self.store.set(self.session_id, Self::KEY, value),
            Err(e) => log::error!("failed to serialise history: {}", e),
        }
    }
}
