//! Per-connection session state.
//!
//! A [`Session`] records the negotiated client capabilities, the
//! initialisation flag and the MCP log level for one connection. Sessions
//! live in a pluggable key/value [`SessionStore`]; the engine reads a
//! session at the start of each dispatch cycle and writes it back when a
//! handler changed it. Concurrent writers to the same session id are not
//! coordinated: the last write wins.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidArgument;

/// MCP log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Normal but significant events.
    Notice,
    /// Warning conditions.
    Warning,
    /// Error conditions.
    Error,
    /// Critical conditions.
    Critical,
    /// Action must be taken immediately.
    Alert,
    /// System is unusable.
    Emergency,
}

impl LogLevel {
    /// Every level, least severe first.
    pub const ALL: [Self; 8] = [
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Critical,
        Self::Alert,
        Self::Emergency,
    ];

    /// Returns the wire name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        }
    }

    /// Returns `true` if a message at this level passes `threshold`.
    #[must_use]
    pub fn should_emit(self, threshold: Self) -> bool {
        self >= threshold
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| InvalidArgument::new(format!("unknown log level '{s}'")))
    }
}

/// Where a session is in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `initialize`.
    Uninitialized,
    /// `initialize` answered, waiting for `notifications/initialized`.
    Initializing,
    /// Ready for normal operation.
    Initialized,
}

/// State kept for one client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    #[serde(default)]
    client_capabilities: Map<String, Value>,
    #[serde(default)]
    initialized: bool,
    #[serde(default)]
    log_level: LogLevel,
    #[serde(default)]
    protocol_version: Option<String>,
}

impl Session {
    /// Creates a fresh, uninitialised session.
    #[must_use]
    pub fn new(id: impl Into<String>, log_level: LogLevel) -> Self {
        Self {
            id: id.into(),
            client_capabilities: Map::new(),
            initialized: false,
            log_level,
            protocol_version: None,
        }
    }

    /// Generates a new random session id.
    #[must_use]
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the capabilities the client declared in `initialize`.
    #[must_use]
    pub const fn client_capabilities(&self) -> &Map<String, Value> {
        &self.client_capabilities
    }

    /// Returns `true` if the client declared `capability`.
    #[must_use]
    pub fn client_supports(&self, capability: &str) -> bool {
        self.client_capabilities.contains_key(capability)
    }

    /// Returns `true` once `notifications/initialized` was received.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        match (self.initialized, &self.protocol_version) {
            (true, _) => SessionState::Initialized,
            (false, Some(_)) => SessionState::Initializing,
            (false, None) => SessionState::Uninitialized,
        }
    }

    /// Returns the negotiated protocol version, if `initialize` completed.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Returns the minimum level of log notifications sent to this client.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Records a successful `initialize` exchange.
    pub fn begin_initialization(
        &mut self,
        protocol_version: String,
        client_capabilities: Map<String, Value>,
    ) {
        self.protocol_version = Some(protocol_version);
        self.client_capabilities = client_capabilities;
        self.initialized = false;
    }

    /// Marks the session initialised.
    ///
    /// Returns `false` if `initialize` has not happened yet.
    pub fn mark_initialized(&mut self) -> bool {
        if self.protocol_version.is_none() {
            return false;
        }
        self.initialized = true;
        true
    }

    /// Sets the minimum log level.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }
}

/// Key/value persistence for sessions.
///
/// Implementations decide eviction; the engine only requires that a value
/// written under a key can be read back until evicted.
pub trait SessionStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: Value);

    /// Removes the value stored under `key`.
    fn forget(&self, key: &str);
}

/// Process-local [`SessionStore`] backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn forget(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Loads and saves [`Session`] records through a [`SessionStore`].
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    default_log_level: LogLevel,
}

impl Sessions {
    /// Creates a session repository over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, default_log_level: LogLevel) -> Self {
        Self {
            store,
            default_log_level,
        }
    }

    fn key(id: &str) -> String {
        format!("mcp:session:{id}")
    }

    /// Returns the log level given to new sessions.
    #[must_use]
    pub const fn default_log_level(&self) -> LogLevel {
        self.default_log_level
    }

    /// Loads the session for `id`, or a fresh one if none is stored.
    #[must_use]
    pub fn load(&self, id: &str) -> Session {
        let Some(value) = self.store.get(&Self::key(id)) else {
            return Session::new(id, self.default_log_level);
        };

        match serde_json::from_value::<Session>(value) {
            Ok(session) if session.id == id => session,
            Ok(_) | Err(_) => {
                tracing::warn!(session_id = %id, "Discarding unreadable session record");
                Session::new(id, self.default_log_level)
            }
        }
    }

    /// Writes `session` back to the store.
    pub fn save(&self, session: &Session) {
        match serde_json::to_value(session) {
            Ok(value) => self.store.put(&Self::key(&session.id), value),
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "Failed to serialise session");
            }
        }
    }

    /// Removes the session for `id`.
    pub fn forget(&self, id: &str) {
        self.store.forget(&Self::key(id));
    }
}

impl std::fmt::Debug for Sessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sessions")
            .field("default_log_level", &self.default_log_level)
            .finish_non_exhaustive()
    }
}
