//! In-memory session store.
//!
//! Maps an opaque token to an authenticated identity. A single mutex guards
//! the map so the one-session-per-user rule and the sliding `last_activity`
//! refresh can never interleave with invalidation or purging.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::session::clock::{Clock, SystemClock};
use crate::session::token::{fingerprint, generate_session_token};

/// Configuration for the session store
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Inactivity window after which a session is dead
    pub timeout: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::hours(24),
        }
    }
}

impl SessionStoreConfig {
    pub fn with_timeout_hours(hours: i64) -> Self {
        Self {
            timeout: Duration::hours(hours),
        }
    }
}

/// Who a live session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
}

/// Snapshot of a session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub user_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    identity: Identity,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl SessionRecord {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            user_id: self.identity.user_id,
            email: self.identity.email.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    config: SessionStoreConfig,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionStoreConfig, clock: Arc<dyn Clock>) -> Self {
        info!("Session store initialized (timeout: {}h)", config.timeout.num_hours());
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    // A panic while holding the guard cannot leave a record half-written,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        now - record.last_activity > self.config.timeout
    }

    /// Issue a new session for `user_id`, invalidating every other session
    /// that user holds.
    pub fn create_session(&self, user_id: i64, email: impl Into<String>) -> String {
        let now = self.clock.now();
        let mut sessions = self.lock();

        let replaced = Self::invalidate_user_sessions(&mut sessions, user_id);
        if replaced > 0 {
            info!("Invalidated {} previous session(s) for user {}", replaced, user_id);
        }

        let mut session_id = generate_session_token();
        while sessions.contains_key(&session_id) {
            session_id = generate_session_token();
        }

        sessions.insert(
            session_id.clone(),
            SessionRecord {
                identity: Identity {
                    user_id,
                    email: email.into(),
                },
                created_at: now,
                last_activity: now,
            },
        );

        info!("✅ Created session {} for user {}", fingerprint(&session_id), user_id);
        session_id
    }

    /// Resolve a token to its identity, refreshing `last_activity`.
    ///
    /// An expired session is removed on the spot.
    pub fn resolve_session(&self, session_id: &str) -> Result<Identity, AuthError> {
        self.touch(session_id).map(|record| record.identity)
    }

    /// Same semantics as [`SessionStore::resolve_session`], returning the whole record.
    pub fn session_info(&self, session_id: &str) -> Result<SessionInfo, AuthError> {
        self.touch(session_id).map(|record| record.info())
    }

    fn touch(&self, session_id: &str) -> Result<SessionRecord, AuthError> {
        let now = self.clock.now();
        let mut sessions = self.lock();

        let expired = match sessions.get(session_id) {
            None => return Err(AuthError::SessionNotFound),
            Some(record) => self.is_expired(record, now),
        };

        if expired {
            if let Some(record) = sessions.remove(session_id) {
                info!(
                    "⏰ Session {} for user {} expired",
                    fingerprint(session_id),
                    record.identity.user_id
                );
            }
            return Err(AuthError::SessionExpired);
        }

        match sessions.get_mut(session_id) {
            Some(record) => {
                record.last_activity = now;
                Ok(record.clone())
            }
            None => Err(AuthError::SessionNotFound),
        }
    }

    /// Explicit logout. Returns whether the session existed.
    pub fn invalidate_session(&self, session_id: &str) -> bool {
        match self.lock().remove(session_id) {
            Some(record) => {
                info!(
                    "Invalidated session {} for user {}",
                    fingerprint(session_id),
                    record.identity.user_id
                );
                true
            }
            None => false,
        }
    }

    fn invalidate_user_sessions(sessions: &mut HashMap<String, SessionRecord>, user_id: i64) -> usize {
        let before = sessions.len();
        sessions.retain(|session_id, record| {
            let keep = record.identity.user_id != user_id;
            if !keep {
                debug!("Dropping old session {} for user {}", fingerprint(session_id), user_id);
            }
            keep
        });
        before - sessions.len()
    }

    /// Remove every session idle for longer than the timeout. Returns how
    /// many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !self.is_expired(record, now));
        let purged = before - sessions.len();

        if purged > 0 {
            info!("🧹 Cleaned up {} expired session(s)", purged);
        }
        purged
    }

    pub fn active_session_count(&self) -> usize {
        self.lock().len()
    }
}
