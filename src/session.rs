use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::connection::SessionContext;

/// Cookie carrying the browser session id.
pub const SESSION_COOKIE: &str = "session_id";

pub const DEFAULT_MAX_SESSIONS: usize = 256;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub type SharedContext<H> = Arc<AsyncMutex<SessionContext<H>>>;

/// A resolved browser session.
pub struct Session<H> {
    pub id: String,
    pub context: SharedContext<H>,
    /// The id was minted for this request and must be sent back as a cookie.
    pub is_new: bool,
}

struct Entry<H> {
    context: SharedContext<H>,
    last_used: Instant,
}

/// Connection state for every browser session, keyed by session id.
///
/// The async mutex around each context keeps a session's connection
/// exclusive to one request at a time. Sessions idle for longer than the
/// idle timeout are dropped, and at most `max_sessions` are kept, evicting
/// the least recently used first. Dropping a session closes its connection
/// once no request holds it.
pub struct SessionRegistry<H> {
    sessions: Mutex<HashMap<String, Entry<H>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl<H> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_IDLE_TIMEOUT)
    }
}

impl<H> SessionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::with_limits(config.max_sessions, config.idle_timeout())
    }

    /// Looks up a known session, or starts a new one under a fresh id.
    ///
    /// Unknown or expired ids are never adopted; the caller gets a newly
    /// minted one.
    pub fn resolve(&self, id: Option<&str>) -> Session<H> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(id) {
                if now.duration_since(entry.last_used) <= self.idle_timeout {
                    entry.last_used = now;
                    return Session {
                        id: id.to_string(),
                        context: Arc::clone(&entry.context),
                        is_new: false,
                    };
                }
            }
        }

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) <= self.idle_timeout);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(oldest) => sessions.remove(&oldest),
                None => break,
            };
        }
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "dropped idle sessions");
        }

        let id = Uuid::new_v4().to_string();
        let context = Arc::new(AsyncMutex::new(SessionContext::new()));
        sessions.insert(
            id.clone(),
            Entry {
                context: Arc::clone(&context),
                last_used: now,
            },
        );
        tracing::debug!(session = %id, "new session");
        Session {
            id,
            context,
            is_new: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
