//! Registry of live tree sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::catalog::TreeCatalog;
use super::walker::{CompletionObserver, TreeWalker};
use crate::error::{TraversalError, TraversalResult};

/// Shared handle to one walker.
pub type SharedWalker = Arc<Mutex<TreeWalker>>;

const DEFAULT_MAX_SESSIONS: usize = 256;

struct SessionEntry {
    walker: SharedWalker,
    last_used: AtomicU64,
}

/// All live tree sessions, keyed by session id.
///
/// Each walker is locked individually so sessions never contend with each
/// other; the map lock is only held for insert, lookup and removal. Once
/// `max_sessions` are live, starting another evicts the least recently used.
pub struct TreeSessions {
    catalog: Arc<TreeCatalog>,
    observer: Arc<dyn CompletionObserver>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    clock: AtomicU64,
}

impl TreeSessions {
    /// Create an empty registry over a catalog.
    pub fn new(catalog: Arc<TreeCatalog>, observer: Arc<dyn CompletionObserver>) -> Self {
        Self {
            catalog,
            observer,
            sessions: RwLock::new(HashMap::new()),
            max_sessions: DEFAULT_MAX_SESSIONS,
            clock: AtomicU64::new(0),
        }
    }

    /// Limit the number of live sessions (at least one).
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Start a new session at the catalog root and return its id.
    pub async fn start(&self) -> (String, SharedWalker) {
        let id = Uuid::new_v4().to_string();
        let walker = TreeWalker::new(Arc::clone(&self.catalog)).with_observer(Arc::clone(&self.observer));
        let walker = Arc::new(Mutex::new(walker));

        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            warn!(
                session_id = %oldest,
                max_sessions = self.max_sessions,
                "Session limit reached, evicted least recently used tree session"
            );
        }
        sessions.insert(
            id.clone(),
            SessionEntry {
                walker: Arc::clone(&walker),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        drop(sessions);
        debug!(session_id = %id, "Tree session started");

        (id, walker)
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, session_id: &str) -> TraversalResult<SharedWalker> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| TraversalError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Ok(Arc::clone(&entry.walker))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Tree session ended");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
