//! Flash messages: one-shot notices shown on the page after a redirect.
//!
//! Keyed by the `contact_session` cookie and held in memory. Unread
//! flashes expire after a TTL; reading them consumes them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Flash severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Notice,
    Error,
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
    created_at: Instant,
}

/// Pending flashes for one session, grouped for the page template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlashBag {
    pub notice: Vec<String>,
    pub error: Vec<String>,
}

impl FlashBag {
    pub fn is_empty(&self) -> bool {
        self.notice.is_empty() && self.error.is_empty()
    }
}

/// In-memory flash storage.
pub struct FlashStore {
    sessions: RwLock<HashMap<Uuid, Vec<Flash>>>,
    ttl: Duration,
}

impl FlashStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    pub async fn notice(&self, session: Uuid, message: impl Into<String>) {
        self.push(session, FlashKind::Notice, message.into()).await;
    }

    pub async fn error(&self, session: Uuid, message: impl Into<String>) {
        self.push(session, FlashKind::Error, message.into()).await;
    }

    async fn push(&self, session: Uuid, kind: FlashKind, message: String) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session).or_default().push(Flash {
            kind,
            message,
            created_at: Instant::now(),
        });
    }

    /// Remove and return the live flashes for a session.
    pub async fn take(&self, session: Uuid) -> FlashBag {
        let flashes = self.sessions.write().await.remove(&session).unwrap_or_default();

        let mut bag = FlashBag::default();
        for flash in flashes.into_iter().filter(|f| f.created_at.elapsed() < self.ttl) {
            match flash.kind {
                FlashKind::Notice => bag.notice.push(flash.message),
                FlashKind::Error => bag.error.push(flash.message),
            }
        }
        bag
    }

    /// Drop flashes older than the TTL. Returns how many were removed.
    pub async fn expire_old(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut removed = 0;

        sessions.retain(|_, flashes| {
            let before = flashes.len();
            flashes.retain(|f| f.created_at.elapsed() < self.ttl);
            removed += before - flashes.len();
            !flashes.is_empty()
        });

        if removed > 0 {
            debug!(removed, "Expired stale flash messages");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn a background task that periodically expires old flashes.
pub fn spawn_expiry_task(store: Arc<FlashStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            store.expire_old().await;
        }
    })
}
