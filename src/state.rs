use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::types::PendingRequest;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct Entry {
    request: PendingRequest,
    created_at: DateTime<Utc>,
}

/// Pending authorizations keyed by their one-time state token.
///
/// Entries are consumed by the first callback that presents the token and
/// are treated as absent once older than the configured TTL.
#[derive(Clone)]
pub struct StateStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    pub async fn put(&self, token: impl Into<String>, request: PendingRequest) {
        let entry = Entry {
            request,
            created_at: self.clock.now(),
        };
        self.entries.lock().await.insert(token.into(), entry);
    }

    pub async fn take_and_invalidate(&self, token: &str) -> Option<PendingRequest> {
        let entry = self.entries.lock().await.remove(token)?;

        if self.is_expired(&entry) {
            log::info!("Discarding expired state for {}", entry.request.feed);
            return None;
        }

        Some(entry.request)
    }

    /// Drops every entry older than the TTL, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = self.clock.now();
        entries.retain(|_, entry| now - entry.created_at < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.clock.now() - entry.created_at >= self.ttl
    }
}

pub fn spawn_sweeper(
    store: StateStore,
    every: tokio::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                log::info!("Purged {} abandoned authorization(s)", purged);
            }
        }
    })
}
