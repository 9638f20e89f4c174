use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::ProvisionError;
use crate::types::SubscriptionRecord;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create(&self, record: &SubscriptionRecord) -> anyhow::Result<()>;
}

/// Stores subscriptions on a detached task. Callers get a handle they may
/// await, but no error ever comes back through it.
#[derive(Clone)]
pub struct SubscriptionRegistrar {
    store: Arc<dyn SubscriptionStore>,
    failures: Arc<AtomicU64>,
}

impl SubscriptionRegistrar {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            store,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn dispatch(&self, record: SubscriptionRecord) -> JoinHandle<()> {
        let store = self.store.clone();
        let failures = self.failures.clone();

        tokio::spawn(async move {
            match store.create(&record).await {
                Ok(()) => log::info!(
                    "Stored subscription for {} in channel {} (guild {})",
                    record.feed,
                    record.channel_id,
                    record.guild_id
                ),
                Err(err) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    log::error!(
                        "{} (feed {}, channel {})",
                        ProvisionError::PersistFailed(err),
                        record.feed,
                        record.channel_id
                    );
                }
            }
        })
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
