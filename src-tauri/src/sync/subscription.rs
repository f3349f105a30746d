use std::sync::Weak;

use tokio::sync::watch;

use super::cache::CacheEntry;
use super::store::Inner;
use crate::models::ResourceKey;

/// A consumer's live view of one key. Dropping it unsubscribes.
pub struct Subscription {
    key: ResourceKey,
    id: u64,
    receiver: watch::Receiver<CacheEntry>,
    inner: Weak<Inner>,
}

impl Subscription {
    pub(crate) fn new(
        key: ResourceKey,
        id: u64,
        receiver: watch::Receiver<CacheEntry>,
        inner: Weak<Inner>,
    ) -> Self {
        Self {
            key,
            id,
            receiver,
            inner,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current entry without waiting.
    pub fn current(&self) -> CacheEntry {
        self.receiver.borrow().clone()
    }

    /// Current entry, marked seen so the next `changed` waits for a newer one.
    pub fn observe(&mut self) -> CacheEntry {
        self.receiver.borrow_and_update().clone()
    }

    /// Waits for the next change. `None` once the synchronizer is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until the entry satisfies `predicate`, checking the current value first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&CacheEntry) -> bool) -> Option<CacheEntry> {
        let entry = self.receiver.wait_for(|entry| predicate(entry)).await.ok()?;
        Some(entry.clone())
    }

    /// Stops scheduled fetches for this consumer. Requests already on the wire
    /// finish; if this was the last subscriber, only on-demand responses are
    /// still written to the entry.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.release(&self.key, self.id);
            log::info!("sync: subscriber #{} detached from {}", self.id, self.key);
        }
    }
}
