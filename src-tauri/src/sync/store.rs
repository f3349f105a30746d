use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::cache::{CacheEntry, Sequencer, Ticket};
use super::subscription::Subscription;
use crate::client::ResourceClient;
use crate::error::FetchError;
use crate::models::{Resource, ResourceKey};

/// Resolves once an issued request has settled (applied or discarded).
pub type Settled = Shared<BoxFuture<'static, ()>>;

/// What a consumer wants kept fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeConfig {
    pub key: ResourceKey,
    /// `None` or zero: fetch on subscribe only. Otherwise revalidate this often.
    pub interval: Option<Duration>,
}

impl SubscribeConfig {
    pub fn once(key: ResourceKey) -> Self {
        Self { key, interval: None }
    }

    pub fn polling(key: ResourceKey, interval: Duration) -> Self {
        Self {
            key,
            interval: Some(interval),
        }
    }

    /// Console defaults: deployments change server-side on their own and are
    /// polled; applications and their status are fetched once per mount.
    pub fn for_view(key: ResourceKey, deployment_poll: Duration) -> Self {
        match key {
            ResourceKey::Deployment(_) => Self::polling(key, deployment_poll),
            _ => Self::once(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Join the request already in flight, if any.
    Join,
    /// Always issue a new request; it queues behind the one in flight.
    Fresh,
    /// Poller tick: joins like `Join`, but a new request is scoped to the
    /// current subscription run.
    Scheduled,
}

// ── per-key state ─────────────────────────────────────────────────────────────

struct Pending {
    ticket: Ticket,
    done: Settled,
}

struct Slot {
    entry: watch::Sender<CacheEntry>,
    sequencer: Sequencer,
    pending: Option<Pending>,
    /// Live subscribers and the interval each asked for.
    subscribers: HashMap<u64, Option<Duration>>,
    poll_interval: Option<Duration>,
    poller: Option<JoinHandle<()>>,
    /// Most recently issued request. The next one waits for it, so a key
    /// never has two on the wire and requests go out in issue order.
    tail: Option<Settled>,
}

impl Slot {
    fn new() -> Self {
        let (entry, _) = watch::channel(CacheEntry::default());
        Self {
            entry,
            sequencer: Sequencer::default(),
            pending: None,
            subscribers: HashMap::new(),
            poll_interval: None,
            poller: None,
            tail: None,
        }
    }

    fn shortest_interval(&self) -> Option<Duration> {
        self.subscribers.values().flatten().min().copied()
    }

    fn poller_alive(&self) -> bool {
        self.poller.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub(crate) struct Inner {
    client: ResourceClient,
    slots: Mutex<HashMap<ResourceKey, Slot>>,
    next_subscriber: AtomicU64,
}

impl Inner {
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<ResourceKey, Slot>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn request(self: &Arc<Self>, key: &ResourceKey, mode: Mode) -> Settled {
        let mut slots = self.lock_slots();
        let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
        self.issue(slot, key, mode)
    }

    fn issue(self: &Arc<Self>, slot: &mut Slot, key: &ResourceKey, mode: Mode) -> Settled {
        if mode != Mode::Fresh {
            let joinable = slot.pending.as_ref().filter(|p| {
                p.done.peek().is_none() && slot.sequencer.in_scope(p.ticket)
            });
            if let Some(pending) = joinable {
                log::debug!("sync: {key} joined in-flight request #{}", pending.ticket.seq);
                return pending.done.clone();
            }
        }

        let ticket = match mode {
            Mode::Scheduled => slot.sequencer.issue_scheduled(),
            Mode::Join | Mode::Fresh => slot.sequencer.issue(),
        };
        slot.entry.send_modify(CacheEntry::begin_fetch);
        log::debug!("sync: {key} issued request #{}", ticket.seq);

        let previous = slot.tail.take();
        let this = Arc::clone(self);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            let result = this.client.fetch_resource(&task_key).await;
            this.apply(&task_key, ticket, result);
        });

        let done: Settled = async move {
            let _ = task.await;
        }
        .boxed()
        .shared();

        slot.tail = Some(done.clone());
        slot.pending = Some(Pending {
            ticket,
            done: done.clone(),
        });
        done
    }

    fn apply(&self, key: &ResourceKey, ticket: Ticket, result: Result<Resource, FetchError>) {
        let mut slots = self.lock_slots();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };

        if slot.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
            slot.pending = None;
        }

        if !slot.sequencer.accept(ticket) {
            log::debug!("sync: {key} dropped superseded response #{}", ticket.seq);
            if slot.sequencer.is_latest(ticket) {
                slot.entry.send_modify(CacheEntry::abandon);
            }
            return;
        }

        let latest = slot.sequencer.is_latest(ticket);
        if let Err(err) = &result {
            log::warn!("sync: {key} revalidation failed: {err}");
        }
        let now = Utc::now();
        slot.entry.send_modify(|entry| entry.settle(result, now, latest));
    }

    /// Starts, restarts or stops the key's poller to match its subscribers.
    fn reschedule(self: &Arc<Self>, slot: &mut Slot, key: &ResourceKey) {
        let wanted = slot.shortest_interval();
        if wanted == slot.poll_interval && (wanted.is_none() || slot.poller_alive()) {
            return;
        }

        if let Some(handle) = slot.poller.take() {
            handle.abort();
        }
        slot.poll_interval = wanted;

        if let Some(every) = wanted {
            log::info!("sync: {key} polling every {every:?}");
            let generation = slot.sequencer.generation();
            slot.poller = Some(tokio::spawn(poll_loop(
                Arc::downgrade(self),
                key.clone(),
                every,
                generation,
            )));
        }
    }

    /// Issues the next scheduled fetch, unless the subscription run it belongs
    /// to has ended.
    fn scheduled_request(self: &Arc<Self>, key: &ResourceKey, generation: u64) -> Option<Settled> {
        let mut slots = self.lock_slots();
        let slot = slots.get_mut(key)?;
        if slot.subscribers.is_empty() || slot.sequencer.generation() != generation {
            return None;
        }
        Some(self.issue(slot, key, Mode::Scheduled))
    }

    pub(crate) fn release(self: &Arc<Self>, key: &ResourceKey, subscriber: u64) {
        let mut slots = self.lock_slots();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if slot.subscribers.remove(&subscriber).is_none() {
            return;
        }

        if slot.subscribers.is_empty() {
            if let Some(handle) = slot.poller.take() {
                handle.abort();
            }
            slot.poll_interval = None;
            slot.sequencer.retire();
            log::info!("sync: {key} has no subscribers left");
        } else {
            self.reschedule(slot, key);
        }
    }
}

async fn poll_loop(inner: Weak<Inner>, key: ResourceKey, every: Duration, generation: u64) {
    loop {
        tokio::time::sleep(every).await;

        let done = {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            match inner.scheduled_request(&key, generation) {
                Some(done) => done,
                None => return,
            }
        };
        // Wait for the response before sleeping again so polls never overlap.
        done.await;
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Session cache of remote records with scheduled and on-demand revalidation.
///
/// Must be used from within a Tokio runtime: requests and pollers run as
/// spawned tasks.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                slots: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a consumer for `config.key`, revalidates it, and starts the
    /// shared poller when an interval is requested.
    pub fn subscribe(&self, config: SubscribeConfig) -> Subscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let interval = config.interval.filter(|d| !d.is_zero());

        let receiver = {
            let mut slots = self.inner.lock_slots();
            let slot = slots.entry(config.key.clone()).or_insert_with(Slot::new);
            slot.subscribers.insert(id, interval);
            let receiver = slot.entry.subscribe();

            let _ = self.inner.issue(slot, &config.key, Mode::Join);
            self.inner.reschedule(slot, &config.key);
            receiver
        };

        log::info!("sync: subscriber #{id} attached to {}", config.key);
        Subscription::new(config.key, id, receiver, Arc::downgrade(&self.inner))
    }

    /// Fetches `key` now, joining any request already in flight for it.
    pub async fn revalidate(&self, key: &ResourceKey) {
        let done = self.inner.request(key, Mode::Join);
        done.await;
    }

    /// Marks `key` stale after a mutation and issues a fresh request for it,
    /// queued behind any request already in flight. Keys never fetched in
    /// this session are skipped and yield `None`.
    pub fn invalidate(&self, key: &ResourceKey) -> Option<Settled> {
        let mut slots = self.inner.lock_slots();
        let slot = slots.get_mut(key)?;
        log::info!("sync: {key} invalidated");
        Some(self.inner.issue(slot, key, Mode::Fresh))
    }

    /// Snapshot of the cached entry for `key`, if it was ever requested.
    pub fn entry(&self, key: &ResourceKey) -> Option<CacheEntry> {
        let slots = self.inner.lock_slots();
        slots.get(key).map(|slot| slot.entry.borrow().clone())
    }

    /// Whether a poller is currently scheduled for `key`.
    pub fn is_polling(&self, key: &ResourceKey) -> bool {
        let slots = self.inner.lock_slots();
        slots.get(key).is_some_and(Slot::poller_alive)
    }

    pub fn subscriber_count(&self, key: &ResourceKey) -> usize {
        let slots = self.inner.lock_slots();
        slots.get(key).map_or(0, |slot| slot.subscribers.len())
    }
}
