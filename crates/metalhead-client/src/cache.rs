//! Shared query cache with per-key in-flight tracking.
//!
//! Reads are cached under a [`QueryKey`]; mutations invalidate whole
//! [`QueryFamily`]s. An entry is served only while it is younger than the
//! cache's stale time (zero by default, so every read refetches and the
//! stored value is only a placeholder via [`QueryCache::peek`]).
//!
//! Every fetch registers a [`FetchTicket`] for its key. A read that finds a
//! fetch already in flight for the same key and generation follows it
//! through a [`FetchWaiter`] instead of starting another. A fetch started
//! after an invalidation cancels the older ticket, and a ticket whose family
//! was invalidated while it was in flight may not write its result, so a
//! slow response can never overwrite newer state.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use metalhead_shared::Principal;
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::Instant;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUserProfile,
    Profile(Principal),
    Feed,
    UserPosts(Principal),
    Friends(Principal),
    PendingRequests,
    BlockedUsers,
    IsBlocked(Principal),
    Reports,
    CallerRole,
    IsAdmin,
}

/// A key without its parameters; the unit of invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    CurrentUserProfile,
    Profile,
    Feed,
    UserPosts,
    Friends,
    PendingRequests,
    BlockedUsers,
    IsBlocked,
    Reports,
    CallerRole,
    IsAdmin,
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::CurrentUserProfile => QueryFamily::CurrentUserProfile,
            QueryKey::Profile(_) => QueryFamily::Profile,
            QueryKey::Feed => QueryFamily::Feed,
            QueryKey::UserPosts(_) => QueryFamily::UserPosts,
            QueryKey::Friends(_) => QueryFamily::Friends,
            QueryKey::PendingRequests => QueryFamily::PendingRequests,
            QueryKey::BlockedUsers => QueryFamily::BlockedUsers,
            QueryKey::IsBlocked(_) => QueryFamily::IsBlocked,
            QueryKey::Reports => QueryFamily::Reports,
            QueryKey::CallerRole => QueryFamily::CallerRole,
            QueryKey::IsAdmin => QueryFamily::IsAdmin,
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
    updated_at: Instant,
}

/// Type-erased outcome a fetch hands to the readers following it.
pub type Published = Arc<dyn Any + Send + Sync>;

struct InFlight {
    id: u64,
    generation: u64,
    cancel: Arc<Notify>,
    done: watch::Receiver<Option<Published>>,
}

impl InFlight {
    /// The ticket was dropped without being released.
    fn is_orphaned(&self) -> bool {
        self.done.has_changed().is_err()
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    inflight: HashMap<QueryKey, InFlight>,
    generations: HashMap<QueryFamily, u64>,
}

impl Inner {
    fn generation(&self, family: QueryFamily) -> u64 {
        self.generations.get(&family).copied().unwrap_or(0)
    }
}

/// Registration of one in-flight fetch.
pub struct FetchTicket {
    key: QueryKey,
    id: u64,
    generation: u64,
    cancel: Arc<Notify>,
    done: watch::Sender<Option<Published>>,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Resolves once a newer fetch, a cache clear or an explicit
    /// [`QueryCache::cancel`] supersedes this one.
    pub async fn cancelled(&self) {
        self.cancel.notified().await;
    }

    /// Hand the outcome to every reader following this fetch.
    pub fn publish<V>(&self, outcome: V)
    where
        V: Send + Sync + 'static,
    {
        let outcome: Published = Arc::new(outcome);
        self.done.send_replace(Some(outcome));
    }
}

/// A read waiting on someone else's fetch.
pub struct FetchWaiter {
    key: QueryKey,
    done: watch::Receiver<Option<Published>>,
}

impl FetchWaiter {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The published outcome, or `None` when the fetch went away without
    /// one (superseded, cancelled or dropped).
    pub async fn outcome(mut self) -> Option<Published> {
        loop {
            let current = self.done.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
            if self.done.changed().await.is_err() {
                return self.done.borrow().clone();
            }
        }
    }
}

/// How a read should obtain its value.
pub enum Fetch {
    /// Run the fetch under this ticket.
    Lead(FetchTicket),
    /// A fetch for the same data is already running.
    Follow(FetchWaiter),
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<QueryFamily>,
    next_id: Arc<AtomicU64>,
    stale_time: Duration,
}

impl QueryCache {
    /// Cache whose entries are stale as soon as they are written.
    pub fn new() -> Self {
        Self::with_stale_time(Duration::ZERO)
    }

    /// Cache that serves entries for `stale_time` after they are written.
    pub fn with_stale_time(stale_time: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            events,
            next_id: Arc::new(AtomicU64::new(1)),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh cached value for `key`, if any: not invalidated and younger
    /// than the stale time.
    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let inner = self.lock();
        let entry = inner
            .entries
            .get(key)
            .filter(|e| !e.stale && e.updated_at.elapsed() < self.stale_time)?;
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Newest value for `key` that no mutation has invalidated, however old.
    pub fn latest<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let inner = self.lock();
        let entry = inner.entries.get(key).filter(|e| !e.stale)?;
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Cached value for `key` even if stale, for showing while refetching.
    pub fn peek<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let inner = self.lock();
        inner.entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .map_or(true, |e| e.stale || e.updated_at.elapsed() >= self.stale_time)
    }

    /// When `key` was last written.
    pub fn updated_at(&self, key: &QueryKey) -> Option<Instant> {
        self.lock().entries.get(key).map(|e| e.updated_at)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().inflight.contains_key(key)
    }

    /// Register a fetch for `key`, cancelling any fetch already in flight.
    pub fn begin_fetch(&self, key: QueryKey) -> FetchTicket {
        let mut inner = self.lock();
        self.register(&mut inner, key)
    }

    /// Follow the fetch in flight for `key` when it started after the last
    /// invalidation of its family, otherwise register a new one.
    pub fn join_or_begin(&self, key: QueryKey) -> Fetch {
        let mut inner = self.lock();
        let generation = inner.generation(key.family());
        if let Some(current) = inner.inflight.get(&key) {
            if current.generation == generation && !current.is_orphaned() {
                return Fetch::Follow(FetchWaiter {
                    done: current.done.clone(),
                    key,
                });
            }
        }
        Fetch::Lead(self.register(&mut inner, key))
    }

    /// Follow whatever fetch is currently in flight for `key`.
    pub fn follow(&self, key: &QueryKey) -> Option<FetchWaiter> {
        let mut inner = self.lock();
        let current = inner.inflight.get(key)?;
        if current.is_orphaned() {
            inner.inflight.remove(key);
            return None;
        }
        Some(FetchWaiter {
            key: key.clone(),
            done: current.done.clone(),
        })
    }

    fn register(&self, inner: &mut Inner, key: QueryKey) -> FetchTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(Notify::new());
        let (done, watcher) = watch::channel(None);
        let generation = inner.generation(key.family());

        let previous = inner.inflight.insert(
            key.clone(),
            InFlight {
                id,
                generation,
                cancel: Arc::clone(&cancel),
                done: watcher,
            },
        );
        if let Some(previous) = previous {
            debug!(key = ?key, superseded = previous.id, by = id, "Superseding in-flight fetch");
            previous.cancel.notify_one();
        }

        FetchTicket {
            key,
            id,
            generation,
            cancel,
            done,
        }
    }

    /// Store the result of a fetch. Returns `false` (and stores nothing)
    /// when the ticket was superseded or its family invalidated meanwhile.
    pub fn complete<T>(&self, ticket: &FetchTicket, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        let mut inner = self.lock();
        if !Self::release(&mut inner, ticket) {
            return false;
        }
        if inner.generation(ticket.key.family()) != ticket.generation {
            debug!(key = ?ticket.key, "Discarding result fetched before invalidation");
            return false;
        }

        inner.entries.insert(
            ticket.key.clone(),
            Entry {
                value: Arc::new(value),
                stale: false,
                updated_at: Instant::now(),
            },
        );
        true
    }

    /// Release a ticket whose fetch failed.
    pub fn abandon(&self, ticket: &FetchTicket) {
        let mut inner = self.lock();
        Self::release(&mut inner, ticket);
    }

    fn release(inner: &mut Inner, ticket: &FetchTicket) -> bool {
        match inner.inflight.get(&ticket.key) {
            Some(current) if current.id == ticket.id => {
                inner.inflight.remove(&ticket.key);
                true
            }
            _ => false,
        }
    }

    /// Cancel the fetch in flight for `key`, e.g. when its view goes away.
    pub fn cancel(&self, key: &QueryKey) {
        if let Some(inflight) = self.lock().inflight.remove(key) {
            inflight.cancel.notify_one();
        }
    }

    /// Mark every entry of `family` stale and notify subscribers.
    pub fn invalidate(&self, family: QueryFamily) {
        {
            let mut inner = self.lock();
            *inner.generations.entry(family).or_insert(0) += 1;
            for (key, entry) in inner.entries.iter_mut() {
                if key.family() == family {
                    entry.stale = true;
                }
            }
        }
        debug!(family = ?family, "Invalidated query family");
        // Nobody listening is fine.
        let _ = self.events.send(family);
    }

    /// Drop every entry and cancel every fetch in flight.
    pub fn clear(&self) {
        let inflight: Vec<InFlight> = {
            let mut inner = self.lock();
            inner.entries.clear();
            inner.inflight.drain().map(|(_, f)| f).collect()
        };
        for fetch in inflight {
            fetch.cancel.notify_one();
        }
        debug!("Query cache cleared");
    }

    /// Invalidation events, one per invalidated family.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryFamily> {
        self.events.subscribe()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
