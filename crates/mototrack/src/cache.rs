//! Per-key query cache with request coalescing.
//!
//! Each [`QueryKey`] owns one slot. A slot holds the last good value, the
//! fetch currently in flight (shared by every caller that asks while it
//! runs) and a generation counter. Invalidation bumps the generation and
//! detaches the in-flight fetch, so a fetch that finishes afterwards cannot
//! overwrite newer state.
//!
//! The slot map is behind a `parking_lot` mutex that is never held across an
//! await.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::motorcycle::MotorcycleId;

/// How long fetched data is served without asking the backend again.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Identifies one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// All motorcycles.
    MotorcycleList,
    /// One motorcycle.
    MotorcycleDetail(MotorcycleId),
    /// All branches.
    BranchList,
}

/// Loading and error state of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStatus {
    /// A value is cached, fresh or not.
    pub has_data: bool,
    /// A fetch is in flight.
    pub is_fetching: bool,
    /// The cached value is missing, invalidated or older than the stale time.
    pub is_stale: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
    /// When the cached value was fetched.
    pub updated_at: Option<DateTime<Utc>>,
}

type SharedFetch<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<Error>>>>;

struct Entry<T> {
    value: T,
    fetched_at: Instant,
    updated_at: DateTime<Utc>,
    invalidated: bool,
}

struct Slot<T> {
    entry: Option<Entry<T>>,
    in_flight: Option<SharedFetch<T>>,
    generation: u64,
    last_error: Option<String>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            entry: None,
            in_flight: None,
            generation: 0,
            last_error: None,
        }
    }
}

/// Cache of query results of type `T`.
pub struct QueryCache<T> {
    slots: Mutex<HashMap<QueryKey, Slot<T>>>,
    stale_time: Duration,
}

impl<T> std::fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_time", &self.stale_time)
            .field("slots", &self.slots.lock().len())
            .finish()
    }
}

impl<T> Default for QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries stay fresh for `stale_time`.
    #[must_use]
    pub fn new(stale_time: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    /// Configured staleness window.
    #[must_use]
    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    fn is_fresh(&self, entry: &Entry<T>) -> bool {
        !entry.invalidated && entry.fetched_at.elapsed() < self.stale_time
    }

    /// Return fresh data for `key`, fetching it if needed.
    ///
    /// `fetcher` is only called when no fresh value is cached and no fetch is
    /// already running. Concurrent callers share one fetch and see the same
    /// value or error.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. A failed fetch leaves any previous value in
    /// place.
    pub async fn get_or_fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (fetch, generation) = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key).or_default();

            if let Some(entry) = slot.entry.as_ref().filter(|e| self.is_fresh(e)) {
                trace!(?key, "cache hit");
                return Ok(entry.value.clone());
            }

            let fetch = if let Some(in_flight) = &slot.in_flight {
                debug!(?key, "joining in-flight fetch");
                in_flight.clone()
            } else {
                debug!(?key, "starting fetch");
                let future = fetcher();
                let shared = async move { future.await.map_err(Arc::new) }
                    .boxed()
                    .shared();
                slot.in_flight = Some(shared.clone());
                shared
            };
            (fetch, slot.generation)
        };

        let result = fetch.clone().await;
        self.complete(key, &fetch, generation, &result);
        // Release our handle so a sole caller gets the original error back.
        drop(fetch);
        result.map_err(Error::from_shared)
    }

    /// Store the outcome of `fetch` unless the slot moved on meanwhile.
    fn complete(
        &self,
        key: QueryKey,
        fetch: &SharedFetch<T>,
        generation: u64,
        result: &std::result::Result<T, Arc<Error>>,
    ) {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&key) else {
            return;
        };
        let current = slot.generation == generation
            && slot
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.ptr_eq(fetch));
        if !current {
            trace!(?key, "discarding result of a detached fetch");
            return;
        }

        slot.in_flight = None;
        match result {
            Ok(value) => {
                slot.entry = Some(Entry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                    updated_at: Utc::now(),
                    invalidated: false,
                });
                slot.last_error = None;
            }
            Err(err) => {
                slot.last_error = Some(err.to_string());
            }
        }
    }

    /// Mark `key` stale and detach any fetch in flight for it.
    pub fn invalidate(&self, key: QueryKey) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&key) {
            if let Some(entry) = slot.entry.as_mut() {
                entry.invalidated = true;
            }
            slot.in_flight = None;
            slot.generation += 1;
            debug!(?key, generation = slot.generation, "invalidated");
        }
    }

    /// Invalidate every key matching `predicate`.
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) {
        let keys: Vec<QueryKey> = self
            .slots
            .lock()
            .keys()
            .filter(|key| predicate(key))
            .copied()
            .collect();
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Invalidate `key` and fetch it again.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.invalidate(key);
        self.get_or_fetch(key, fetcher).await
    }

    /// Last known value for `key`, even if stale. Never fetches.
    #[must_use]
    pub fn peek(&self, key: QueryKey) -> Option<T> {
        self.slots
            .lock()
            .get(&key)
            .and_then(|slot| slot.entry.as_ref())
            .map(|entry| entry.value.clone())
    }

    /// Loading and error state for `key`.
    #[must_use]
    pub fn status(&self, key: QueryKey) -> QueryStatus {
        let slots = self.slots.lock();
        let Some(slot) = slots.get(&key) else {
            return QueryStatus {
                is_stale: true,
                ..QueryStatus::default()
            };
        };
        QueryStatus {
            has_data: slot.entry.is_some(),
            is_fetching: slot.in_flight.is_some(),
            is_stale: slot.entry.as_ref().map_or(true, |e| !self.is_fresh(e)),
            error: slot.last_error.clone(),
            updated_at: slot.entry.as_ref().map(|e| e.updated_at),
        }
    }

    /// Drop every entry and detach every fetch.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.values_mut() {
            slot.entry = None;
            slot.in_flight = None;
            slot.last_error = None;
            slot.generation += 1;
        }
    }
}
