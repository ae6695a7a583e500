use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use tracing::{debug, trace};

use crate::dedup::sweeper::SweeperHandle;
use crate::dedup::types::CacheConfig;
use crate::error::Error;
use crate::request::RequestId;
use crate::time::{SystemTimeProvider, TimeProvider};

/// Slack on moka's own wall-clock expiry so it never evicts an entry the lazy
/// check still considers live.
const EVICTION_GRACE: Duration = Duration::from_secs(1);

struct Store<T> {
    /// request id -> insertion time in unix millis
    entries: Cache<RequestId, u64>,
    ttl: Duration,
    ttl_millis: u64,
    clock: Arc<T>,
}

impl<T: TimeProvider> Store<T> {
    fn is_live(&self, inserted_at: u64, now: u64) -> bool {
        now.saturating_sub(inserted_at) < self.ttl_millis
    }

    /// Remove `id` only if it is still expired at `now`; a concurrent refresh wins.
    fn remove_if_stale(&self, id: RequestId, now: u64) -> bool {
        let result = self.entries.entry(id).and_compute_with(|current| match current {
            Some(entry) if !self.is_live(*entry.value(), now) => Op::Remove,
            _ => Op::Nop,
        });
        matches!(result, CompResult::Removed(_))
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let stale: Vec<Arc<RequestId>> = self
            .entries
            .iter()
            .filter(|(_, inserted_at)| !self.is_live(*inserted_at, now))
            .map(|(id, _)| id)
            .collect();
        let purged = stale
            .into_iter()
            .filter(|id| self.remove_if_stale(RequestId::clone(id), now))
            .count();
        self.entries.run_pending_tasks();
        purged
    }
}

/// Time-windowed deduplication of level-update requests.
///
/// An entry is live for `ttl` after its last [`add`](Self::add); after that it reads
/// as absent whether or not it has been physically purged yet. Expired entries are
/// dropped lazily on read and, when configured, by a background sweeper.
///
/// Clones share the same store.
pub struct ExpiringRequestCache<T: TimeProvider = SystemTimeProvider> {
    store: Arc<Store<T>>,
    sweeper: Option<Arc<SweeperHandle>>,
}

impl ExpiringRequestCache<SystemTimeProvider> {
    pub fn new(config: CacheConfig) -> Result<Self, Error> {
        config.validate()?;
        let entries = Cache::builder()
            .time_to_live(config.ttl.saturating_add(EVICTION_GRACE))
            .build();
        Self::assemble(config, entries, Arc::new(SystemTimeProvider))
    }
}

impl<T> ExpiringRequestCache<T>
where
    T: TimeProvider + 'static,
{
    /// Build a cache whose expiry is driven entirely by `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<T>) -> Result<Self, Error> {
        config.validate()?;
        Self::assemble(config, Cache::builder().build(), clock)
    }

    fn assemble(
        config: CacheConfig,
        entries: Cache<RequestId, u64>,
        clock: Arc<T>,
    ) -> Result<Self, Error> {
        let ttl_millis = u64::try_from(config.ttl.as_millis())
            .map_err(|_| Error::InvalidConfig("ttl does not fit in milliseconds".into()))?;
        let store = Arc::new(Store {
            entries,
            ttl: config.ttl,
            ttl_millis,
            clock,
        });
        let sweeper = match config.sweep_interval {
            Some(interval) => {
                let swept = store.clone();
                let handle = SweeperHandle::spawn(interval, move || swept.purge_expired())?;
                Some(Arc::new(handle))
            }
            None => None,
        };
        debug!(ttl = ?config.ttl, sweeping = sweeper.is_some(), "request cache ready");
        Ok(Self { store, sweeper })
    }

    /// Insert `id`, or restart its window if already present.
    pub fn add(&self, id: &RequestId) {
        let now = self.store.clock.now_millis();
        self.store.entries.insert(id.clone(), now);
        trace!(request = %id, at = now, "request recorded");
    }

    /// Whether `id` was added less than `ttl` ago.
    pub fn contains(&self, id: &RequestId) -> bool {
        let Some(inserted_at) = self.store.entries.get(id) else {
            return false;
        };
        let now = self.store.clock.now_millis();
        if self.store.is_live(inserted_at, now) {
            return true;
        }
        if self.store.remove_if_stale(id.clone(), now) {
            trace!(request = %id, "expired request dropped on read");
        }
        false
    }

    /// Atomically admit `id` if it is absent or expired.
    ///
    /// Returns `true` when the caller now owns the request. A live entry is left
    /// untouched, so a losing caller does not extend the window.
    pub fn try_claim(&self, id: &RequestId) -> bool {
        let now = self.store.clock.now_millis();
        let result = self
            .store
            .entries
            .entry(id.clone())
            .and_compute_with(|current| match current {
                Some(entry) if self.store.is_live(*entry.value(), now) => Op::Nop,
                _ => Op::Put(now),
            });
        matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        )
    }

    /// Forget `id`. Returns whether a live entry was removed.
    pub fn remove(&self, id: &RequestId) -> bool {
        let now = self.store.clock.now_millis();
        self.store
            .entries
            .remove(id)
            .is_some_and(|inserted_at| self.store.is_live(inserted_at, now))
    }

    /// Physically drop every expired entry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Physically stored entries, live or not yet purged.
    pub fn entry_count(&self) -> u64 {
        self.store.entries.run_pending_tasks();
        self.store.entries.entry_count()
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|s| s.is_running())
    }
}

impl<T: TimeProvider> Clone for ExpiringRequestCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sweeper: self.sweeper.clone(),
        }
    }
}

impl<T: TimeProvider> fmt::Debug for ExpiringRequestCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringRequestCache")
            .field("ttl", &self.store.ttl)
            .field("sweeping", &self.sweeper.is_some())
            .finish()
    }
}
