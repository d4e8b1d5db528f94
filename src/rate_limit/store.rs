use async_trait::async_trait;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Minimum spacing between purge sweeps of the in-memory store.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Counter state for one key: requests seen in the current window and when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    pub count: u32,
    pub reset_at_millis: u64,
}

impl WindowEntry {
    /// Open a window at `now_millis` with one request counted.
    pub fn first(now_millis: u64, window: Duration) -> Self {
        Self { count: 1, reset_at_millis: now_millis.saturating_add(duration_millis(window)) }
    }

    /// A window is over once its reset instant lies strictly in the past.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        self.reset_at_millis < now_millis
    }

    /// Time left until the window resets, as seen at `now_millis`.
    pub fn time_to_reset(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.reset_at_millis.saturating_sub(now_millis))
    }
}

pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Storage interface for fixed-window counters.
///
/// Stores hold no clock: every call carries the caller's `now_millis`, so one limiter clock
/// drives window boundaries for any backend.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the live entry for `key`, if any.
    async fn get(&self, key: &str, now_millis: u64) -> Result<Option<WindowEntry>, Self::Error>;

    /// Overwrite the entry for `key`.
    async fn set(&self, key: &str, entry: WindowEntry, now_millis: u64)
        -> Result<(), Self::Error>;

    /// Atomically count one request against `key`.
    ///
    /// If `key` has no entry, or its window has expired, a fresh window with `count = 1`
    /// ending at `now_millis + window` replaces it. Otherwise `count` is incremented.
    /// Returns the entry as it stands after the update.
    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now_millis: u64,
    ) -> Result<WindowEntry, Self::Error>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, WindowEntry>,
    last_purge_millis: Option<u64>,
}

/// Process-local store. Correct only for a single instance.
///
/// Every read-modify-write runs under one mutex. Expired entries are dropped by a full scan
/// that runs at most once per [`PURGE_INTERVAL`].
#[derive(Default, Clone, Debug)]
pub struct InMemoryCounterStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic mid-update leaves at worst one stale counter; keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry now, regardless of the sweep interval.
    pub fn purge_expired(&self, now_millis: u64) -> usize {
        let mut state = self.lock();
        state.last_purge_millis = Some(now_millis);
        purge(&mut state.entries, now_millis)
    }

    fn maybe_purge(state: &mut MemoryState, now_millis: u64) {
        match state.last_purge_millis {
            None => state.last_purge_millis = Some(now_millis),
            Some(last) if now_millis.saturating_sub(last) >= duration_millis(PURGE_INTERVAL) => {
                state.last_purge_millis = Some(now_millis);
                purge(&mut state.entries, now_millis);
            }
            Some(_) => {}
        }
    }
}

fn purge(entries: &mut HashMap<String, WindowEntry>, now_millis: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now_millis));
    let removed = before - entries.len();
    if removed > 0 {
        tracing::debug!(removed, remaining = entries.len(), "rate limit store purged");
    }
    removed
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    type Error = Infallible;

    async fn get(&self, key: &str, now_millis: u64) -> Result<Option<WindowEntry>, Self::Error> {
        let state = self.lock();
        Ok(state.entries.get(key).copied().filter(|e| !e.is_expired(now_millis)))
    }

    async fn set(
        &self,
        key: &str,
        entry: WindowEntry,
        _now_millis: u64,
    ) -> Result<(), Self::Error> {
        self.lock().entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now_millis: u64,
    ) -> Result<WindowEntry, Self::Error> {
        let mut state = self.lock();
        Self::maybe_purge(&mut state, now_millis);

        let entry = match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now_millis) => {
                entry.count = entry.count.saturating_add(1);
                *entry
            }
            _ => {
                let fresh = WindowEntry::first(now_millis, window);
                state.entries.insert(key.to_string(), fresh);
                fresh
            }
        };
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn increments_within_window_and_resets_after() {
        let store = InMemoryCounterStore::new();
        let e = store.increment("k", MINUTE, 1_000).await.unwrap();
        assert_eq!(e, WindowEntry { count: 1, reset_at_millis: 61_000 });
        let e = store.increment("k", MINUTE, 2_000).await.unwrap();
        assert_eq!(e.count, 2);
        // The reset instant itself still belongs to the window.
        let e = store.increment("k", MINUTE, 61_000).await.unwrap();
        assert_eq!(e.count, 3);
        let e = store.increment("k", MINUTE, 61_001).await.unwrap();
        assert_eq!(e, WindowEntry { count: 1, reset_at_millis: 121_001 });
    }

    #[tokio::test]
    async fn get_hides_expired_entries() {
        let store = InMemoryCounterStore::new();
        store.set("k", WindowEntry { count: 4, reset_at_millis: 10 }, 0).await.unwrap();
        assert_eq!(store.get("k", 10).await.unwrap().map(|e| e.count), Some(4));
        assert_eq!(store.get("k", 11).await.unwrap(), None);
        assert_eq!(store.get("missing", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sweep_runs_at_most_once_per_interval() {
        let store = InMemoryCounterStore::new();
        store.increment("a", Duration::from_millis(10), 0).await.unwrap();
        store.increment("b", Duration::from_millis(10), 0).await.unwrap();
        assert_eq!(store.len(), 2);

        // "a" and "b" are expired, but the interval since the first sweep check hasn't passed.
        store.increment("c", MINUTE, 59_999).await.unwrap();
        assert_eq!(store.len(), 3);

        store.increment("c", MINUTE, 60_000).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn explicit_purge_reports_removed_count() {
        let store = InMemoryCounterStore::new();
        store.increment("a", Duration::from_millis(10), 0).await.unwrap();
        store.increment("b", MINUTE, 0).await.unwrap();
        assert_eq!(store.purge_expired(11), 1);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryCounterStore::new();
        let other = store.clone();
        store.increment("k", MINUTE, 0).await.unwrap();
        assert_eq!(other.increment("k", MINUTE, 1).await.unwrap().count, 2);
    }

    #[test]
    fn time_to_reset_saturates() {
        let e = WindowEntry { count: 1, reset_at_millis: 100 };
        assert_eq!(e.time_to_reset(40), Duration::from_millis(60));
        assert_eq!(e.time_to_reset(500), Duration::ZERO);
    }
}
