use crate::clock::{Clock, MonotonicClock};
use crate::error::StoreError;
use crate::rate_limit::store::{duration_millis, CounterStore, WindowEntry};
use crate::rate_limit::{
    Category, Decision, FailurePolicy, Limit, RateLimiter, DEFAULT_STORE_TIMEOUT,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A fixed-window rate limiter.
///
/// Each identifier gets a counter that starts at the first request and resets one window
/// later. Requests past `max_requests` are rejected and still counted, so hammering a
/// limited endpoint does not shorten the wait.
///
/// Clones share the same store and clock.
#[derive(Debug)]
pub struct FixedWindowLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    failure_policy: Option<FailurePolicy>,
}

impl<S> Clone for FixedWindowLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            store_timeout: self.store_timeout,
            failure_policy: self.failure_policy,
        }
    }
}

impl<S> FixedWindowLimiter<S>
where
    S: CounterStore + 'static,
    S::Error: Into<StoreError>,
{
    /// Create a limiter over `store` with a monotonic clock.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(MonotonicClock::default()),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            failure_policy: None,
        }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Bound each store round-trip. Panics if `timeout` is zero.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        assert!(timeout > Duration::ZERO, "store timeout must be non-zero");
        self.store_timeout = timeout;
        self
    }

    /// Apply one failure policy to every category instead of the per-category defaults.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Policy in force for `category`.
    pub fn failure_policy(&self, category: Category) -> FailurePolicy {
        self.failure_policy.unwrap_or_else(|| category.failure_policy())
    }

    /// Count one request and decide, surfacing store failures instead of applying the
    /// failure policy.
    pub async fn check(
        &self,
        identifier: &str,
        category: Category,
        limit: Limit,
    ) -> Result<Decision, StoreError> {
        let key = category.store_key(identifier);
        let now = self.clock.now_millis();

        let entry = match tokio::time::timeout(
            self.store_timeout,
            self.store.increment(&key, limit.window, now),
        )
        .await
        {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(StoreError::Timeout(self.store_timeout)),
        };

        Ok(Self::decide(&key, entry, limit, now))
    }

    fn decide(key: &str, entry: WindowEntry, limit: Limit, now: u64) -> Decision {
        if entry.count > limit.max_requests {
            let retry_after = entry.time_to_reset(now);
            tracing::debug!(
                key,
                count = entry.count,
                max = limit.max_requests,
                retry_after_ms = duration_millis(retry_after),
                "rate limit: rejected"
            );
            Decision::Rejected { retry_after }
        } else {
            let remaining = limit.max_requests - entry.count;
            tracing::debug!(key, count = entry.count, remaining, "rate limit: admitted");
            Decision::Admitted { remaining }
        }
    }

    fn fallback(&self, category: Category, limit: Limit) -> Decision {
        match self.failure_policy(category) {
            FailurePolicy::FailOpen => {
                Decision::Admitted { remaining: limit.max_requests.saturating_sub(1) }
            }
            FailurePolicy::FailClosed => Decision::Rejected { retry_after: limit.window },
        }
    }
}

#[async_trait]
impl<S> RateLimiter for FixedWindowLimiter<S>
where
    S: CounterStore + 'static,
    S::Error: Into<StoreError>,
{
    async fn try_acquire_with(
        &self,
        identifier: &str,
        category: Category,
        limit: Limit,
    ) -> Decision {
        match self.check(identifier, category, limit).await {
            Ok(decision) => decision,
            Err(error) => {
                let policy = self.failure_policy(category);
                tracing::warn!(
                    identifier,
                    %category,
                    ?policy,
                    %error,
                    "rate limit store unavailable; applying failure policy"
                );
                self.fallback(category, limit)
            }
        }
    }
}
