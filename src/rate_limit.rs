//! Rate limiting primitives.
//!
//! This module provides the building blocks for throttling rate-limited actions:
//! - [`RateLimiter`]: The core trait, returning a [`Decision`] for an identifier.
//! - [`FixedWindowLimiter`]: Fixed-window counting over any [`CounterStore`].
//! - [`RateLimitLayer`]: Tower middleware that enforces the limit.
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` wraps your service. It doesn't know *how* limiting works,
//!   only that it should ask a `RateLimiter`.
//! - **Logic**: `FixedWindowLimiter` (in `strategies`) compares counts against a [`Limit`] and
//!   applies the category's [`FailurePolicy`] when the store misbehaves.
//! - **Storage**: `CounterStore` (in `store`) holds per-key windows, either in process or in a
//!   shared Redis (`redis_rest`, behind the `redis-rest` feature).
//!
//! Windows are fixed, not sliding: a full burst at the end of one window may be followed by
//! another full burst at the start of the next.

use std::fmt;
use std::time::Duration;

pub mod middleware;
#[cfg(feature = "redis-rest")]
pub mod redis_rest;
pub mod store;
pub mod strategies;
pub use middleware::{RateLimitLayer, RateLimitService};
#[cfg(feature = "redis-rest")]
pub use redis_rest::RedisRestStore;
pub use store::{CounterStore, InMemoryCounterStore, WindowEntry};
pub use strategies::FixedWindowLimiter;

/// Upper bound on a single store round-trip before the failure policy applies.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Admitted {
        /// Requests left in the current window.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is rejected.
    Rejected {
        /// How long until the window resets.
        /// Useful for `Retry-After` headers.
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// Requests left in the window; always 0 for a rejection.
    pub fn remaining(&self) -> u32 {
        match self {
            Decision::Admitted { remaining } => *remaining,
            Decision::Rejected { .. } => 0,
        }
    }
}

/// At most `max_requests` admissions per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Limit {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    pub const fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// What a limiter answers when its store cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Admit the request.
    FailOpen,
    /// Reject the request for one window.
    FailClosed,
}

/// Kinds of rate-limited actions, each with its own default limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// AI receipt parsing.
    Ocr,
    /// Billing checkout session creation.
    Checkout,
    /// Account deletion.
    AccountDeletion,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Ocr, Category::Checkout, Category::AccountDeletion];

    pub const fn default_limit(&self) -> Limit {
        match self {
            Category::Ocr => Limit::new(10, Duration::from_secs(60)),
            Category::Checkout => Limit::new(5, Duration::from_secs(60)),
            Category::AccountDeletion => Limit::new(3, Duration::from_secs(3600)),
        }
    }

    /// Store key namespace; keys are `<prefix>:<identifier>`.
    pub const fn key_prefix(&self) -> &'static str {
        match self {
            Category::Ocr => "rl:ocr",
            Category::Checkout => "rl:checkout",
            Category::AccountDeletion => "rl:account",
        }
    }

    /// Answer used when the counter store is unreachable.
    ///
    /// Deletion is irreversible, so it stays throttled even without a store.
    pub const fn failure_policy(&self) -> FailurePolicy {
        match self {
            Category::Ocr | Category::Checkout => FailurePolicy::FailOpen,
            Category::AccountDeletion => FailurePolicy::FailClosed,
        }
    }

    pub fn store_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix(), identifier)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Ocr => "ocr",
            Category::Checkout => "checkout",
            Category::AccountDeletion => "account-deletion",
        })
    }
}

/// Core interface for rate limiting.
///
/// Rejection is an ordinary [`Decision`]; implementations never fail the caller.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `identifier` against an explicit limit.
    async fn try_acquire_with(&self, identifier: &str, category: Category, limit: Limit)
        -> Decision;

    /// Count one request for `identifier` against the category's default limit.
    async fn try_acquire(&self, identifier: &str, category: Category) -> Decision {
        self.try_acquire_with(identifier, category, category.default_limit()).await
    }
}
