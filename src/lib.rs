#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # fukugyo
//!
//! Policy core for a side-income bookkeeping service: decides whether a year's side income
//! must be filed, derives withholding and progress figures, enforces plan quotas, and
//! throttles expensive or sensitive actions.
//!
//! ## Features
//!
//! - **Filing threshold engine** over integer yen, with exact withholding arithmetic
//! - **Fixed-window rate limiting** over an in-process map or a shared Redis
//! - **Plan quotas** and **threshold/deadline reminders**
//! - **Tower middleware** turning limiter rejections into typed errors
//!
//! ## Quick Start
//!
//! ```rust
//! use fukugyo::rate_limit::{Category, FixedWindowLimiter, InMemoryCounterStore, RateLimiter};
//! use fukugyo::tax::evaluate_filing_requirement;
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = FixedWindowLimiter::new(InMemoryCounterStore::new());
//!     let decision = limiter.try_acquire("user-42", Category::Ocr).await;
//!     assert_eq!(decision.remaining(), 9);
//!
//!     let filing = evaluate_filing_requirement(250_000, 30_000).unwrap();
//!     assert!(filing.required);
//! }
//! ```

pub mod clock;
pub mod error;
pub mod format;
pub mod notifications;
pub mod plans;
pub mod prelude;
pub mod rate_limit;
pub mod settings;
pub mod tax;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{ConfigError, PlanError, RateLimitedError, StoreError, TaxError};
pub use notifications::{generate_notifications, Notification, NotificationKind, Severity};
pub use plans::{Plan, Quota};
pub use rate_limit::{
    Category, Decision, FailurePolicy, FixedWindowLimiter, InMemoryCounterStore, Limit,
    RateLimitLayer, RateLimiter,
};
pub use settings::{build_limiter, Backend, LimiterSettings};
pub use tax::{
    compute_progress_percent, compute_withholding_tax, evaluate_filing_requirement,
    FilingDecision, FilingStatus, Yen, FILING_THRESHOLD,
};
