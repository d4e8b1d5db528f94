//! Convenient re-exports for request handlers.
pub use crate::{
    plans::{Plan, Quota},
    rate_limit::{Category, Decision, Limit, RateLimiter},
    settings::{build_limiter, LimiterSettings},
    tax::{
        compute_progress_percent, compute_withholding_tax, evaluate_filing_requirement,
        FilingDecision, FilingStatus, FILING_THRESHOLD,
    },
    RateLimitedError, TaxError,
};
