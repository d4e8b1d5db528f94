//! Error types for the tax engine, plans, limiter stores and middleware
use std::fmt;
use std::time::Duration;

/// Rejected input to the tax engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxError {
    /// A summed amount was below zero; sums of recorded amounts never are.
    #[error("{field} must be non-negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },
}

/// Unknown plan identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown plan '{0}'")]
    Unknown(String),
}

/// Failures talking to a counter store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store did not answer within the limiter's bound.
    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),
    /// The request never produced a response (connect, TLS, DNS...).
    #[error("counter store unreachable: {0}")]
    Transport(String),
    /// The store answered with something we could not interpret.
    #[error("unexpected counter store response: {0}")]
    Protocol(String),
    /// The store reported a command failure.
    #[error("counter store command failed: {0}")]
    Remote(String),
}

impl From<std::convert::Infallible> for StoreError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Invalid limiter settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid rate limit endpoint '{0}'")]
    InvalidEndpoint(String),
    /// Distributed settings were supplied but the crate was built without a client for them.
    #[error("distributed rate limiting requires the `redis-rest` feature")]
    BackendUnavailable,
}

/// Error returned by services wrapped in the rate-limit middleware.
#[derive(Debug, Clone)]
pub enum RateLimitedError<E> {
    /// The limiter rejected the request
    Rejected { retry_after: Duration },
    /// The underlying service failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for RateLimitedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { retry_after } => {
                write!(f, "too many requests; retry after {:?}", retry_after)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RateLimitedError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Rejected { .. } => None,
        }
    }
}

impl<E> RateLimitedError<E> {
    /// Check if this error is a limiter rejection
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
    /// Retry hint for a rejection, suitable for a `Retry-After` header.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Rejected { retry_after } => Some(*retry_after),
            Self::Inner(_) => None,
        }
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Rejected { .. } => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn rejected_display_mentions_retry_hint() {
        let err: RateLimitedError<io::Error> =
            RateLimitedError::Rejected { retry_after: Duration::from_secs(42) };
        let msg = format!("{}", err);
        assert!(msg.contains("too many requests"));
        assert!(msg.contains("42"));
        assert!(err.source().is_none());
    }

    #[test]
    fn inner_error_is_exposed_as_source() {
        let err = RateLimitedError::Inner(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(!err.is_rejected());
        assert!(err.retry_after().is_none());
        assert_eq!(err.source().map(|e| e.to_string()), Some("boom".to_string()));
        assert_eq!(err.into_inner().unwrap().to_string(), "boom");
    }

    #[test]
    fn tax_error_names_the_field() {
        let err = TaxError::NegativeAmount { field: "total_expense", value: -3 };
        assert_eq!(err.to_string(), "total_expense must be non-negative (got -3)");
    }

    #[test]
    fn store_timeout_display() {
        let msg = StoreError::Timeout(Duration::from_millis(1500)).to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("1.5"));
    }
}
