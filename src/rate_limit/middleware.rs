use crate::error::RateLimitedError;
use crate::rate_limit::{Category, Decision, Limit, RateLimiter};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that throttles requests with a [`RateLimiter`].
///
/// `key_fn` maps each request to its identifier (typically the user id); the limiter's
/// rejection becomes [`RateLimitedError::Rejected`] so the caller can answer 429 with a
/// `Retry-After`.
pub struct RateLimitLayer<L: ?Sized, F> {
    limiter: Arc<L>,
    category: Category,
    limit: Option<Limit>,
    key_fn: Arc<F>,
}

impl<L: ?Sized, F> RateLimitLayer<L, F> {
    /// Create a new rate limit layer using the category's default limit.
    pub fn new(limiter: Arc<L>, category: Category, key_fn: F) -> Self {
        Self { limiter, category, limit: None, key_fn: Arc::new(key_fn) }
    }

    /// Use `limit` instead of the category default.
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl<L: ?Sized, F> Clone for RateLimitLayer<L, F> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            category: self.category,
            limit: self.limit,
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<L: ?Sized, F> fmt::Debug for RateLimitLayer<L, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitLayer")
            .field("category", &self.category)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<S, L: ?Sized, F> Layer<S> for RateLimitLayer<L, F> {
    type Service = RateLimitService<S, L, F>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            category: self.category,
            limit: self.limit.unwrap_or_else(|| self.category.default_limit()),
            key_fn: self.key_fn.clone(),
        }
    }
}

/// Middleware service that enforces rate limits.
pub struct RateLimitService<S, L: ?Sized, F> {
    inner: S,
    limiter: Arc<L>,
    category: Category,
    limit: Limit,
    key_fn: Arc<F>,
}

impl<S: Clone, L: ?Sized, F> Clone for RateLimitService<S, L, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            category: self.category,
            limit: self.limit,
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<S, L, F, Req> Service<Req> for RateLimitService<S, L, F>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    L: RateLimiter + ?Sized + 'static,
    F: Fn(&Req) -> String + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimitedError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimitedError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let identifier = (self.key_fn)(&req);
        let limiter = self.limiter.clone();
        let category = self.category;
        let limit = self.limit;
        // Keep the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match limiter.try_acquire_with(&identifier, category, limit).await {
                Decision::Admitted { .. } => inner.call(req).await.map_err(RateLimitedError::Inner),
                Decision::Rejected { retry_after } => {
                    Err(RateLimitedError::Rejected { retry_after })
                }
            }
        })
    }
}
