//! Limiter settings read from the environment.
//!
//! `UPSTASH_REDIS_REST_URL` and `UPSTASH_REDIS_REST_TOKEN` together select the shared Redis
//! backend; without both, limits are counted in process.

use crate::error::ConfigError;
use crate::rate_limit::{
    FixedWindowLimiter, InMemoryCounterStore, RateLimiter, DEFAULT_STORE_TIMEOUT,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Environment prefix for the distributed backend's connection parameters.
pub const ENV_PREFIX: &str = "UPSTASH_REDIS_REST";

#[derive(Debug, Deserialize, Default)]
struct RedisRestEnv {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Where counters live.
#[derive(Clone, PartialEq, Eq)]
pub enum Backend {
    /// Single-instance map in this process.
    InMemory,
    /// Shared Redis reached over its REST API.
    RedisRest { url: String, token: String },
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::InMemory => f.write_str("InMemory"),
            Backend::RedisRest { url, .. } => f
                .debug_struct("RedisRest")
                .field("url", url)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterSettings {
    pub backend: Backend,
    pub store_timeout: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self { backend: Backend::InMemory, store_timeout: DEFAULT_STORE_TIMEOUT }
    }
}

impl LimiterSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Read settings from an explicit variable map, keyed like the environment
    /// (`UPSTASH_REDIS_REST_URL`, ...).
    pub fn from_source(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(env: config::Environment) -> Result<Self, ConfigError> {
        let raw: RedisRestEnv =
            config::Config::builder().add_source(env).build()?.try_deserialize()?;

        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let backend = match (non_empty(raw.url), non_empty(raw.token)) {
            (Some(url), Some(token)) => Backend::RedisRest { url, token },
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    prefix = ENV_PREFIX,
                    "only one of URL/TOKEN is set; counting rate limits in process"
                );
                Backend::InMemory
            }
            (None, None) => Backend::InMemory,
        };

        Ok(Self { backend, ..Self::default() })
    }

    pub fn is_distributed(&self) -> bool {
        matches!(self.backend, Backend::RedisRest { .. })
    }
}

/// Build the limiter selected by `settings`.
///
/// # Errors
/// Fails if the Redis endpoint is malformed, or if it is configured but the crate was built
/// without the `redis-rest` feature.
pub fn build_limiter(settings: &LimiterSettings) -> Result<Arc<dyn RateLimiter>, ConfigError> {
    match &settings.backend {
        Backend::InMemory => Ok(Arc::new(
            FixedWindowLimiter::new(InMemoryCounterStore::new())
                .with_store_timeout(settings.store_timeout),
        )),
        #[cfg(feature = "redis-rest")]
        Backend::RedisRest { url, token } => {
            let store = crate::rate_limit::RedisRestStore::new(url.as_str(), token.as_str())?;
            tracing::info!(endpoint = store.endpoint(), "rate limiting via shared Redis");
            Ok(Arc::new(FixedWindowLimiter::new(store).with_store_timeout(settings.store_timeout)))
        }
        #[cfg(not(feature = "redis-rest"))]
        Backend::RedisRest { .. } => Err(ConfigError::BackendUnavailable),
    }
}
