//! Counter store over a Redis REST endpoint (Upstash-compatible).
//!
//! Each increment is one `MULTI/EXEC` transaction of `INCR`, `PEXPIRE .. NX` and `PTTL`, so
//! concurrent instances sharing the endpoint see a single counter per key. Windows expire
//! server-side; the caller's clock is only used to turn the remaining TTL into a reset
//! instant.

use crate::error::{ConfigError, StoreError};
use crate::rate_limit::store::{duration_millis, CounterStore, WindowEntry};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// One element of a transaction reply: either `{"result": ..}` or `{"error": ".."}`.
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct RedisRestStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for RedisRestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRestStore")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl RedisRestStore {
    /// Create a store for `endpoint` authenticated with a bearer `token`.
    ///
    /// # Errors
    /// Returns `Err` if the endpoint is not an `http(s)://` URL.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
            || endpoint.contains(char::is_whitespace)
        {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }
        Ok(Self { client: reqwest::Client::new(), endpoint, token: token.into() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn transaction(&self, commands: Value) -> Result<Vec<Reply>, StoreError> {
        let response = self
            .client
            .post(format!("{}/multi-exec", self.endpoint))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value =
            response.json().await.map_err(|e| StoreError::Protocol(e.to_string()))?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(StoreError::Remote(message));
        }
        parse_replies(body)
    }
}

fn parse_replies(body: Value) -> Result<Vec<Reply>, StoreError> {
    let replies: Vec<Reply> =
        serde_json::from_value(body).map_err(|e| StoreError::Protocol(e.to_string()))?;
    if let Some(message) = replies.iter().find_map(|r| r.error.clone()) {
        return Err(StoreError::Remote(message));
    }
    Ok(replies)
}

/// Redis integers arrive as JSON numbers; `GET` values arrive as strings.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn count_from(value: &Value) -> Result<u32, StoreError> {
    let n = as_integer(value)
        .ok_or_else(|| StoreError::Protocol(format!("expected a counter, got {}", value)))?;
    Ok(u32::try_from(n.max(0)).unwrap_or(u32::MAX))
}

/// Turn a `PTTL` reply into a reset instant. Negative TTLs (no expiry set, or key gone)
/// fall back to a full window.
fn reset_at(pttl: &Value, window: Duration, now_millis: u64) -> Result<u64, StoreError> {
    let ttl = as_integer(pttl)
        .ok_or_else(|| StoreError::Protocol(format!("expected a TTL, got {}", pttl)))?;
    let ttl_millis = u64::try_from(ttl).unwrap_or_else(|_| duration_millis(window));
    Ok(now_millis.saturating_add(ttl_millis))
}

fn window_from_increment(
    replies: &[Reply],
    window: Duration,
    now_millis: u64,
) -> Result<WindowEntry, StoreError> {
    match replies {
        [incr, _expire, pttl] => Ok(WindowEntry {
            count: count_from(&incr.result)?,
            reset_at_millis: reset_at(&pttl.result, window, now_millis)?,
        }),
        other => Err(StoreError::Protocol(format!("expected 3 replies, got {}", other.len()))),
    }
}

#[async_trait]
impl CounterStore for RedisRestStore {
    type Error = StoreError;

    async fn get(&self, key: &str, now_millis: u64) -> Result<Option<WindowEntry>, Self::Error> {
        let replies = self.transaction(json!([["GET", key], ["PTTL", key]])).await?;
        match replies.as_slice() {
            [value, _] if value.result.is_null() => Ok(None),
            [value, pttl] => Ok(Some(WindowEntry {
                count: count_from(&value.result)?,
                reset_at_millis: reset_at(&pttl.result, Duration::ZERO, now_millis)?,
            })),
            other => Err(StoreError::Protocol(format!("expected 2 replies, got {}", other.len()))),
        }
    }

    async fn set(
        &self,
        key: &str,
        entry: WindowEntry,
        now_millis: u64,
    ) -> Result<(), Self::Error> {
        let ttl = entry.reset_at_millis.saturating_sub(now_millis);
        let command = if ttl == 0 {
            json!([["DEL", key]])
        } else {
            json!([["SET", key, entry.count.to_string(), "PX", ttl.to_string()]])
        };
        self.transaction(command).await.map(|_| ())
    }

    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now_millis: u64,
    ) -> Result<WindowEntry, Self::Error> {
        // PEXPIRE takes at least 1 ms; NX leaves a running window's expiry alone.
        let window_ms = duration_millis(window).max(1).to_string();
        let replies = self
            .transaction(json!([["INCR", key], ["PEXPIRE", key, window_ms, "NX"], ["PTTL", key]]))
            .await?;
        window_from_increment(&replies, window, now_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(matches!(
            RedisRestStore::new("redis://localhost:6379", "t"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
        assert!(RedisRestStore::new("", "t").is_err());
    }

    #[test]
    fn trims_trailing_slash() {
        let store = RedisRestStore::new(" https://example.upstash.io/ ", "t").unwrap();
        assert_eq!(store.endpoint(), "https://example.upstash.io");
    }

    #[test]
    fn debug_redacts_token() {
        let store = RedisRestStore::new("https://example.upstash.io", "secret").unwrap();
        assert!(!format!("{:?}", store).contains("secret"));
    }

    #[test]
    fn parses_increment_transaction() {
        let replies =
            parse_replies(json!([{"result": 4}, {"result": 0}, {"result": 12_000}])).unwrap();
        let entry = window_from_increment(&replies, MINUTE, 1_000).unwrap();
        assert_eq!(entry, WindowEntry { count: 4, reset_at_millis: 13_000 });
    }

    #[test]
    fn missing_expiry_falls_back_to_full_window() {
        let replies = parse_replies(json!([{"result": 1}, {"result": 0}, {"result": -1}])).unwrap();
        let entry = window_from_increment(&replies, MINUTE, 0).unwrap();
        assert_eq!(entry.reset_at_millis, 60_000);
    }

    #[test]
    fn command_errors_surface_as_remote() {
        let err = parse_replies(json!([{"result": 1}, {"error": "ERR syntax"}])).unwrap_err();
        assert_eq!(err, StoreError::Remote("ERR syntax".into()));
    }

    #[test]
    fn malformed_replies_are_protocol_errors() {
        assert!(matches!(parse_replies(json!({"result": 1})), Err(StoreError::Protocol(_))));
        let replies = parse_replies(json!([{"result": 1}])).unwrap();
        assert!(matches!(
            window_from_increment(&replies, MINUTE, 0),
            Err(StoreError::Protocol(_))
        ));
        let replies =
            parse_replies(json!([{"result": "x"}, {"result": 1}, {"result": 5}])).unwrap();
        assert!(window_from_increment(&replies, MINUTE, 0).is_err());
    }

    #[test]
    fn string_counters_parse() {
        assert_eq!(count_from(&json!("7")).unwrap(), 7);
        assert_eq!(count_from(&json!(-3)).unwrap(), 0);
    }
}
