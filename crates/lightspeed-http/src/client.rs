//! The request dispatcher.
//!
//! [`RestClient::execute`] is the single funnel every remote call goes
//! through. The pipeline, in order:
//!
//! 1. Stall on the global pause gate (armed by a global-scope 429) and
//!    the aggregate sliding-window ceiling.
//! 2. Stall while the route's bucket is exhausted, until its reset time
//!    plus a small safety margin. Waiting locally is always preferable
//!    to being throttled by the server.
//! 3. Run the transport attempt loop in a spawned task. 429s are
//!    absorbed by sleeping out the server's retry-after (without
//!    consuming a retry attempt); network errors and 5xx retry with
//!    exponential backoff up to a bound; other 4xx map immediately onto
//!    the error taxonomy.
//!
//! Because the attempt loop runs in its own task, dropping the caller's
//! future after the gates clear only abandons the wait: the in-flight
//! request completes, its bucket update lands, and the result is
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use lightspeed_core::retry::{backoff_delay_with_random, parse_retry_after};
use lightspeed_core::{Error, Result, RetryConfig};

use crate::buckets::{BucketTable, GlobalLimiter, GlobalPause};
use crate::routes::Route;

/// Default API base.
pub const DEFAULT_BASE: &str = "https://api.lightspeed.tv";

/// Safety margin added on top of a bucket's reset time.
const RESET_SAFETY_MARGIN: Duration = Duration::from_millis(50);

/// What a rate-limit violation pauses.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitPolicy {
    /// When the server reports a global-scope 429, stall every dispatch
    /// (not just the violating call) until the retry-after elapses.
    pub pause_all_on_global: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            pause_all_on_global: true,
        }
    }
}

/// Configuration for the REST dispatcher.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Retry behavior for transient transport failures.
    pub retry: RetryConfig,
    /// Rate-limit violation scope policy.
    pub rate_limit: RateLimitPolicy,
    /// If set, a server retry-after longer than this surfaces
    /// [`Error::RateLimited`] instead of being waited out. Clamped to a
    /// minimum of 30 seconds.
    pub max_rate_limit_timeout: Option<Duration>,
    /// Aggregate ceiling: calls allowed per window.
    pub ceiling_max_calls: usize,
    /// Aggregate ceiling: window length.
    pub ceiling_interval: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE.to_owned(),
            user_agent: format!(
                "lightspeed-rs (https://github.com/lightspeedtv/lightspeed-rs {})",
                env!("CARGO_PKG_VERSION"),
            ),
            retry: RetryConfig::default(),
            rate_limit: RateLimitPolicy::default(),
            max_rate_limit_timeout: None,
            ceiling_max_calls: 50,
            ceiling_interval: Duration::from_secs(1),
        }
    }
}

/// Rate-limit metadata reported on a response.
#[derive(Clone, Debug)]
struct BucketMeta {
    limit: u32,
    remaining: u32,
    reset_after: Duration,
    bucket_id: String,
}

impl BucketMeta {
    fn parse(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| headers.get(name)?.to_str().ok();
        let bucket_id = header("x-ratelimit-bucket")?.to_owned();
        let remaining = header("x-ratelimit-remaining")?.parse().ok()?;
        let limit = header("x-ratelimit-limit")?.parse().ok()?;
        let reset_after =
            Duration::from_secs_f64(header("x-ratelimit-reset-after")?.parse().ok()?);
        Some(Self {
            limit,
            remaining,
            reset_after,
            bucket_id,
        })
    }
}

struct Inner {
    http: reqwest::Client,
    config: HttpConfig,
    token: parking_lot::RwLock<Option<String>>,
    buckets: BucketTable,
    limiter: GlobalLimiter,
    pause: GlobalPause,
}

/// REST client for the Lightspeed API.
///
/// Cheap to clone; all clones share buckets, the aggregate ceiling, and
/// the session token.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<Inner>,
}

impl RestClient {
    /// Build a client from configuration.
    pub fn new(mut config: HttpConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        config.max_rate_limit_timeout = config
            .max_rate_limit_timeout
            .map(|t| t.max(Duration::from_secs(30)));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let limiter = GlobalLimiter::new(config.ceiling_max_calls, config.ceiling_interval);
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                token: parking_lot::RwLock::new(None),
                buckets: BucketTable::new(),
                limiter,
                pause: GlobalPause::new(),
            }),
        })
    }

    /// Authenticate with a session token.
    ///
    /// Verifies the token by fetching the current user; on rejection the
    /// previous token (if any) is restored and
    /// [`Error::AuthenticationFailure`] is returned. On success, returns
    /// the raw user payload.
    pub async fn static_login(&self, token: &str) -> Result<Value> {
        let previous = self.inner.token.write().replace(token.trim().to_owned());

        match self.execute(Route::new(reqwest::Method::GET, "/users/@me"), None).await {
            Ok(user) => Ok(user),
            Err(err) => {
                *self.inner.token.write() = previous;
                Err(err)
            }
        }
    }

    /// Forget the session token.
    pub fn logout(&self) {
        *self.inner.token.write() = None;
    }

    /// Issue a call with no body.
    pub async fn request(&self, route: Route) -> Result<Value> {
        self.execute(route, None).await
    }

    /// Issue a call with a JSON body.
    pub async fn request_json(&self, route: Route, body: &impl Serialize) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.execute(route, Some(body)).await
    }

    /// The dispatch pipeline. See the module docs for the stages.
    pub async fn execute(&self, route: Route, body: Option<Value>) -> Result<Value> {
        let key = route.key();

        // Gates run in the caller's future: cancelling here has no side
        // effect because nothing has been sent yet.
        if self.inner.config.rate_limit.pause_all_on_global {
            self.inner.pause.wait().await;
        }
        self.inner.limiter.acquire().await;
        while let Some(delay) = self.inner.buckets.delay_for(&key) {
            tracing::debug!(
                route = %key,
                wait_ms = delay.as_millis() as u64,
                "bucket exhausted; waiting for reset",
            );
            tokio::time::sleep(delay + RESET_SAFETY_MARGIN).await;
        }

        // The attempt loop owns the call from here; the caller only
        // awaits the outcome.
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = oneshot::channel();
        drop(tokio::spawn(async move {
            let result = perform(&inner, route, body.as_ref()).await;
            let _ = tx.send(result);
        }));

        rx.await.unwrap_or_else(|_| {
            Err(Error::Transport {
                message: "dispatch task terminated unexpectedly".into(),
            })
        })
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.config.base_url)
            .finish_non_exhaustive()
    }
}

/// One call's attempt loop: transport, bucket updates, retries.
async fn perform(inner: &Inner, route: Route, body: Option<&Value>) -> Result<Value> {
    let key = route.key();
    let url = format!("{}{}", inner.config.base_url, route.path());
    let retry = &inner.config.retry;
    let mut attempt = 0u32;

    loop {
        if inner.config.rate_limit.pause_all_on_global {
            inner.pause.wait().await;
        }

        let mut request = inner.http.request(route.method().clone(), &url);
        if let Some(token) = inner.token.read().clone() {
            request = request.header("x-session-token", token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                if attempt >= retry.max_retries {
                    return Err(Error::Transport {
                        message: err.to_string(),
                    });
                }
                let delay = backoff_delay_with_random(attempt, retry, rand::random());
                tracing::warn!(
                    route = %key,
                    attempt,
                    wait_ms = delay.as_millis() as u64,
                    error = %err,
                    "transport failure; backing off",
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let status = response.status();
        if let Some(meta) = BucketMeta::parse(response.headers()) {
            inner.buckets.update(
                &key,
                meta.limit,
                meta.remaining,
                meta.reset_after,
                &meta.bucket_id,
            );
        }
        let header_retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                if attempt >= retry.max_retries {
                    return Err(Error::Transport {
                        message: err.to_string(),
                    });
                }
                let delay = backoff_delay_with_random(attempt, retry, rand::random());
                attempt += 1;
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        if status.is_success() {
            tracing::debug!(route = %key, status = status.as_u16(), "request succeeded");
            if text.is_empty() {
                return Ok(Value::Null);
            }
            // Some deployments return plain text behind a proxy even on
            // success; pass it through rather than failing the call.
            return Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let Ok(data) = serde_json::from_str::<Value>(&text) else {
                // Not the API speaking (proxy ban page); terminal.
                return Err(Error::from_status(status.as_u16(), text));
            };

            let retry_after = data
                .get("retry_after")
                .and_then(Value::as_u64)
                .map(Duration::from_millis)
                .or(header_retry_after)
                .unwrap_or(Duration::from_secs(1));
            let global = data.get("global").and_then(Value::as_bool).unwrap_or(false);

            if let Some(max) = inner.config.max_rate_limit_timeout {
                if retry_after > max {
                    tracing::warn!(
                        route = %key,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "rate limited beyond the configured timeout; surfacing",
                    );
                    return Err(Error::RateLimited { retry_after });
                }
            }

            if global && inner.config.rate_limit.pause_all_on_global {
                inner.pause.pause_for(retry_after);
            }
            tracing::warn!(
                route = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                global,
                "rate limited; waiting before retry",
            );
            // A 429 means we just need to wait; it never consumes a
            // retry attempt.
            tokio::time::sleep(retry_after).await;
            continue;
        }

        if status.is_server_error() {
            if attempt >= retry.max_retries {
                return Err(Error::from_status(status.as_u16(), text));
            }
            let delay = backoff_delay_with_random(attempt, retry, rand::random());
            tracing::warn!(
                route = %key,
                status = status.as_u16(),
                attempt,
                wait_ms = delay.as_millis() as u64,
                "server error; backing off",
            );
            attempt += 1;
            tokio::time::sleep(delay).await;
            continue;
        }

        return Err(Error::from_status(status.as_u16(), text));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE);
        assert!(config.rate_limit.pause_all_on_global);
        assert_eq!(config.ceiling_max_calls, 50);
        assert!(config.max_rate_limit_timeout.is_none());
    }

    #[test]
    fn new_strips_trailing_slash_and_clamps_timeout() {
        let client = RestClient::new(HttpConfig {
            base_url: "https://example.test/".into(),
            max_rate_limit_timeout: Some(Duration::from_secs(5)),
            ..HttpConfig::default()
        })
        .unwrap();
        assert_eq!(client.inner.config.base_url, "https://example.test");
        assert_eq!(
            client.inner.config.max_rate_limit_timeout,
            Some(Duration::from_secs(30)),
        );
    }

    #[test]
    fn bucket_meta_parses_complete_headers() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-limit", "10".parse().unwrap());
        let _ = headers.insert("x-ratelimit-remaining", "3".parse().unwrap());
        let _ = headers.insert("x-ratelimit-reset-after", "1.5".parse().unwrap());
        let _ = headers.insert("x-ratelimit-bucket", "abc".parse().unwrap());

        let meta = BucketMeta::parse(&headers).unwrap();
        assert_eq!(meta.limit, 10);
        assert_eq!(meta.remaining, 3);
        assert_eq!(meta.reset_after, Duration::from_millis(1500));
        assert_eq!(meta.bucket_id, "abc");
    }

    #[test]
    fn bucket_meta_requires_bucket_id() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-limit", "10".parse().unwrap());
        let _ = headers.insert("x-ratelimit-remaining", "3".parse().unwrap());
        let _ = headers.insert("x-ratelimit-reset-after", "1.5".parse().unwrap());
        assert!(BucketMeta::parse(&headers).is_none());
    }
}
