//! Error taxonomy for the Lightspeed client.
//!
//! A single closed enum with one variant per failure class, mirroring
//! the HTTP status families the API reports plus the session-level
//! faults from the gateway. Variants carry the original status and body
//! for diagnostics.
//!
//! Transient conditions (network blips, in-budget rate limits) are
//! absorbed inside the dispatcher and never surface here — they only add
//! latency.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the Lightspeed client.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure that survived the bounded retry loop.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the underlying failure.
        message: String,
    },

    /// The server asked us to wait longer than the configured
    /// `max_rate_limit_timeout` allows.
    ///
    /// Rate limits inside that budget are absorbed by the dispatcher and
    /// never produce this error.
    #[error("rate limited: retry in {:.2}s", retry_after.as_secs_f64())]
    RateLimited {
        /// Server-provided wait before the call may be retried.
        retry_after: Duration,
    },

    /// 404 — the requested entity does not exist.
    #[error("not found ({status}): {body}")]
    NotFound {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// 403 — the token lacks permission for this operation.
    #[error("forbidden ({status}): {body}")]
    Forbidden {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Any other non-retryable 4xx.
    #[error("bad request ({status}): {body}")]
    BadRequest {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// 5xx after retries were exhausted, or an unrecoverable server
    /// response.
    #[error("server fault ({status}): {body}")]
    ServerFault {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The gateway session could not be resumed and restarted cold.
    ///
    /// Delivered as a one-time out-of-band notification; cached state
    /// may have missed events and a full resynchronization is warranted.
    #[error("gateway session invalidated; full resync required")]
    SessionInvalidated,

    /// Credentials were rejected. Fatal: no reconnect is attempted and
    /// the client must be restarted with a new token.
    #[error("authentication failure: {message}")]
    AuthenticationFailure {
        /// Reason reported by the server.
        message: String,
    },

    /// A response body failed to decode.
    #[error("payload decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map a non-success HTTP status and body text to an error variant.
    ///
    /// Only terminal statuses belong here; 429 and retryable 5xx are
    /// handled by the dispatcher before this mapping applies.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => Self::AuthenticationFailure { message: body },
            403 => Self::Forbidden { status, body },
            404 => Self::NotFound { status, body },
            500.. => Self::ServerFault { status, body },
            _ => Self::BadRequest { status, body },
        }
    }

    /// Whether the dispatcher may retry the request that produced this
    /// error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::RateLimited { .. } | Self::ServerFault { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
