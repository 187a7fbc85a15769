//! # lightspeed
//!
//! Client library for the Lightspeed.tv API.
//!
//! [`Client`] is the entry point: `login` authenticates over REST,
//! `connect` opens the event stream, and one handler per [`EventKind`]
//! receives events in arrival order together with the merged cache
//! entry. All REST calls are paced against the server's rate buckets and
//! their payloads feed the shared entity cache before results are
//! returned, so cache readers and callers observe data in the same
//! order.
//!
//! The layering lives in the companion crates: `lightspeed-http` (the
//! rate-limited REST dispatcher), `lightspeed-gateway` (the session
//! state machine), `lightspeed-cache` (the entity cache) and
//! `lightspeed-core` (IDs, errors, retry policy).

#![deny(unsafe_code)]

pub mod client;
pub mod events;
pub mod models;

pub use client::{Client, ClientConfig, EventContext};
pub use events::EventKind;

pub use lightspeed_cache::{CacheEntry, EntityCache, EntityKind, Hydration};
pub use lightspeed_core::{Error, Field, Result, RetryConfig, ids};
pub use lightspeed_gateway::{ConnectionStatus, GatewayConfig, GatewayConnector, SessionEvent};
pub use lightspeed_http::{HttpConfig, RestClient, data};
