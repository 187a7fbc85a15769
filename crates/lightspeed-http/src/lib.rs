//! # lightspeed-http
//!
//! Rate-limit-aware REST pipeline for the Lightspeed API.
//!
//! The central type is [`RestClient`]: it queues and paces outbound
//! calls against the server's per-route quota buckets, absorbs 429
//! responses by waiting out the server-provided retry-after, retries
//! transient failures with backoff, and maps terminal statuses onto the
//! closed error taxonomy in `lightspeed-core`.
//!
//! Modules:
//!
//! - [`routes`]: route templates and the normalized [`RouteKey`]
//! - [`buckets`]: the rate bucket table and pacing primitives
//! - [`client`]: the dispatcher itself
//! - [`data`]: outbound wire payload structs
//! - [`api`]: one typed method per remote route

#![deny(unsafe_code)]

pub mod api;
pub mod buckets;
pub mod client;
pub mod data;
pub mod routes;

pub use client::{HttpConfig, RateLimitPolicy, RestClient};
pub use routes::{Route, RouteKey};
