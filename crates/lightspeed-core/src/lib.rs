//! # lightspeed-core
//!
//! Foundation types for the Lightspeed client library.
//!
//! This crate provides the shared vocabulary the other crates depend on:
//!
//! - **Branded IDs**: `UserId`, `StreamId`, `MessageId` and friends as
//!   newtypes for type safety
//! - **Errors**: the closed [`Error`] taxonomy covering transport,
//!   rate-limit, HTTP status and session failures
//! - **Retry**: [`RetryConfig`] plus exponential backoff and
//!   `Retry-After` parsing
//! - **Fields**: [`Field`], the absent / null / value wrapper used in
//!   PATCH request bodies

#![deny(unsafe_code)]

pub mod errors;
pub mod field;
pub mod ids;
pub mod retry;

pub use errors::Error;
pub use field::Field;
pub use retry::RetryConfig;

/// Result type alias used across the Lightspeed crates.
pub type Result<T> = std::result::Result<T, Error>;
