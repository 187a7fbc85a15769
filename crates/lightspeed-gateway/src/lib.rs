//! # lightspeed-gateway
//!
//! Event-stream session state machine for the Lightspeed API.
//!
//! [`Session::spawn`] starts a driver task that owns the full connection
//! lifecycle: handshake, heartbeat, sequence validation, resume after
//! drops and re-identify when a session is invalidated. Consumers watch
//! [`ConnectionStatus`] transitions and read validated
//! [`SessionEvent`]s, delivered strictly in sequence order.
//!
//! The transport is a seam: production uses [`WsConnector`] over
//! `tokio-tungstenite`, tests drive the machine with scripted in-memory
//! transports.

#![deny(unsafe_code)]

pub mod protocol;
pub mod session;
pub mod transport;

pub use protocol::{Frame, Opcode};
pub use session::{
    ConnectionStatus, DEFAULT_GATEWAY, GatewayConfig, Session, SessionEvent, SessionHandle,
};
pub use transport::{GatewayConnector, GatewayTransport, WsConnector};
