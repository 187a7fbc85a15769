//! The session state machine.
//!
//! One [`Session`] owns one logical event-stream connection: handshake,
//! heartbeat, sequence tracking, resume and re-identify. All state lives
//! in a single driver task, so only one transition is ever in progress;
//! consumers observe it through a `watch` channel of
//! [`ConnectionStatus`] values and an `mpsc` stream of [`SessionEvent`]s
//! delivered strictly in arrival order.
//!
//! Reconnects are unbounded: a long-lived client is expected to come
//! back indefinitely. The only terminal failure is the server explicitly
//! marking the session non-resumable with rejected credentials.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lightspeed_core::RetryConfig;
use lightspeed_core::retry::backoff_delay_with_random;

use crate::protocol::{Frame, Opcode};
use crate::transport::{GatewayConnector, GatewayTransport};

/// Default event-stream endpoint.
pub const DEFAULT_GATEWAY: &str = "wss://api.lightspeed.tv/events";

/// Where the connection currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection and no attempt in progress.
    Disconnected,
    /// Opening the transport for a fresh session.
    Connecting,
    /// Transport open; credentials sent, waiting for acceptance.
    Identifying,
    /// Session established; events flowing.
    Ready,
    /// A heartbeat went unacknowledged; reconnecting.
    Degraded,
    /// Reopening the transport to resume a held session.
    Resuming,
    /// Shut down; no further reconnect attempts.
    Closed,
}

/// Configuration for a session.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Event-stream endpoint URL.
    pub url: String,
    /// Session token presented on identify and resume.
    pub token: String,
    /// Backoff shape for reconnect attempts.
    pub reconnect: RetryConfig,
    /// Capacity of the delivered-event channel.
    pub event_buffer: usize,
}

impl GatewayConfig {
    /// Configuration for the default endpoint with the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_GATEWAY.to_owned(),
            token: token.into(),
            reconnect: RetryConfig::default(),
            event_buffer: 256,
        }
    }
}

/// What a session delivers to its consumer.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A validated dispatch frame.
    Dispatch {
        /// Sequence number, when the frame carried one.
        seq: Option<u64>,
        /// Event name.
        event: String,
        /// Event body.
        data: Value,
    },
    /// The session could not be resumed and restarted cold; cached state
    /// may have missed events and should be treated as stale.
    Invalidated,
    /// Credentials were rejected; the session is terminal.
    Fatal {
        /// Reason reported by the server.
        message: String,
    },
}

/// Handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    status: watch::Receiver<ConnectionStatus>,
    driver: JoinHandle<()>,
}

impl SessionHandle {
    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Watch channel of status transitions.
    #[must_use]
    pub fn status_stream(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Shut the session down from any state and wait for the driver to
    /// finish.
    pub async fn close(self) {
        self.cancel.cancel();
        let _ = self.driver.await;
    }
}

/// A logical event-stream session.
///
/// All timers and connection state are owned by the spawned driver task;
/// spawning a second session shares nothing with the first.
pub struct Session;

impl Session {
    /// Start a session driver.
    ///
    /// Returns the control handle and the channel on which validated
    /// events arrive, strictly in sequence order.
    #[must_use]
    pub fn spawn(
        connector: Arc<dyn GatewayConnector>,
        config: GatewayConfig,
    ) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let cancel = CancellationToken::new();

        let driver = Driver {
            connector,
            config,
            status: status_tx,
            events: event_tx,
            cancel: cancel.clone(),
            session_id: None,
            resume_url: None,
            last_seq: None,
        };
        let handle = tokio::spawn(driver.run());

        (
            SessionHandle {
                cancel,
                status: status_rx,
                driver: handle,
            },
            event_rx,
        )
    }
}

/// How one connection ended, from the reconnect loop's point of view.
enum Outcome {
    /// Deliberate shutdown.
    Closed,
    /// Transport gone or protocol forced a reconnect; resume if a
    /// session is held.
    Dropped,
    /// Server invalidated the session; restart cold.
    Invalidated,
    /// Credentials rejected; terminal.
    Fatal(String),
}

struct Driver {
    connector: Arc<dyn GatewayConnector>,
    config: GatewayConfig,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
    session_id: Option<String>,
    resume_url: Option<String>,
    last_seq: Option<u64>,
}

impl Driver {
    fn set_status(&self, status: ConnectionStatus) {
        if *self.status.borrow() != status {
            tracing::debug!(?status, "session status");
            let _ = self.status.send(status);
        }
    }

    async fn run(mut self) {
        // Consecutive failed reconnects; reset once a session reaches
        // Ready. The first reconnect after a drop is immediate, repeated
        // failures back off.
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if attempt > 1 {
                let delay =
                    backoff_delay_with_random(attempt - 2, &self.config.reconnect, rand::random());
                tracing::info!(
                    attempt,
                    wait_ms = delay.as_millis() as u64,
                    "reconnecting after backoff",
                );
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let resuming = self.session_id.is_some() && self.last_seq.is_some();
            self.set_status(if resuming {
                ConnectionStatus::Resuming
            } else {
                ConnectionStatus::Connecting
            });

            let url = self
                .resume_url
                .clone()
                .unwrap_or_else(|| self.config.url.clone());
            let connected = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.connector.connect(&url) => result,
            };
            let mut transport = match connected {
                Ok(transport) => transport,
                Err(err) => {
                    tracing::warn!(error = %err, "transport connect failed");
                    attempt = attempt.saturating_add(1);
                    continue;
                }
            };

            match self.run_connection(transport.as_mut(), &mut attempt).await {
                Outcome::Closed => {
                    transport.close().await;
                    break;
                }
                Outcome::Fatal(message) => {
                    transport.close().await;
                    tracing::error!(reason = %message, "session terminated by server");
                    let _ = self.events.send(SessionEvent::Fatal { message }).await;
                    break;
                }
                Outcome::Invalidated => {
                    transport.close().await;
                    tracing::warn!("session invalidated; restarting cold");
                    self.session_id = None;
                    self.resume_url = None;
                    self.last_seq = None;
                    if self.events.send(SessionEvent::Invalidated).await.is_err() {
                        break;
                    }
                    attempt = 0;
                }
                Outcome::Dropped => {
                    transport.close().await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }

        self.set_status(ConnectionStatus::Closed);
    }

    /// Drive one transport connection to its end.
    async fn run_connection(
        &mut self,
        transport: &mut dyn GatewayTransport,
        attempt: &mut u32,
    ) -> Outcome {
        // The first frame must be hello; it carries the heartbeat
        // interval and the loop starts on it immediately.
        let hello = tokio::select! {
            () = self.cancel.cancelled() => return Outcome::Closed,
            frame = transport.recv() => match frame {
                Some(frame) if frame.op == Opcode::Hello => match frame.hello() {
                    Ok(hello) => hello,
                    Err(err) => {
                        tracing::warn!(error = %err, "undecodable hello");
                        return Outcome::Dropped;
                    }
                },
                Some(frame) => {
                    tracing::warn!(op = ?frame.op, "expected hello as first frame");
                    return Outcome::Dropped;
                }
                None => return Outcome::Dropped,
            },
        };

        let interval = Duration::from_millis(hello.heartbeat_interval_ms.max(1));
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        let mut awaiting_ack = false;

        self.set_status(ConnectionStatus::Identifying);
        let opening = match (&self.session_id, self.last_seq) {
            (Some(session_id), Some(seq)) => {
                tracing::info!(%session_id, seq, "resuming session");
                Frame::resume(&self.config.token, session_id, seq)
            }
            _ => Frame::identify(&self.config.token),
        };
        if transport.send(opening).await.is_err() {
            return Outcome::Dropped;
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return Outcome::Closed,

                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        tracing::warn!("heartbeat unacknowledged; reconnecting");
                        self.set_status(ConnectionStatus::Degraded);
                        return Outcome::Dropped;
                    }
                    if transport.send(Frame::heartbeat(self.last_seq)).await.is_err() {
                        return Outcome::Dropped;
                    }
                    awaiting_ack = true;
                }

                frame = transport.recv() => {
                    let Some(frame) = frame else { return Outcome::Dropped };
                    match frame.op {
                        Opcode::HeartbeatAck => awaiting_ack = false,
                        Opcode::Heartbeat => {
                            // Server-requested heartbeat; answer out of
                            // band without touching the timer.
                            if transport.send(Frame::heartbeat(self.last_seq)).await.is_err() {
                                return Outcome::Dropped;
                            }
                        }
                        Opcode::Hello => {
                            if let Ok(hello) = frame.hello() {
                                let interval =
                                    Duration::from_millis(hello.heartbeat_interval_ms.max(1));
                                heartbeat = tokio::time::interval_at(
                                    tokio::time::Instant::now() + interval,
                                    interval,
                                );
                            }
                        }
                        Opcode::Reconnect => {
                            tracing::info!("server requested reconnect");
                            return Outcome::Dropped;
                        }
                        Opcode::InvalidSession => {
                            let Ok(body) = frame.invalid_session() else {
                                return Outcome::Dropped;
                            };
                            if !body.resumable && body.is_auth_failure() {
                                return Outcome::Fatal(
                                    body.reason.unwrap_or_else(|| "credentials rejected".into()),
                                );
                            }
                            if body.resumable {
                                return Outcome::Dropped;
                            }
                            return Outcome::Invalidated;
                        }
                        Opcode::Dispatch => {
                            if let Some(outcome) = self.accept_dispatch(frame, attempt).await {
                                return outcome;
                            }
                        }
                        // Client-to-server opcodes; a server echoing them
                        // is out of contract but harmless.
                        Opcode::Identify | Opcode::Resume => {}
                    }
                }
            }
        }
    }

    /// Validate and deliver one dispatch frame. `Some` ends the
    /// connection with that outcome.
    async fn accept_dispatch(&mut self, frame: Frame, attempt: &mut u32) -> Option<Outcome> {
        let event = frame.event.clone().unwrap_or_default();

        match event.as_str() {
            "ready" => {
                let Ok(ready) = frame.ready() else {
                    tracing::warn!("undecodable ready payload");
                    return Some(Outcome::Dropped);
                };
                tracing::info!(session_id = %ready.session_id, "session ready");
                self.session_id = Some(ready.session_id);
                self.resume_url = ready.resume_url;
                self.last_seq = frame.seq;
                *attempt = 0;
                self.set_status(ConnectionStatus::Ready);
            }
            "resumed" => {
                tracing::info!(seq = self.last_seq, "session resumed");
                *attempt = 0;
                self.set_status(ConnectionStatus::Ready);
            }
            _ => {
                if let Some(seq) = frame.seq {
                    if let Some(last) = self.last_seq {
                        if seq != last + 1 {
                            // A gap means missed events; resume replays
                            // them rather than skipping ahead.
                            tracing::warn!(
                                expected = last + 1,
                                received = seq,
                                "out-of-order dispatch; forcing resume",
                            );
                            return Some(Outcome::Dropped);
                        }
                    }
                    self.last_seq = Some(seq);
                }
            }
        }

        let delivered = self
            .events
            .send(SessionEvent::Dispatch {
                seq: frame.seq,
                event,
                data: frame.data,
            })
            .await;
        // Receiver gone means the consumer is done with us.
        delivered.is_err().then_some(Outcome::Closed)
    }
}
