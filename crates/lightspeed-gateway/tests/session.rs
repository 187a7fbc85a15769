//! Session state machine behavior against scripted transports.

use std::collections::VecDeque;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use lightspeed_core::{Error, Result, RetryConfig};
use lightspeed_gateway::{
    ConnectionStatus, Frame, GatewayConfig, GatewayConnector, GatewayTransport, Opcode, Session,
    SessionEvent,
};

// ─── Scripted transport ──────────────────────────────────────────────────────

/// In-memory transport: the test is the server.
struct ScriptedTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    sent: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.sent.send(frame).map_err(|_| Error::Transport {
            message: "scripted server gone".into(),
        })
    }

    async fn recv(&mut self) -> Option<Frame> {
        self.incoming.recv().await
    }

    async fn close(&mut self) {
        self.incoming.close();
    }
}

/// The server side of one scripted connection.
struct ServerEnd {
    /// Frames pushed here arrive at the session. Dropping this sender
    /// simulates an unexpected transport drop.
    frames: mpsc::UnboundedSender<Frame>,
    /// Frames the session sent.
    sent: mpsc::UnboundedReceiver<Frame>,
}

fn scripted_pair() -> (ScriptedTransport, ServerEnd) {
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (
        ScriptedTransport {
            incoming: frame_rx,
            sent: sent_tx,
        },
        ServerEnd {
            frames: frame_tx,
            sent: sent_rx,
        },
    )
}

/// Connector handing out pre-built transports, one per connect call.
struct ScriptedConnector {
    transports: parking_lot::Mutex<VecDeque<ScriptedTransport>>,
}

impl ScriptedConnector {
    fn new(transports: Vec<ScriptedTransport>) -> Arc<Self> {
        Arc::new(Self {
            transports: parking_lot::Mutex::new(transports.into()),
        })
    }
}

#[async_trait]
impl GatewayConnector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn GatewayTransport>> {
        match self.transports.lock().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(Error::Transport {
                message: "no more scripted connections".into(),
            }),
        }
    }
}

// ─── Frame builders ──────────────────────────────────────────────────────────

fn hello(interval_ms: u64) -> Frame {
    Frame {
        op: Opcode::Hello,
        seq: None,
        event: None,
        data: json!({ "heartbeat_interval_ms": interval_ms }),
    }
}

fn ready(session_id: &str, seq: u64) -> Frame {
    Frame {
        op: Opcode::Dispatch,
        seq: Some(seq),
        event: Some("ready".into()),
        data: json!({ "session_id": session_id }),
    }
}

fn resumed() -> Frame {
    Frame {
        op: Opcode::Dispatch,
        seq: None,
        event: Some("resumed".into()),
        data: Value::Null,
    }
}

fn message(seq: u64) -> Frame {
    Frame {
        op: Opcode::Dispatch,
        seq: Some(seq),
        event: Some("message_create".into()),
        data: json!({ "_id": format!("m{seq}"), "content": "hi" }),
    }
}

fn invalid_session(resumable: bool, reason: Option<&str>) -> Frame {
    Frame {
        op: Opcode::InvalidSession,
        seq: None,
        event: None,
        data: json!({ "resumable": resumable, "reason": reason }),
    }
}

fn test_config() -> GatewayConfig {
    GatewayConfig {
        url: "wss://gateway.test".into(),
        token: "tok".into(),
        reconnect: RetryConfig {
            max_retries: 4,
            base_delay_ms: 10,
            max_delay_ms: 50,
            jitter_factor: 0.0,
        },
        event_buffer: 64,
    }
}

/// Collect dispatched events until `count` have arrived.
async fn collect(rx: &mut mpsc::Receiver<SessionEvent>, count: usize) -> Vec<SessionEvent> {
    let mut events = Vec::with_capacity(count);
    while events.len() < count {
        match rx.recv().await {
            Some(event) => events.push(event),
            None => panic!("session ended after {} events, wanted {count}", events.len()),
        }
    }
    events
}

fn message_seqs(events: &[SessionEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Dispatch {
                seq: Some(seq),
                event,
                ..
            } if event == "message_create" => Some(*seq),
            _ => None,
        })
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn delivers_sequenced_events_exactly_once_across_drop_and_resume() {
    let (first, first_server) = scripted_pair();
    let (second, second_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first, second]);

    // First connection: handshake, two events, then an unexpected drop.
    first_server.frames.send(hello(45_000)).unwrap();
    first_server.frames.send(ready("s1", 0)).unwrap();
    first_server.frames.send(message(1)).unwrap();
    first_server.frames.send(message(2)).unwrap();
    drop(first_server.frames);

    // Second connection: resume acknowledged, replay continues at 3.
    second_server.frames.send(hello(45_000)).unwrap();
    second_server.frames.send(resumed()).unwrap();
    second_server.frames.send(message(3)).unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());
    let seen = collect(&mut events, 5).await;

    assert_eq!(message_seqs(&seen), vec![1, 2, 3]);
    assert_matches!(&seen[0], SessionEvent::Dispatch { event, .. } if event == "ready");
    assert_matches!(&seen[3], SessionEvent::Dispatch { event, .. } if event == "resumed");

    // The reconnect presented a resume, not a fresh identify.
    let mut second_server = second_server;
    let opening = second_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Resume);
    assert_eq!(opening.data["session_id"], "s1");
    assert_eq!(opening.data["seq"], 2);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_resume_emits_one_invalidated_and_restarts_cold() {
    let (first, first_server) = scripted_pair();
    let (second, second_server) = scripted_pair();
    let (third, third_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first, second, third]);

    first_server.frames.send(hello(45_000)).unwrap();
    first_server.frames.send(ready("s1", 0)).unwrap();
    first_server.frames.send(message(1)).unwrap();
    drop(first_server.frames);

    // Resume attempt is rejected outright.
    second_server.frames.send(hello(45_000)).unwrap();
    second_server
        .frames
        .send(invalid_session(false, None))
        .unwrap();

    // Cold restart succeeds with a new session.
    third_server.frames.send(hello(45_000)).unwrap();
    third_server.frames.send(ready("s2", 0)).unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());
    let seen = collect(&mut events, 4).await;

    let invalidated = seen
        .iter()
        .filter(|e| matches!(e, SessionEvent::Invalidated))
        .count();
    assert_eq!(invalidated, 1);
    assert_matches!(&seen[3], SessionEvent::Dispatch { event, data, .. }
        if event == "ready" && data["session_id"] == "s2");

    // The cold connection identified from scratch.
    let mut third_server = third_server;
    let opening = third_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Identify);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn sequence_gap_forces_resume_without_skipping_events() {
    let (first, first_server) = scripted_pair();
    let (second, second_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first, second]);

    // Seq jumps 1 → 3: the gapped frame must not be delivered.
    first_server.frames.send(hello(45_000)).unwrap();
    first_server.frames.send(ready("s1", 0)).unwrap();
    first_server.frames.send(message(1)).unwrap();
    first_server.frames.send(message(3)).unwrap();

    // Resume replays the missed events in order.
    second_server.frames.send(hello(45_000)).unwrap();
    second_server.frames.send(resumed()).unwrap();
    second_server.frames.send(message(2)).unwrap();
    second_server.frames.send(message(3)).unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());
    let seen = collect(&mut events, 5).await;

    assert_eq!(message_seqs(&seen), vec![1, 2, 3]);

    let mut second_server = second_server;
    let opening = second_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Resume);
    assert_eq!(opening.data["seq"], 1);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn auth_rejection_is_fatal_and_terminal() {
    let (first, first_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first]);

    first_server.frames.send(hello(45_000)).unwrap();
    first_server
        .frames
        .send(invalid_session(false, Some("authentication_failed")))
        .unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());

    let event = events.recv().await.unwrap();
    assert_matches!(event, SessionEvent::Fatal { message } if message == "authentication_failed");

    // No reconnect attempts follow; the driver winds down on its own.
    assert!(events.recv().await.is_none());
    let mut status = handle.status_stream();
    let closed = status.wait_for(|s| *s == ConnectionStatus::Closed).await;
    assert!(closed.is_ok());
}

#[tokio::test(start_paused = true)]
async fn missed_heartbeat_ack_degrades_and_resumes() {
    let (first, first_server) = scripted_pair();
    let (second, second_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first, second]);

    // Short heartbeat interval; the server never acknowledges.
    first_server.frames.send(hello(100)).unwrap();
    first_server.frames.send(ready("s1", 0)).unwrap();

    second_server.frames.send(hello(45_000)).unwrap();
    second_server.frames.send(resumed()).unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());
    let seen = collect(&mut events, 2).await;
    assert_matches!(&seen[1], SessionEvent::Dispatch { event, .. } if event == "resumed");

    // The first connection actually heartbeated before giving up.
    let mut first_server = first_server;
    let opening = first_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Identify);
    let beat = first_server.sent.recv().await.unwrap();
    assert_eq!(beat.op, Opcode::Heartbeat);
    assert_eq!(beat.seq, Some(0));

    // And the second presented a resume.
    let mut second_server = second_server;
    let opening = second_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Resume);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn server_heartbeat_request_is_answered_immediately() {
    let (first, first_server) = scripted_pair();
    let connector = ScriptedConnector::new(vec![first]);

    first_server.frames.send(hello(45_000)).unwrap();
    first_server.frames.send(ready("s1", 0)).unwrap();
    first_server.frames.send(Frame::heartbeat(None)).unwrap();

    let (handle, mut events) = Session::spawn(connector, test_config());
    let _ = collect(&mut events, 1).await;

    let mut first_server = first_server;
    let opening = first_server.sent.recv().await.unwrap();
    assert_eq!(opening.op, Opcode::Identify);
    let beat = first_server.sent.recv().await.unwrap();
    assert_eq!(beat.op, Opcode::Heartbeat);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn close_stops_reconnect_attempts_from_any_state() {
    // No transports at all: the driver sits in its reconnect loop.
    let connector = ScriptedConnector::new(vec![]);
    let (handle, _events) = Session::spawn(connector, test_config());

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_ne!(handle.status(), ConnectionStatus::Closed);

    let mut status = handle.status_stream();
    handle.close().await;
    let closed = status.wait_for(|s| *s == ConnectionStatus::Closed).await;
    assert!(closed.is_ok());
}
