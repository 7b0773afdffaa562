//! Shared harness for the in-process integration tests.
//!
//! The daemon and room processors run as real tasks; clients are attached
//! to capture channels instead of sockets, so every reply can be asserted
//! byte for byte. Events are injected straight into the daemon events
//! channel, exactly as a connection reader would emit them.

#![allow(dead_code)]

use rircd::client::Client;
use rircd::daemon::Daemon;
use rircd::events::{ClientEvent, EventKind, LogEvent, StateEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const HOST: &str = "foohost";

/// A running daemon plus captured log and state sinks.
pub struct TestBed {
    pub events: mpsc::UnboundedSender<ClientEvent>,
    pub log: mpsc::UnboundedReceiver<LogEvent>,
    pub state: mpsc::UnboundedReceiver<StateEvent>,
    next_id: u64,
}

impl TestBed {
    pub fn start() -> Self {
        Self::with_motd(None)
    }

    pub fn with_motd(motd: Option<PathBuf>) -> Self {
        let (log_tx, log) = mpsc::unbounded_channel();
        let (state_tx, state) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let daemon = Daemon::new(HOST, motd, log_tx, state_tx);
        tokio::spawn(daemon.run(events_rx));
        Self {
            events,
            log,
            state,
            next_id: 0,
        }
    }

    /// Attach a new client, announcing it to the daemon like a reader
    /// would.
    pub fn connect(&mut self) -> TestConn {
        self.next_id += 1;
        TestConn::attach(self.events.clone(), self.next_id)
    }

    pub async fn recv_log(&mut self) -> LogEvent {
        timeout(Duration::from_secs(5), self.log.recv())
            .await
            .expect("timed out waiting for a log event")
            .expect("log sink closed")
    }

    pub async fn recv_state(&mut self) -> StateEvent {
        timeout(Duration::from_secs(5), self.state.recv())
            .await
            .expect("timed out waiting for a state event")
            .expect("state sink closed")
    }
}

/// One simulated connection: the shared client record plus the capture end
/// of its writer channel.
pub struct TestConn {
    pub client: Arc<Client>,
    pub rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl TestConn {
    /// Attach a capture client to an externally-wired daemon events
    /// channel, announcing it with the reader's NEW event.
    pub fn attach(events: mpsc::UnboundedSender<ClientEvent>, id: u64) -> Self {
        let (writer, rx) = mpsc::unbounded_channel();
        let client = Client::new(
            id,
            Arc::from(HOST),
            "someclient".to_string(),
            writer,
            CancellationToken::new(),
        );
        events
            .send(ClientEvent::new(Arc::clone(&client), EventKind::New, ""))
            .unwrap();
        Self { client, rx, events }
    }

    /// Inject one command line, as the reader does for a framed line.
    pub fn send(&self, line: &str) {
        self.events
            .send(ClientEvent::new(
                Arc::clone(&self.client),
                EventKind::Msg,
                line,
            ))
            .unwrap();
    }

    /// Inject the reader's disconnect event.
    pub fn disconnect(&self) {
        self.events
            .send(ClientEvent::new(
                Arc::clone(&self.client),
                EventKind::Del,
                "",
            ))
            .unwrap();
    }

    /// Next outbound line (without its CRLF, which the writer task owns).
    pub async fn recv(&mut self) -> String {
        timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for a reply")
            .expect("client writer closed")
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Run the NICK/USER workflow and drain the six-line welcome burst
    /// (001-004, LUSERS, missing-MOTD 422).
    pub async fn register(&mut self, nick: &str, user_args: &str) {
        self.send(&format!("NICK {nick}"));
        self.send(&format!("USER {user_args}"));
        for _ in 0..6 {
            self.recv().await;
        }
    }
}
