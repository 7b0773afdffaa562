//! Typed events flowing between the actors.

use crate::client::Client;
use std::sync::Arc;

/// What a [`ClientEvent`] signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Connection opened (reader to daemon) or member joining (daemon to
    /// room).
    New,
    /// Connection lost, QUIT or PART. The daemon fans this out to every
    /// room sink; rooms check membership themselves.
    Del,
    /// A raw command line (reader to daemon), or a `"<CMD> <trailing>"`
    /// relay of PRIVMSG/NOTICE (daemon to room).
    Msg,
    /// Topic query or change, synthesized by the daemon.
    Topic,
    /// WHO listing, synthesized by the daemon.
    Who,
    /// MODE query or change, synthesized by the daemon.
    Mode,
}

/// An event concerning one client, routed through the daemon.
#[derive(Debug, Clone)]
pub struct ClientEvent {
    pub client: Arc<Client>,
    pub kind: EventKind,
    pub text: String,
}

impl ClientEvent {
    pub fn new(client: Arc<Client>, kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            client,
            kind,
            text: text.into(),
        }
    }
}

/// One line of a room's chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Room name.
    pub room: String,
    /// Acting client's nickname.
    pub nick: String,
    pub what: String,
    /// Join/part/topic/key changes log in a different format than chat
    /// text.
    pub meta: bool,
}

/// Full snapshot of a room's persistable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEvent {
    pub room: String,
    pub topic: String,
    pub key: String,
}
