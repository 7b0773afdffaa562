//! Client connection state and reply shaping.

use parking_lot::{Mutex, RwLock};
use rirc_proto::reply;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Placeholder nickname a client carries until NICK is accepted.
pub const NO_NICKNAME: &str = "*";

#[derive(Debug)]
struct Identity {
    nickname: String,
    username: String,
    realname: String,
    registered: bool,
}

#[derive(Debug)]
struct Liveness {
    last_seen: Instant,
    ping_sent: bool,
}

/// A connected peer.
///
/// The record is shared between the connection reader (liveness updates),
/// the daemon (identity, registration, sweeps) and room processors
/// (broadcast targets). Each mutable part has exactly one writing actor;
/// the locks only guard the cross-actor reads and are never held across an
/// await point.
///
/// All socket writes go through the writer channel. Its consumer task is
/// the sole owner of the socket write half and writes one complete line at
/// a time, so lines issued by different actors never interleave on the
/// wire.
#[derive(Debug)]
pub struct Client {
    id: u64,
    hostname: Arc<str>,
    addr: String,
    writer: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    identity: RwLock<Identity>,
    liveness: Mutex<Liveness>,
}

impl Client {
    pub fn new(
        id: u64,
        hostname: Arc<str>,
        addr: String,
        writer: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            hostname,
            addr,
            writer,
            cancel,
            identity: RwLock::new(Identity {
                nickname: NO_NICKNAME.to_string(),
                username: String::new(),
                realname: String::new(),
                registered: false,
            }),
            liveness: Mutex::new(Liveness {
                last_seen: Instant::now(),
                ping_sent: false,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote address in textual form.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn nickname(&self) -> String {
        self.identity.read().nickname.clone()
    }

    pub fn username(&self) -> String {
        self.identity.read().username.clone()
    }

    pub fn realname(&self) -> String {
        self.identity.read().realname.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.identity.read().registered
    }

    pub fn set_nickname(&self, nickname: &str) {
        self.identity.write().nickname = nickname.to_string();
    }

    pub fn set_user(&self, username: &str, realname: &str) {
        let mut identity = self.identity.write();
        identity.username = username.to_string();
        identity.realname = realname.to_string();
    }

    pub fn set_registered(&self) {
        self.identity.write().registered = true;
    }

    /// Record inbound activity: refresh the idle clock and rearm PING.
    pub fn touch(&self) {
        let mut liveness = self.liveness.lock();
        liveness.last_seen = Instant::now();
        liveness.ping_sent = false;
    }

    /// Snapshot of (instant of last inbound activity, outstanding PING).
    pub fn liveness(&self) -> (Instant, bool) {
        let liveness = self.liveness.lock();
        (liveness.last_seen, liveness.ping_sent)
    }

    pub fn mark_ping_sent(&self) {
        self.liveness.lock().ping_sent = true;
    }

    /// Request connection teardown. The reader observes the cancellation,
    /// emits its DEL event and terminates; the writer drops the socket.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Send a line as is; the writer task appends CRLF. Best effort: a
    /// closed writer means the connection is going away and the DEL path
    /// cleans up.
    pub fn msg(&self, text: &str) {
        let _ = self.writer.send(text.to_string());
    }

    /// Send a server-originated line, prefixed `:<hostname>`.
    pub fn reply(&self, rest: &str) {
        self.msg(&reply::with_server_prefix(&self.hostname, rest));
    }

    /// Numeric reply; the last parameter is colon-prefixed.
    pub fn reply_parts(&self, code: &str, params: &[&str]) {
        self.reply(&reply::join_params(code, params));
    }

    /// Numeric reply carrying the client's current nickname as the first
    /// parameter.
    pub fn reply_nicknamed(&self, code: &str, params: &[&str]) {
        let nickname = self.nickname();
        let mut all: Vec<&str> = Vec::with_capacity(params.len() + 1);
        all.push(&nickname);
        all.extend_from_slice(params);
        self.reply_parts(code, &all);
    }

    /// `461 <command> :Not enough parameters`
    pub fn reply_not_enough_params(&self, command: &str) {
        self.reply_nicknamed("461", &[command, "Not enough parameters"]);
    }

    /// `403 <channel> :No such channel`
    pub fn reply_no_channel(&self, channel: &str) {
        self.reply_nicknamed("403", &[channel, "No such channel"]);
    }

    /// `401 <name> :No such nick/channel`
    pub fn reply_no_nick_chan(&self, name: &str) {
        self.reply_nicknamed("401", &[name, "No such nick/channel"]);
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.identity.read();
        write!(
            f,
            "{}!{}@{}",
            identity.nickname, identity.username, self.addr
        )
    }
}
