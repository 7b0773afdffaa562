//! Room (channel) actor.
//!
//! Each room runs as an isolated task owning its membership, topic and key.
//! All interactions arrive as [`ClientEvent`]s on the room's sink channel,
//! so state mutation is single-writer by construction. The daemon reads the
//! key, topic and membership snapshots directly (JOIN admission, LIST,
//! WHOIS), which is why those fields sit behind locks.

use crate::client::Client;
use crate::events::{ClientEvent, EventKind, LogEvent, StateEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// A named channel. Created lazily on first JOIN or restored at startup;
/// never destroyed while the process lives.
#[derive(Debug)]
pub struct Room {
    name: String,
    hostname: Arc<str>,
    topic: RwLock<String>,
    key: RwLock<String>,
    members: RwLock<HashMap<u64, Arc<Client>>>,
    log_sink: mpsc::UnboundedSender<LogEvent>,
    state_sink: mpsc::UnboundedSender<StateEvent>,
}

impl Room {
    /// Create the room and start its processor task. Returns the room and
    /// the sink feeding its processor.
    pub fn spawn(
        hostname: Arc<str>,
        name: &str,
        log_sink: mpsc::UnboundedSender<LogEvent>,
        state_sink: mpsc::UnboundedSender<StateEvent>,
    ) -> (Arc<Room>, mpsc::UnboundedSender<ClientEvent>) {
        let room = Arc::new(Room {
            name: name.to_string(),
            hostname,
            topic: RwLock::new(String::new()),
            key: RwLock::new(String::new()),
            members: RwLock::new(HashMap::new()),
            log_sink,
            state_sink,
        });
        let (sink, events) = mpsc::unbounded_channel();
        tokio::spawn(Arc::clone(&room).processor(events));
        (room, sink)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> String {
        self.topic.read().clone()
    }

    pub fn key(&self) -> String {
        self.key.read().clone()
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    /// Whether a client with this nickname is currently joined.
    pub fn has_member_nick(&self, nickname: &str) -> bool {
        self.members
            .read()
            .values()
            .any(|member| member.nickname().eq_ignore_ascii_case(nickname))
    }

    /// Set the topic directly, bypassing the processor. Only for startup
    /// state restoration, before the accept loop runs.
    pub fn set_topic(&self, topic: &str) {
        *self.topic.write() = topic.to_string();
    }

    /// Set the key directly. Used by startup restoration and by the daemon
    /// when it creates a room for a keyed JOIN.
    pub fn set_key(&self, key: &str) {
        *self.key.write() = key.to_string();
    }

    /// Emit a full snapshot of the persistable state.
    pub fn state_save(&self) {
        let _ = self.state_sink.send(StateEvent {
            room: self.name.clone(),
            topic: self.topic(),
            key: self.key(),
        });
    }

    fn log(&self, nick: &str, what: &str, meta: bool) {
        let _ = self.log_sink.send(LogEvent {
            room: self.name.clone(),
            nick: nick.to_string(),
            what: what.to_string(),
            meta,
        });
    }

    /// `331`/`332` topic reply for one client.
    fn send_topic(&self, client: &Client) {
        let topic = self.topic();
        if topic.is_empty() {
            client.reply_nicknamed("331", &[&self.name, "No topic is set"]);
        } else {
            client.reply_nicknamed("332", &[&self.name, &topic]);
        }
    }

    /// Send a line to every member, possibly excluding one client.
    fn broadcast(&self, line: &str, exclude: Option<u64>) {
        for member in self.members.read().values() {
            if exclude == Some(member.id()) {
                continue;
            }
            member.msg(line);
        }
    }

    async fn processor(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
        while let Some(event) = events.recv().await {
            let client = &event.client;
            match event.kind {
                EventKind::New => {
                    self.members
                        .write()
                        .insert(client.id(), Arc::clone(client));
                    debug!(client = %client, room = %self.name, "joined");
                    self.send_topic(client);
                    self.broadcast(&format!(":{} JOIN {}", client, self.name), None);
                    let mut nicknames: Vec<String> = self
                        .members
                        .read()
                        .values()
                        .map(|member| member.nickname())
                        .collect();
                    nicknames.sort();
                    client.reply_nicknamed("353", &["=", &self.name, &nicknames.join(" ")]);
                    client.reply_nicknamed("366", &[&self.name, "End of NAMES list"]);
                    self.log(&client.nickname(), "joined", true);
                }
                EventKind::Del => {
                    if self.members.write().remove(&client.id()).is_none() {
                        client.reply_nicknamed(
                            "442",
                            &[&self.name, "You are not on that channel"],
                        );
                        continue;
                    }
                    debug!(client = %client, room = %self.name, "left");
                    self.broadcast(
                        &format!(":{} PART {} :{}", client, self.name, client.nickname()),
                        None,
                    );
                    self.log(&client.nickname(), "left", true);
                }
                EventKind::Topic => self.handle_topic(client, &event.text),
                EventKind::Who => {
                    for member in self.members.read().values() {
                        client.reply_nicknamed(
                            "352",
                            &[
                                &self.name,
                                &member.username(),
                                member.addr(),
                                &self.hostname,
                                &member.nickname(),
                                "H",
                                &format!("0 {}", member.realname()),
                            ],
                        );
                    }
                    client.reply_nicknamed("315", &[&self.name, "End of /WHO list"]);
                }
                EventKind::Mode => self.handle_mode(client, &event.text),
                EventKind::Msg => {
                    // The daemon always relays "<CMD> <trailing>".
                    let Some((command, payload)) = event.text.split_once(' ') else {
                        continue;
                    };
                    self.broadcast(
                        &format!(":{} {} {} :{}", client, command, self.name, payload),
                        Some(client.id()),
                    );
                    self.log(&client.nickname(), payload, false);
                }
            }
        }
    }

    fn handle_topic(&self, client: &Arc<Client>, text: &str) {
        if !self.members.read().contains_key(&client.id()) {
            client.reply_parts("442", &[&self.name, "You are not on that channel"]);
            return;
        }
        if text.is_empty() {
            self.send_topic(client);
            return;
        }
        let topic = text.trim_start_matches(':').to_string();
        *self.topic.write() = topic.clone();
        self.broadcast(&format!(":{} TOPIC {} :{}", client, self.name, topic), None);
        self.log(&client.nickname(), &format!("set topic to {topic}"), true);
        self.state_save();
    }

    fn handle_mode(&self, client: &Arc<Client>, text: &str) {
        if text.is_empty() {
            let mode = if self.key.read().is_empty() { "+" } else { "+k" };
            client.reply_nicknamed("324", &[&self.name, mode]);
            return;
        }
        if !text.starts_with("+k") && !text.starts_with("-k") {
            client.reply_nicknamed("472", &[text, "Unknown MODE flag"]);
            return;
        }
        if !self.members.read().contains_key(&client.id()) {
            client.reply_parts("442", &[&self.name, "You are not on that channel"]);
            return;
        }
        if text.starts_with("+k") {
            let mut cols = text.split(' ');
            cols.next();
            let Some(key) = cols.next() else {
                client.reply_not_enough_params("MODE");
                return;
            };
            *self.key.write() = key.to_string();
            self.broadcast(&format!(":{} MODE {} +k {}", client, self.name, key), None);
            self.log(&client.nickname(), &format!("set channel key to {key}"), true);
        } else {
            self.key.write().clear();
            self.broadcast(&format!(":{} MODE {} -k", client, self.name), None);
            self.log(&client.nickname(), "removed channel key", true);
        }
        self.state_save();
    }
}
