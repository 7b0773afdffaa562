//! The daemon router.
//!
//! A single task owning the set of connected clients and the room
//! directory. It is the sole consumer of the daemon events channel: every
//! reader fans in here, and room-bound work fans out to the per-room sinks.
//! Liveness bookkeeping is interleaved with normal event handling.

use crate::client::{Client, NO_NICKNAME};
use crate::events::{ClientEvent, EventKind, LogEvent, StateEvent};
use crate::room::Room;
use rirc_proto::{is_valid_nickname, sanitize_room_name};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Max time deadline for a client's unresponsiveness.
const PING_TIMEOUT: Duration = Duration::from_secs(180);
/// Max idle time before a PING is sent.
const PING_THRESHOLD: Duration = Duration::from_secs(90);
/// Aliveness check period.
const ALIVENESS_CHECK: Duration = Duration::from_secs(10);

/// A registered room: the shared record plus the sink feeding its
/// processor task.
pub struct RoomHandle {
    pub room: Arc<Room>,
    pub sink: mpsc::UnboundedSender<ClientEvent>,
}

pub struct Daemon {
    hostname: Arc<str>,
    motd: Option<PathBuf>,
    clients: HashMap<u64, Arc<Client>>,
    rooms: HashMap<String, RoomHandle>,
    last_aliveness_check: Instant,
    log_sink: mpsc::UnboundedSender<LogEvent>,
    state_sink: mpsc::UnboundedSender<StateEvent>,
}

impl Daemon {
    pub fn new(
        hostname: &str,
        motd: Option<PathBuf>,
        log_sink: mpsc::UnboundedSender<LogEvent>,
        state_sink: mpsc::UnboundedSender<StateEvent>,
    ) -> Self {
        Self {
            hostname: Arc::from(hostname),
            motd,
            clients: HashMap::new(),
            rooms: HashMap::new(),
            last_aliveness_check: Instant::now(),
            log_sink,
            state_sink,
        }
    }

    pub fn hostname(&self) -> Arc<str> {
        Arc::clone(&self.hostname)
    }

    /// Register a room: create it, start its processor and remember its
    /// sink. Returns the existing handle if the name is already taken.
    pub fn room_register(&mut self, name: &str) -> &RoomHandle {
        match self.rooms.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (room, sink) = Room::spawn(
                    Arc::clone(&self.hostname),
                    name,
                    self.log_sink.clone(),
                    self.state_sink.clone(),
                );
                entry.insert(RoomHandle { room, sink })
            }
        }
    }

    /// Drive the daemon until the events channel closes. The liveness sweep
    /// runs at the top of each event and, so that an idle server still
    /// pings and reaps clients, on a timer tick.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
        let mut ticker = tokio::time::interval(ALIVENESS_CHECK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => {
                        self.check_aliveness();
                        self.handle_event(event).await;
                    }
                    None => break,
                },
                _ = ticker.tick() => self.check_aliveness(),
            }
        }
    }

    /// Scan every client at most once per [`ALIVENESS_CHECK`]: dead-idle
    /// clients are disconnected, quiet registered ones get a PING, quiet
    /// unregistered ones are disconnected.
    fn check_aliveness(&mut self) {
        let now = Instant::now();
        if now < self.last_aliveness_check + ALIVENESS_CHECK {
            return;
        }
        for client in self.clients.values() {
            let (last_seen, ping_sent) = client.liveness();
            if now > last_seen + PING_TIMEOUT {
                warn!(client = %client, "ping timeout");
                client.close();
                continue;
            }
            if !ping_sent && now > last_seen + PING_THRESHOLD {
                if client.is_registered() {
                    client.msg(&format!("PING :{}", self.hostname));
                    client.mark_ping_sent();
                } else {
                    warn!(client = %client, "ping timeout");
                    client.close();
                }
            }
        }
        self.last_aliveness_check = now;
    }

    async fn handle_event(&mut self, event: ClientEvent) {
        let client = event.client;
        match event.kind {
            EventKind::New => {
                self.clients.insert(client.id(), client);
            }
            EventKind::Del => {
                self.clients.remove(&client.id());
                for handle in self.rooms.values() {
                    let _ = handle
                        .sink
                        .send(ClientEvent::new(Arc::clone(&client), EventKind::Del, ""));
                }
            }
            EventKind::Msg => self.dispatch_command(client, &event.text).await,
            // Topic/Who/Mode are daemon-synthesized and never arrive here.
            _ => {}
        }
    }

    async fn dispatch_command(&mut self, client: Arc<Client>, line: &str) {
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command.to_uppercase(), Some(rest)),
            None => (line.to_uppercase(), None),
        };
        debug!(client = %client, command = %command, "command");

        if command == "QUIT" {
            self.clients.remove(&client.id());
            client.close();
            return;
        }
        if !client.is_registered() {
            self.register_client(&client, &command, rest).await;
            return;
        }

        match command.as_str() {
            "AWAY" => {}
            "JOIN" => match rest.filter(|args| !args.is_empty()) {
                Some(args) => self.handle_join(&client, args),
                None => client.reply_not_enough_params("JOIN"),
            },
            "LIST" => self.send_list(&client, rest),
            "LUSERS" => self.send_lusers(&client),
            "MODE" => self.handle_mode(&client, rest),
            "MOTD" => self.send_motd(&client).await,
            "PART" => match rest.filter(|args| !args.is_empty()) {
                Some(args) => {
                    for name in args.split(',') {
                        match self.rooms.get(name) {
                            Some(handle) => {
                                let _ = handle.sink.send(ClientEvent::new(
                                    Arc::clone(&client),
                                    EventKind::Del,
                                    "",
                                ));
                            }
                            None => client.reply_no_channel(name),
                        }
                    }
                }
                None => client.reply_not_enough_params("PART"),
            },
            "PING" => match rest {
                Some(origin) => {
                    client.reply(&format!("PONG {} :{}", self.hostname, origin));
                }
                None => client.reply_nicknamed("409", &["No origin specified"]),
            },
            "PONG" => {}
            "PRIVMSG" | "NOTICE" => self.handle_private_message(&client, &command, rest),
            "TOPIC" => match rest {
                Some(args) => {
                    let (name, change) = match args.split_once(' ') {
                        Some((name, change)) => (name, change),
                        None => (args, ""),
                    };
                    match self.rooms.get(name) {
                        Some(handle) => {
                            let _ = handle.sink.send(ClientEvent::new(
                                Arc::clone(&client),
                                EventKind::Topic,
                                change,
                            ));
                        }
                        None => client.reply_no_channel(name),
                    }
                }
                None => client.reply_not_enough_params("TOPIC"),
            },
            "WHO" => match rest.filter(|args| !args.is_empty()) {
                Some(args) => {
                    let name = args.split(' ').next().unwrap_or_default();
                    match self.rooms.get(name) {
                        Some(handle) => {
                            let _ = handle.sink.send(ClientEvent::new(
                                Arc::clone(&client),
                                EventKind::Who,
                                "",
                            ));
                        }
                        None => client.reply_no_channel(name),
                    }
                }
                None => client.reply_not_enough_params("WHO"),
            },
            "WHOIS" => match rest.filter(|args| !args.is_empty()) {
                Some(args) => {
                    let targets = args.split(' ').last().unwrap_or_default();
                    let nicknames: Vec<&str> = targets.split(',').collect();
                    self.send_whois(&client, &nicknames);
                }
                None => client.reply_not_enough_params("WHOIS"),
            },
            _ => client.reply_nicknamed("421", &[&command, "Unknown command"]),
        }
    }

    /// Unregistered client workflow. Only NICK and USER have effect; other
    /// commands are quietly ignored. Once both have been accepted, the
    /// welcome burst, LUSERS and the MOTD block are sent.
    async fn register_client(&mut self, client: &Arc<Client>, command: &str, rest: Option<&str>) {
        match command {
            "NICK" => {
                let Some(nickname) = rest.filter(|nickname| !nickname.is_empty()) else {
                    client.reply_parts("431", &["No nickname given"]);
                    return;
                };
                if !is_valid_nickname(nickname) {
                    client.reply_parts("432", &["*", nickname, "Erroneous nickname"]);
                    return;
                }
                if self
                    .clients
                    .values()
                    .any(|other| other.nickname() == nickname)
                {
                    client.reply_parts("433", &["*", nickname, "Nickname is already in use"]);
                    return;
                }
                client.set_nickname(nickname);
            }
            "USER" => {
                let Some(args) = rest else {
                    client.reply_not_enough_params("USER");
                    return;
                };
                let parts: Vec<&str> = args.splitn(4, ' ').collect();
                if parts.len() < 4 {
                    client.reply_not_enough_params("USER");
                    return;
                }
                client.set_user(parts[0], parts[3].trim_start_matches(':'));
            }
            _ => return,
        }
        if client.nickname() != NO_NICKNAME && !client.username().is_empty() {
            client.set_registered();
            client.reply_nicknamed("001", &["Hi, welcome to IRC"]);
            client.reply_nicknamed(
                "002",
                &[&format!("Your host is {}, running rircd", self.hostname)],
            );
            client.reply_nicknamed("003", &["This server was created sometime"]);
            client.reply_nicknamed("004", &[&format!("{} rircd o o", self.hostname)]);
            self.send_lusers(client);
            self.send_motd(client).await;
        }
    }

    /// JOIN `room-list[,room-list] [key-list[,key-list]]`.
    fn handle_join(&mut self, client: &Arc<Client>, args: &str) {
        let mut fields = args.split(' ');
        let rooms = fields.next().unwrap_or_default();
        let keys: Vec<&str> = fields.next().map(|k| k.split(',').collect()).unwrap_or_default();
        for (n, requested) in rooms.split(',').enumerate() {
            let Some(name) = sanitize_room_name(requested) else {
                client.reply_no_channel(requested);
                continue;
            };
            let key = keys.get(n).copied().filter(|key| !key.is_empty()).unwrap_or("");
            if let Some(handle) = self.rooms.get(&name) {
                let room_key = handle.room.key();
                if !room_key.is_empty() && room_key != key {
                    client.reply_nicknamed("475", &[&name, "Cannot join channel (+k) - bad key"]);
                } else {
                    let _ = handle
                        .sink
                        .send(ClientEvent::new(Arc::clone(client), EventKind::New, ""));
                }
                continue;
            }
            let handle = self.room_register(&name);
            if !key.is_empty() {
                handle.room.set_key(key);
                handle.room.state_save();
            }
            let _ = handle
                .sink
                .send(ClientEvent::new(Arc::clone(client), EventKind::New, ""));
        }
    }

    /// MODE: self-MODE is answered locally, room MODE is forwarded.
    fn handle_mode(&mut self, client: &Arc<Client>, rest: Option<&str>) {
        let Some(args) = rest.filter(|args| !args.is_empty()) else {
            client.reply_not_enough_params("MODE");
            return;
        };
        let (target, flags) = match args.split_once(' ') {
            Some((target, flags)) => (target, Some(flags)),
            None => (args, None),
        };
        if target == client.username() {
            match flags {
                None => client.reply_nicknamed("221", &["+"]),
                Some(_) => client.reply_nicknamed("501", &["Unknown MODE flag"]),
            }
            return;
        }
        match self.rooms.get(target) {
            Some(handle) => {
                let _ = handle.sink.send(ClientEvent::new(
                    Arc::clone(client),
                    EventKind::Mode,
                    flags.unwrap_or_default(),
                ));
            }
            None => client.reply_no_channel(target),
        }
    }

    fn handle_private_message(&mut self, client: &Arc<Client>, command: &str, rest: Option<&str>) {
        let Some(args) = rest else {
            client.reply_nicknamed("411", &[&format!("No recipient given ({command})")]);
            return;
        };
        let Some((target, text)) = args.split_once(' ') else {
            client.reply_nicknamed("412", &["No text to send"]);
            return;
        };
        let target = target.to_lowercase();
        for other in self.clients.values() {
            if other.is_registered() && other.nickname().eq_ignore_ascii_case(&target) {
                // Direct delivery keeps the payload verbatim, leading colon
                // included.
                other.msg(&format!(
                    ":{} {} {} :{}",
                    client,
                    command,
                    other.nickname(),
                    text
                ));
                return;
            }
        }
        match self.rooms.get(&target) {
            Some(handle) => {
                let _ = handle.sink.send(ClientEvent::new(
                    Arc::clone(client),
                    EventKind::Msg,
                    format!("{command} {}", text.trim_start_matches(':')),
                ));
            }
            None => client.reply_no_nick_chan(&target),
        }
    }

    fn send_lusers(&self, client: &Client) {
        let lusers = self
            .clients
            .values()
            .filter(|other| other.is_registered())
            .count();
        client.reply_nicknamed(
            "251",
            &[&format!(
                "There are {lusers} users and 0 invisible on 1 servers"
            )],
        );
    }

    async fn send_motd(&self, client: &Client) {
        let Some(path) = &self.motd else {
            client.reply_nicknamed("422", &["MOTD File is missing"]);
            return;
        };
        match tokio::fs::read_to_string(path).await {
            Ok(motd) => {
                client.reply_nicknamed(
                    "375",
                    &[&format!("- {} Message of the day -", self.hostname)],
                );
                for line in motd.trim_end_matches('\n').split('\n') {
                    client.reply_nicknamed("372", &[&format!("- {line}")]);
                }
                client.reply_nicknamed("376", &["End of /MOTD command"]);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open motd file");
                client.reply_nicknamed("422", &["MOTD File is missing"]);
            }
        }
    }

    /// `322` per requested (or every) room, then `323`.
    fn send_list(&self, client: &Client, rest: Option<&str>) {
        let mut names: Vec<String> = match rest.filter(|args| !args.is_empty()) {
            Some(args) => args
                .split(' ')
                .next()
                .unwrap_or_default()
                .split(',')
                .map(str::to_string)
                .collect(),
            None => self.rooms.keys().cloned().collect(),
        };
        names.sort();
        for name in &names {
            if let Some(handle) = self.rooms.get(name) {
                client.reply_nicknamed(
                    "322",
                    &[
                        name,
                        &handle.room.member_count().to_string(),
                        &handle.room.topic(),
                    ],
                );
            }
        }
        client.reply_nicknamed("323", &["End of /LIST"]);
    }

    /// `311`/`312`/`319`/`318` per matching client, `401` per miss.
    fn send_whois(&self, client: &Client, nicknames: &[&str]) {
        for nickname in nicknames {
            let mut found = false;
            for other in self.clients.values() {
                let other_nick = other.nickname();
                if !other_nick.eq_ignore_ascii_case(nickname) {
                    continue;
                }
                found = true;
                client.reply_nicknamed(
                    "311",
                    &[
                        &other_nick,
                        &other.username(),
                        other.addr(),
                        "*",
                        &other.realname(),
                    ],
                );
                client.reply_nicknamed("312", &[&other_nick, &self.hostname, &self.hostname]);
                let mut subscriptions: Vec<&str> = self
                    .rooms
                    .values()
                    .filter(|handle| handle.room.has_member_nick(&other_nick))
                    .map(|handle| handle.room.name())
                    .collect();
                subscriptions.sort_unstable();
                client.reply_nicknamed("319", &[&other_nick, &subscriptions.join(" ")]);
                client.reply_nicknamed("318", &[&other_nick, "End of /WHOIS list"]);
            }
            if !found {
                client.reply_no_nick_chan(nickname);
            }
        }
    }
}
