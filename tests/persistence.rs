//! Log sink, state sink and startup restoration.

mod common;

use common::HOST;
use rircd::daemon::Daemon;
use rircd::events::{ClientEvent, LogEvent, StateEvent};
use rircd::sinks;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

/// Wait for the sink task to materialize a file with the wanted content.
async fn wait_for_file<F: Fn(&str) -> bool>(path: &Path, ready: F) -> String {
    for _ in 0..500 {
        if let Ok(contents) = tokio::fs::read_to_string(path).await {
            if ready(&contents) {
                return contents;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sink never wrote {}", path.display());
}

#[tokio::test]
async fn state_keeper_writes_topic_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let state_sink = sinks::spawn_state_keeper(Some(dir.path().to_path_buf()));

    state_sink
        .send(StateEvent {
            room: "#foo".to_string(),
            topic: "New topic".to_string(),
            key: "sesame".to_string(),
        })
        .unwrap();
    let contents = wait_for_file(&dir.path().join("#foo"), |c| !c.is_empty()).await;
    assert_eq!(contents, "New topic\nsesame\n");

    // A later snapshot truncates, never appends.
    state_sink
        .send(StateEvent {
            room: "#foo".to_string(),
            topic: String::new(),
            key: String::new(),
        })
        .unwrap();
    let contents = wait_for_file(&dir.path().join("#foo"), |c| c == "\n\n").await;
    assert_eq!(contents, "\n\n");
}

#[tokio::test]
async fn logger_formats_meta_and_chat_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_sink = sinks::spawn_logger(Some(dir.path().to_path_buf()));

    log_sink
        .send(LogEvent {
            room: "#foo".to_string(),
            nick: "nick1".to_string(),
            what: "joined".to_string(),
            meta: true,
        })
        .unwrap();
    log_sink
        .send(LogEvent {
            room: "#foo".to_string(),
            nick: "nick1".to_string(),
            what: "hello world".to_string(),
            meta: false,
        })
        .unwrap();

    let contents = wait_for_file(&dir.path().join("#foo"), |c| c.lines().count() == 2).await;
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] * nick1 joined"));
    assert!(lines[1].starts_with('['));
    assert!(lines[1].ends_with("] <nick1> hello world"));
}

#[tokio::test]
async fn room_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    // First life: a client sets a key and a topic.
    {
        let state_sink = sinks::spawn_state_keeper(Some(dir.path().to_path_buf()));
        let (log_tx, _log) = mpsc::unbounded_channel();
        let daemon = Daemon::new(HOST, None, log_tx, state_sink);
        let (events, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(daemon.run(events_rx));

        let mut bed_conn = connect_to(&events, 1);
        bed_conn.register("nick1", "foo1 bar1 baz1 :Long name1").await;
        bed_conn.send("JOIN #keep sesame");
        for _ in 0..4 {
            bed_conn.recv().await;
        }
        bed_conn.send("TOPIC #keep :New topic");
        bed_conn.recv().await;
        wait_for_file(&dir.path().join("#keep"), |c| c == "New topic\nsesame\n").await;
    }

    // Second life: the room comes back with its topic and key.
    let (log_tx, _log) = mpsc::unbounded_channel();
    let (state_tx, _state) = mpsc::unbounded_channel();
    let mut daemon = Daemon::new(HOST, None, log_tx, state_tx);
    let restored = sinks::restore_rooms(&mut daemon, dir.path()).await.unwrap();
    assert_eq!(restored, 1);
    let (events, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(daemon.run(events_rx));

    let mut conn = connect_to(&events, 1);
    conn.register("nick1", "foo1 bar1 baz1 :Long name1").await;
    conn.send("JOIN #keep");
    assert_eq!(
        conn.recv().await,
        ":foohost 475 nick1 #keep :Cannot join channel (+k) - bad key"
    );
    conn.send("JOIN #keep sesame");
    assert_eq!(conn.recv().await, ":foohost 332 nick1 #keep :New topic");
}

#[tokio::test]
async fn restore_skips_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("#foo"), "topic\nkey\n")
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("README"), "not a room\n")
        .await
        .unwrap();

    let (log_tx, _log) = mpsc::unbounded_channel();
    let (state_tx, _state) = mpsc::unbounded_channel();
    let mut daemon = Daemon::new(HOST, None, log_tx, state_tx);
    assert_eq!(sinks::restore_rooms(&mut daemon, dir.path()).await.unwrap(), 1);
}

/// Like `TestBed::connect`, for tests that wire the daemon by hand.
fn connect_to(events: &mpsc::UnboundedSender<ClientEvent>, id: u64) -> common::TestConn {
    common::TestConn::attach(events.clone(), id)
}
