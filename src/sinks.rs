//! External sinks: the append-only chat logger, the room state keeper and
//! startup state restoration.
//!
//! Both sinks are single consumers of unbounded channels; when a consumer
//! stalls on disk I/O the producers keep running. Sink I/O failures are
//! operator-logged and the offending event is skipped.

use crate::daemon::Daemon;
use crate::events::{LogEvent, StateEvent};
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Start the chat logger. Each room's events append to a separate file in
/// `logdir`; without a logdir the task just drains the channel.
pub fn spawn_logger(logdir: Option<PathBuf>) -> mpsc::UnboundedSender<LogEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel::<LogEvent>();
    match logdir {
        None => {
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
        }
        Some(dir) => {
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let logfile = dir.join(&event.room);
                    let line = if event.meta {
                        format!("[{}] * {} {}\n", Utc::now(), event.nick, event.what)
                    } else {
                        format!("[{}] <{}> {}\n", Utc::now(), event.nick, event.what)
                    };
                    match tokio::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&logfile)
                        .await
                    {
                        Ok(mut fd) => {
                            if let Err(err) = fd.write_all(line.as_bytes()).await {
                                warn!(logfile = %logfile.display(), error = %err,
                                    "error writing to logfile");
                            }
                        }
                        Err(err) => {
                            warn!(logfile = %logfile.display(), error = %err,
                                "cannot open logfile");
                        }
                    }
                }
            });
        }
    }
    tx
}

/// Start the state keeper. Every snapshot truncate-writes
/// `<topic>\n<key>\n` to `<statedir>/<room>`; without a statedir the task
/// just drains the channel.
pub fn spawn_state_keeper(statedir: Option<PathBuf>) -> mpsc::UnboundedSender<StateEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StateEvent>();
    match statedir {
        None => {
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
        }
        Some(dir) => {
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let statefile = dir.join(&event.room);
                    let contents = format!("{}\n{}\n", event.topic, event.key);
                    if let Err(err) = tokio::fs::write(&statefile, contents).await {
                        warn!(statefile = %statefile.display(), error = %err,
                            "cannot write statefile");
                    }
                }
            });
        }
    }
    tx
}

/// Re-create rooms from the state directory: every file whose name begins
/// with `#` holds two LF-terminated lines, topic then key. Membership is
/// not persisted. Must run before the accept loop starts.
pub async fn restore_rooms(daemon: &mut Daemon, statedir: &Path) -> io::Result<usize> {
    let mut restored = 0;
    let mut entries = tokio::fs::read_dir(statedir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('#') {
            continue;
        }
        let contents = tokio::fs::read_to_string(entry.path()).await?;
        let mut lines = contents.split('\n');
        let topic = lines.next().unwrap_or_default();
        let key = lines.next().unwrap_or_default();
        let handle = daemon.room_register(&name);
        handle.room.set_topic(topic);
        handle.room.set_key(key);
        info!(room = %name, "loaded state");
        restored += 1;
    }
    Ok(restored)
}
