//! Per-connection reader and writer tasks.
//!
//! ```text
//! socket read half ──▶ Reader task ──ClientEvent──▶ daemon events channel
//! socket write half ◀── Writer task ◀──lines────── Client::msg (any actor)
//! ```
//!
//! The reader owns the read half: it frames CRLF batches and emits one NEW
//! on start, MSG per complete line, and exactly one DEL when the connection
//! ends for any reason. The writer task is the sole owner of the write
//! half, which makes line writes to one socket atomic no matter which actor
//! issued them.

use crate::client::Client;
use crate::events::{ClientEvent, EventKind};
use rirc_proto::LineBuffer;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Bytes requested per socket read.
pub const READ_BUF_SIZE: usize = 1380;

/// Spawn the writer task and hand back the line sender for the client.
///
/// Lines arrive without CRLF and leave the socket with it appended. A write
/// failure or a closed channel ends the task; the socket write half is
/// dropped with it.
pub fn spawn_writer<W>(mut write: W) -> mpsc::UnboundedSender<String>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push_str("\r\n");
            if write.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write.shutdown().await;
    });
    tx
}

/// Drive the connection's read side until end-of-stream or cancellation.
///
/// Cancellation (`Client::close`) stands in for the daemon closing the
/// socket: the reader stops as if the peer vanished and the DEL event takes
/// the ordinary cleanup path.
pub async fn run_reader<R>(
    client: Arc<Client>,
    mut read: R,
    events: &mpsc::UnboundedSender<ClientEvent>,
) where
    R: AsyncRead + Unpin,
{
    info!(client = %client, "new client");
    let _ = events.send(ClientEvent::new(Arc::clone(&client), EventKind::New, ""));
    let cancel = client.cancel_token();
    let mut lines = LineBuffer::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            res = read.read(&mut buf) => match res {
                Ok(0) => {
                    debug!(client = %client, "connection closed");
                    break;
                }
                Err(err) => {
                    debug!(client = %client, error = %err, "connection lost");
                    break;
                }
                Ok(n) => {
                    client.touch();
                    for line in lines.push(&buf[..n]) {
                        let _ = events.send(ClientEvent::new(
                            Arc::clone(&client),
                            EventKind::Msg,
                            line,
                        ));
                    }
                }
            }
        }
    }
    let _ = events.send(ClientEvent::new(client, EventKind::Del, ""));
}
