//! CRLF batch framing.
//!
//! IRC is line-delimited and commands may arrive split across reads. The
//! accumulator collects raw socket reads and dispatches nothing until the
//! buffered data ends in CRLF; at that point every complete line is drained
//! at once. Holding back partially-terminated batches preserves per-line
//! atomicity for the consumer.

use bytes::{BufMut, BytesMut};

/// IRC line terminator.
pub const CRLF: &[u8] = b"\x0d\x0a";

/// Accumulates raw reads and yields batches of complete CRLF-terminated
/// lines.
///
/// ```
/// use rirc_proto::LineBuffer;
///
/// let mut buf = LineBuffer::new();
/// assert!(buf.push(b"NICK mei").is_empty());
/// assert_eq!(buf.push(b"nick\r\n"), vec!["NICK meinick".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes. Returns the complete lines if the
    /// chunk finished a CRLF-terminated batch, otherwise an empty vector.
    ///
    /// Trailing NUL bytes of the chunk are discarded before accumulation.
    /// Empty lines are dropped. Lines are decoded lossily: the framing
    /// characters are ASCII and anything else passes through untouched
    /// unless it is invalid UTF-8.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let end = chunk.len() - chunk.iter().rev().take_while(|&&b| b == 0).count();
        self.buf.put_slice(&chunk[..end]);
        if !self.buf.ends_with(CRLF) {
            return Vec::new();
        }
        let batch = self.buf.split();
        split_crlf(&batch[..batch.len() - CRLF.len()])
            .filter(|segment| !segment.is_empty())
            .map(|segment| String::from_utf8_lossy(segment).into_owned())
            .collect()
    }
}

fn split_crlf(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(data);
    std::iter::from_fn(move || {
        let data = rest?;
        match data.windows(CRLF.len()).position(|w| w == CRLF) {
            Some(at) => {
                rest = Some(&data[at + CRLF.len()..]);
                Some(&data[..at])
            }
            None => {
                rest = None;
                Some(data)
            }
        }
    })
}
