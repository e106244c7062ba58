//! Newline framing for the event log
//!
//! Splits a byte stream into [`LogRecord`]s, tracking where each record
//! starts and ends in the file. A trailing line without its `\n` is treated
//! as not yet written: it is never yielded, so a reader racing an active
//! appender only ever sees complete records.

use crate::types::LogError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// One complete line of the event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// 1-based line number, relative to where the read started
    pub line_number: u64,

    /// Byte offset of the first byte of the line
    pub start_offset: u64,

    /// Byte offset just past the terminating `\n`
    pub end_offset: u64,

    /// Line content without the line terminator
    pub raw: Bytes,
}

impl LogRecord {
    /// True for lines containing nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.raw.iter().all(u8::is_ascii_whitespace)
    }

    /// Line content for diagnostics
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// Decoder producing [`LogRecord`]s from raw log bytes
#[derive(Debug, Clone)]
pub struct LogLineCodec {
    next_offset: u64,
    lines_read: u64,
    scanned: usize,
}

impl LogLineCodec {
    /// Create a codec for a stream positioned at `start_offset` in the file
    pub fn new(start_offset: u64) -> Self {
        Self {
            next_offset: start_offset,
            lines_read: 0,
            scanned: 0,
        }
    }
}

impl Decoder for LogLineCodec {
    type Item = LogRecord;
    type Error = LogError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<LogRecord>, LogError> {
        // Bytes before `scanned` were already searched on a previous call
        let Some(pos) = buf[self.scanned..].iter().position(|b| *b == b'\n') else {
            self.scanned = buf.len();
            return Ok(None);
        };

        let newline = self.scanned + pos;
        self.scanned = 0;

        let mut line = buf.split_to(newline + 1);
        line.truncate(newline);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        let start_offset = self.next_offset;
        self.next_offset += (newline + 1) as u64;
        self.lines_read += 1;

        Ok(Some(LogRecord {
            line_number: self.lines_read,
            start_offset,
            end_offset: self.next_offset,
            raw: line.freeze(),
        }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<LogRecord>, LogError> {
        match self.decode(buf)? {
            Some(record) => Ok(Some(record)),
            None => {
                if !buf.is_empty() {
                    tracing::debug!(
                        offset = self.next_offset,
                        pending_bytes = buf.len(),
                        "Unterminated trailing line left for a later pass"
                    );
                }
                Ok(None)
            }
        }
    }
}
