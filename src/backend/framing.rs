//! Reassembles inbound transport frames into protocol lines.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec};
use tracing::warn;

use crate::config::Framing;

/// Longest accepted line: 512 bytes of message plus the IRCv3 tag budget.
pub const MAX_LINE_LENGTH: usize = 8191 + 512;

pub struct LineBuffer {
    codec: LinesCodec,
    buf: BytesMut,
    framing: Framing,
}

impl LineBuffer {
    pub fn new(framing: Framing) -> Self {
        Self {
            codec: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
            buf: BytesMut::new(),
            framing,
        }
    }

    /// Feed one inbound frame and return the complete, non-blank lines it finished.
    pub fn push(&mut self, frame: &str) -> Vec<String> {
        self.buf.extend_from_slice(frame.as_bytes());
        let mut lines = Vec::new();

        loop {
            // In message framing the end of the frame also ends a line
            let decoded = match self.framing {
                Framing::Message => self.codec.decode_eof(&mut self.buf),
                Framing::Stream => self.codec.decode(&mut self.buf),
            };
            match decoded {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Discarding oversized protocol line");
                }
            }
        }

        if self.framing == Framing::Message {
            // Nothing carries over into the next frame, not even discard state
            self.reset();
        }
        lines
    }

    /// Drop any partial line (new connection).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.codec = LinesCodec::new_with_max_length(MAX_LINE_LENGTH);
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
