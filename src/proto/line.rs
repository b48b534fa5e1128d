use std::str::Utf8Error;

use thiserror::Error;
use tracing::warn;

/// Longest line kept while waiting for its newline.
pub const MAX_LINE: usize = 4096;

#[derive(Debug, Error)]
#[error("line of {len} bytes is not valid UTF-8")]
pub struct DecodeError {
    pub len: usize,
    #[source]
    source: Utf8Error,
}

/// Decodes one raw line and strips surrounding whitespace (including `\r`).
pub fn decode_line(raw: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(raw)
        .map(str::trim)
        .map_err(|source| DecodeError {
            len: raw.len(),
            source,
        })
}

/// Buffers input across reads and hands back each `\n`-terminated line
/// without its terminator. A line longer than `MAX_LINE` is dropped whole.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    /// Inside an overlong line; skip to the next newline.
    discarding: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            discarding: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    lines.push(std::mem::take(&mut self.buffer));
                }
                continue;
            }
            if self.discarding {
                continue;
            }
            if self.buffer.len() >= MAX_LINE {
                warn!(len = self.buffer.len(), "discarding overlong line");
                self.buffer.clear();
                self.discarding = true;
                continue;
            }
            self.buffer.push(b);
        }
        lines
    }
}
