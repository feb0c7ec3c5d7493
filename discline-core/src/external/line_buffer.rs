//! Splits a byte stream into text lines.
//!
//! Tools redraw progress lines with a bare `\r`, so both `\r` and `\n` end a
//! line; a `\r\n` pair ends just one. Bytes after the last terminator stay
//! buffered until more data arrives or the stream ends.

#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match byte {
                b'\n' => {
                    if !(self.after_cr && self.pending.is_empty()) {
                        lines.push(self.take());
                    }
                    self.after_cr = false;
                }
                b'\r' => {
                    lines.push(self.take());
                    self.after_cr = true;
                }
                other => {
                    self.pending.push(other);
                    self.after_cr = false;
                }
            }
        }
        lines
    }

    /// Returns the unterminated tail at end of stream, if any.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}
