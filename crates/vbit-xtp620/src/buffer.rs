//! Fixed-capacity command buffer.
//!
//! Bytes received on a control connection are collected here until the
//! current mode says the command is complete (a line terminator in normal
//! mode, a fixed byte count otherwise). The protocol has no line-length
//! negotiation, so a line that outgrows the buffer is dropped rather than
//! truncated.

/// Capacity of the command buffer in bytes.
pub const MAX_CMD: usize = 128;

/// Outcome of [`CommandBuffer::add_char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// The byte was appended.
    Stored,
    /// The buffer was full: it has been cleared and the byte discarded.
    Overflow,
}

/// Bounded accumulator for one command.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    bytes: [u8; MAX_CMD],
    len: usize,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        CommandBuffer {
            bytes: [0; MAX_CMD],
            len: 0,
        }
    }

    /// Logical reset; the storage is not overwritten.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append one byte, or reset the buffer if it is already full.
    pub fn add_char(&mut self, ch: u8) -> Push {
        if self.len == MAX_CMD {
            self.clear();
            return Push::Overflow;
        }
        self.bytes[self.len] = ch;
        self.len += 1;
        Push::Stored
    }

    /// The bytes collected so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of bytes collected.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been collected since the last clear.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next [`add_char`](Self::add_char) would overflow.
    pub fn is_full(&self) -> bool {
        self.len == MAX_CMD
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = CommandBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), b"");
    }

    #[test]
    fn add_char_appends() {
        let mut buf = CommandBuffer::new();
        for &b in b"P100" {
            assert_eq!(buf.add_char(b), Push::Stored);
        }
        assert_eq!(buf.as_bytes(), b"P100");
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn clear_is_logical() {
        let mut buf = CommandBuffer::new();
        buf.add_char(b'Y');
        buf.clear();
        assert!(buf.is_empty());
        buf.add_char(b'P');
        assert_eq!(buf.as_bytes(), b"P");
    }

    #[test]
    fn fills_to_capacity() {
        let mut buf = CommandBuffer::new();
        for _ in 0..MAX_CMD {
            assert_eq!(buf.add_char(b'x'), Push::Stored);
        }
        assert!(buf.is_full());
        assert_eq!(buf.len(), MAX_CMD);
    }

    #[test]
    fn overflow_resets_and_discards() {
        let mut buf = CommandBuffer::new();
        let mut last = Push::Stored;
        for _ in 0..=MAX_CMD {
            last = buf.add_char(b'x');
        }
        assert_eq!(last, Push::Overflow);
        assert!(buf.is_empty(), "129th byte must leave the buffer empty");
    }

    #[test]
    fn usable_after_overflow() {
        let mut buf = CommandBuffer::new();
        for _ in 0..=MAX_CMD {
            buf.add_char(b'x');
        }
        buf.add_char(b'Y');
        assert_eq!(buf.as_bytes(), b"Y");
    }
}
