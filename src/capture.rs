//! Serial line capture with destructive backspace.
//!
//! One byte in, one [`LineEvent`] out.  The buffer holds at most
//! `MAX_LINE_LENGTH - 1` bytes of content; the last slot is reserved
//! for the terminator.  Bytes arriving once the buffer is full are
//! dropped without echo until the line is terminated.

use crate::config::MAX_LINE_LENGTH;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Terminal sequence that erases the character left of the cursor.
pub const ERASE_SEQUENCE: &[u8] = b"\x08 \x08";

/// Outcome of feeding one byte.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// Nothing happened (backspace on empty line, or overflow drop).
    None,
    /// Byte was appended; echo it back.
    Echoed(u8),
    /// Last byte was removed; erase it on the terminal.
    Erased,
    /// Terminator after content: the finished line.
    LineReady(&'a [u8]),
    /// Terminator on an empty line.
    LineEmpty,
}

impl LineEvent<'_> {
    /// Bytes to send back to the terminal for this event.
    pub fn echo(&self) -> &[u8] {
        match self {
            LineEvent::Echoed(b) => core::slice::from_ref(b),
            LineEvent::Erased => ERASE_SEQUENCE,
            _ => &[],
        }
    }
}

/// Line buffer plus write cursor.
pub struct LineCapture {
    buf: [u8; MAX_LINE_LENGTH],
    cursor: usize,
}

impl Default for LineCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCapture {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_LINE_LENGTH],
            cursor: 0,
        }
    }

    /// Maximum number of content bytes in one line.
    pub const fn capacity() -> usize {
        MAX_LINE_LENGTH - 1
    }

    /// Content accumulated so far.
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Drop the current partial line.
    pub fn discard(&mut self) {
        self.cursor = 0;
    }

    /// Consume one byte from the serial channel.
    pub fn feed(&mut self, byte: u8) -> LineEvent<'_> {
        match byte {
            BACKSPACE | DELETE => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    LineEvent::Erased
                } else {
                    LineEvent::None
                }
            }
            b'\r' | b'\n' => {
                let len = self.cursor;
                self.buf[len] = 0;
                if len > 0 {
                    self.cursor = 0;
                    LineEvent::LineReady(&self.buf[..len])
                } else {
                    LineEvent::LineEmpty
                }
            }
            _ if self.cursor < Self::capacity() => {
                self.buf[self.cursor] = byte;
                self.cursor += 1;
                LineEvent::Echoed(byte)
            }
            _ => LineEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(capture: &mut LineCapture, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if let LineEvent::LineReady(line) = capture.feed(b) {
                lines.push(String::from_utf8(line.to_vec()).unwrap());
            }
        }
        lines
    }

    #[test]
    fn backspace_edits_line() {
        let mut capture = LineCapture::new();
        assert_eq!(capture.feed(b'h'), LineEvent::Echoed(b'h'));
        assert_eq!(capture.feed(b'i'), LineEvent::Echoed(b'i'));
        assert_eq!(capture.feed(BACKSPACE), LineEvent::Erased);
        assert_eq!(capture.feed(b'!'), LineEvent::Echoed(b'!'));
        assert_eq!(capture.feed(b'\n'), LineEvent::LineReady(b"h!"));
        assert!(capture.pending().is_empty());
    }

    #[test]
    fn delete_behaves_like_backspace() {
        let mut capture = LineCapture::new();
        assert_eq!(feed_all(&mut capture, b"abc\x7f\x7fz\r"), vec!["az"]);
    }

    #[test]
    fn backspace_on_empty_line_is_noop() {
        let mut capture = LineCapture::new();
        assert_eq!(capture.feed(BACKSPACE), LineEvent::None);
        assert_eq!(capture.feed(DELETE).echo(), b"");
        assert_eq!(capture.feed(b'\r'), LineEvent::LineEmpty);
    }

    #[test]
    fn crlf_yields_line_then_empty() {
        let mut capture = LineCapture::new();
        for &b in b"ok" {
            capture.feed(b);
        }
        assert_eq!(capture.feed(b'\r'), LineEvent::LineReady(b"ok"));
        assert_eq!(capture.feed(b'\n'), LineEvent::LineEmpty);
    }

    #[test]
    fn lines_are_independent() {
        let mut capture = LineCapture::new();
        assert_eq!(feed_all(&mut capture, b"one\ntwo\n\nthree\r"), vec!["one", "two", "three"]);
    }

    #[test]
    fn overflow_drops_without_echo() {
        let mut capture = LineCapture::new();
        for _ in 0..LineCapture::capacity() {
            assert_eq!(capture.feed(b'x'), LineEvent::Echoed(b'x'));
        }
        assert_eq!(capture.pending().len(), MAX_LINE_LENGTH - 1);

        let event = capture.feed(b'y');
        assert_eq!(event, LineEvent::None);
        assert!(event.echo().is_empty());
        assert_eq!(capture.pending().len(), MAX_LINE_LENGTH - 1);
        assert!(capture.pending().iter().all(|&b| b == b'x'));

        match capture.feed(b'\n') {
            LineEvent::LineReady(line) => assert_eq!(line.len(), MAX_LINE_LENGTH - 1),
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn backspace_after_overflow_frees_room() {
        let mut capture = LineCapture::new();
        for _ in 0..LineCapture::capacity() {
            capture.feed(b'x');
        }
        assert_eq!(capture.feed(BACKSPACE), LineEvent::Erased);
        assert_eq!(capture.feed(b'y'), LineEvent::Echoed(b'y'));
        assert_eq!(capture.pending().last(), Some(&b'y'));
    }

    #[test]
    fn echo_bytes() {
        assert_eq!(LineEvent::Echoed(b'q').echo(), b"q");
        assert_eq!(LineEvent::Erased.echo(), ERASE_SEQUENCE);
        assert!(LineEvent::LineEmpty.echo().is_empty());
    }

    #[test]
    fn discard_resets_cursor() {
        let mut capture = LineCapture::new();
        capture.feed(b'a');
        capture.discard();
        assert_eq!(capture.feed(b'\n'), LineEvent::LineEmpty);
    }
}
