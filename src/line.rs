//! Incremental CRLF line framing.
//!
//! [`LineFramer`] accepts bytes in whatever chunks the transport delivers and
//! hands back complete lines. Chunk boundaries are invisible: the framer only
//! ever looks at its accumulated buffer, so a terminator split across two
//! reads is found as soon as its second half arrives.
//!
//! ```
//! use slirc_engine::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! assert_eq!(framer.feed(b"PING :a\r").count(), 0);
//! let lines: Vec<_> = framer.feed(b"\nPING :b\r\n").map(Result::unwrap).collect();
//! assert_eq!(lines, ["PING :a", "PING :b"]);
//! ```

use bytes::{Buf, BytesMut};
use encoding::Encoding;

use crate::error::ProtocolError;

/// Default framing limit used by [`ClientConfig`](crate::ClientConfig).
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Buffers raw bytes and yields complete lines with the CRLF removed.
///
/// Lines are decoded with the configured encoding (UTF-8 by default);
/// undecodable bytes become U+FFFD. Without a limit the buffer grows until
/// a terminator arrives; [`with_max_line_len`](Self::with_max_line_len)
/// bounds it.
#[derive(Debug)]
pub struct LineFramer {
    pending: BytesMut,
    encoding: &'static Encoding,
    max_line_len: Option<usize>,
    /// Bytes dropped so far from an over-long line still waiting for its CRLF.
    discarding: Option<usize>,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// A UTF-8 framer without a line length limit.
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(512),
            encoding: encoding::UTF_8,
            max_line_len: None,
            discarding: None,
        }
    }

    /// A framer decoding lines with the encoding named by `label`
    /// (any WHATWG label such as `utf-8` or `latin1`).
    pub fn with_encoding(label: &str) -> Result<Self, ProtocolError> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ProtocolError::UnknownEncoding(label.to_string()))?;
        Ok(Self {
            encoding,
            ..Self::new()
        })
    }

    /// Discard lines longer than `limit` bytes (terminator excluded).
    pub fn with_max_line_len(mut self, limit: usize) -> Self {
        self.max_line_len = Some(limit);
        self
    }

    /// The encoding lines are decoded with.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Append `bytes` and iterate over the lines completed so far.
    ///
    /// The iterator is lazy. Lines it does not get to stay buffered and
    /// come out of the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.pending.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop the buffered partial line, returning how many bytes were lost.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.discarding = None;
        dropped
    }

    /// Extract the next complete line from the buffer.
    pub fn next_line(&mut self) -> Option<Result<String, ProtocolError>> {
        loop {
            let Some(pos) = find_crlf(&self.pending) else {
                return self.check_overflow().map(Err);
            };

            let line = self.pending.split_to(pos);
            self.pending.advance(2);

            if self.discarding.take().is_some() {
                // Tail of a line already reported as too long.
                continue;
            }

            if let Some(limit) = self.max_line_len {
                if line.len() > limit {
                    return Some(Err(ProtocolError::MessageTooLong {
                        actual: line.len(),
                        limit,
                    }));
                }
            }

            let (text, _) = self.encoding.decode_without_bom_handling(&line);
            return Some(Ok(text.into_owned()));
        }
    }

    /// Enforce the limit on a line whose terminator has not arrived yet.
    ///
    /// Reports the first overflow of each line; later bytes of the same line
    /// are dropped silently until its CRLF shows up.
    fn check_overflow(&mut self) -> Option<ProtocolError> {
        let limit = self.max_line_len?;

        // A trailing CR may be the first half of the terminator.
        let keep = usize::from(self.pending.last() == Some(&b'\r'));
        let content = self.pending.len() - keep;
        if content <= limit && self.discarding.is_none() {
            return None;
        }
        if content == 0 {
            return None;
        }

        self.pending.advance(content);
        match self.discarding.as_mut() {
            Some(dropped) => {
                *dropped += content;
                None
            }
            None => {
                self.discarding = Some(content);
                Some(ProtocolError::MessageTooLong {
                    actual: content,
                    limit,
                })
            }
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Iterator returned by [`LineFramer::feed`].
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(framer: &mut LineFramer, bytes: &[u8]) -> Vec<String> {
        framer.feed(bytes).map(Result::unwrap).collect()
    }

    #[test]
    fn test_single_line() {
        let mut framer = LineFramer::new();
        assert_eq!(collect(&mut framer, b"PING :x\r\n"), ["PING :x"]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_partial_then_complete() {
        let mut framer = LineFramer::new();
        assert!(collect(&mut framer, b":a!b@c PRIVMSG #x :hel").is_empty());
        assert_eq!(framer.pending_len(), 22);
        assert_eq!(
            collect(&mut framer, b"lo\r\nPING :y\r\n:partial"),
            [":a!b@c PRIVMSG #x :hello", "PING :y"]
        );
        assert_eq!(framer.pending_len(), 8);
    }

    #[test]
    fn test_split_terminator() {
        let mut framer = LineFramer::new();
        assert!(collect(&mut framer, b"PING :x\r").is_empty());
        assert_eq!(collect(&mut framer, b"\n"), ["PING :x"]);
    }

    #[test]
    fn test_empty_feed() {
        let mut framer = LineFramer::new();
        assert!(collect(&mut framer, b"").is_empty());
    }

    #[test]
    fn test_bare_lf_is_not_a_terminator() {
        let mut framer = LineFramer::new();
        assert!(collect(&mut framer, b"a\nb").is_empty());
        assert_eq!(collect(&mut framer, b"\r\n"), ["a\nb"]);
    }

    #[test]
    fn test_lazy_iteration_keeps_unread_lines() {
        let mut framer = LineFramer::new();
        let first = framer.feed(b"one\r\ntwo\r\n").next();
        assert_eq!(first.unwrap().unwrap(), "one");
        assert_eq!(collect(&mut framer, b""), ["two"]);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut framer = LineFramer::new();
        let text = "caf\u{e9}\r\n".as_bytes();
        assert!(collect(&mut framer, &text[..4]).is_empty());
        assert_eq!(collect(&mut framer, &text[4..]), ["caf\u{e9}"]);
    }

    #[test]
    fn test_latin1_encoding() {
        let mut framer = LineFramer::with_encoding("latin1").unwrap();
        assert_eq!(collect(&mut framer, b"caf\xe9\r\n"), ["caf\u{e9}"]);
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            LineFramer::with_encoding("klingon"),
            Err(ProtocolError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_overlong_complete_line() {
        let mut framer = LineFramer::new().with_max_line_len(4);
        let items: Vec<_> = framer.feed(b"12345\r\nok\r\n").collect();
        assert!(matches!(
            items[0],
            Err(ProtocolError::MessageTooLong { actual: 5, limit: 4 })
        ));
        assert_eq!(items[1].as_ref().unwrap(), "ok");
    }

    #[test]
    fn test_overlong_partial_line_is_reported_once() {
        let mut framer = LineFramer::new().with_max_line_len(4);
        let items: Vec<_> = framer.feed(b"123456").collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(framer.pending_len(), 0);

        assert_eq!(framer.feed(b"789\r").count(), 0);
        assert_eq!(collect(&mut framer, b"\nnext\r\n"), ["next"]);
    }

    #[test]
    fn test_line_at_limit_with_split_cr() {
        let mut framer = LineFramer::new().with_max_line_len(4);
        assert_eq!(framer.feed(b"1234\r").count(), 0);
        assert_eq!(collect(&mut framer, b"\n"), ["1234"]);
    }

    #[test]
    fn test_discard() {
        let mut framer = LineFramer::new();
        assert!(collect(&mut framer, b"half a li").is_empty());
        assert_eq!(framer.discard(), 9);
        assert_eq!(collect(&mut framer, b"ne\r\n"), ["ne"]);
    }
}
