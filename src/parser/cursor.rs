//! Character cursor over template source.
//!
//! Tracks a byte position into a `&str` and hands out `char`s. Positions
//! are always on a char boundary.

pub(super) struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Current byte offset into the source.
    #[inline]
    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(super) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    #[inline]
    pub(super) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume `expected` if it is the next character.
    pub(super) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume characters while `pred` holds and return the consumed slice.
    pub(super) fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !pred(c))
            .unwrap_or(self.source.len() - start);
        self.pos += len;
        &self.source[start..self.pos]
    }

    /// Unconsumed remainder of the source.
    #[inline]
    pub(super) fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_tracks_byte_offsets() {
        let mut cursor = Cursor::new("é$");
        assert_eq!(cursor.bump(), Some('é'));
        assert_eq!(cursor.pos(), 2);
        assert!(cursor.eat('$'));
        assert_eq!(cursor.peek(), None);
        assert_eq!(cursor.bump(), None);
    }

    #[test]
    fn test_eat_while_stops_at_mismatch() {
        let mut cursor = Cursor::new("track_no%rest");
        assert_eq!(cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_'), "track_no");
        assert_eq!(cursor.rest(), "%rest");
    }

    #[test]
    fn test_eat_while_to_end() {
        let mut cursor = Cursor::new("abc");
        assert_eq!(cursor.eat_while(|c| c.is_ascii_alphabetic()), "abc");
        assert_eq!(cursor.pos(), 3);
        assert_eq!(cursor.eat_while(|_| true), "");
    }
}
