use text_size::TextSize;

use crate::Rope;

pub const EOF_CHAR: char = '\0';

/// A char-level reading position inside a [`Rope`].
///
/// Supports arbitrary lookahead without consuming, one char of push-back, and
/// reports the absolute offset of the next unconsumed char.
pub struct Cursor<'a> {
    rope: &'a Rope,
    /// Remainder of the leaf chunk currently being read.
    chunk: std::str::Chars<'a>,
    /// Absolute offset of the next unconsumed char.
    offset: TextSize,
    pushed: Option<char>,
}

impl<'a> Cursor<'a> {
    /// Starts reading `rope` at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is beyond the end of the rope.
    pub fn new(rope: &'a Rope, offset: TextSize) -> Self {
        assert!(offset <= rope.len(), "cursor offset {offset:?} beyond {:?}", rope.len());
        let chunk = if offset < rope.len() {
            let (chunk, chunk_offset) = rope.chunk_at(offset);
            chunk[usize::from(chunk_offset)..].chars()
        } else {
            "".chars()
        };
        Self { rope, chunk, offset, pushed: None }
    }

    /// Absolute offset of the next unconsumed char.
    pub fn offset(&self) -> TextSize {
        self.offset
    }

    pub fn is_eof(&self) -> bool {
        self.peek() == EOF_CHAR
    }

    /// Next char without consuming it, or [`EOF_CHAR`] at the end.
    pub fn peek(&self) -> char {
        self.peek_nth(0)
    }

    /// Char after the next one, without consuming anything.
    pub fn second(&self) -> char {
        self.peek_nth(1)
    }

    fn peek_nth(&self, n: usize) -> char {
        let mut n = n;
        if let Some(c) = self.pushed {
            if n == 0 {
                return c;
            }
            n -= 1;
        }
        for c in self.chunk.clone() {
            if n == 0 {
                return c;
            }
            n -= 1;
        }
        let mut pos = self.after_chunk_offset();
        while pos < self.rope.len() {
            let (chunk, chunk_offset) = self.rope.chunk_at(pos);
            let rest = &chunk[usize::from(chunk_offset)..];
            for c in rest.chars() {
                if n == 0 {
                    return c;
                }
                n -= 1;
            }
            pos += TextSize::new(rest.len() as u32);
        }
        EOF_CHAR
    }

    /// Consumes and returns the next char, or [`EOF_CHAR`] at the end.
    pub fn bump(&mut self) -> char {
        if let Some(c) = self.pushed.take() {
            self.offset += TextSize::of(c);
            return c;
        }
        loop {
            if let Some(c) = self.chunk.next() {
                self.offset += TextSize::of(c);
                return c;
            }
            if self.offset >= self.rope.len() {
                return EOF_CHAR;
            }
            let (chunk, chunk_offset) = self.rope.chunk_at(self.offset);
            self.chunk = chunk[usize::from(chunk_offset)..].chars();
        }
    }

    /// Un-consumes `c`, making it the next char again. At most one char can
    /// be pushed back at a time.
    pub fn push_back(&mut self, c: char) {
        assert!(self.pushed.is_none(), "only one char of push-back is supported");
        assert_ne!(c, EOF_CHAR);
        self.offset -= TextSize::of(c);
        self.pushed = Some(c);
    }

    fn after_chunk_offset(&self) -> TextSize {
        let pushed = self.pushed.map_or(TextSize::new(0), TextSize::of);
        self.offset + pushed + TextSize::new(self.chunk.as_str().len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_chunks() {
        let rope = Rope::from("first chunk that is long enough").concat(&Rope::from(" and more"));
        let mut cursor = Cursor::new(&rope, TextSize::new(0));
        let mut collected = String::new();
        loop {
            let c = cursor.bump();
            if c == EOF_CHAR {
                break;
            }
            collected.push(c);
        }
        assert_eq!(collected, rope.to_string());
        assert_eq!(cursor.offset(), rope.len());
    }

    #[test]
    fn peek_does_not_consume() {
        let rope = Rope::from("ab");
        let mut cursor = Cursor::new(&rope, TextSize::new(0));
        assert_eq!(cursor.peek(), 'a');
        assert_eq!(cursor.second(), 'b');
        assert_eq!(cursor.offset(), TextSize::new(0));
        assert_eq!(cursor.bump(), 'a');
        assert_eq!(cursor.peek(), 'b');
        assert_eq!(cursor.second(), EOF_CHAR);
    }

    #[test]
    fn second_crosses_chunk_boundary() {
        let rope = Rope::from("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").concat(&Rope::from("bc"));
        let mut cursor = Cursor::new(&rope, TextSize::new(31));
        assert_eq!(cursor.peek(), 'a');
        assert_eq!(cursor.second(), 'b');
        cursor.bump();
        assert_eq!(cursor.peek(), 'b');
        assert_eq!(cursor.second(), 'c');
    }

    #[test]
    fn push_back_restores_the_char() {
        let rope = Rope::from("/x");
        let mut cursor = Cursor::new(&rope, TextSize::new(0));
        assert_eq!(cursor.bump(), '/');
        assert_eq!(cursor.offset(), TextSize::new(1));
        cursor.push_back('/');
        assert_eq!(cursor.offset(), TextSize::new(0));
        assert_eq!(cursor.peek(), '/');
        assert_eq!(cursor.second(), 'x');
        assert_eq!(cursor.bump(), '/');
        assert_eq!(cursor.bump(), 'x');
    }

    #[test]
    fn starts_mid_rope() {
        let rope = Rope::from("print value;");
        let mut cursor = Cursor::new(&rope, TextSize::new(6));
        assert_eq!(cursor.bump(), 'v');
        assert_eq!(cursor.offset(), TextSize::new(7));
    }
}
