use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use text_size::{TextRange, TextSize};

/// Concatenations below this many bytes collapse into a single flat leaf,
/// bounding tree depth for tiny ropes.
const FUSE_THRESHOLD: u32 = 32;

/// An immutable rope of text.
///
/// Ropes are cheap to clone and share; concatenation is O(1) and substring
/// extraction shares the backing storage instead of copying. Equality and
/// hashing are by character sequence, never by tree shape. Offsets are UTF-8
/// byte offsets and the total length is capped at `u32::MAX` bytes; an
/// operation that would exceed the cap panics rather than truncating.
#[derive(Clone)]
pub struct Rope {
    repr: Arc<Repr>,
}

enum Repr {
    /// A whole backing string.
    Flat(Arc<str>),
    /// A shared slice of a backing string, produced by substring extraction.
    Slice { base: Arc<str>, range: TextRange },
    Concat { left: Rope, right: Rope, len: TextSize },
}

impl Rope {
    pub fn new() -> Self {
        Self { repr: Arc::new(Repr::Flat("".into())) }
    }

    pub fn len(&self) -> TextSize {
        match &*self.repr {
            Repr::Flat(text) => TextSize::new(text.len() as u32),
            Repr::Slice { range, .. } => range.len(),
            Repr::Concat { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == TextSize::new(0)
    }

    /// Returns `true` if both ropes share the same representation node.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.repr, &b.repr)
    }

    /// Concatenates two ropes in O(1).
    ///
    /// Concatenating with an empty rope returns the other operand unchanged.
    /// Small results are fused into a single flat leaf.
    ///
    /// # Panics
    ///
    /// Panics if the combined length exceeds the maximum representable
    /// length.
    pub fn concat(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let len = u64::from(u32::from(self.len())) + u64::from(u32::from(other.len()));
        assert!(len <= u64::from(u32::MAX), "rope length overflow: {len} bytes");
        let len = TextSize::new(len as u32);

        if u32::from(len) < FUSE_THRESHOLD {
            let mut text = String::with_capacity(u32::from(len) as usize);
            self.write_into(&mut text);
            other.write_into(&mut text);
            return Self::from(text);
        }

        Self { repr: Arc::new(Repr::Concat { left: self.clone(), right: other.clone(), len }) }
    }

    /// Extracts `range` as a new rope, sharing storage where possible.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds or does not fall on char
    /// boundaries.
    pub fn slice(&self, range: TextRange) -> Self {
        assert!(range.end() <= self.len(), "slice {range:?} out of bounds of {:?}", self.len());
        if range.is_empty() {
            return Self::new();
        }
        if range == TextRange::new(0.into(), self.len()) {
            return self.clone();
        }
        match &*self.repr {
            Repr::Flat(text) => {
                let _ = &text[std::ops::Range::<usize>::from(range)];
                Self { repr: Arc::new(Repr::Slice { base: Arc::clone(text), range }) }
            }
            Repr::Slice { base, range: outer } => {
                let range = range + outer.start();
                let _ = &base[std::ops::Range::<usize>::from(range)];
                Self { repr: Arc::new(Repr::Slice { base: Arc::clone(base), range }) }
            }
            Repr::Concat { left, right, .. } => {
                let mid = left.len();
                if range.end() <= mid {
                    left.slice(range)
                } else if range.start() >= mid {
                    right.slice(range - mid)
                } else {
                    let left = left.slice(TextRange::new(range.start(), mid));
                    let right = right.slice(TextRange::new(0.into(), range.end() - mid));
                    left.concat(&right)
                }
            }
        }
    }

    /// Returns the char starting at `offset`, descending concatenation nodes
    /// in O(depth).
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside `[0, len)` or not a char boundary.
    pub fn char_at(&self, offset: TextSize) -> char {
        assert!(offset < self.len(), "offset {offset:?} out of bounds of {:?}", self.len());
        let (chunk, chunk_offset) = self.chunk_at(offset);
        chunk[usize::from(chunk_offset)..].chars().next().unwrap()
    }

    /// Returns the leaf chunk containing `offset` and the offset within it.
    pub(crate) fn chunk_at(&self, offset: TextSize) -> (&str, TextSize) {
        debug_assert!(offset < self.len());
        match &*self.repr {
            Repr::Flat(text) => (text, offset),
            Repr::Slice { base, range } => (&base[std::ops::Range::<usize>::from(*range)], offset),
            Repr::Concat { left, right, .. } => {
                let mid = left.len();
                if offset < mid { left.chunk_at(offset) } else { right.chunk_at(offset - mid) }
            }
        }
    }

    /// Iterates the leaf chunks left to right.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks { stack: vec![self] }
    }

    fn write_into(&self, out: &mut String) {
        for chunk in self.chunks() {
            out.push_str(chunk);
        }
    }

    /// At most the first `max` bytes of the content, backing off to the
    /// nearest char boundary.
    pub fn to_limited_string(&self, max: TextSize) -> String {
        let mut out = String::with_capacity(usize::from(max.min(self.len())));
        for chunk in self.chunks() {
            let budget = usize::from(max) - out.len();
            if budget == 0 {
                break;
            }
            if chunk.len() <= budget {
                out.push_str(chunk);
            } else {
                let mut cut = budget;
                while !chunk.is_char_boundary(cut) {
                    cut -= 1;
                }
                out.push_str(&chunk[..cut]);
                break;
            }
        }
        out
    }
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Rope {
    fn from(text: &str) -> Self {
        Self { repr: Arc::new(Repr::Flat(text.into())) }
    }
}

impl From<String> for Rope {
    fn from(text: String) -> Self {
        Self { repr: Arc::new(Repr::Flat(text.into())) }
    }
}

impl From<Arc<str>> for Rope {
    fn from(text: Arc<str>) -> Self {
        Self { repr: Arc::new(Repr::Flat(text)) }
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 32;
        let mut preview = String::new();
        for chunk in self.chunks() {
            preview.push_str(chunk);
            if preview.len() > PREVIEW {
                break;
            }
        }
        if usize::from(self.len()) > preview.len() || preview.len() > PREVIEW {
            let mut cut = PREVIEW.min(preview.len());
            while !preview.is_char_boundary(cut) {
                cut -= 1;
            }
            preview.truncate(cut);
            write!(f, "Rope({preview:?}.., len = {:?})", self.len())
        } else {
            write!(f, "Rope({preview:?})")
        }
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if Self::ptr_eq(self, other) {
            return true;
        }
        let mut lhs = self.chunks();
        let mut rhs = other.chunks();
        let mut a: &[u8] = &[];
        let mut b: &[u8] = &[];
        loop {
            if a.is_empty() {
                a = match lhs.next() {
                    Some(chunk) => chunk.as_bytes(),
                    None => return b.is_empty() && rhs.next().is_none(),
                };
                continue;
            }
            if b.is_empty() {
                b = match rhs.next() {
                    Some(chunk) => chunk.as_bytes(),
                    None => return false,
                };
                continue;
            }
            let n = a.len().min(b.len());
            if a[..n] != b[..n] {
                return false;
            }
            a = &a[n..];
            b = &b[n..];
        }
    }
}

impl Eq for Rope {}

impl Hash for Rope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Byte-stream the content so shape never affects the hash.
        for chunk in self.chunks() {
            state.write(chunk.as_bytes());
        }
        state.write_u8(0xff);
    }
}

impl PartialEq<str> for Rope {
    fn eq(&self, other: &str) -> bool {
        *self == Self::from(other)
    }
}

impl PartialEq<&str> for Rope {
    fn eq(&self, other: &&str) -> bool {
        *self == Self::from(*other)
    }
}

/// Left-to-right iterator over a rope's leaf chunks. Skips empty leaves.
#[derive(Clone)]
pub struct Chunks<'a> {
    stack: Vec<&'a Rope>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rope = self.stack.pop()?;
            match &*rope.repr {
                Repr::Flat(text) => {
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
                Repr::Slice { base, range } => {
                    if !range.is_empty() {
                        return Some(&base[std::ops::Range::<usize>::from(*range)]);
                    }
                }
                Repr::Concat { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of(rope: &Rope) -> u64 {
        let mut hasher = DefaultHasher::new();
        rope.hash(&mut hasher);
        hasher.finish()
    }

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn roundtrip() {
        let rope = Rope::from("print x;");
        assert_eq!(rope.to_string(), "print x;");
        assert_eq!(rope.len(), TextSize::new(8));
    }

    #[test]
    fn concat_with_empty_shares_the_other_operand() {
        let rope = Rope::from("while x do od");
        let empty = Rope::new();
        assert!(Rope::ptr_eq(&rope.concat(&empty), &rope));
        assert!(Rope::ptr_eq(&empty.concat(&rope), &rope));
    }

    #[test]
    fn content_equality_ignores_shape() {
        let a = Rope::from("let value = 100; print value more;");
        let b = Rope::from("let value = 100; ").concat(&Rope::from("print value more;"));
        let c = Rope::from("let value = ")
            .concat(&Rope::from("100; print value "))
            .concat(&Rope::from("more;"));
        assert!(u32::from(b.len()) >= FUSE_THRESHOLD, "pieces must be big enough not to fuse");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&b), hash_of(&c));
    }

    #[test]
    fn concat_is_associative_in_content() {
        let a = Rope::from("abcdefghijklmnopqrstuvwxyz");
        let b = Rope::from("0123456789_0123456789_0123456789");
        let c = Rope::from("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let left = a.concat(&b).concat(&c);
        let right = a.concat(&b.concat(&c));
        assert_eq!(left, right);
        assert_eq!(hash_of(&left), hash_of(&right));
    }

    #[test]
    fn small_concats_fuse() {
        let rope = Rope::from("ab").concat(&Rope::from("cd"));
        assert_eq!(rope, "abcd");
        // A fused rope is a single chunk.
        assert_eq!(rope.chunks().count(), 1);
    }

    #[test]
    fn slicing_shares_storage() {
        let padding = "x".repeat(FUSE_THRESHOLD as usize);
        let rope = Rope::from(format!("{padding}print a;"));
        let sliced = rope.slice(range(FUSE_THRESHOLD, FUSE_THRESHOLD + 8));
        assert_eq!(sliced, "print a;");

        let resliced = sliced.slice(range(0, 5));
        assert_eq!(resliced, "print");
    }

    #[test]
    fn slice_across_concat_boundary() {
        let rope =
            Rope::from("first chunk of text and more").concat(&Rope::from(" second chunk here"));
        assert_eq!(rope.slice(range(6, 34)), "chunk of text and more seco");
    }

    #[test]
    fn char_at_descends() {
        let rope = Rope::from("abcdefghijklmnopqrstuvwxyz").concat(&Rope::from("0123456789"));
        assert_eq!(rope.char_at(TextSize::new(0)), 'a');
        assert_eq!(rope.char_at(TextSize::new(25)), 'z');
        assert_eq!(rope.char_at(TextSize::new(26)), '0');
        assert_eq!(rope.char_at(TextSize::new(35)), '9');
    }

    #[test]
    fn limited_stringification() {
        let rope = Rope::from("abcdefghijklmnopqrstuvwxyz").concat(&Rope::from("0123456789"));
        assert_eq!(rope.to_limited_string(TextSize::new(4)), "abcd");
        assert_eq!(rope.to_limited_string(TextSize::new(28)), "abcdefghijklmnopqrstuvwxyz01");
        assert_eq!(rope.to_limited_string(TextSize::new(100)), rope.to_string());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn char_at_out_of_bounds() {
        let rope = Rope::from("ab");
        rope.char_at(TextSize::new(2));
    }

    #[test]
    #[should_panic(expected = "rope length overflow")]
    fn length_overflow_is_fatal() {
        // Doubling keeps memory O(1) per step, so the 4 GiB cap is reachable.
        let mut rope = Rope::from("x".repeat(1 << 16));
        for _ in 0..16 {
            rope = rope.concat(&rope);
        }
    }
}
