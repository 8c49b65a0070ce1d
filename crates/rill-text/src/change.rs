use text_size::{TextRange, TextSize};

use crate::Rope;

/// A single text edit: a span of the old text and the length of the text
/// replacing it. All positions are byte offsets into the *old* text.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TextChange {
    span: TextRange,
    new_len: TextSize,
}

impl TextChange {
    pub fn new(span: TextRange, new_len: TextSize) -> Self {
        Self { span, new_len }
    }

    /// An insertion of `len` bytes at `offset`.
    pub fn insert(offset: TextSize, len: TextSize) -> Self {
        Self { span: TextRange::empty(offset), new_len: len }
    }

    /// A deletion of `span`.
    pub fn delete(span: TextRange) -> Self {
        Self { span, new_len: TextSize::new(0) }
    }

    /// The replaced span, in old-text coordinates.
    pub fn span(&self) -> TextRange {
        self.span
    }

    /// Length of the replacement text.
    pub fn new_len(&self) -> TextSize {
        self.new_len
    }

    /// The span the replacement occupies in the new text.
    pub fn new_span(&self) -> TextRange {
        TextRange::at(self.span.start(), self.new_len)
    }

    /// Maps an old-text position at or after the end of the edit into the
    /// new text.
    pub fn shift(&self, old_position: TextSize) -> TextSize {
        debug_assert!(old_position >= self.span.end());
        old_position - self.span.end() + self.span.start() + self.new_len
    }

    /// Builds the new text by three-way rope concatenation.
    ///
    /// # Panics
    ///
    /// Panics if the span is out of bounds of `old` or if `replacement` does
    /// not have the declared length.
    pub fn apply(&self, old: &Rope, replacement: &Rope) -> Rope {
        assert_eq!(replacement.len(), self.new_len, "replacement length mismatch");
        let before = old.slice(TextRange::new(0.into(), self.span.start()));
        let after = old.slice(TextRange::new(self.span.end(), old.len()));
        before.concat(replacement).concat(&after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn apply_replaces_the_span() {
        let old = Rope::from("print first; print second; print third;");
        let change = TextChange::new(range(13, 26), 14.into());
        let new = change.apply(&old, &Rope::from("print middle; "));
        assert_eq!(new, "print first; print middle; print third;");
    }

    #[test]
    fn apply_insertion_and_deletion() {
        let old = Rope::from("print x;");
        let insert = TextChange::insert(8.into(), 9.into());
        assert_eq!(insert.apply(&old, &Rope::from("\nprint y;")), "print x;\nprint y;");

        let delete = TextChange::delete(range(5, 7));
        assert_eq!(delete.apply(&old, &Rope::new()), "print;");
    }

    #[test]
    fn shift_applies_the_delta() {
        let change = TextChange::new(range(4, 8), 2.into());
        assert_eq!(change.shift(8.into()), TextSize::new(6));
        assert_eq!(change.shift(10.into()), TextSize::new(8));

        let grow = TextChange::insert(4.into(), 3.into());
        assert_eq!(grow.shift(4.into()), TextSize::new(7));
    }
}
