//! Full and incremental parsing entry points.
//!
//! [`parse`] runs the lexer and parser over a whole text. [`with_change`]
//! applies exactly one edit: it reuses every unaffected subtree of the old
//! tree and lexes only the affected region, producing a tree guaranteed to
//! be content-equal to re-parsing the edited text from scratch.

mod blend;
mod grammar;
mod parser;
mod source;
#[cfg(test)]
mod tests;

use rill_syntax::SyntaxTree;
pub use rill_text::{Rope, TextChange};
use text_size::TextSize;

/// Parses a full text into a positioned tree.
pub fn parse(text: impl Into<Rope>) -> SyntaxTree {
    let text = text.into();
    let root = {
        let mut parser = parser::Parser::new(source::TextTokenSource::new(&text));
        grammar::program(&mut parser)
    };
    SyntaxTree::new(text, root)
}

/// Applies one edit to a previously parsed tree.
///
/// The replacement text must have exactly the length the change declares;
/// anything else is an input-contract error. The change's span must lie
/// within the old text.
pub fn with_change(
    tree: &SyntaxTree,
    change: TextChange,
    replacement: &str,
) -> Result<SyntaxTree, ReplacementLengthMismatch> {
    let actual = TextSize::new(replacement.len() as u32);
    if actual != change.new_len() {
        return Err(ReplacementLengthMismatch { declared: change.new_len(), actual });
    }
    assert!(
        change.span().end() <= tree.text().len(),
        "change span {:?} is outside the old text",
        change.span(),
    );

    let new_text = change.apply(tree.text(), &Rope::from(replacement));
    let root = {
        let mut parser =
            parser::Parser::new(blend::Blender::new(tree.green_root(), &new_text, &change));
        grammar::program(&mut parser)
    };
    Ok(SyntaxTree::new(new_text, root))
}

/// The replacement text's length did not match the length declared by the
/// [`TextChange`].
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("replacement text is {actual:?} bytes but the change declared {declared:?}")]
pub struct ReplacementLengthMismatch {
    pub declared: TextSize,
    pub actual: TextSize,
}
