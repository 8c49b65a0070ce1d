//! The symbol source the parser consumes.
//!
//! The parser is written against [`TokenSource`] so it can run either over a
//! plain lexed token stream ([`TextTokenSource`]) or over the incremental
//! reconciler, which serves a mix of reused old subtrees and freshly lexed
//! tokens without the parser noticing.

use rill_syntax::{GreenNode, GreenToken, SyntaxKind};
use rill_text::{Cursor, Rope};
use rill_tokenizer::Tokenizer;
use text_size::TextSize;

pub(crate) trait TokenSource {
    /// Kind of the next token. Must not destroy reuse opportunities: a
    /// source holding a reusable subtree answers from the subtree's first
    /// token without decomposing it.
    fn peek_kind(&mut self) -> SyntaxKind;

    /// Consumes and returns the next token.
    fn bump(&mut self) -> GreenToken;

    /// Un-consumes `token`, making it the next token again. Only the token
    /// just returned by [`TokenSource::bump`] may be pushed back, and only
    /// one at a time.
    fn push_back(&mut self, token: GreenToken);

    /// A diagnostic-free, statement-shaped non-terminal sitting exactly at
    /// the current cursor, if the source has one to offer.
    fn peek_node(&mut self) -> Option<GreenNode>;

    /// Takes the non-terminal reported by [`TokenSource::peek_node`],
    /// advancing past its full width.
    fn take_node(&mut self) -> GreenNode;
}

/// Plain token source over a text: lexes the rope front to back.
pub(crate) struct TextTokenSource<'a> {
    tokenizer: Tokenizer<Cursor<'a>>,
    current: Option<GreenToken>,
}

impl<'a> TextTokenSource<'a> {
    pub(crate) fn new(text: &'a Rope) -> Self {
        let tokenizer = Tokenizer::new(Cursor::new(text, TextSize::new(0)));
        Self { tokenizer, current: None }
    }

    fn fill(&mut self) {
        if self.current.is_none() {
            self.current = Some(self.tokenizer.next_token().token);
        }
    }
}

impl TokenSource for TextTokenSource<'_> {
    fn peek_kind(&mut self) -> SyntaxKind {
        self.fill();
        self.current.as_ref().unwrap().kind()
    }

    fn bump(&mut self) -> GreenToken {
        self.fill();
        self.current.take().unwrap()
    }

    fn push_back(&mut self, token: GreenToken) {
        assert!(self.current.is_none(), "only one token of push-back is supported");
        self.current = Some(token);
    }

    fn peek_node(&mut self) -> Option<GreenNode> {
        None
    }

    fn take_node(&mut self) -> GreenNode {
        unreachable!("a plain text source has no subtrees to reuse")
    }
}

#[cfg(test)]
mod tests {
    use rill_syntax::SyntaxKind::*;

    use super::*;

    #[test]
    fn push_back_restores_the_token() {
        let text = Rope::from("print x;");
        let mut source = TextTokenSource::new(&text);
        assert_eq!(source.peek_kind(), PRINT_KW);
        let print = source.bump();
        assert_eq!(source.peek_kind(), NAME);
        source.push_back(print);
        assert_eq!(source.peek_kind(), PRINT_KW);
        assert_eq!(source.bump().kind(), PRINT_KW);
        assert_eq!(source.bump().kind(), NAME);
    }

    #[test]
    fn never_offers_nodes() {
        let text = Rope::from("print x;");
        let mut source = TextTokenSource::new(&text);
        assert!(source.peek_node().is_none());
    }
}
