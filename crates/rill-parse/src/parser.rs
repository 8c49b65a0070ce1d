use rill_errors::Diagnostic;
use rill_syntax::{GreenNode, GreenToken, GreenTrivia, SyntaxKind, TriviaKind, TriviaPiece};
use text_size::{TextRange, TextSize};

use crate::source::TokenSource;

pub(crate) struct Parser<S> {
    source: S,
}

impl<S: TokenSource> Parser<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source }
    }

    pub(crate) fn peek_kind(&mut self) -> SyntaxKind {
        self.source.peek_kind()
    }

    pub(crate) fn at(&mut self, kind: SyntaxKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn bump(&mut self) -> GreenToken {
        self.source.bump()
    }

    pub(crate) fn push_back(&mut self, token: GreenToken) {
        self.source.push_back(token);
    }

    /// The incremental reuse hook: a whole, diagnostic-free statement from
    /// the old tree sitting exactly at the cursor, or `None`.
    pub(crate) fn try_reuse_statement(&mut self) -> Option<GreenNode> {
        self.source.peek_node()?;
        Some(self.source.take_node())
    }

    /// Consumes the expected token kind, recovering if it is absent.
    ///
    /// On a mismatch, tokens are consumed one at a time and re-attached as
    /// accumulated trivia (each one's own trivia plus the token itself,
    /// wrapped as a skipped-token piece carrying a diagnostic) until the
    /// expected kind turns up, which is returned with the accumulated
    /// trivia prepended, or end of input is reached, which synthesizes a
    /// zero-width missing token carrying the accumulated trivia. No input
    /// text is ever discarded.
    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> GreenToken {
        if self.at(kind) {
            return self.bump();
        }
        let mut pieces: Vec<TriviaPiece> = Vec::new();
        loop {
            if self.at(kind) {
                let token = self.bump();
                return token.with_prepended_leading(pieces);
            }
            if self.at(SyntaxKind::EOF) {
                let at_end = pieces.iter().map(TriviaPiece::len).sum();
                let diagnostic = Diagnostic::error(
                    format!("Expected {}", kind.describe()),
                    TextRange::empty(at_end),
                );
                return GreenToken::missing(kind, GreenTrivia::new(pieces), diagnostic);
            }
            let skipped = self.bump();
            attach_skipped(&mut pieces, &skipped, kind);
        }
    }
}

/// A zero-width missing token with no trivia, for tolerated empty slots in
/// lists and expressions.
pub(crate) fn missing_token(kind: SyntaxKind, message: &str) -> GreenToken {
    let diagnostic = Diagnostic::error(message, TextRange::empty(TextSize::new(0)));
    GreenToken::missing(kind, GreenTrivia::empty(), diagnostic)
}

/// Flattens `token` onto `pieces`: its leading trivia, then the token text
/// as a skipped-token piece with an unexpected-token diagnostic (plus the
/// token's own diagnostics, re-based to the piece), then its trailing
/// trivia.
fn attach_skipped(pieces: &mut Vec<TriviaPiece>, token: &GreenToken, expected: SyntaxKind) {
    pieces.extend(token.leading().pieces().iter().cloned());

    let mut diagnostics = vec![Diagnostic::error(
        format!("Expected {}, found '{}'", expected.describe(), token.text()),
        TextRange::at(TextSize::new(0), token.width()),
    )];
    let leading_len = token.leading().len();
    for diagnostic in token.diagnostics() {
        // The token's diagnostics are relative to its full start; the piece
        // holds only the token text.
        let start = diagnostic.range().start().checked_sub(leading_len).unwrap_or_default();
        let end = diagnostic.range().end().checked_sub(leading_len).unwrap_or(start);
        diagnostics.push(Diagnostic::error(
            diagnostic.message().to_string(),
            TextRange::new(start, end.max(start)),
        ));
    }
    pieces.push(TriviaPiece::with_diagnostics(TriviaKind::SkippedToken, token.text(), diagnostics));

    pieces.extend(token.trailing().pieces().iter().cloned());
}
