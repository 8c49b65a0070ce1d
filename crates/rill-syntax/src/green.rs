//! The green (structural) layer: immutable, position-independent nodes.
//!
//! Green nodes carry widths and diagnostics but no absolute positions, which
//! is what makes them reusable across edits. They are shared by reference
//! between any number of trees; equality and hashing are structural.

use std::fmt;
use std::hash::{Hash, Hasher};

use rill_errors::Diagnostic;
use text_size::TextSize;
use triomphe::{Arc, ThinArc};

use crate::SyntaxKind;

/// Node-or-token wrapper used throughout the tree.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }
}

pub type Green = NodeOrToken<GreenNode, GreenToken>;

impl Green {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn full_width(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.full_width(),
            NodeOrToken::Token(token) => token.full_width(),
        }
    }

    pub fn contains_diagnostics(&self) -> bool {
        match self {
            NodeOrToken::Node(node) => node.contains_diagnostics(),
            NodeOrToken::Token(token) => token.contains_diagnostics(),
        }
    }

    pub fn leading_trivia_width(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.leading_trivia_width(),
            NodeOrToken::Token(token) => token.leading().len(),
        }
    }

    pub fn trailing_trivia_width(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.trailing_trivia_width(),
            NodeOrToken::Token(token) => token.trailing().len(),
        }
    }

    /// Whether the last trivia attached to this element is a newline. The
    /// incremental reconciler uses this: trailing trivia scanning halts at a
    /// newline unconditionally, so no lexical merge can reach past one.
    pub fn ends_in_newline(&self) -> bool {
        match self {
            NodeOrToken::Node(node) => {
                node.children().iter().rev().find(|c| c.full_width() > TextSize::new(0)).is_some_and(
                    Self::ends_in_newline,
                )
            }
            NodeOrToken::Token(token) => {
                token.trailing().pieces().last().is_some_and(|p| p.kind() == TriviaKind::Newline)
            }
        }
    }
}

/// An interior structural node.
#[derive(Clone)]
pub struct GreenNode(Arc<GreenNodeData>);

struct GreenNodeData {
    kind: SyntaxKind,
    children: Box<[Green]>,
    /// Diagnostics owned by this node itself, relative to its full start.
    diagnostics: Box<[Diagnostic]>,
    full_width: TextSize,
    contains_diagnostics: bool,
}

impl GreenNode {
    /// Assembles a node from already-built children, computing width and
    /// diagnostic info bottom-up. Never inspects source text.
    pub fn new(kind: SyntaxKind, children: Vec<Green>) -> Self {
        Self::with_diagnostics(kind, children, Vec::new())
    }

    pub fn with_diagnostics(
        kind: SyntaxKind,
        children: Vec<Green>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let full_width = children.iter().map(Green::full_width).sum();
        let contains_diagnostics =
            !diagnostics.is_empty() || children.iter().any(Green::contains_diagnostics);
        Self(Arc::new(GreenNodeData {
            kind,
            children: children.into(),
            diagnostics: diagnostics.into(),
            full_width,
            contains_diagnostics,
        }))
    }

    pub fn kind(&self) -> SyntaxKind {
        self.0.kind
    }

    pub fn children(&self) -> &[Green] {
        &self.0.children
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0.diagnostics
    }

    /// Width including all trivia.
    pub fn full_width(&self) -> TextSize {
        self.0.full_width
    }

    /// Width excluding the leading trivia of the first token and the
    /// trailing trivia of the last token.
    pub fn width(&self) -> TextSize {
        self.full_width() - self.leading_trivia_width() - self.trailing_trivia_width()
    }

    /// True if this node or any descendant carries a diagnostic. Erroneous
    /// subtrees are never reused incrementally.
    pub fn contains_diagnostics(&self) -> bool {
        self.0.contains_diagnostics
    }

    pub fn leading_trivia_width(&self) -> TextSize {
        self.children()
            .iter()
            .find(|c| c.full_width() > TextSize::new(0))
            .map_or(TextSize::new(0), Green::leading_trivia_width)
    }

    pub fn trailing_trivia_width(&self) -> TextSize {
        self.children()
            .iter()
            .rev()
            .find(|c| c.full_width() > TextSize::new(0))
            .map_or(TextSize::new(0), Green::trailing_trivia_width)
    }

    /// Reference identity, used to observe cross-edit sharing.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
            || (self.0.kind == other.0.kind
                && self.0.full_width == other.0.full_width
                && self.0.diagnostics == other.0.diagnostics
                && self.0.children == other.0.children)
    }
}

impl Eq for GreenNode {}

impl Hash for GreenNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.kind.hash(state);
        self.0.children.hash(state);
        self.0.diagnostics.hash(state);
    }
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("kind", &self.kind())
            .field("full_width", &self.full_width())
            .field("children", &self.children().len())
            .finish_non_exhaustive()
    }
}

/// A structural token with its attached trivia.
#[derive(Clone)]
pub struct GreenToken(Arc<GreenTokenData>);

struct GreenTokenData {
    kind: SyntaxKind,
    /// Token text, trivia excluded.
    text: Box<str>,
    leading: GreenTrivia,
    trailing: GreenTrivia,
    /// Diagnostics relative to the token's full start.
    diagnostics: Box<[Diagnostic]>,
    missing: bool,
}

impl GreenToken {
    pub fn new(kind: SyntaxKind, text: &str, leading: GreenTrivia, trailing: GreenTrivia) -> Self {
        Self::with_diagnostics(kind, text, leading, trailing, Vec::new())
    }

    pub fn with_diagnostics(
        kind: SyntaxKind,
        text: &str,
        leading: GreenTrivia,
        trailing: GreenTrivia,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self(Arc::new(GreenTokenData {
            kind,
            text: text.into(),
            leading,
            trailing,
            diagnostics: diagnostics.into(),
            missing: false,
        }))
    }

    /// A zero-width synthesized token standing in for a required symbol the
    /// parser could not find.
    pub fn missing(kind: SyntaxKind, leading: GreenTrivia, diagnostic: Diagnostic) -> Self {
        Self(Arc::new(GreenTokenData {
            kind,
            text: "".into(),
            leading,
            trailing: GreenTrivia::empty(),
            diagnostics: vec![diagnostic].into(),
            missing: true,
        }))
    }

    /// A copy of this token with extra trivia pieces in front of its leading
    /// trivia. The token's own diagnostics are re-based past the insertion.
    pub fn with_prepended_leading(&self, mut pieces: Vec<TriviaPiece>) -> Self {
        if pieces.is_empty() {
            return self.clone();
        }
        let added: TextSize = pieces.iter().map(TriviaPiece::len).sum();
        pieces.extend(self.leading().pieces().iter().cloned());
        let diagnostics =
            self.diagnostics().iter().map(|d| d.with_offset(added)).collect::<Vec<_>>();
        Self(Arc::new(GreenTokenData {
            kind: self.kind(),
            text: self.text().into(),
            leading: GreenTrivia::new(pieces),
            trailing: self.trailing().clone(),
            diagnostics: diagnostics.into(),
            missing: self.is_missing(),
        }))
    }

    pub fn kind(&self) -> SyntaxKind {
        self.0.kind
    }

    /// Token text, trivia excluded.
    pub fn text(&self) -> &str {
        &self.0.text
    }

    pub fn leading(&self) -> &GreenTrivia {
        &self.0.leading
    }

    pub fn trailing(&self) -> &GreenTrivia {
        &self.0.trailing
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0.diagnostics
    }

    pub fn is_missing(&self) -> bool {
        self.0.missing
    }

    pub fn width(&self) -> TextSize {
        TextSize::new(self.text().len() as u32)
    }

    pub fn full_width(&self) -> TextSize {
        self.leading().len() + self.width() + self.trailing().len()
    }

    pub fn contains_diagnostics(&self) -> bool {
        !self.0.diagnostics.is_empty()
            || self.leading().contains_diagnostics()
            || self.trailing().contains_diagnostics()
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for GreenToken {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
            || (self.0.kind == other.0.kind
                && self.0.missing == other.0.missing
                && self.0.text == other.0.text
                && self.0.leading == other.0.leading
                && self.0.trailing == other.0.trailing
                && self.0.diagnostics == other.0.diagnostics)
    }
}

impl Eq for GreenToken {}

impl Hash for GreenToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.kind.hash(state);
        self.0.text.hash(state);
        self.0.missing.hash(state);
        self.0.leading.hash(state);
        self.0.trailing.hash(state);
        self.0.diagnostics.hash(state);
    }
}

impl fmt::Debug for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenToken")
            .field("kind", &self.kind())
            .field("text", &self.text())
            .field("missing", &self.is_missing())
            .finish_non_exhaustive()
    }
}

/// The trivia attached to one side of a token, as a shared piece list.
#[derive(Clone)]
pub struct GreenTrivia {
    ptr: Option<ThinArc<TriviaHeader, TriviaPiece>>,
}

#[derive(Debug)]
struct TriviaHeader {
    len: TextSize,
    contains_diagnostics: bool,
}

impl GreenTrivia {
    pub fn new(pieces: Vec<TriviaPiece>) -> Self {
        if pieces.is_empty() {
            return Self::empty();
        }
        let len = pieces.iter().map(TriviaPiece::len).sum();
        let contains_diagnostics = pieces.iter().any(|piece| !piece.diagnostics().is_empty());
        let header = TriviaHeader { len, contains_diagnostics };
        Self { ptr: Some(ThinArc::from_header_and_iter(header, pieces.into_iter())) }
    }

    pub const fn empty() -> Self {
        Self { ptr: None }
    }

    pub fn len(&self) -> TextSize {
        match &self.ptr {
            None => TextSize::new(0),
            Some(ptr) => ptr.header.header.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn pieces(&self) -> &[TriviaPiece] {
        match &self.ptr {
            None => &[],
            Some(ptr) => &ptr.slice,
        }
    }

    pub fn contains_diagnostics(&self) -> bool {
        match &self.ptr {
            None => false,
            Some(ptr) => ptr.header.header.contains_diagnostics,
        }
    }
}

impl PartialEq for GreenTrivia {
    fn eq(&self, other: &Self) -> bool {
        self.pieces() == other.pieces()
    }
}

impl Eq for GreenTrivia {}

impl Hash for GreenTrivia {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pieces().hash(state);
    }
}

impl fmt::Debug for GreenTrivia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pieces()).finish()
    }
}

/// Kinds of trivia.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TriviaKind {
    /// A run of spaces.
    Spaces,
    /// A run of tabs.
    Tabs,
    /// A run mixing spaces and tabs.
    MixedWhitespace,
    /// A single newline.
    Newline,
    /// A `//` comment. In leading position the terminating newline is part
    /// of the piece; in trailing position it is not.
    Comment,
    /// A token the parser skipped during error recovery, preserved as
    /// trivia so no input text is ever lost.
    SkippedToken,
}

/// One trivia fragment: its kind, its text, and any diagnostics attached to
/// it (relative to the piece's own start). Trivia has no children.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TriviaPiece {
    kind: TriviaKind,
    text: Box<str>,
    diagnostics: Box<[Diagnostic]>,
}

impl TriviaPiece {
    pub fn new(kind: TriviaKind, text: &str) -> Self {
        Self { kind, text: text.into(), diagnostics: Box::new([]) }
    }

    pub fn with_diagnostics(kind: TriviaKind, text: &str, diagnostics: Vec<Diagnostic>) -> Self {
        Self { kind, text: text.into(), diagnostics: diagnostics.into() }
    }

    pub fn kind(&self) -> TriviaKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> TextSize {
        TextSize::new(self.text.len() as u32)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Collects every diagnostic in `green`, re-based to absolute coordinates,
/// in document order.
pub(crate) fn collect_diagnostics(green: &Green, full_start: TextSize, out: &mut Vec<Diagnostic>) {
    match green {
        NodeOrToken::Node(node) => {
            if !node.contains_diagnostics() {
                return;
            }
            for diagnostic in node.diagnostics() {
                out.push(diagnostic.with_offset(full_start));
            }
            let mut offset = full_start;
            for child in node.children() {
                collect_diagnostics(child, offset, out);
                offset += child.full_width();
            }
        }
        NodeOrToken::Token(token) => {
            if !token.contains_diagnostics() {
                return;
            }
            let mut offset = full_start;
            for piece in token.leading().pieces() {
                for diagnostic in piece.diagnostics() {
                    out.push(diagnostic.with_offset(offset));
                }
                offset += piece.len();
            }
            for diagnostic in token.diagnostics() {
                out.push(diagnostic.with_offset(full_start));
            }
            let mut offset = full_start + token.leading().len() + token.width();
            for piece in token.trailing().pieces() {
                for diagnostic in piece.diagnostics() {
                    out.push(diagnostic.with_offset(offset));
                }
                offset += piece.len();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use text_size::TextRange;

    use super::*;
    use crate::SyntaxKind::*;

    fn spaces(text: &str) -> GreenTrivia {
        GreenTrivia::new(vec![TriviaPiece::new(TriviaKind::Spaces, text)])
    }

    #[test]
    fn token_widths() {
        let token = GreenToken::new(PRINT_KW, "print", spaces("  "), spaces(" "));
        assert_eq!(token.width(), TextSize::new(5));
        assert_eq!(token.full_width(), TextSize::new(8));
        assert!(!token.contains_diagnostics());
    }

    #[test]
    fn node_widths_trim_edge_trivia() {
        let print = GreenToken::new(PRINT_KW, "print", spaces("  "), spaces(" "));
        let name = GreenToken::new(NAME, "x", GreenTrivia::empty(), GreenTrivia::empty());
        let name = GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(name)]);
        let semi = GreenToken::new(SEMICOLON, ";", GreenTrivia::empty(), spaces(" "));
        let stmt = GreenNode::new(
            PRINT_STMT,
            vec![
                NodeOrToken::Token(print),
                NodeOrToken::Node(name),
                NodeOrToken::Token(semi),
            ],
        );
        // "  print x; " with two leading and one trailing space trimmed.
        assert_eq!(stmt.full_width(), TextSize::new(11));
        assert_eq!(stmt.width(), TextSize::new(8));
    }

    #[test]
    fn structural_equality_ignores_sharing() {
        let make = || {
            let token = GreenToken::new(NAME, "x", spaces(" "), GreenTrivia::empty());
            GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(token)])
        };
        let a = make();
        let b = make();
        assert!(!GreenNode::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn diagnostics_bubble_up() {
        let diagnostic =
            Diagnostic::error("Expected ';'", TextRange::empty(TextSize::new(0)));
        let missing = GreenToken::missing(SEMICOLON, GreenTrivia::empty(), diagnostic);
        assert!(missing.is_missing());
        assert_eq!(missing.full_width(), TextSize::new(0));

        let node = GreenNode::new(PRINT_STMT, vec![NodeOrToken::Token(missing)]);
        assert!(node.contains_diagnostics());
    }

    #[test]
    fn prepended_leading_rebases_diagnostics() {
        let diagnostic = Diagnostic::error("bad", TextRange::new(1.into(), 2.into()));
        let token = GreenToken::with_diagnostics(
            STRING,
            "\"a\"",
            GreenTrivia::empty(),
            GreenTrivia::empty(),
            vec![diagnostic],
        );
        let skipped = TriviaPiece::new(TriviaKind::SkippedToken, "junk");
        let token = token.with_prepended_leading(vec![skipped]);
        assert_eq!(token.diagnostics()[0].range(), TextRange::new(5.into(), 6.into()));
        assert_eq!(token.leading().len(), TextSize::new(4));
        assert_eq!(token.full_width(), TextSize::new(7));
    }

    #[test]
    fn ends_in_newline_looks_at_the_last_token() {
        let newline = GreenTrivia::new(vec![TriviaPiece::new(TriviaKind::Newline, "\n")]);
        let semi = GreenToken::new(SEMICOLON, ";", GreenTrivia::empty(), newline);
        let node = GreenNode::new(ERROR_STMT, vec![NodeOrToken::Token(semi)]);
        assert!(Green::Node(node).ends_in_newline());

        let bare = GreenToken::new(SEMICOLON, ";", GreenTrivia::empty(), GreenTrivia::empty());
        assert!(!Green::Token(bare).ends_in_newline());
    }
}
