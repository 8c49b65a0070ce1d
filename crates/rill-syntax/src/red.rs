//! The red (positioned) layer: a lazily built overlay that attaches absolute
//! offsets and parent links to green nodes.
//!
//! Red wrappers are created per parse, cached one-per-child-slot on first
//! access, and discarded wholesale when the next tree supersedes them. The
//! parent link is non-owning, so no cycle is ever formed over the shared
//! green data.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use rill_errors::Diagnostic;
use rill_text::Rope;
use text_size::{TextRange, TextSize};

use crate::green::collect_diagnostics;
use crate::{GreenNode, GreenToken, NodeOrToken, SyntaxKind, TriviaPiece};

/// A parsed source text: the text itself plus the positioned root node.
pub struct SyntaxTree {
    text: Rope,
    root: SyntaxNode,
}

impl SyntaxTree {
    pub fn new(text: Rope, root: GreenNode) -> Self {
        debug_assert_eq!(text.len(), root.full_width(), "tree width must match its text");
        Self { text, root: SyntaxNode::new_root(root) }
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn green_root(&self) -> &GreenNode {
        self.root.green()
    }

    /// Every diagnostic in the tree, in document order, with absolute
    /// ranges.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        collect_diagnostics(
            &NodeOrToken::Node(self.green_root().clone()),
            TextSize::new(0),
            &mut out,
        );
        out
    }
}

impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        self.green_root() == other.green_root()
    }
}

impl Eq for SyntaxTree {}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree").field("text", &self.text).finish_non_exhaustive()
    }
}

/// A positioned node or token.
pub type SyntaxElement = NodeOrToken<SyntaxNode, SyntaxToken>;

impl SyntaxElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn text_range(&self) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.text_range(),
            NodeOrToken::Token(token) => token.text_range(),
        }
    }
}

/// A positioned interior node.
#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

struct NodeData {
    green: GreenNode,
    /// Absolute offset of the node's full span.
    offset: TextSize,
    parent: Weak<NodeData>,
    /// Lazily populated wrappers, one slot per green child.
    children: Box<[OnceLock<SyntaxElement>]>,
}

impl SyntaxNode {
    fn new_root(green: GreenNode) -> Self {
        Self::new(green, TextSize::new(0), Weak::new())
    }

    fn new(green: GreenNode, offset: TextSize, parent: Weak<NodeData>) -> Self {
        let slots = green.children().len();
        Self {
            data: Arc::new(NodeData {
                green,
                offset,
                parent,
                children: (0..slots).map(|_| OnceLock::new()).collect(),
            }),
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    pub fn green(&self) -> &GreenNode {
        &self.data.green
    }

    /// The range including leading/trailing trivia.
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.full_width())
    }

    /// The range with edge trivia trimmed away.
    pub fn trimmed_range(&self) -> TextRange {
        let green = &self.data.green;
        let start = self.data.offset + green.leading_trivia_width();
        TextRange::new(start, start + green.width())
    }

    /// The parent node; `None` for the root (or once the owning tree has
    /// been dropped).
    pub fn parent(&self) -> Option<SyntaxNode> {
        self.data.parent.upgrade().map(|data| Self { data })
    }

    pub fn child_count(&self) -> usize {
        self.data.children.len()
    }

    /// The positioned wrapper for child `index`, built on first access and
    /// cached for the lifetime of this tree.
    pub fn child(&self, index: usize) -> SyntaxElement {
        self.data.children[index]
            .get_or_init(|| {
                let green_children = self.data.green.children();
                let mut offset = self.data.offset;
                for child in &green_children[..index] {
                    offset += child.full_width();
                }
                let parent = Arc::downgrade(&self.data);
                match &green_children[index] {
                    NodeOrToken::Node(node) => {
                        NodeOrToken::Node(Self::new(node.clone(), offset, parent))
                    }
                    NodeOrToken::Token(token) => NodeOrToken::Token(SyntaxToken {
                        data: Arc::new(TokenData { green: token.clone(), offset, parent }),
                    }),
                }
            })
            .clone()
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxElement> + '_ {
        (0..self.child_count()).map(|index| self.child(index))
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.children().filter_map(SyntaxElement::into_node)
    }

    pub fn child_tokens(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.children().filter_map(SyntaxElement::into_token)
    }

    /// The first token in this subtree, if any.
    pub fn first_token(&self) -> Option<SyntaxToken> {
        self.children().find_map(|child| match child {
            NodeOrToken::Node(node) => node.first_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }
}

/// Structural equality: position is ignored, only the underlying green
/// nodes are compared.
impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        self.green() == other.green()
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.text_range())
    }
}

/// A positioned token.
#[derive(Clone)]
pub struct SyntaxToken {
    data: Arc<TokenData>,
}

struct TokenData {
    green: GreenToken,
    offset: TextSize,
    parent: Weak<NodeData>,
}

impl SyntaxToken {
    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    pub fn green(&self) -> &GreenToken {
        &self.data.green
    }

    /// Token text, trivia excluded.
    pub fn text(&self) -> &str {
        self.data.green.text()
    }

    pub fn is_missing(&self) -> bool {
        self.data.green.is_missing()
    }

    /// The range including attached trivia.
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.full_width())
    }

    /// The range of the token text alone.
    pub fn trimmed_range(&self) -> TextRange {
        let start = self.data.offset + self.data.green.leading().len();
        TextRange::new(start, start + self.data.green.width())
    }

    pub fn parent(&self) -> Option<SyntaxNode> {
        self.data.parent.upgrade().map(|data| SyntaxNode { data })
    }

    /// Leading trivia as absolutely positioned records.
    pub fn leading_trivia(&self) -> impl Iterator<Item = Trivia> + '_ {
        trivia_records(self.data.green.leading().pieces(), self.data.offset)
    }

    /// Trailing trivia as absolutely positioned records.
    pub fn trailing_trivia(&self) -> impl Iterator<Item = Trivia> + '_ {
        let start = self.data.offset + self.data.green.leading().len() + self.data.green.width();
        trivia_records(self.data.green.trailing().pieces(), start)
    }
}

impl PartialEq for SyntaxToken {
    fn eq(&self, other: &Self) -> bool {
        self.green() == other.green()
    }
}

impl Eq for SyntaxToken {}

impl fmt::Debug for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind(), self.text_range(), self.text())
    }
}

/// An absolutely positioned view of one trivia piece.
#[derive(Clone, Debug)]
pub struct Trivia {
    piece: TriviaPiece,
    range: TextRange,
}

impl Trivia {
    pub fn kind(&self) -> crate::TriviaKind {
        self.piece.kind()
    }

    pub fn text(&self) -> &str {
        self.piece.text()
    }

    pub fn range(&self) -> TextRange {
        self.range
    }
}

fn trivia_records(pieces: &[TriviaPiece], start: TextSize) -> impl Iterator<Item = Trivia> + '_ {
    let mut offset = start;
    pieces.iter().map(move |piece| {
        let range = TextRange::at(offset, piece.len());
        offset += piece.len();
        Trivia { piece: piece.clone(), range }
    })
}

impl SyntaxNode {
    /// Structural equality with another subtree, ignoring positions; for
    /// tokens this includes the decoded text, via green token equality.
    pub fn structurally_equal(&self, other: &SyntaxNode) -> bool {
        self.green() == other.green()
    }

    /// This node and its ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode> {
        std::iter::successors(Some(self.clone()), SyntaxNode::parent)
    }

    /// Preorder traversal over nodes.
    pub fn preorder(&self) -> Preorder {
        Preorder { inner: self.preorder_with_tokens() }
    }

    /// Preorder traversal over nodes and tokens.
    pub fn preorder_with_tokens(&self) -> PreorderWithTokens {
        PreorderWithTokens { stack: Vec::new(), root: Some(self.clone()) }
    }

    /// The token(s) at `offset`: zero, one, or, exactly on a boundary,
    /// two.
    pub fn token_at_offset(&self, offset: TextSize) -> TokenAtOffset<SyntaxToken> {
        let range = self.text_range();
        if offset < range.start() || offset > range.end() {
            return TokenAtOffset::None;
        }
        let mut hits = self.children().filter(|child| {
            let range = child.text_range();
            !range.is_empty() && range.start() <= offset && offset <= range.end()
        });
        let Some(first) = hits.next() else {
            return TokenAtOffset::None;
        };
        let second = hits.next();
        let descend = |element: SyntaxElement| match element {
            NodeOrToken::Node(node) => node.token_at_offset(offset),
            NodeOrToken::Token(token) => TokenAtOffset::Single(token),
        };
        match second {
            None => descend(first),
            Some(second) => match (descend(first).left_biased(), descend(second).right_biased()) {
                (Some(left), Some(right)) => TokenAtOffset::Between(left, right),
                (Some(single), None) | (None, Some(single)) => TokenAtOffset::Single(single),
                (None, None) => TokenAtOffset::None,
            },
        }
    }

    /// The smallest element that fully covers `range`.
    pub fn covering_element(&self, range: TextRange) -> SyntaxElement {
        let mut res: SyntaxElement = NodeOrToken::Node(self.clone());
        loop {
            res = match res {
                NodeOrToken::Token(_) => return res,
                NodeOrToken::Node(node) => {
                    assert!(
                        node.text_range().contains_range(range),
                        "{range:?} is not covered by {:?}",
                        node.text_range(),
                    );
                    let child =
                        node.children().find(|child| child.text_range().contains_range(range));
                    match child {
                        Some(child) => child,
                        None => return NodeOrToken::Node(node),
                    }
                }
            };
        }
    }
}

/// Preorder traversal over nodes.
pub struct Preorder {
    inner: PreorderWithTokens,
}

impl Preorder {
    /// Skips the current subtree during traversal.
    pub fn skip_subtree(&mut self) {
        self.inner.skip_subtree();
    }
}

impl Iterator for Preorder {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(|event| match event {
            WalkEventWithTokens::EnterNode(it) => Some(WalkEvent::Enter(it)),
            WalkEventWithTokens::LeaveNode(it) => Some(WalkEvent::Leave(it)),
            WalkEventWithTokens::Token(_) => None,
        })
    }
}

/// Preorder walk event for nodes.
#[derive(Clone)]
pub enum WalkEvent {
    Enter(SyntaxNode),
    Leave(SyntaxNode),
}

/// Preorder traversal over nodes and tokens.
pub struct PreorderWithTokens {
    /// Open nodes plus the index of the next child to visit in each.
    stack: Vec<(SyntaxNode, usize)>,
    root: Option<SyntaxNode>,
}

impl PreorderWithTokens {
    /// Skips the current subtree during traversal.
    pub fn skip_subtree(&mut self) {
        assert!(self.stack.pop().is_some(), "must have a subtree to skip");
    }
}

impl Iterator for PreorderWithTokens {
    type Item = WalkEventWithTokens;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            self.stack.push((root.clone(), 0));
            return Some(WalkEventWithTokens::EnterNode(root));
        }
        let (node, index) = self.stack.last()?;
        let (node, index) = (node.clone(), *index);
        if index < node.child_count() {
            self.stack.last_mut().unwrap().1 += 1;
            return Some(match node.child(index) {
                NodeOrToken::Node(child) => {
                    self.stack.push((child.clone(), 0));
                    WalkEventWithTokens::EnterNode(child)
                }
                NodeOrToken::Token(token) => WalkEventWithTokens::Token(token),
            });
        }
        self.stack.pop();
        Some(WalkEventWithTokens::LeaveNode(node))
    }
}

/// Preorder walk event including tokens.
#[derive(Clone)]
pub enum WalkEventWithTokens {
    EnterNode(SyntaxNode),
    LeaveNode(SyntaxNode),
    Token(SyntaxToken),
}

/// There might be zero, one or two tokens at a given offset.
#[derive(Clone, Debug)]
pub enum TokenAtOffset<T> {
    /// No tokens at offset.
    None,
    /// Only a single token at offset.
    Single(T),
    /// Offset is exactly between two tokens.
    Between(T, T),
}

impl<T> TokenAtOffset<T> {
    /// Convert to option, preferring the right token in case of a tie.
    pub fn right_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(token) => Some(token),
            Self::Between(_, right) => Some(right),
        }
    }

    /// Convert to option, preferring the left token in case of a tie.
    pub fn left_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(token) => Some(token),
            Self::Between(left, _) => Some(left),
        }
    }
}

/// Stable identifier for a node by kind and trimmed range, resolvable in
/// any tree where an equivalent node still exists.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SyntaxNodePtr {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl SyntaxNodePtr {
    pub fn new(node: &SyntaxNode) -> Self {
        Self { kind: node.kind(), range: node.trimmed_range() }
    }

    /// Attempts to resolve this pointer within `root`.
    pub fn try_to_node(&self, root: &SyntaxNode) -> Option<SyntaxNode> {
        if root.parent().is_some() {
            return None;
        }
        let element = root.covering_element(self.range);
        let start = match element {
            NodeOrToken::Node(node) => node,
            NodeOrToken::Token(token) => token.parent()?,
        };
        start
            .ancestors()
            .find(|node| node.kind() == self.kind && node.trimmed_range() == self.range)
    }
}

#[cfg(test)]
mod tests {
    use rill_errors::Diagnostic;

    use super::*;
    use crate::SyntaxKind::*;
    use crate::{GreenTrivia, TriviaKind};

    fn sample_tree() -> SyntaxTree {
        // "  print x ;" built by hand, trivia attached per the lexer's rules.
        let ws = |text: &str| GreenTrivia::new(vec![TriviaPiece::new(TriviaKind::Spaces, text)]);
        let print = GreenToken::new(PRINT_KW, "print", ws("  "), ws(" "));
        let name = GreenToken::new(NAME, "x", GreenTrivia::empty(), ws(" "));
        let name = GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(name)]);
        let semi = GreenToken::new(SEMICOLON, ";", GreenTrivia::empty(), GreenTrivia::empty());
        let stmt = GreenNode::new(
            PRINT_STMT,
            vec![NodeOrToken::Token(print), NodeOrToken::Node(name), NodeOrToken::Token(semi)],
        );
        let list = GreenNode::new(STATEMENT_LIST, vec![NodeOrToken::Node(stmt)]);
        let eof = GreenToken::new(EOF, "", GreenTrivia::empty(), GreenTrivia::empty());
        let root = GreenNode::new(PROGRAM, vec![NodeOrToken::Node(list), NodeOrToken::Token(eof)]);
        SyntaxTree::new(Rope::from("  print x ;"), root)
    }

    #[test]
    fn offsets_accumulate() {
        let tree = sample_tree();
        let list = tree.root().child(0).into_node().unwrap();
        let stmt = list.child(0).into_node().unwrap();
        assert_eq!(stmt.text_range(), TextRange::new(0.into(), 11.into()));
        assert_eq!(stmt.trimmed_range(), TextRange::new(2.into(), 11.into()));

        let print = stmt.child(0).into_token().unwrap();
        assert_eq!(print.trimmed_range(), TextRange::new(2.into(), 7.into()));
        let name = stmt.child(1).into_node().unwrap();
        assert_eq!(name.text_range(), TextRange::new(8.into(), 10.into()));
        let semi = stmt.child(2).into_token().unwrap();
        assert_eq!(semi.trimmed_range(), TextRange::new(10.into(), 11.into()));
    }

    #[test]
    fn children_are_cached() {
        let tree = sample_tree();
        let list = tree.root().child(0).into_node().unwrap();
        let first = list.child(0).into_node().unwrap();
        let second = list.child(0).into_node().unwrap();
        assert!(Arc::ptr_eq(&first.data, &second.data));
    }

    #[test]
    fn parent_links_work() {
        let tree = sample_tree();
        let list = tree.root().child(0).into_node().unwrap();
        let stmt = list.child(0).into_node().unwrap();
        let parent = stmt.parent().unwrap();
        assert_eq!(parent.kind(), STATEMENT_LIST);
        let grandparent = parent.parent().unwrap();
        assert_eq!(grandparent.kind(), PROGRAM);
        assert!(grandparent.parent().is_none());
    }

    #[test]
    fn trivia_views_are_positioned() {
        let tree = sample_tree();
        let list = tree.root().child(0).into_node().unwrap();
        let stmt = list.child(0).into_node().unwrap();
        let print = stmt.child(0).into_token().unwrap();
        let leading: Vec<_> = print.leading_trivia().collect();
        assert_eq!(leading.len(), 1);
        assert_eq!(leading[0].text(), "  ");
        assert_eq!(leading[0].range(), TextRange::new(0.into(), 2.into()));
        let trailing: Vec<_> = print.trailing_trivia().collect();
        assert_eq!(trailing[0].range(), TextRange::new(7.into(), 8.into()));
    }

    #[test]
    fn preorder_visits_every_element_in_text_order() {
        let tree = sample_tree();
        let mut kinds = Vec::new();
        for event in tree.root().preorder_with_tokens() {
            if let WalkEventWithTokens::EnterNode(node) = &event {
                kinds.push(node.kind());
            }
            if let WalkEventWithTokens::Token(token) = &event {
                kinds.push(token.kind());
            }
        }
        assert_eq!(
            kinds,
            [PROGRAM, STATEMENT_LIST, PRINT_STMT, PRINT_KW, NAME_EXPR, NAME, SEMICOLON, EOF]
        );

        let enters =
            tree.root().preorder().filter(|event| matches!(event, WalkEvent::Enter(_))).count();
        let leaves =
            tree.root().preorder().filter(|event| matches!(event, WalkEvent::Leave(_))).count();
        assert_eq!(enters, leaves);
        assert_eq!(enters, 4);
    }

    #[test]
    fn token_at_offset_finds_boundaries() {
        // "  print x ;"
        let tree = sample_tree();
        let root = tree.root();

        let inside = root.token_at_offset(TextSize::new(4));
        assert_eq!(inside.clone().right_biased().unwrap().kind(), PRINT_KW);
        assert!(matches!(inside, TokenAtOffset::Single(_)));

        // Offset 8 is the boundary between `print`'s trailing trivia and
        // `x`.
        let between = root.token_at_offset(TextSize::new(8));
        match between {
            TokenAtOffset::Between(left, right) => {
                assert_eq!(left.kind(), PRINT_KW);
                assert_eq!(right.kind(), NAME);
            }
            _ => panic!("expected a boundary"),
        }
    }

    #[test]
    fn covering_element_descends_to_the_smallest_cover() {
        let tree = sample_tree();
        let root = tree.root();

        let token = root.covering_element(TextRange::new(3.into(), 5.into()));
        assert_eq!(token.kind(), PRINT_KW);

        let node = root.covering_element(TextRange::new(6.into(), 11.into()));
        assert_eq!(node.kind(), PRINT_STMT);
    }

    #[test]
    fn node_ptr_round_trips() {
        let tree = sample_tree();
        let list = tree.root().child(0).into_node().unwrap();
        let stmt = list.child(0).into_node().unwrap();
        let ptr = SyntaxNodePtr::new(&stmt);
        let resolved = ptr.try_to_node(tree.root()).unwrap();
        assert_eq!(resolved.kind(), PRINT_STMT);
        assert_eq!(resolved.trimmed_range(), stmt.trimmed_range());
    }

    #[test]
    fn diagnostics_are_rebased_to_absolute() {
        let ws = |text: &str| GreenTrivia::new(vec![TriviaPiece::new(TriviaKind::Spaces, text)]);
        let print = GreenToken::new(PRINT_KW, "print", ws(" "), ws(" "));
        let name = GreenToken::new(NAME, "x", GreenTrivia::empty(), GreenTrivia::empty());
        let name = GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(name)]);
        let missing = GreenToken::missing(
            SEMICOLON,
            GreenTrivia::empty(),
            Diagnostic::error("Expected ';'", TextRange::empty(TextSize::new(0))),
        );
        let stmt = GreenNode::new(
            PRINT_STMT,
            vec![NodeOrToken::Token(print), NodeOrToken::Node(name), NodeOrToken::Token(missing)],
        );
        let list = GreenNode::new(STATEMENT_LIST, vec![NodeOrToken::Node(stmt)]);
        let eof = GreenToken::new(EOF, "", GreenTrivia::empty(), GreenTrivia::empty());
        let root = GreenNode::new(PROGRAM, vec![NodeOrToken::Node(list), NodeOrToken::Token(eof)]);
        let tree = SyntaxTree::new(Rope::from(" print x"), root);

        let diagnostics = tree.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        // The missing semicolon sits at the very end of "print x".
        assert_eq!(diagnostics[0].range(), TextRange::empty(TextSize::new(8)));
    }
}
