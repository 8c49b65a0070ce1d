//! The incremental reconciler.
//!
//! Given the old structural tree, the new text, and the edit that produced
//! it, this serves the parser a mix of reused old subtrees (repositioned),
//! reused old tokens, and freshly lexed tokens from the affected region,
//! all through the same [`TokenSource`] interface a plain parse uses.
//!
//! The core invariant: the cursor always equals the start of whichever slot
//! sits on top of the stack (modulo one peeked-or-pushed-back token held in
//! `current`). Every operation below preserves it.

use rill_syntax::{Green, GreenNode, GreenToken, NodeOrToken, SyntaxKind};
use rill_text::{Cursor, Rope, TextChange};
use rill_tokenizer::Tokenizer;
use text_size::{TextRange, TextSize};

use crate::source::TokenSource;

/// Old tokens ending within this many bytes of the edit start are re-lexed
/// rather than reused: trailing-trivia scanning can look up to two chars
/// past a token's nominal end (`//` detection), so a token this close to
/// the edit may lex differently in the new text. A token whose trailing
/// trivia ends in a newline is exempt: the scan halts at a newline
/// unconditionally and can never look past it.
const LOOKAHEAD_MARGIN: u32 = 2;

pub(crate) struct Blender<'a> {
    text: &'a Rope,
    /// Pending slots, top at the end: remaining left-stack items, then the
    /// text region, then the right-stack items.
    stack: Vec<Slot>,
    /// Current position in the new text.
    cursor: TextSize,
    /// A fetched-but-unconsumed (or pushed-back) token. While this is
    /// occupied the cursor already sits past it, and no node reuse is
    /// offered.
    current: Option<GreenToken>,
}

enum Slot {
    /// An old interior node, positioned in new-text coordinates.
    Node(GreenNode, TextSize),
    /// An old token, positioned in new-text coordinates.
    Token(GreenToken, TextSize),
    /// A span of the new text that must be lexed fresh.
    Text(TextRange),
}

impl Slot {
    fn start(&self) -> TextSize {
        match self {
            Slot::Node(_, start) | Slot::Token(_, start) => *start,
            Slot::Text(range) => range.start(),
        }
    }

    fn end(&self) -> TextSize {
        match self {
            Slot::Node(node, start) => *start + node.full_width(),
            Slot::Token(token, start) => *start + token.full_width(),
            Slot::Text(range) => range.end(),
        }
    }
}

impl<'a> Blender<'a> {
    pub(crate) fn new(old_root: &GreenNode, text: &'a Rope, change: &TextChange) -> Self {
        let mut left = Vec::new();
        let mut right = Vec::new();
        classify(
            &NodeOrToken::Node(old_root.clone()),
            TextSize::new(0),
            change,
            &mut left,
            &mut right,
        );

        let left_end = left.last().map_or(TextSize::new(0), Slot::end);
        let right_start = right.first().map_or(text.len(), Slot::start);
        debug_assert!(left_end <= right_start);

        let mut stack = Vec::with_capacity(left.len() + right.len() + 1);
        stack.extend(right.into_iter().rev());
        if left_end < right_start {
            stack.push(Slot::Text(TextRange::new(left_end, right_start)));
        }
        stack.extend(left.into_iter().rev());

        Self { text, stack, cursor: TextSize::new(0), current: None }
    }

    fn fill_current(&mut self) {
        if self.current.is_none() {
            self.current = Some(self.next_token_from_stack());
        }
    }

    fn next_token_from_stack(&mut self) -> GreenToken {
        loop {
            match self.stack.last() {
                // Past the last slot: only end-of-input (and any trivia the
                // region already covered) remains.
                None | Some(Slot::Text(_)) => return self.lex_token(),
                Some(Slot::Token(token, start)) => {
                    debug_assert_eq!(*start, self.cursor, "top of stack must sit at the cursor");
                    let token = token.clone();
                    self.stack.pop();
                    self.cursor += token.full_width();
                    return token;
                }
                Some(Slot::Node(..)) => self.crumble(),
            }
        }
    }

    /// Lexes one token from the new text at the cursor and consumes every
    /// slot its full width covers.
    fn lex_token(&mut self) -> GreenToken {
        let cursor = Cursor::new(self.text, self.cursor);
        let mut tokenizer = Tokenizer::new(cursor);
        let lexed = tokenizer.next_token();
        debug_assert_eq!(lexed.full_start, self.cursor);
        self.advance_to(lexed.full_end());
        lexed.token
    }

    /// Moves the cursor and restores the invariant: slots the cursor has
    /// passed are dropped; a token the cursor landed inside is converted to
    /// a text region so the lexer can read the rest of its span; a node the
    /// cursor landed inside is decomposed and re-examined.
    fn advance_to(&mut self, new_cursor: TextSize) {
        self.cursor = new_cursor;
        loop {
            match self.stack.last_mut() {
                None => break,
                Some(Slot::Text(range)) => {
                    if range.end() <= self.cursor {
                        self.stack.pop();
                        continue;
                    }
                    if range.start() < self.cursor {
                        *range = TextRange::new(self.cursor, range.end());
                    }
                    break;
                }
                Some(Slot::Token(token, start)) => {
                    let end = *start + token.full_width();
                    if end <= self.cursor {
                        self.stack.pop();
                        continue;
                    }
                    if *start < self.cursor {
                        let rest = TextRange::new(self.cursor, end);
                        self.stack.pop();
                        self.stack.push(Slot::Text(rest));
                    }
                    break;
                }
                Some(Slot::Node(node, start)) => {
                    let end = *start + node.full_width();
                    if end <= self.cursor {
                        self.stack.pop();
                        continue;
                    }
                    if *start < self.cursor {
                        self.crumble();
                        continue;
                    }
                    break;
                }
            }
        }
    }

    /// Replaces the top node with its children, at the positions implied by
    /// summing the preceding children's widths from the node's own start.
    /// Zero-width children are dropped; tokens that carry diagnostics or
    /// are missing become text regions, since they are products of recovery
    /// and must go back through the lexer and the parser's own recovery.
    fn crumble(&mut self) {
        let Some(Slot::Node(node, start)) = self.stack.pop() else {
            unreachable!("crumble requires a node on top");
        };
        let mut children = Vec::with_capacity(node.children().len());
        let mut offset = start;
        for child in node.children() {
            push_element(&mut children, child, offset);
            offset += child.full_width();
        }
        self.stack.extend(children.into_iter().rev());
    }

    /// The kind the next token will have, if that can be read off the stack
    /// without lexing or decomposing anything reusable.
    fn reliable_peek(&self) -> Option<SyntaxKind> {
        if let Some(token) = &self.current {
            return Some(token.kind());
        }
        match self.stack.last()? {
            Slot::Token(token, _) => Some(token.kind()),
            Slot::Node(node, _) => reliable_first_token_kind(node),
            Slot::Text(_) => None,
        }
    }
}

impl TokenSource for Blender<'_> {
    fn peek_kind(&mut self) -> SyntaxKind {
        if let Some(kind) = self.reliable_peek() {
            return kind;
        }
        self.fill_current();
        self.current.as_ref().unwrap().kind()
    }

    fn bump(&mut self) -> GreenToken {
        self.fill_current();
        self.current.take().unwrap()
    }

    fn push_back(&mut self, token: GreenToken) {
        assert!(self.current.is_none(), "only one token of push-back is supported");
        self.current = Some(token);
    }

    fn peek_node(&mut self) -> Option<GreenNode> {
        if self.current.is_some() {
            return None;
        }
        loop {
            match self.stack.last() {
                Some(Slot::Node(node, start)) => {
                    debug_assert_eq!(*start, self.cursor, "top of stack must sit at the cursor");
                    if node.full_width() > TextSize::new(0)
                        && !node.contains_diagnostics()
                        && node.kind().is_reusable_statement()
                    {
                        return Some(node.clone());
                    }
                    self.crumble();
                }
                _ => return None,
            }
        }
    }

    fn take_node(&mut self) -> GreenNode {
        let Some(Slot::Node(node, start)) = self.stack.pop() else {
            unreachable!("take_node requires a peeked node");
        };
        debug_assert_eq!(start, self.cursor);
        self.cursor += node.full_width();
        node
    }
}

/// Walks the old tree, splitting it into a left stack (kept in place), a
/// right stack (shifted by the edit delta), and discarded material that the
/// central text region will cover.
fn classify(
    element: &Green,
    old_start: TextSize,
    change: &TextChange,
    left: &mut Vec<Slot>,
    right: &mut Vec<Slot>,
) {
    let full_width = element.full_width();
    if full_width == TextSize::new(0) {
        return;
    }
    let old_end = old_start + full_width;
    let edit = change.span();

    // Entirely after the edit: defer, shifted into new-text coordinates.
    if old_start >= edit.end() {
        push_element(right, element, change.shift(old_start));
        return;
    }

    // Entirely before the edit.
    if old_end <= edit.start() {
        let clear_of_margin = old_end + TextSize::new(LOOKAHEAD_MARGIN) <= edit.start();
        if clear_of_margin || element.ends_in_newline() {
            push_element(left, element, old_start);
            return;
        }
        // Too close to the edit to trust: re-scan tokens, refine nodes.
        match element {
            NodeOrToken::Token(_) => push_text(left, TextRange::new(old_start, old_end)),
            NodeOrToken::Node(node) => classify_children(node, old_start, change, left, right),
        }
        return;
    }

    // Overlapping the edit.
    match element {
        // The span becomes part of the re-lexed region.
        NodeOrToken::Token(_) => {}
        NodeOrToken::Node(node) => {
            if old_start >= edit.start() && old_end <= edit.end() {
                // Wholly inside the edited span: discard outright.
                return;
            }
            classify_children(node, old_start, change, left, right);
        }
    }
}

fn classify_children(
    node: &GreenNode,
    old_start: TextSize,
    change: &TextChange,
    left: &mut Vec<Slot>,
    right: &mut Vec<Slot>,
) {
    let mut offset = old_start;
    for child in node.children() {
        classify(child, offset, change, left, right);
        offset += child.full_width();
    }
}

/// Appends an element as a slot, in order. Tokens produced by error
/// recovery (missing, or carrying diagnostics) are never served as tokens;
/// their spans are re-lexed instead.
fn push_element(slots: &mut Vec<Slot>, element: &Green, start: TextSize) {
    match element {
        NodeOrToken::Node(node) => slots.push(Slot::Node(node.clone(), start)),
        NodeOrToken::Token(token) => {
            if token.is_missing() || token.contains_diagnostics() {
                push_text(slots, TextRange::at(start, token.full_width()));
            } else {
                slots.push(Slot::Token(token.clone(), start));
            }
        }
    }
}

fn push_text(slots: &mut Vec<Slot>, range: TextRange) {
    if range.is_empty() {
        return;
    }
    if let Some(Slot::Text(previous)) = slots.last_mut() {
        if previous.end() == range.start() {
            *previous = TextRange::new(previous.start(), range.end());
            return;
        }
    }
    slots.push(Slot::Text(range));
}

/// The kind of the first token inside `node`, if it can be trusted: a
/// clean, non-missing token will be delivered verbatim, so its kind is the
/// answer peeking would produce. Recovery products force a real fetch.
fn reliable_first_token_kind(node: &GreenNode) -> Option<SyntaxKind> {
    let first = node.children().iter().find(|child| child.full_width() > TextSize::new(0))?;
    match first {
        NodeOrToken::Node(node) => reliable_first_token_kind(node),
        NodeOrToken::Token(token) => {
            (!token.is_missing() && !token.contains_diagnostics()).then(|| token.kind())
        }
    }
}
