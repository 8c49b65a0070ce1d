//! Lossless, immutable syntax trees with attached trivia.
//!
//! The tree comes in two layers. The green (structural) layer is
//! position-independent and shared by reference across edits; the red
//! (positioned) layer is a cheap per-parse overlay adding absolute offsets
//! and parent links.

/// Typed AST wrappers around the raw syntax tree.
pub mod ast;
mod dump;
mod green;
mod red;
mod syntax_kind;

pub use dump::debug_dump;
pub use green::{
    Green, GreenNode, GreenToken, GreenTrivia, NodeOrToken, TriviaKind, TriviaPiece,
};
pub use red::{
    Preorder, PreorderWithTokens, SyntaxElement, SyntaxNode, SyntaxNodePtr, SyntaxToken,
    SyntaxTree, TokenAtOffset, Trivia, WalkEvent, WalkEventWithTokens,
};
pub use syntax_kind::SyntaxKind;
