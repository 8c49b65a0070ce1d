//! Debug rendering of a tree, used by snapshot tests.

use std::fmt::Write;

use crate::{NodeOrToken, SyntaxNode, SyntaxTree};

/// Renders the tree as an indented kind/range listing, one line per node or
/// token, with token text quoted and missing tokens marked.
pub fn debug_dump(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    dump_node(tree.root(), 0, &mut out);
    out
}

fn dump_node(node: &SyntaxNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    writeln!(out, "{indent}{:?}@{:?}", node.kind(), node.text_range()).unwrap();
    for child in node.children() {
        match child {
            NodeOrToken::Node(node) => dump_node(&node, depth + 1, out),
            NodeOrToken::Token(token) => {
                let indent = "  ".repeat(depth + 1);
                let missing = if token.is_missing() { " (missing)" } else { "" };
                writeln!(
                    out,
                    "{indent}{:?}@{:?} {:?}{missing}",
                    token.kind(),
                    token.text_range(),
                    token.text(),
                )
                .unwrap();
            }
        }
    }
}
