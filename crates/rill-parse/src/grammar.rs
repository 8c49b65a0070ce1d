//! Recursive-descent grammar over an abstract token source.
//!
//! Every production returns *some* node: required-but-absent tokens become
//! zero-width missing tokens, unparseable statements degrade to an error
//! statement, and list slots tolerate missing items. A tree with
//! diagnostics is still structurally valid.

use rill_errors::Diagnostic;
use rill_syntax::SyntaxKind::{self, *};
use rill_syntax::{Green, GreenNode, NodeOrToken};
use text_size::{TextRange, TextSize};

use crate::parser::{Parser, missing_token};
use crate::source::TokenSource;

pub(crate) fn program<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let statements = statement_list(p);
    let eof = p.expect(EOF);
    GreenNode::new(PROGRAM, vec![NodeOrToken::Node(statements), NodeOrToken::Token(eof)])
}

fn statement_list<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut statements: Vec<Green> = Vec::new();
    loop {
        let kind = p.peek_kind();
        if kind == EOF || kind.is_block_terminator() {
            break;
        }
        // Reuse hook: take a whole unchanged statement from the old tree.
        if let Some(reused) = p.try_reuse_statement() {
            statements.push(NodeOrToken::Node(reused));
            continue;
        }
        let statement = statement(p);
        if statement.full_width() == TextSize::new(0) {
            // No forward progress; stop so the list parse terminates.
            break;
        }
        statements.push(NodeOrToken::Node(statement));
    }
    GreenNode::new(STATEMENT_LIST, statements)
}

fn statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    match p.peek_kind() {
        PRINT_KW => keyword_value_statement(p, PRINT_STMT),
        RETURN_KW => keyword_value_statement(p, RETURN_STMT),
        LET_KW => let_statement(p),
        DEFINE_KW => define_statement(p),
        IF_KW => if_statement(p),
        WHILE_KW => while_statement(p),
        _ => error_statement(p),
    }
}

/// `print expr ;` and `return expr ;` share a shape.
fn keyword_value_statement<S: TokenSource>(p: &mut Parser<S>, kind: SyntaxKind) -> GreenNode {
    let keyword = p.bump();
    let value = expression(p);
    let semicolon = p.expect(SEMICOLON);
    GreenNode::new(
        kind,
        vec![NodeOrToken::Token(keyword), NodeOrToken::Node(value), NodeOrToken::Token(semicolon)],
    )
}

fn let_statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let keyword = p.bump();
    let name = p.expect(NAME);
    let eq = p.expect(EQ);
    let value = expression(p);
    let semicolon = p.expect(SEMICOLON);
    GreenNode::new(
        LET_STMT,
        vec![
            NodeOrToken::Token(keyword),
            NodeOrToken::Token(name),
            NodeOrToken::Token(eq),
            NodeOrToken::Node(value),
            NodeOrToken::Token(semicolon),
        ],
    )
}

fn define_statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let keyword = p.bump();
    let name = p.expect(NAME);
    let left_paren = p.expect(LEFT_PAREN);
    let params = param_list(p);
    let right_paren = p.expect(RIGHT_PAREN);

    let mut children = vec![
        NodeOrToken::Token(keyword),
        NodeOrToken::Token(name),
        NodeOrToken::Token(left_paren),
        NodeOrToken::Node(params),
        NodeOrToken::Token(right_paren),
    ];

    if p.at(BEGIN_KW) {
        children.push(NodeOrToken::Token(p.bump()));
        children.push(NodeOrToken::Node(statement_list(p)));
        children.push(NodeOrToken::Token(p.expect(END_KW)));
    } else {
        children.push(NodeOrToken::Token(p.expect(EQ)));
        children.push(NodeOrToken::Node(expression(p)));
        children.push(NodeOrToken::Token(p.expect(SEMICOLON)));
    }

    GreenNode::new(DEFINE_STMT, children)
}

fn if_statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let keyword = p.bump();
    let condition = expression(p);
    let then_kw = p.expect(THEN_KW);
    let then_branch = statement_list(p);

    let mut children = vec![
        NodeOrToken::Token(keyword),
        NodeOrToken::Node(condition),
        NodeOrToken::Token(then_kw),
        NodeOrToken::Node(then_branch),
    ];

    if p.at(ELSE_KW) {
        children.push(NodeOrToken::Token(p.bump()));
        children.push(NodeOrToken::Node(statement_list(p)));
    }
    children.push(NodeOrToken::Token(p.expect(FI_KW)));

    GreenNode::new(IF_STMT, children)
}

fn while_statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let keyword = p.bump();
    let condition = expression(p);
    let do_kw = p.expect(DO_KW);
    let body = statement_list(p);
    let od_kw = p.expect(OD_KW);
    GreenNode::new(
        WHILE_STMT,
        vec![
            NodeOrToken::Token(keyword),
            NodeOrToken::Node(condition),
            NodeOrToken::Token(do_kw),
            NodeOrToken::Node(body),
            NodeOrToken::Token(od_kw),
        ],
    )
}

/// Swallows tokens up to a semicolon, end of input, or a reserved block
/// terminator, and reports one diagnostic spanning what it consumed.
fn error_statement<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut tokens: Vec<Green> = Vec::new();
    loop {
        let token = p.bump();
        let kind = token.kind();
        if kind == EOF || kind.is_block_terminator() {
            p.push_back(token);
            break;
        }
        let is_semicolon = kind == SEMICOLON;
        tokens.push(NodeOrToken::Token(token));
        if is_semicolon {
            break;
        }
    }

    let full_width: TextSize = tokens.iter().map(Green::full_width).sum();
    let leading = tokens.first().map_or(TextSize::new(0), Green::leading_trivia_width);
    let trailing = tokens.last().map_or(TextSize::new(0), Green::trailing_trivia_width);
    let range = TextRange::new(leading, full_width - trailing);
    let diagnostic = Diagnostic::error("Unable to parse this statement", range);

    GreenNode::with_diagnostics(ERROR_STMT, tokens, vec![diagnostic])
}

/// `(IDENT ("," IDENT)*)?` with tolerated empty slots: a terminator or
/// comma where a name was expected yields a zero-width missing identifier.
fn param_list<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut items: Vec<Green> = Vec::new();
    if !p.at(RIGHT_PAREN) && !p.at(EOF) {
        loop {
            if p.at(NAME) {
                items.push(NodeOrToken::Token(p.bump()));
            } else {
                items.push(NodeOrToken::Token(missing_token(NAME, "Expected an identifier")));
            }
            if p.at(COMMA) {
                items.push(NodeOrToken::Token(p.bump()));
                continue;
            }
            break;
        }
    }
    GreenNode::new(PARAM_LIST, items)
}

fn arg_list<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut items: Vec<Green> = Vec::new();
    if !p.at(RIGHT_PAREN) && !p.at(EOF) {
        loop {
            items.push(NodeOrToken::Node(expression(p)));
            if p.at(COMMA) {
                items.push(NodeOrToken::Token(p.bump()));
                continue;
            }
            break;
        }
    }
    GreenNode::new(ARG_LIST, items)
}

fn expression<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    additive(p)
}

fn additive<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut lhs = multiplicative(p);
    while matches!(p.peek_kind(), PLUS | MINUS) {
        let op = p.bump();
        let rhs = multiplicative(p);
        lhs = GreenNode::new(
            BINARY_EXPR,
            vec![NodeOrToken::Node(lhs), NodeOrToken::Token(op), NodeOrToken::Node(rhs)],
        );
    }
    lhs
}

fn multiplicative<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    let mut lhs = unary(p);
    while matches!(p.peek_kind(), STAR | SLASH) {
        let op = p.bump();
        let rhs = unary(p);
        lhs = GreenNode::new(
            BINARY_EXPR,
            vec![NodeOrToken::Node(lhs), NodeOrToken::Token(op), NodeOrToken::Node(rhs)],
        );
    }
    lhs
}

fn unary<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    if p.at(MINUS) {
        let op = p.bump();
        let operand = unary(p);
        return GreenNode::new(
            PREFIX_EXPR,
            vec![NodeOrToken::Token(op), NodeOrToken::Node(operand)],
        );
    }
    primary(p)
}

fn primary<S: TokenSource>(p: &mut Parser<S>) -> GreenNode {
    match p.peek_kind() {
        NAME => {
            let name = p.bump();
            if p.at(LEFT_PAREN) {
                let left_paren = p.bump();
                let args = arg_list(p);
                let right_paren = p.expect(RIGHT_PAREN);
                GreenNode::new(
                    CALL_EXPR,
                    vec![
                        NodeOrToken::Token(name),
                        NodeOrToken::Token(left_paren),
                        NodeOrToken::Node(args),
                        NodeOrToken::Token(right_paren),
                    ],
                )
            } else {
                GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(name)])
            }
        }
        NUMBER | STRING => GreenNode::new(LITERAL, vec![NodeOrToken::Token(p.bump())]),
        LEFT_PAREN => {
            let left_paren = p.bump();
            let inner = expression(p);
            let right_paren = p.expect(RIGHT_PAREN);
            GreenNode::new(
                PAREN_EXPR,
                vec![
                    NodeOrToken::Token(left_paren),
                    NodeOrToken::Node(inner),
                    NodeOrToken::Token(right_paren),
                ],
            )
        }
        _ => {
            // Nothing expression-shaped here; synthesize a missing name and
            // leave the offending token for the caller's recovery.
            let missing = missing_token(NAME, "Expected an expression");
            GreenNode::new(NAME_EXPR, vec![NodeOrToken::Token(missing)])
        }
    }
}
