//! Typed wrappers over the raw positioned tree.
//!
//! These are thin views: each wrapper holds a [`SyntaxNode`] and finds its
//! parts by kind, tolerating missing or error-shaped children.

use crate::SyntaxKind::*;
use crate::{SyntaxNode, SyntaxToken};

pub trait Node {
    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &SyntaxNode;
}

#[derive(Clone, Debug)]
pub struct Program(SyntaxNode);

impl Program {
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.0
            .child_nodes()
            .find(|node| node.kind() == STATEMENT_LIST)
            .into_iter()
            .flat_map(|list| list.child_nodes().collect::<Vec<_>>())
            .filter_map(Statement::cast)
    }
}

impl Node for Program {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == PROGRAM).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct StatementList(SyntaxNode);

impl StatementList {
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.0.child_nodes().filter_map(Statement::cast)
    }
}

impl Node for StatementList {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == STATEMENT_LIST).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub enum Statement {
    Print(PrintStmt),
    Return(ReturnStmt),
    Let(LetStmt),
    Define(DefineStmt),
    If(IfStmt),
    While(WhileStmt),
    Error(ErrorStmt),
}

impl Node for Statement {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        match syntax.kind() {
            PRINT_STMT => Some(Self::Print(PrintStmt(syntax))),
            RETURN_STMT => Some(Self::Return(ReturnStmt(syntax))),
            LET_STMT => Some(Self::Let(LetStmt(syntax))),
            DEFINE_STMT => Some(Self::Define(DefineStmt(syntax))),
            IF_STMT => Some(Self::If(IfStmt(syntax))),
            WHILE_STMT => Some(Self::While(WhileStmt(syntax))),
            ERROR_STMT => Some(Self::Error(ErrorStmt(syntax))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Print(it) => it.syntax(),
            Self::Return(it) => it.syntax(),
            Self::Let(it) => it.syntax(),
            Self::Define(it) => it.syntax(),
            Self::If(it) => it.syntax(),
            Self::While(it) => it.syntax(),
            Self::Error(it) => it.syntax(),
        }
    }
}

fn first_expr(node: &SyntaxNode) -> Option<Expr> {
    node.child_nodes().find_map(Expr::cast)
}

fn first_name_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.child_tokens().find(|token| token.kind() == NAME)
}

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(SyntaxNode);

        impl Node for $name {
            fn cast(syntax: SyntaxNode) -> Option<Self> {
                (syntax.kind() == $kind).then_some(Self(syntax))
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(PrintStmt, PRINT_STMT);
ast_node!(ReturnStmt, RETURN_STMT);
ast_node!(LetStmt, LET_STMT);
ast_node!(DefineStmt, DEFINE_STMT);
ast_node!(IfStmt, IF_STMT);
ast_node!(WhileStmt, WHILE_STMT);
ast_node!(ErrorStmt, ERROR_STMT);

impl PrintStmt {
    pub fn value(&self) -> Option<Expr> {
        first_expr(&self.0)
    }
}

impl ReturnStmt {
    pub fn value(&self) -> Option<Expr> {
        first_expr(&self.0)
    }
}

impl LetStmt {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_name_token(&self.0)
    }

    pub fn value(&self) -> Option<Expr> {
        first_expr(&self.0)
    }
}

/// The two body forms of a function definition.
#[derive(Clone, Debug)]
pub enum FnBody {
    Expr(Expr),
    Block(StatementList),
}

impl DefineStmt {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_name_token(&self.0)
    }

    pub fn params(&self) -> Vec<SyntaxToken> {
        self.0
            .child_nodes()
            .find(|node| node.kind() == PARAM_LIST)
            .map(|list| list.child_tokens().filter(|token| token.kind() == NAME).collect())
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<FnBody> {
        if let Some(block) = self.0.child_nodes().find_map(StatementList::cast) {
            return Some(FnBody::Block(block));
        }
        first_expr(&self.0).map(FnBody::Expr)
    }
}

impl IfStmt {
    pub fn condition(&self) -> Option<Expr> {
        first_expr(&self.0)
    }

    pub fn then_branch(&self) -> Option<StatementList> {
        self.0.child_nodes().find_map(StatementList::cast)
    }

    pub fn else_branch(&self) -> Option<StatementList> {
        self.0.child_nodes().filter_map(StatementList::cast).nth(1)
    }
}

impl WhileStmt {
    pub fn condition(&self) -> Option<Expr> {
        first_expr(&self.0)
    }

    pub fn body(&self) -> Option<StatementList> {
        self.0.child_nodes().find_map(StatementList::cast)
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Name(NameExpr),
    Call(CallExpr),
    Literal(Literal),
    Paren(ParenExpr),
    Binary(BinaryExpr),
    Prefix(PrefixExpr),
}

impl Node for Expr {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        match syntax.kind() {
            NAME_EXPR => Some(Self::Name(NameExpr(syntax))),
            CALL_EXPR => Some(Self::Call(CallExpr(syntax))),
            LITERAL => Some(Self::Literal(Literal(syntax))),
            PAREN_EXPR => Some(Self::Paren(ParenExpr(syntax))),
            BINARY_EXPR => Some(Self::Binary(BinaryExpr(syntax))),
            PREFIX_EXPR => Some(Self::Prefix(PrefixExpr(syntax))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Name(it) => it.syntax(),
            Self::Call(it) => it.syntax(),
            Self::Literal(it) => it.syntax(),
            Self::Paren(it) => it.syntax(),
            Self::Binary(it) => it.syntax(),
            Self::Prefix(it) => it.syntax(),
        }
    }
}

ast_node!(NameExpr, NAME_EXPR);
ast_node!(CallExpr, CALL_EXPR);
ast_node!(Literal, LITERAL);
ast_node!(ParenExpr, PAREN_EXPR);
ast_node!(BinaryExpr, BINARY_EXPR);
ast_node!(PrefixExpr, PREFIX_EXPR);

impl NameExpr {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_name_token(&self.0)
    }
}

impl CallExpr {
    pub fn callee(&self) -> Option<SyntaxToken> {
        first_name_token(&self.0)
    }

    pub fn args(&self) -> Vec<Expr> {
        self.0
            .child_nodes()
            .find(|node| node.kind() == ARG_LIST)
            .map(|list| list.child_nodes().filter_map(Expr::cast).collect())
            .unwrap_or_default()
    }
}

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.0.child_tokens().next()
    }

    pub fn number_value(&self) -> Option<f64> {
        let token = self.token()?;
        if token.kind() != NUMBER {
            return None;
        }
        token.text().parse().ok()
    }

    pub fn string_value(&self) -> Option<String> {
        let token = self.token()?;
        if token.kind() != STRING {
            return None;
        }
        Some(unescape(token.text()))
    }
}

impl ParenExpr {
    pub fn inner(&self) -> Option<Expr> {
        first_expr(&self.0)
    }
}

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        self.0.child_nodes().find_map(Expr::cast)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        self.0
            .child_tokens()
            .find(|token| matches!(token.kind(), PLUS | MINUS | STAR | SLASH))
    }

    pub fn rhs(&self) -> Option<Expr> {
        self.0.child_nodes().filter_map(Expr::cast).nth(1)
    }
}

impl PrefixExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        self.0.child_tokens().find(|token| token.kind() == MINUS)
    }

    pub fn operand(&self) -> Option<Expr> {
        first_expr(&self.0)
    }
}

/// Decodes a string literal's source text: strips the quotes and resolves
/// `\"`, `\\` and `\n`. An unrecognized escape decodes to the escaped char
/// itself, matching the lexer's recovery.
pub fn unescape(raw: &str) -> String {
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_resolves_known_escapes() {
        assert_eq!(unescape(r#""a\nb""#), "a\nb");
        assert_eq!(unescape(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unescape(r#""back\\slash""#), "back\\slash");
        // Unrecognized escapes decode to the escaped char.
        assert_eq!(unescape(r#""\q""#), "q");
        // Unterminated literals lack the closing quote.
        assert_eq!(unescape("\"abc"), "abc");
    }
}
