#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SyntaxKind {
    // Tokens.
    LEFT_PAREN,
    RIGHT_PAREN,
    COMMA,
    SEMICOLON,
    EQ,
    PLUS,
    MINUS,
    STAR,
    SLASH,

    PRINT_KW,
    RETURN_KW,
    LET_KW,
    DEFINE_KW,
    IF_KW,
    THEN_KW,
    ELSE_KW,
    FI_KW,
    WHILE_KW,
    DO_KW,
    OD_KW,
    BEGIN_KW,
    END_KW,

    NAME,
    NUMBER,
    STRING,

    ERROR_TOKEN,
    EOF,

    // Nodes.
    PROGRAM,
    STATEMENT_LIST,
    PRINT_STMT,
    RETURN_STMT,
    LET_STMT,
    DEFINE_STMT,
    IF_STMT,
    WHILE_STMT,
    ERROR_STMT,
    PARAM_LIST,
    ARG_LIST,
    NAME_EXPR,
    CALL_EXPR,
    LITERAL,
    PAREN_EXPR,
    BINARY_EXPR,
    PREFIX_EXPR,
}

impl SyntaxKind {
    /// Keywords that close an enclosing block and therefore stop error
    /// recovery.
    pub fn is_block_terminator(self) -> bool {
        matches!(self, Self::ELSE_KW | Self::FI_KW | Self::OD_KW | Self::END_KW)
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::PRINT_KW
                | Self::RETURN_KW
                | Self::LET_KW
                | Self::DEFINE_KW
                | Self::IF_KW
                | Self::THEN_KW
                | Self::ELSE_KW
                | Self::FI_KW
                | Self::WHILE_KW
                | Self::DO_KW
                | Self::OD_KW
                | Self::BEGIN_KW
                | Self::END_KW
        )
    }

    pub fn is_statement(self) -> bool {
        self.is_reusable_statement() || self == Self::ERROR_STMT
    }

    /// Statement kinds the incremental parser may take wholesale from an old
    /// tree. Error statements are never reused.
    pub fn is_reusable_statement(self) -> bool {
        matches!(
            self,
            Self::PRINT_STMT
                | Self::RETURN_STMT
                | Self::LET_STMT
                | Self::DEFINE_STMT
                | Self::IF_STMT
                | Self::WHILE_STMT
        )
    }

    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::LEFT_PAREN => "'('",
            Self::RIGHT_PAREN => "')'",
            Self::COMMA => "','",
            Self::SEMICOLON => "';'",
            Self::EQ => "'='",
            Self::PLUS => "'+'",
            Self::MINUS => "'-'",
            Self::STAR => "'*'",
            Self::SLASH => "'/'",
            Self::PRINT_KW => "'print'",
            Self::RETURN_KW => "'return'",
            Self::LET_KW => "'let'",
            Self::DEFINE_KW => "'define'",
            Self::IF_KW => "'if'",
            Self::THEN_KW => "'then'",
            Self::ELSE_KW => "'else'",
            Self::FI_KW => "'fi'",
            Self::WHILE_KW => "'while'",
            Self::DO_KW => "'do'",
            Self::OD_KW => "'od'",
            Self::BEGIN_KW => "'begin'",
            Self::END_KW => "'end'",
            Self::NAME => "an identifier",
            Self::NUMBER => "a number",
            Self::STRING => "a string",
            Self::ERROR_TOKEN => "an unexpected character",
            Self::EOF => "end of input",
            _ => "a syntax node",
        }
    }
}
