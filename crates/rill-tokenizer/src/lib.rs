//! The lexer: turns a character source into green tokens with classified
//! leading and trailing trivia.
//!
//! Trivia attachment rules:
//! - Leading trivia is everything scanned before a token begins: whitespace
//!   runs, `//` comments (which absorb their terminating newline in leading
//!   position), and any number of newlines.
//! - Trailing trivia is scanned immediately after a token: whitespace runs,
//!   at most one comment (newline not absorbed), and at most one newline.
//!   Consuming a newline stops the scan, so anything further becomes the
//!   next token's leading trivia.

use rill_errors::Diagnostic;
use rill_syntax::SyntaxKind::{self, *};
use rill_syntax::{GreenToken, GreenTrivia, TriviaKind, TriviaPiece};
use rill_text::{Cursor, EOF_CHAR};
use text_size::{TextRange, TextSize};

/// The character-level interface the lexer reads from.
///
/// One char of push-back is enough: the only speculative read is a `/` that
/// turns out not to start a comment.
pub trait CharSource {
    /// Next char without consuming, or [`EOF_CHAR`].
    fn peek(&self) -> char;
    /// Char after the next one.
    fn second(&self) -> char;
    /// Consume and return the next char, or [`EOF_CHAR`].
    fn bump(&mut self) -> char;
    /// Un-consume `c`; at most one char at a time.
    fn push_back(&mut self, c: char);
    /// Absolute offset of the next unconsumed char.
    fn offset(&self) -> TextSize;
}

impl CharSource for Cursor<'_> {
    fn peek(&self) -> char {
        Cursor::peek(self)
    }

    fn second(&self) -> char {
        Cursor::second(self)
    }

    fn bump(&mut self) -> char {
        Cursor::bump(self)
    }

    fn push_back(&mut self, c: char) {
        Cursor::push_back(self, c)
    }

    fn offset(&self) -> TextSize {
        Cursor::offset(self)
    }
}

/// One lexed token plus where it sits in the source.
#[derive(Clone, Debug)]
pub struct LexedToken {
    pub token: GreenToken,
    /// Offset of the first leading trivia char.
    pub full_start: TextSize,
    /// Offset of the token text itself.
    pub content_start: TextSize,
}

impl LexedToken {
    pub fn full_width(&self) -> TextSize {
        self.token.full_width()
    }

    pub fn full_end(&self) -> TextSize {
        self.full_start + self.full_width()
    }
}

pub struct Tokenizer<S> {
    source: S,
}

impl<S: CharSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Scans the next token. At end of input this produces a zero-width
    /// [`EOF`] token whose leading trivia is whatever trivia preceded it.
    pub fn next_token(&mut self) -> LexedToken {
        let full_start = self.source.offset();
        let leading = self.trivia(true);
        let content_start = self.source.offset();

        let mut diagnostics = Vec::new();
        let (kind, text) = self.scan(full_start, &mut diagnostics);

        let trailing = if kind == EOF { Vec::new() } else { self.trivia(false) };

        let token = GreenToken::with_diagnostics(
            kind,
            &text,
            GreenTrivia::new(leading),
            GreenTrivia::new(trailing),
            diagnostics,
        );
        LexedToken { token, full_start, content_start }
    }

    fn trivia(&mut self, leading: bool) -> Vec<TriviaPiece> {
        let mut pieces = Vec::new();
        loop {
            match self.source.peek() {
                ' ' | '\t' => {
                    let mut text = String::new();
                    let mut spaces = false;
                    let mut tabs = false;
                    while matches!(self.source.peek(), ' ' | '\t') {
                        let c = self.source.bump();
                        match c {
                            ' ' => spaces = true,
                            _ => tabs = true,
                        }
                        text.push(c);
                    }
                    let kind = match (spaces, tabs) {
                        (true, false) => TriviaKind::Spaces,
                        (false, true) => TriviaKind::Tabs,
                        _ => TriviaKind::MixedWhitespace,
                    };
                    pieces.push(TriviaPiece::new(kind, &text));
                }
                '\n' => {
                    self.source.bump();
                    pieces.push(TriviaPiece::new(TriviaKind::Newline, "\n"));
                    if !leading {
                        // At most one trailing newline; the rest belongs to
                        // the next token.
                        break;
                    }
                }
                '/' => {
                    self.source.bump();
                    if self.source.peek() != '/' {
                        // Division operator; let the token scanner read it.
                        self.source.push_back('/');
                        break;
                    }
                    let mut text = String::from("/");
                    while !matches!(self.source.peek(), '\n' | EOF_CHAR) {
                        text.push(self.source.bump());
                    }
                    if leading && self.source.peek() == '\n' {
                        text.push(self.source.bump());
                    }
                    pieces.push(TriviaPiece::new(TriviaKind::Comment, &text));
                }
                _ => break,
            }
        }
        pieces
    }

    fn scan(&mut self, full_start: TextSize, diagnostics: &mut Vec<Diagnostic>) -> (SyntaxKind, String) {
        let content_rel = self.source.offset() - full_start;
        match self.source.peek() {
            EOF_CHAR => (EOF, String::new()),
            '(' => self.single(LEFT_PAREN),
            ')' => self.single(RIGHT_PAREN),
            ',' => self.single(COMMA),
            ';' => self.single(SEMICOLON),
            '=' => self.single(EQ),
            '+' => self.single(PLUS),
            '-' => self.single(MINUS),
            '*' => self.single(STAR),
            '/' => self.single(SLASH),
            '"' => self.string(content_rel, diagnostics),
            '0'..='9' | '.' => self.number(content_rel, diagnostics),
            c if c.is_ascii_alphabetic() || c == '_' => self.ident(),
            c => {
                self.source.bump();
                let text = c.to_string();
                let range = TextRange::at(content_rel, TextSize::of(c));
                diagnostics.push(Diagnostic::error(format!("Unexpected character '{c}'"), range));
                (ERROR_TOKEN, text)
            }
        }
    }

    fn single(&mut self, kind: SyntaxKind) -> (SyntaxKind, String) {
        let c = self.source.bump();
        (kind, c.to_string())
    }

    fn ident(&mut self) -> (SyntaxKind, String) {
        let mut text = String::new();
        while {
            let c = self.source.peek();
            c.is_ascii_alphanumeric() || c == '_'
        } {
            text.push(self.source.bump());
        }
        (keyword_kind(&text).unwrap_or(NAME), text)
    }

    fn number(
        &mut self,
        content_rel: TextSize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (SyntaxKind, String) {
        let mut text = String::new();
        let mut digits = 0;
        while self.source.peek().is_ascii_digit() {
            text.push(self.source.bump());
            digits += 1;
        }
        if self.source.peek() == '.' {
            text.push(self.source.bump());
            while self.source.peek().is_ascii_digit() {
                text.push(self.source.bump());
                digits += 1;
            }
        }
        if digits == 0 {
            let range = TextRange::at(content_rel, TextSize::new(text.len() as u32));
            diagnostics.push(Diagnostic::error("Number has no digits", range));
        }
        (NUMBER, text)
    }

    fn string(
        &mut self,
        content_rel: TextSize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (SyntaxKind, String) {
        let full_start = self.source.offset() - content_rel;
        let mut text = String::new();
        text.push(self.source.bump());
        loop {
            match self.source.peek() {
                EOF_CHAR | '\n' => {
                    // The newline is not part of the token; it will become
                    // trailing trivia.
                    let range = TextRange::at(content_rel, TextSize::new(text.len() as u32));
                    diagnostics.push(Diagnostic::error("Unterminated string literal", range));
                    break;
                }
                '"' => {
                    text.push(self.source.bump());
                    break;
                }
                '\\' => {
                    let escape_rel = self.source.offset() - full_start;
                    text.push(self.source.bump());
                    match self.source.peek() {
                        '"' | '\\' | 'n' => text.push(self.source.bump()),
                        EOF_CHAR | '\n' => {}
                        c => {
                            let range =
                                TextRange::at(escape_rel, TextSize::of('\\') + TextSize::of(c));
                            diagnostics.push(Diagnostic::error(
                                format!("Unrecognized escape sequence '\\{c}'"),
                                range,
                            ));
                            text.push(self.source.bump());
                        }
                    }
                }
                _ => text.push(self.source.bump()),
            }
        }
        (STRING, text)
    }
}

fn keyword_kind(text: &str) -> Option<SyntaxKind> {
    let kind = match text {
        "print" => PRINT_KW,
        "return" => RETURN_KW,
        "let" => LET_KW,
        "define" => DEFINE_KW,
        "if" => IF_KW,
        "then" => THEN_KW,
        "else" => ELSE_KW,
        "fi" => FI_KW,
        "while" => WHILE_KW,
        "do" => DO_KW,
        "od" => OD_KW,
        "begin" => BEGIN_KW,
        "end" => END_KW,
        _ => return None,
    };
    Some(kind)
}
