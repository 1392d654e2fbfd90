//! Lexical analysis for datapol policies
//!
//! Tokenizes Datalog policy text using logos.

use datapol_ast::Span;
use logos::Logos;

/// Policy tokens
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// Negation keyword: `not`, `NOT` or `!`
    #[token("not")]
    #[token("NOT")]
    #[token("!")]
    Negation,

    /// Identifier: tablename piece, modal, variable or column name.
    /// Dots are allowed between segments but never at the end, so a
    /// trailing `.` still terminates a statement.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z0-9_]+)*")]
    Id,

    /// Integer literal, optionally negative
    #[regex(r"-?[0-9]+")]
    Integer,

    /// Float literal with a fraction and/or an exponent
    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?")]
    #[regex(r"-?[0-9]+[eE][-+]?[0-9]+")]
    Float,

    /// String literal with quotes
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    String,

    /// Rule implication (:-)
    #[token(":-")]
    ColonMinus,

    /// Service separator (:)
    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("(")]
    Lparen,

    #[token(")")]
    Rparen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    /// Column reference assignment (=)
    #[token("=")]
    Equal,

    /// Insert-update suffix (+)
    #[token("+")]
    Plus,

    /// Delete-update suffix (-)
    #[token("-")]
    Minus,

    /// Statement terminator (;)
    #[token(";")]
    Semicolon,

    /// Statement terminator (.)
    #[token(".")]
    Period,

    /// Line comment, `//` or `#` to end of line
    #[regex(r"//[^\n]*")]
    #[regex(r"#[^\n]*")]
    Comment,

    /// Whitespace and newlines (ignored)
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    /// End of input
    Eof,

    /// Lexer error
    Error,
}

/// Token with location information
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub text: String,
}

/// Lexer that produces tokens with spans
pub struct Lexer<'input> {
    lexer: logos::Lexer<'input, Token>,
    input: &'input str,
}

impl<'input> Lexer<'input> {
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self {
            lexer: Token::lexer(input),
            input,
        }
    }

    /// Get the next token with span information
    pub fn next_token(&mut self) -> SpannedToken {
        match self.lexer.next() {
            Some(result) => {
                let span = self.lexer.span();
                let text = self.input[span.clone()].to_string();
                SpannedToken {
                    token: result.unwrap_or(Token::Error),
                    span: Span::new(span.start, span.end),
                    text,
                }
            }
            None => SpannedToken {
                token: Token::Eof,
                span: Span::new(self.input.len(), self.input.len()),
                text: String::new(),
            },
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token == Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
