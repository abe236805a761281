//! Token types for the modulation lexer.

use std::fmt;

use crate::scanner::{Found, Location};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Ident(String),
    Number(f64),
    /// `<number>t`, a period in beats.
    Period(f64),
    /// A pitch name. `midi` is not range checked yet.
    Pitch { name: String, midi: i32 },

    // Operators and delimiters
    Plus,
    PlusEq,
    Minus,
    Star,
    Slash,
    Eq,
    Pipe,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,

    Eof,
}

impl TokenKind {
    /// How this token reads in a "found ..." message.
    pub fn found(&self) -> Found {
        match self {
            TokenKind::Eof => Found::EndOfInput,
            other => Found::Token(other.to_string()),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Period(n) => write!(f, "{n}t"),
            TokenKind::Pitch { name, .. } => write!(f, "{name}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::PlusEq => write!(f, "+="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
