// src/errors/lexer.rs
//! Lexer errors (E0xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexerError {
    #[error("unexpected character '{ch}'")]
    #[diagnostic(code(E0001))]
    UnexpectedCharacter {
        ch: char,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("unterminated string")]
    #[diagnostic(code(E0002), help("strings must close on the same line"))]
    UnterminatedString {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("unterminated long bracket")]
    #[diagnostic(code(E0003), help("close with ']]' matching the opening level"))]
    UnterminatedLongBracket {
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("malformed number '{text}'")]
    #[diagnostic(code(E0004))]
    InvalidNumber {
        text: String,
        #[label("not a valid numeric literal")]
        span: SourceSpan,
    },
}
