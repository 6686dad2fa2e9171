// src/errors/parser.rs
//! Parser errors (E1xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected expression, found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedExpression {
        found: String,
        #[label("expected expression")]
        span: SourceSpan,
    },

    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}'")]
    #[diagnostic(code(E1003))]
    UnexpectedToken {
        token: String,
        #[label("unexpected")]
        span: SourceSpan,
    },

    #[error("expected identifier")]
    #[diagnostic(code(E1004))]
    ExpectedIdentifier {
        #[label("expected identifier")]
        span: SourceSpan,
    },

    #[error("expected function arguments")]
    #[diagnostic(
        code(E1005),
        help("call arguments are '(...)', a table constructor, or a string literal")
    )]
    ExpectedArguments {
        #[label("expected arguments")]
        span: SourceSpan,
    },

    #[error("malformed assignment target")]
    #[diagnostic(code(E1006), help("only names, fields, and index expressions can be assigned"))]
    InvalidAssignmentTarget {
        #[label("cannot assign to this")]
        span: SourceSpan,
    },
}
