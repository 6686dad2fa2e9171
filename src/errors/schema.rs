// src/errors/schema.rs
//! Schema file errors (E3xxx).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    #[error("unsupported schema version '{found}' in {path}")]
    #[diagnostic(code(E3001), help("this reader understands schema version 1.1"))]
    UnsupportedVersion { found: String, path: String },

    #[error("malformed schema file {path}: {message}")]
    #[diagnostic(code(E3002))]
    Malformed { path: String, message: String },

    #[error("could not read schema file {path}")]
    #[diagnostic(code(E3003))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
