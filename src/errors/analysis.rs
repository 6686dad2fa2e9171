// src/errors/analysis.rs
//! Analysis errors and warnings (E2xxx).

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the analysis pipeline. Everything here is file- or
/// module-scoped rather than span-scoped: by the time analysis runs, parse
/// diagnostics have already been rendered against source text.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum AnalysisError {
    #[error("duplicate module identifier '{identifier}' ({path})")]
    #[diagnostic(
        code(E2001),
        help("the first file with this identifier wins; rename or exclude one of them")
    )]
    DuplicateIdentifier { identifier: String, path: String },

    #[error("no table info for id '{id}'")]
    #[diagnostic(code(E2002))]
    MissingTableInfo { id: String },
}

/// Non-fatal findings surfaced while merging schema data into the analyzed
/// model.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum AnalysisWarning {
    #[error("'{name}': schema declares {schema} parameters, analysis found {analyzed}")]
    #[diagnostic(code(W2101))]
    ArityMismatch {
        name: String,
        schema: usize,
        analyzed: usize,
    },

    #[error("schema entry '{name}' has no analyzed counterpart in module '{module}'")]
    #[diagnostic(code(W2102))]
    UnknownSchemaEntry { name: String, module: String },

    #[error("constructor '{name}' has no analyzed function; leaving schema entry intact")]
    #[diagnostic(code(W2103))]
    MissingAnalyzedConstructor { name: String },
}
