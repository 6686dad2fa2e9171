// src/commands/common.rs
//! Shared utilities for CLI commands.

use std::io::IsTerminal;

use miette::NamedSource;

use crate::cli::ColorMode;
use crate::errors::render_to_stderr;
use crate::frontend::ParseError;

/// Check if stdout supports color output.
pub fn stdout_supports_color() -> bool {
    // Respect NO_COLOR environment variable (https://no-color.org/)
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Render a parse error to stderr with source context.
pub fn render_parse_error(err: &ParseError, file_path: &str, source: &str, color: ColorMode) {
    let report = miette::Report::new(err.error.clone())
        .with_source_code(NamedSource::new(file_path, source.to_string()));
    render_to_stderr(report.as_ref(), color);
}

/// Render a source-less diagnostic (analysis errors, schema errors,
/// warnings) to stderr.
pub fn render_plain(diagnostic: &dyn miette::Diagnostic, color: ColorMode) {
    render_to_stderr(diagnostic, color);
}
