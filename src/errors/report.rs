// src/errors/report.rs
//! Terminal rendering for diagnostics.
//!
//! Left to itself, miette prints a diagnostic's code on a line of its
//! own above the message. We want one scannable headline instead:
//! `[E1002]: expected ')'`. The `Headline` shim below makes miette do
//! that: it reports no code of its own, folds the code into its Display
//! text, and forwards the rest of the diagnostic untouched.

use std::fmt;
use std::io::Write as IoWrite;

use miette::{
    Diagnostic, GraphicalReportHandler, GraphicalTheme, LabeledSpan, Severity, SourceCode,
    ThemeCharacters, ThemeStyles,
};

use crate::cli::ColorMode;

struct Headline<'d>(&'d dyn Diagnostic);

impl fmt::Display for Headline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.code() {
            Some(code) => write!(f, "[{}]: {}", code, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Debug for Headline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0, f)
    }
}

impl std::error::Error for Headline<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl Diagnostic for Headline<'_> {
    // The code already sits in the headline
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        None
    }

    fn severity(&self) -> Option<Severity> {
        self.0.severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.0.help()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.0.url()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.0.source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.0.labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.0.related()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.0.diagnostic_source()
    }
}

/// Unicode and ANSI color when the terminal can take it, plain ASCII
/// otherwise (and always for captured output).
fn handler(colored: bool) -> GraphicalReportHandler {
    let theme = if colored {
        GraphicalTheme {
            characters: ThemeCharacters::unicode(),
            styles: ThemeStyles::ansi(),
        }
    } else {
        GraphicalTheme {
            characters: ThemeCharacters::ascii(),
            styles: ThemeStyles::none(),
        }
    };
    GraphicalReportHandler::new_themed(theme)
}

fn render(diagnostic: &dyn Diagnostic, colored: bool) -> String {
    let mut out = String::new();
    let _ = handler(colored).render_report(&mut out, &Headline(diagnostic));
    out
}

/// Render to stderr, honoring the color mode.
pub fn render_to_stderr(diagnostic: &dyn Diagnostic, color: ColorMode) {
    let colored = match color {
        ColorMode::Auto => crate::commands::common::stdout_supports_color(),
        ColorMode::Always => true,
        ColorMode::Never => false,
    };
    eprint!("{}", render(diagnostic, colored));
}

/// Render without color or unicode, for tests and captured output.
pub fn render_to_string(diagnostic: &dyn Diagnostic) -> String {
    render(diagnostic, false)
}

/// Render plain output into any writer.
pub fn render_to_writer<W: IoWrite>(
    diagnostic: &dyn Diagnostic,
    mut writer: W,
) -> std::io::Result<()> {
    writer.write_all(render(diagnostic, false).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LexerError;
    use miette::NamedSource;

    #[test]
    fn code_folds_into_the_headline() {
        let err = LexerError::UnexpectedCharacter {
            ch: '@',
            span: (0, 1).into(),
        };
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new("test.lua", "@".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("[E0001]"), "code belongs in the headline");
        assert!(output.contains("unexpected character"));
        // Not repeated as a standalone header line
        assert!(!output.contains("\nE0001\n"));
    }

    #[test]
    fn help_text_survives_the_shim() {
        let err = LexerError::UnterminatedString {
            span: (0, 5).into(),
        };
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new("test.lua", "\"hello".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E0002"));
        assert!(output.contains("help"));
    }
}
