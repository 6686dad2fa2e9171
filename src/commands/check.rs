// src/commands/check.rs

use std::fs;
use std::process::ExitCode;

use crate::cli::{lua_files, ColorMode};
use crate::commands::common::{render_parse_error, render_plain};
use crate::config::{Options, SubdirFilter};
use crate::sema::{Analyzer, SourceError};

/// Parse and analyze the given sources without emitting anything,
/// rendering diagnostics as they surface.
pub fn check_files(paths: &[String], color: ColorMode) -> ExitCode {
    let files = match lua_files(paths) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if files.is_empty() {
        eprintln!("error: no Lua files matched");
        return ExitCode::FAILURE;
    }

    let options = Options {
        // Checking loose files: no subdirectory contract to enforce
        subdirs: SubdirFilter::All,
        ..Options::default()
    };
    let mut analyzer = Analyzer::new(options);
    let mut failed = false;

    for path in &files {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("error: could not read '{}': {}", path.display(), err);
                failed = true;
                continue;
            }
        };
        let identifier = path.with_extension("").to_string_lossy().replace('\\', "/");
        match analyzer.add_source(&identifier, &source) {
            Ok(()) => {}
            Err(SourceError::Parse(err)) => {
                render_parse_error(&err, &path.display().to_string(), &source, color);
                failed = true;
            }
            Err(SourceError::Analysis(err)) => {
                render_plain(&err, color);
                failed = true;
            }
        }
    }

    analyzer.analyze();

    if failed {
        ExitCode::FAILURE
    } else {
        println!("checked {} files", files.len());
        ExitCode::SUCCESS
    }
}
