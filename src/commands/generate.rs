// src/commands/generate.rs
//! The full pipeline: scan, order, analyze, finalize, merge schema
//! overlays, emit stubs and schema files. Per-file failures are logged
//! and skipped; the run continues.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::cli::{ColorMode, GenerateArgs};
use crate::commands::common::{render_parse_error, render_plain};
use crate::config::{Options, SubdirFilter};
use crate::emit::StubWriter;
use crate::schema::{merge_module, read_schema_dir, write_schema_file};
use crate::sema::{Analyzer, ModuleOutput, SourceError};

/// Stub files past this size are skipped unless --include-large-defs
const LARGE_DEF_CUTOFF: usize = 512 * 1024;

pub fn generate(args: &GenerateArgs, color: ColorMode) -> ExitCode {
    let options = args.options();

    let inputs = {
        let _span = tracing::info_span!("scan", input = %args.input.display()).entered();
        collect_inputs(&args.input, &options)
    };
    if inputs.is_empty() {
        eprintln!("error: no Lua sources found under '{}'", args.input.display());
        return ExitCode::FAILURE;
    }
    tracing::info!(files = inputs.len(), "scanned input tree");

    let mut analyzer = Analyzer::new(options.clone());
    for (identifier, path) in &inputs {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable file, skipped");
                continue;
            }
        };
        match analyzer.add_source(identifier, &source) {
            Ok(()) => {}
            Err(SourceError::Parse(err)) => {
                render_parse_error(&err, &path.display().to_string(), &source, color);
                tracing::warn!(module = %identifier, "parse failed, skipped");
            }
            Err(SourceError::Analysis(err)) => {
                render_plain(&err, color);
            }
        }
    }

    analyzer.analyze();
    for err in analyzer.take_errors() {
        render_plain(&err, color);
    }
    let mut outputs = analyzer.finalize();

    if let Some(schema_dir) = &args.schema {
        apply_schemas(&mut outputs, schema_dir, &options, color);
    }

    outputs.retain(|m| !options.exclude.contains(&m.identifier));

    let helper = options
        .helper_pattern
        .as_deref()
        .and_then(|p| glob::Pattern::new(p).ok());
    let writer = StubWriter::new(&options);
    let mut emitted = 0usize;

    let _span = tracing::info_span!("emit", output = %args.output.display()).entered();
    for module in &outputs {
        if helper
            .as_ref()
            .is_some_and(|p| p.matches(&module.identifier))
        {
            continue;
        }
        let Some(text) = writer.render(module) else {
            continue;
        };
        if !options.include_large_defs && text.len() > LARGE_DEF_CUTOFF {
            tracing::warn!(module = %module.identifier, bytes = text.len(), "large definition skipped");
            continue;
        }
        if let Err(err) = write_stub(&args.output, &module.identifier, &text) {
            tracing::warn!(module = %module.identifier, error = %err, "stub write failed, skipped");
            continue;
        }
        if let Err(err) = write_schema_file(&args.output, module) {
            render_plain(&err, color);
            continue;
        }
        emitted += 1;
    }

    println!("analyzed {} modules, emitted {}", outputs.len(), emitted);
    ExitCode::SUCCESS
}

fn write_stub(dir: &Path, identifier: &str, text: &str) -> std::io::Result<()> {
    let path = dir.join(format!("{identifier}.lua"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
}

/// Merge schema overlays into the analyzed modules. Schema files with no
/// analyzed counterpart become modules of their own when injection is on.
fn apply_schemas(
    outputs: &mut Vec<ModuleOutput>,
    schema_dir: &Path,
    options: &Options,
    color: ColorMode,
) {
    let _span = tracing::info_span!("merge", schema = %schema_dir.display()).entered();
    for (identifier, schema) in read_schema_dir(schema_dir) {
        let existing = outputs.iter_mut().find(|m| m.identifier == identifier);
        match existing {
            Some(module) => {
                for warning in merge_module(module, &schema, options) {
                    render_plain(&warning, color);
                }
            }
            None if options.inject => {
                let mut module = ModuleOutput {
                    identifier: identifier.clone(),
                    ..ModuleOutput::default()
                };
                for warning in merge_module(&mut module, &schema, options) {
                    render_plain(&warning, color);
                }
                outputs.push(module);
            }
            None => {
                tracing::warn!(module = %identifier, "schema file has no analyzed module");
            }
        }
    }
}

/// Scan the input tree for Lua files, producing `(identifier, path)`
/// pairs. Identifiers are input-relative paths without the extension.
fn collect_inputs(input: &Path, options: &Options) -> Vec<(String, PathBuf)> {
    let mut files: Vec<PathBuf> = Vec::new();
    match &options.subdirs {
        SubdirFilter::Named(names) => {
            for name in names {
                collect_lua_files(&input.join(name), &mut files);
            }
        }
        SubdirFilter::All => collect_lua_files(input, &mut files),
    }

    let skip = options
        .skip_pattern
        .as_deref()
        .and_then(|p| glob::Pattern::new(p).ok());

    let mut out = Vec::new();
    for path in files {
        let identifier = path
            .strip_prefix(input)
            .unwrap_or(&path)
            .with_extension("")
            .to_string_lossy()
            .replace('\\', "/");
        if skip.as_ref().is_some_and(|p| p.matches(&identifier)) {
            continue;
        }
        if !options.include_kahlua && identifier.to_lowercase().contains("kahlua") {
            continue;
        }
        out.push((identifier, path));
    }

    for path in &options.extra_files {
        let identifier = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if !identifier.is_empty() {
            out.push((identifier, path.clone()));
        }
    }

    out
}

fn collect_lua_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_lua_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "lua") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn collect_respects_subdir_filter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shared/a.lua", "A = {}");
        write(dir.path(), "client/b.lua", "B = {}");
        write(dir.path(), "docs/c.lua", "C = {}");

        let options = Options::default();
        let inputs = collect_inputs(dir.path(), &options);
        let identifiers: Vec<&str> = inputs.iter().map(|(i, _)| i.as_str()).collect();
        assert!(identifiers.contains(&"shared/a"));
        assert!(identifiers.contains(&"client/b"));
        assert!(!identifiers.contains(&"docs/c"));

        let all = Options {
            subdirs: SubdirFilter::All,
            ..Options::default()
        };
        let inputs = collect_inputs(dir.path(), &all);
        assert_eq!(inputs.len(), 3);
    }

    #[test]
    fn skip_pattern_filters_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shared/keep.lua", "A = {}");
        write(dir.path(), "shared/test/skipme.lua", "B = {}");

        let options = Options {
            skip_pattern: Some("shared/test/*".to_string()),
            ..Options::default()
        };
        let inputs = collect_inputs(dir.path(), &options);
        let identifiers: Vec<&str> = inputs.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(identifiers, vec!["shared/keep"]);
    }

    #[test]
    fn kahlua_definitions_excluded_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shared/kahlua/base.lua", "A = {}");
        write(dir.path(), "shared/game.lua", "B = {}");

        let options = Options::default();
        let inputs = collect_inputs(dir.path(), &options);
        assert_eq!(inputs.len(), 1);

        let with_kahlua = Options {
            include_kahlua: true,
            ..Options::default()
        };
        let inputs = collect_inputs(dir.path(), &with_kahlua);
        assert_eq!(inputs.len(), 2);
    }
}
