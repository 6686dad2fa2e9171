// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{Options, SubdirFilter};

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Lua static analyzer and annotated-stub generator
#[derive(Parser)]
#[command(name = "stubgen")]
#[command(version)]
#[command(about = "Generate typed stubs and schema files from Lua sources", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree and emit stubs and schema files
    Generate(GenerateArgs),
    /// Parse and analyze sources, reporting diagnostics without emitting
    Check {
        /// Paths to check (files, directories, or glob patterns)
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<String>,
    },
    /// Print version information
    Version,
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// Root directory of the Lua sources
    #[arg(long, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory the stubs and schema files are written to
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// Directory of hand-authored schema overrides
    #[arg(long, value_name = "DIR")]
    pub schema: Option<PathBuf>,

    /// Subdirectories to analyze, in order, or "all"
    #[arg(long, value_name = "LIST", default_value = "shared,client,server")]
    pub subdirs: String,

    /// Disable parameter-name type heuristics
    #[arg(long)]
    pub no_heuristics: bool,

    /// Schema types win over inferred types
    #[arg(long)]
    pub keep_types: bool,

    /// Do not inject schema-only entries into the output
    #[arg(long)]
    pub no_inject: bool,

    /// Use schema types exclusively; analysis supplies structure only
    #[arg(long)]
    pub rosetta_only: bool,

    /// Keep unknown-typed members the schema does not mention
    #[arg(long)]
    pub no_delete_unknown: bool,

    /// Keep fields the schema does not list
    #[arg(long)]
    pub no_strict_fields: bool,

    /// Drop ambiguous require matches instead of keeping all candidates
    #[arg(long)]
    pub no_ambiguity: bool,

    /// Keep source order instead of sorting output members
    #[arg(long)]
    pub no_alphabetize: bool,

    /// Include the runtime-library definition files in the scan
    #[arg(long)]
    pub include_kahlua: bool,

    /// Emit definition files above the usual size cutoff
    #[arg(long)]
    pub include_large_defs: bool,

    /// Analyze but do not emit modules matching this pattern
    #[arg(long, value_name = "GLOB")]
    pub helper_pattern: Option<String>,

    /// Skip files matching this pattern entirely
    #[arg(long, value_name = "GLOB")]
    pub skip_pattern: Option<String>,

    /// Additional files analyzed after the input tree
    #[arg(long, value_name = "FILE")]
    pub extra_files: Vec<PathBuf>,

    /// Module identifiers excluded from output
    #[arg(long, value_name = "IDENT")]
    pub exclude: Vec<String>,

    /// Field names excluded from output
    #[arg(long, value_name = "NAME")]
    pub exclude_fields: Vec<String>,
}

impl GenerateArgs {
    /// Fold the flag set into run options.
    pub fn options(&self) -> Options {
        Options {
            heuristics: !self.no_heuristics,
            keep_types: self.keep_types,
            inject: !self.no_inject,
            rosetta_only: self.rosetta_only,
            delete_unknown: !self.no_delete_unknown,
            strict_fields: !self.no_strict_fields,
            ambiguity: !self.no_ambiguity,
            alphabetize: !self.no_alphabetize,
            include_kahlua: self.include_kahlua,
            include_large_defs: self.include_large_defs,
            helper_pattern: self.helper_pattern.clone(),
            skip_pattern: self.skip_pattern.clone(),
            extra_files: self.extra_files.clone(),
            exclude: self.exclude.clone(),
            exclude_fields: self.exclude_fields.clone(),
            subdirs: SubdirFilter::parse(&self.subdirs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults_map_to_options() {
        let cli = Cli::try_parse_from([
            "stubgen", "generate", "--input", "in", "--output", "out",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let options = args.options();
        assert!(options.heuristics);
        assert!(options.inject);
        assert!(options.delete_unknown);
        assert!(options.alphabetize);
        assert_eq!(options.subdirs, SubdirFilter::default());
    }

    #[test]
    fn negative_flags_flip_defaults() {
        let cli = Cli::try_parse_from([
            "stubgen",
            "generate",
            "--input",
            "in",
            "--output",
            "out",
            "--no-heuristics",
            "--no-alphabetize",
            "--keep-types",
            "--subdirs",
            "all",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let options = args.options();
        assert!(!options.heuristics);
        assert!(!options.alphabetize);
        assert!(options.keep_types);
        assert_eq!(options.subdirs, SubdirFilter::All);
    }
}
