// src/config.rs
//! Run configuration shared by the analysis pipeline, the schema bridge,
//! and the emitter.

use std::path::PathBuf;

/// Which subdirectories of the input root are analyzed, and in what order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubdirFilter {
    /// Named prefixes, processed in the order given
    Named(Vec<String>),
    /// Every subdirectory, case-insensitive alphabetical
    All,
}

impl Default for SubdirFilter {
    fn default() -> Self {
        Self::Named(vec![
            "shared".to_string(),
            "client".to_string(),
            "server".to_string(),
        ])
    }
}

impl SubdirFilter {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            return Self::All;
        }
        Self::Named(
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

/// Toggles for one generator run. Defaults follow the tool's shipped
/// behavior; the CLI exposes `--no-*` switches for the ones that default
/// on.
#[derive(Debug, Clone)]
pub struct Options {
    /// Apply parameter-name type heuristics
    pub heuristics: bool,
    /// Schema types win over inferred types
    pub keep_types: bool,
    /// Inject schema-only entries into the output
    pub inject: bool,
    /// Use schema types exclusively; analysis supplies structure only
    pub rosetta_only: bool,
    /// Drop unknown-typed members the schema does not mention
    pub delete_unknown: bool,
    /// Restrict emitted fields to schema fields plus inferred instance
    /// fields
    pub strict_fields: bool,
    /// Keep ambiguous alias matches as dependencies
    pub ambiguity: bool,
    /// Sort classes and members case-insensitively in output
    pub alphabetize: bool,
    /// Include the runtime-library definition files in the scan
    pub include_kahlua: bool,
    /// Emit definition files above the usual size cutoff
    pub include_large_defs: bool,
    /// Treat files matching this pattern as helpers (analyzed, not
    /// emitted)
    pub helper_pattern: Option<String>,
    /// Skip files matching this pattern entirely
    pub skip_pattern: Option<String>,
    /// Additional files analyzed after the input tree
    pub extra_files: Vec<PathBuf>,
    /// Module identifiers excluded from output
    pub exclude: Vec<String>,
    /// Field names excluded from output
    pub exclude_fields: Vec<String>,
    pub subdirs: SubdirFilter,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            heuristics: true,
            keep_types: false,
            inject: true,
            rosetta_only: false,
            delete_unknown: true,
            strict_fields: true,
            ambiguity: true,
            alphabetize: true,
            include_kahlua: false,
            include_large_defs: false,
            helper_pattern: None,
            skip_pattern: None,
            extra_files: Vec::new(),
            exclude: Vec::new(),
            exclude_fields: Vec::new(),
            subdirs: SubdirFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_behavior() {
        let options = Options::default();
        assert!(options.heuristics);
        assert!(options.inject);
        assert!(options.delete_unknown);
        assert!(options.strict_fields);
        assert!(options.ambiguity);
        assert!(options.alphabetize);
        assert!(!options.keep_types);
        assert!(!options.rosetta_only);
    }

    #[test]
    fn subdir_filter_parses_lists_and_all() {
        assert_eq!(
            SubdirFilter::parse("shared, client"),
            SubdirFilter::Named(vec!["shared".to_string(), "client".to_string()])
        );
        assert_eq!(SubdirFilter::parse("all"), SubdirFilter::All);
        assert_eq!(SubdirFilter::parse("ALL"), SubdirFilter::All);
    }
}
