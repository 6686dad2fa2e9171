// src/sema/analyzer.rs
//
// The batch analyzer: collects parsed sources, orders them through the
// dependency resolver, reads each module in order, and finalizes the
// whole model. Owns the analysis context for the duration of a run.

use rustc_hash::FxHashMap;

use crate::config::Options;
use crate::errors::AnalysisError;
use crate::frontend::{Chunk, ParseError, Parser};
use crate::sema::context::AnalysisContext;
use crate::sema::deps::DependencyResolver;
use crate::sema::finalize::Finalizer;
use crate::sema::model::ModuleOutput;
use crate::sema::reader;

/// Why a source file was rejected at intake.
#[derive(Debug)]
pub enum SourceError {
    Parse(ParseError),
    Analysis(AnalysisError),
}

pub struct Analyzer {
    ctx: AnalysisContext,
    resolver: DependencyResolver,
    chunks: FxHashMap<String, Chunk>,
    errors: Vec<AnalysisError>,
}

impl Analyzer {
    pub fn new(options: Options) -> Self {
        Self {
            ctx: AnalysisContext::new(options),
            resolver: DependencyResolver::new(),
            chunks: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.ctx.options
    }

    /// Parse and register one source file under its identifier.
    /// Parse failures and duplicate identifiers reject the file; the
    /// caller logs and continues.
    pub fn add_source(&mut self, identifier: &str, source: &str) -> Result<(), SourceError> {
        let mut parser = Parser::new(source);
        let chunk = parser.parse_chunk().map_err(SourceError::Parse)?;
        self.resolver
            .add_file(identifier, &chunk)
            .map_err(SourceError::Analysis)?;
        self.chunks.insert(identifier.to_string(), chunk);
        Ok(())
    }

    /// Run the analysis: order the registered files, then read each
    /// module in order. Returns the analysis order.
    pub fn analyze(&mut self) -> Vec<String> {
        let _span = tracing::info_span!("order", files = self.resolver.len()).entered();
        self.resolver.build_aliases();
        self.ctx.aliases = self.resolver.aliases().clone();
        let order = self
            .resolver
            .order(&self.ctx.options.subdirs, self.ctx.options.ambiguity);
        drop(_span);

        for identifier in &order {
            let Some(chunk) = self.chunks.get(identifier).cloned() else {
                continue;
            };
            let _span = tracing::debug_span!("read", module = %identifier).entered();
            let resolved = reader::read_module(&mut self.ctx, identifier, &chunk);

            // Invariant: every surfaced class id owns a TableInfo. A
            // violation is fatal for this module only; the rest proceed.
            let missing = resolved
                .classes
                .iter()
                .find(|id| self.ctx.table_info(id).is_none())
                .cloned();
            if let Some(id) = missing {
                tracing::error!(module = %identifier, id = %id, "missing table info, module dropped");
                self.errors.push(AnalysisError::MissingTableInfo { id });
                if let Some(module) = self.ctx.module_mut(identifier) {
                    module.resolved = None;
                }
            }
        }
        tracing::debug!(modules = order.len(), "analysis complete");
        order
    }

    /// Module-fatal errors gathered during analysis.
    pub fn take_errors(&mut self) -> Vec<AnalysisError> {
        std::mem::take(&mut self.errors)
    }

    /// Finalize every analyzed module into its user-facing output.
    pub fn finalize(&mut self) -> Vec<ModuleOutput> {
        let _span = tracing::info_span!("finalize").entered();
        Finalizer::new(&mut self.ctx).finalize()
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AnalysisContext {
        &mut self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(files: &[(&str, &str)]) -> Vec<ModuleOutput> {
        let mut analyzer = Analyzer::new(Options::default());
        for (identifier, source) in files {
            analyzer.add_source(identifier, source).expect("add failed");
        }
        analyzer.analyze();
        analyzer.finalize()
    }

    #[test]
    fn modules_finalize_in_analysis_order() {
        let output = run(&[
            ("shared/b", "require \"shared/a\"\nB = {}"),
            ("shared/a", "A = {}"),
        ]);
        let identifiers: Vec<&str> = output.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["shared/a", "shared/b"]);
    }

    #[test]
    fn require_cycle_emits_both_modules() {
        let output = run(&[
            ("shared/u", "require \"shared/v\"\nU = {}\nfunction U:new() return setmetatable({}, U) end"),
            ("shared/v", "require \"shared/u\"\nV = {}\nfunction V:new() return setmetatable({}, V) end"),
        ]);
        assert_eq!(output.len(), 2);
        let total_classes: usize = output.iter().map(|m| m.classes.len()).sum();
        assert_eq!(total_classes, 2);
    }

    #[test]
    fn parse_error_rejects_file() {
        let mut analyzer = Analyzer::new(Options::default());
        let err = analyzer.add_source("shared/bad", "function (");
        assert!(matches!(err, Err(SourceError::Parse(_))));
    }

    #[test]
    fn cross_module_require_types_flow() {
        let output = run(&[
            (
                "shared/def",
                "local M = {}\nfunction M.value() return 42 end\nreturn M",
            ),
            (
                "shared/use",
                "local M = require \"shared/def\"\nCount = M.value()",
            ),
        ]);
        let user = output
            .iter()
            .find(|m| m.identifier == "shared/use")
            .unwrap();
        let field = user.fields.iter().find(|f| f.name == "Count").unwrap();
        assert_eq!(field.types, vec!["number".to_string()]);
    }
}
