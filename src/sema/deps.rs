// src/sema/deps.rs
//
// File-level dependency resolution: scan each file for global reads,
// global writes, and requires, then compute a deterministic analysis
// order.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::SubdirFilter;
use crate::errors::AnalysisError;
use crate::frontend::{Chunk, Expr, ExprKind, Stmt, TableField};

/// What one file reads, writes, and requires. Collected by a lightweight
/// AST walk, no type analysis.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    pub identifier: String,
    pub reads: IndexSet<String>,
    pub writes: IndexSet<String>,
    pub requires: IndexSet<String>,
}

/// Computes the analysis order for a file set.
#[derive(Debug, Default)]
pub struct DependencyResolver {
    facts: IndexMap<String, FileFacts>,
    /// Global name -> files that write it
    setters: FxHashMap<String, IndexSet<String>>,
    /// Identifier path suffix -> full identifiers
    aliases: FxHashMap<String, Vec<String>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one parsed file. Duplicate identifiers are fatal for the
    /// second file; the first wins.
    pub fn add_file(&mut self, identifier: &str, chunk: &Chunk) -> Result<(), AnalysisError> {
        if self.facts.contains_key(identifier) {
            return Err(AnalysisError::DuplicateIdentifier {
                identifier: identifier.to_string(),
                path: format!("{identifier}.lua"),
            });
        }
        let facts = scan_chunk(identifier, chunk);
        for written in &facts.writes {
            self.setters
                .entry(written.clone())
                .or_default()
                .insert(identifier.to_string());
        }
        self.facts.insert(identifier.to_string(), facts);
        Ok(())
    }

    pub fn facts(&self, identifier: &str) -> Option<&FileFacts> {
        self.facts.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Build the require-alias map: for `a/b/c`, register the suffixes
    /// `b/c` and `c`. Done once per run, immutable afterwards.
    pub fn build_aliases(&mut self) {
        self.aliases.clear();
        for identifier in self.facts.keys() {
            let segments: Vec<&str> = identifier.split('/').collect();
            for start in 1..segments.len() {
                let suffix = segments[start..].join("/");
                self.aliases
                    .entry(suffix)
                    .or_default()
                    .push(identifier.clone());
            }
        }
    }

    /// The alias map, for handing to the analysis context.
    pub fn aliases(&self) -> &FxHashMap<String, Vec<String>> {
        &self.aliases
    }

    /// Resolve a require string to dependency identifiers. Unique alias
    /// matches win; ambiguous matches prefer the requiring file's
    /// subdirectory; still-ambiguous matches are all included when
    /// `ambiguity` is set.
    pub fn resolve_require(&self, name: &str, from: &str, ambiguity: bool) -> Vec<String> {
        let normalized = name.replace('.', "/").replace('\\', "/");
        if self.facts.contains_key(normalized.as_str()) {
            return vec![normalized];
        }
        let Some(candidates) = self.aliases.get(normalized.as_str()) else {
            return Vec::new();
        };
        if candidates.len() == 1 {
            return candidates.clone();
        }
        let from_subdir = subdir_of(from);
        let same_subdir: Vec<String> = candidates
            .iter()
            .filter(|c| subdir_of(c) == from_subdir)
            .cloned()
            .collect();
        if same_subdir.len() == 1 {
            return same_subdir;
        }
        if ambiguity {
            candidates.clone()
        } else {
            Vec::new()
        }
    }

    /// Dependencies of one file: resolved requires plus the setters of
    /// every global it reads, minus itself.
    fn deps_of(&self, identifier: &str, ambiguity: bool) -> IndexSet<String> {
        let mut deps = IndexSet::new();
        let Some(facts) = self.facts.get(identifier) else {
            return deps;
        };
        for required in &facts.requires {
            for dep in self.resolve_require(required, identifier, ambiguity) {
                deps.insert(dep);
            }
        }
        for read in &facts.reads {
            if let Some(setters) = self.setters.get(read.as_str()) {
                for setter in setters {
                    deps.insert(setter.clone());
                }
            }
        }
        deps.shift_remove(identifier);
        deps
    }

    /// Compute the analysis order. Files are partitioned by subdirectory
    /// prefix (user-supplied order), each partition sorted
    /// case-insensitively, then a worklist pulls dependencies ahead of
    /// their dependents. Cycles terminate through the `seen` guard: a
    /// file completing a cycle is appended with its back-edges
    /// unresolved.
    pub fn order(&self, filter: &SubdirFilter, ambiguity: bool) -> Vec<String> {
        let mut order: IndexSet<String> = IndexSet::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for partition in self.partitions(filter) {
            // Reverse so pop() yields case-insensitive sorted order
            let mut stack: Vec<String> = partition.into_iter().rev().collect();
            while let Some(file) = stack.pop() {
                if order.contains(file.as_str()) {
                    continue;
                }
                let deps = self.deps_of(&file, ambiguity);
                let pending: Vec<&String> = deps
                    .iter()
                    .filter(|d| !seen.contains(d.as_str()) && !order.contains(d.as_str()))
                    .collect();
                if pending.is_empty() {
                    order.insert(file);
                } else {
                    seen.insert(file.clone());
                    stack.push(file);
                    for dep in pending.into_iter().rev() {
                        stack.push(dep.clone());
                    }
                }
            }
        }

        order.into_iter().collect()
    }

    /// Partition identifiers by subdirectory prefix. Named filters keep
    /// the caller's order and append unmatched files last; `All` sorts
    /// subdirectories case-insensitively.
    fn partitions(&self, filter: &SubdirFilter) -> Vec<Vec<String>> {
        let mut by_subdir: IndexMap<String, Vec<String>> = IndexMap::new();
        for identifier in self.facts.keys() {
            by_subdir
                .entry(subdir_of(identifier).to_string())
                .or_default()
                .push(identifier.clone());
        }
        for files in by_subdir.values_mut() {
            files.sort_by_key(|f| f.to_lowercase());
        }

        match filter {
            SubdirFilter::Named(names) => {
                let mut partitions = Vec::new();
                for name in names {
                    if let Some(files) = by_subdir.shift_remove(name.as_str()) {
                        partitions.push(files);
                    }
                }
                // Whatever is left keeps scan order
                for (_, files) in by_subdir {
                    partitions.push(files);
                }
                partitions
            }
            SubdirFilter::All => {
                let mut keys: Vec<String> = by_subdir.keys().cloned().collect();
                keys.sort_by_key(|k| k.to_lowercase());
                keys.into_iter()
                    .filter_map(|k| by_subdir.shift_remove(k.as_str()))
                    .collect()
            }
        }
    }
}

fn subdir_of(identifier: &str) -> &str {
    identifier.split('/').next().unwrap_or(identifier)
}

/// Walk one file and collect its reads, writes, and requires.
pub fn scan_chunk(identifier: &str, chunk: &Chunk) -> FileFacts {
    let mut scanner = Scanner {
        facts: FileFacts {
            identifier: identifier.to_string(),
            ..FileFacts::default()
        },
        locals: vec![FxHashSet::default()],
    };
    scanner.block(&chunk.body, true);
    scanner.facts
}

struct Scanner {
    facts: FileFacts,
    locals: Vec<FxHashSet<String>>,
}

impl Scanner {
    fn block(&mut self, body: &[Stmt], module_scope: bool) {
        for stmt in body {
            self.statement(stmt, module_scope);
        }
    }

    fn scoped_block(&mut self, body: &[Stmt], bind: &[&Expr]) {
        self.locals.push(FxHashSet::default());
        for expr in bind {
            if let Some(name) = expr.as_identifier() {
                self.bind(name);
            }
        }
        self.block(body, false);
        self.locals.pop();
    }

    fn statement(&mut self, stmt: &Stmt, module_scope: bool) {
        match stmt {
            Stmt::Local(local) => {
                for init in &local.init {
                    self.expression(init);
                }
                for var in &local.variables {
                    if let Some(name) = var.as_identifier() {
                        self.bind(name);
                    }
                }
            }
            Stmt::Assignment(assign) => {
                for init in &assign.init {
                    self.expression(init);
                }
                for var in &assign.variables {
                    match &var.kind {
                        ExprKind::Identifier(name) => {
                            if !self.is_bound(name) && module_scope {
                                self.facts.writes.insert(name.clone());
                            }
                        }
                        _ => self.expression(var),
                    }
                }
            }
            Stmt::Return(ret) => {
                for arg in &ret.arguments {
                    self.expression(arg);
                }
            }
            Stmt::If(stmt) => {
                for clause in &stmt.clauses {
                    if let Some(condition) = &clause.condition {
                        self.expression(condition);
                    }
                    self.scoped_block(&clause.body, &[]);
                }
            }
            Stmt::While(stmt) => {
                self.expression(&stmt.condition);
                self.scoped_block(&stmt.body, &[]);
            }
            Stmt::Repeat(stmt) => {
                self.scoped_block(&stmt.body, &[]);
                self.expression(&stmt.condition);
            }
            Stmt::Do(stmt) => self.scoped_block(&stmt.body, &[]),
            Stmt::ForNumeric(stmt) => {
                self.expression(&stmt.start);
                self.expression(&stmt.limit);
                if let Some(step) = &stmt.step {
                    self.expression(step);
                }
                self.scoped_block(&stmt.body, &[&stmt.variable]);
            }
            Stmt::ForGeneric(stmt) => {
                for iter in &stmt.iterators {
                    self.expression(iter);
                }
                let bind: Vec<&Expr> = stmt.variables.iter().collect();
                self.scoped_block(&stmt.body, &bind);
            }
            Stmt::Function(decl) => {
                if let Some(identifier) = &decl.identifier {
                    match &identifier.kind {
                        ExprKind::Identifier(name) => {
                            if decl.is_local {
                                self.bind(name);
                            } else if module_scope && !self.is_bound(name) {
                                self.facts.writes.insert(name.clone());
                            }
                        }
                        _ => self.expression(identifier),
                    }
                }
                let bind: Vec<&Expr> = decl.parameters.iter().collect();
                self.scoped_block(&decl.body, &bind);
            }
            Stmt::Call(call) => {
                self.expression(&call.expression);
            }
            Stmt::Break(_) => {}
        }
    }

    fn expression(&mut self, expr: &Expr) {
        if let Some(required) = require_argument(expr) {
            self.facts.requires.insert(required);
            return;
        }
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if !self.is_bound(name) {
                    self.facts.reads.insert(name.clone());
                }
            }
            ExprKind::Member { base, .. } => self.expression(base),
            ExprKind::Index { base, index } => {
                self.expression(base);
                self.expression(index);
            }
            ExprKind::Unary { argument, .. } => self.expression(argument),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
                self.expression(lhs);
                self.expression(rhs);
            }
            ExprKind::Call { base, arguments } => {
                self.expression(base);
                for arg in arguments {
                    self.expression(arg);
                }
            }
            ExprKind::TableCall { base, argument } | ExprKind::StringCall { base, argument } => {
                self.expression(base);
                self.expression(argument);
            }
            ExprKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Value { value } => self.expression(value),
                        TableField::Key { key, value } => {
                            self.expression(key);
                            self.expression(value);
                        }
                        TableField::KeyString { value, .. } => self.expression(value),
                    }
                }
            }
            ExprKind::Function { parameters, body } => {
                let bind: Vec<&Expr> = parameters.iter().collect();
                self.scoped_block(body, &bind);
            }
            ExprKind::Vararg
            | ExprKind::String(_)
            | ExprKind::Number(_)
            | ExprKind::Boolean(_)
            | ExprKind::Nil => {}
        }
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.locals.iter().rev().any(|scope| scope.contains(name))
    }
}

/// The string argument of a `require` call, if this expression is one.
pub fn require_argument(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Call { base, arguments } => {
            if base.as_identifier() == Some("require") {
                arguments.first()?.as_string().map(|s| s.to_string())
            } else {
                None
            }
        }
        ExprKind::StringCall { base, argument } => {
            if base.as_identifier() == Some("require") {
                argument.as_string().map(|s| s.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;

    fn scan(identifier: &str, source: &str) -> FileFacts {
        let chunk = Parser::new(source).parse_chunk().expect("parse failed");
        scan_chunk(identifier, &chunk)
    }

    fn resolver(files: &[(&str, &str)]) -> DependencyResolver {
        let mut resolver = DependencyResolver::new();
        for (identifier, source) in files {
            let chunk = Parser::new(source).parse_chunk().expect("parse failed");
            resolver.add_file(identifier, &chunk).expect("duplicate");
        }
        resolver.build_aliases();
        resolver
    }

    #[test]
    fn scan_separates_reads_and_writes() {
        let facts = scan("shared/a", "G = Other.value\nlocal x = G");
        assert!(facts.writes.contains("G"));
        assert!(facts.reads.contains("Other"));
        assert!(!facts.reads.contains("x"));
    }

    #[test]
    fn scan_locals_do_not_read() {
        let facts = scan("shared/a", "local t = {}\nt.x = 1");
        assert!(facts.reads.is_empty());
        assert!(facts.writes.is_empty());
    }

    #[test]
    fn scan_finds_requires() {
        let facts = scan("shared/a", "require \"b/c\"\nlocal m = require(\"d\")");
        assert!(facts.requires.contains("b/c"));
        assert!(facts.requires.contains("d"));
    }

    #[test]
    fn scan_function_scope_binds_parameters() {
        let facts = scan("shared/a", "function f(x) return x + y end");
        assert!(facts.writes.contains("f"));
        assert!(facts.reads.contains("y"));
        assert!(!facts.reads.contains("x"));
    }

    #[test]
    fn duplicate_identifier_is_fatal_for_second() {
        let chunk = Parser::new("x = 1").parse_chunk().unwrap();
        let mut resolver = DependencyResolver::new();
        resolver.add_file("shared/a", &chunk).unwrap();
        let err = resolver.add_file("shared/a", &chunk).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn requires_order_dependencies_first() {
        let resolver = resolver(&[
            ("shared/a", "require \"shared/b\"\nA = {}"),
            ("shared/b", "B = {}"),
        ]);
        let order = resolver.order(&SubdirFilter::default(), true);
        assert_eq!(order, vec!["shared/b", "shared/a"]);
    }

    #[test]
    fn global_reads_pull_setters_first() {
        let resolver = resolver(&[
            ("shared/a", "x = Config.value"),
            ("shared/config", "Config = {}"),
        ]);
        let order = resolver.order(&SubdirFilter::default(), true);
        assert_eq!(order, vec!["shared/config", "shared/a"]);
    }

    #[test]
    fn cycles_include_every_file() {
        let resolver = resolver(&[
            ("shared/u", "require \"shared/v\"\nU = {}"),
            ("shared/v", "require \"shared/u\"\nV = {}"),
        ]);
        let order = resolver.order(&SubdirFilter::default(), true);
        assert_eq!(order.len(), 2);
        assert!(order.contains(&"shared/u".to_string()));
        assert!(order.contains(&"shared/v".to_string()));
    }

    #[test]
    fn partitions_respect_subdir_order() {
        let resolver = resolver(&[
            ("client/x", "X = {}"),
            ("shared/y", "Y = {}"),
            ("server/z", "Z = {}"),
        ]);
        let order = resolver.order(&SubdirFilter::default(), true);
        assert_eq!(order, vec!["shared/y", "client/x", "server/z"]);
    }

    #[test]
    fn alias_resolves_suffix_require() {
        let resolver = resolver(&[
            ("shared/ui/Widget", "Widget = {}"),
            ("shared/a", "require \"Widget\"\nA = {}"),
        ]);
        let deps = resolver.resolve_require("Widget", "shared/a", true);
        assert_eq!(deps, vec!["shared/ui/Widget"]);
    }

    #[test]
    fn ambiguous_alias_prefers_same_subdir() {
        let resolver = resolver(&[
            ("client/Widget", "Widget = {}"),
            ("server/Widget", "Widget = {}"),
            ("client/a", "require \"Widget\"\nA = {}"),
        ]);
        let deps = resolver.resolve_require("Widget", "client/a", true);
        assert_eq!(deps, vec!["client/Widget"]);
    }

    #[test]
    fn still_ambiguous_alias_includes_all() {
        let resolver = resolver(&[
            ("client/Widget", "Widget = {}"),
            ("server/Widget", "Widget = {}"),
            ("shared/a", "require \"Widget\"\nA = {}"),
        ]);
        let deps = resolver.resolve_require("Widget", "shared/a", true);
        assert_eq!(deps.len(), 2);
        let none = resolver.resolve_require("Widget", "shared/a", false);
        assert!(none.is_empty());
    }

    #[test]
    fn dotted_require_normalizes() {
        let resolver = resolver(&[
            ("shared/ui/Widget", "Widget = {}"),
            ("shared/a", "require \"ui.Widget\"\nA = {}"),
        ]);
        let deps = resolver.resolve_require("ui.Widget", "shared/a", true);
        assert_eq!(deps, vec!["shared/ui/Widget"]);
    }
}
