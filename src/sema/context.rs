// src/sema/context.rs
//! Shared analysis context.
//!
//! The context is the only shared state in the pipeline. It owns every
//! TableInfo/FunctionInfo in flat maps keyed by synthetic id, the global
//! definition map, the expression arena, and the module registry. It is
//! passed explicitly to every component; cross-references travel as ids.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::config::Options;
use crate::frontend::NodeId;
use crate::sema::expr::{ExprArena, ExprId, Expression};
use crate::sema::ids::{IdAllocator, IdKind};
use crate::sema::info::{ExpressionInfo, FunctionInfo, Module, TableInfo};
use crate::sema::types::Usage;

#[derive(Debug)]
pub struct AnalysisContext {
    pub options: Options,
    pub exprs: ExprArena,
    /// Global definition map: identifier/id -> ordered definition list
    pub definitions: FxHashMap<String, Vec<ExpressionInfo>>,
    /// Usage records keyed by expression identity
    pub usage: FxHashMap<ExprId, Usage>,
    /// Analyzed modules in analysis order
    pub modules: IndexMap<String, Module>,
    /// Require-alias map: path suffix -> full identifiers
    pub aliases: FxHashMap<String, Vec<String>>,
    ids: IdAllocator,
    tables: FxHashMap<String, TableInfo>,
    functions: FxHashMap<String, FunctionInfo>,
    /// Placeholder class tables for unknown globals, per module
    unknown_classes: FxHashMap<String, String>,
    /// AST-node -> normalized expression cache, per module
    expr_cache: FxHashMap<NodeId, ExprId>,
    current_module: String,
}

impl AnalysisContext {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            exprs: ExprArena::new(),
            definitions: FxHashMap::default(),
            usage: FxHashMap::default(),
            modules: IndexMap::new(),
            aliases: FxHashMap::default(),
            ids: IdAllocator::new(),
            tables: FxHashMap::default(),
            functions: FxHashMap::default(),
            unknown_classes: FxHashMap::default(),
            expr_cache: FxHashMap::default(),
            current_module: String::new(),
        }
    }

    /// Switch to reading a module. Clears per-module state: the unknown
    /// class cache and the AST-node expression cache (node ids restart per
    /// file).
    pub fn set_current_module(&mut self, identifier: &str) {
        self.current_module = identifier.to_string();
        self.unknown_classes.clear();
        self.expr_cache.clear();
        self.modules
            .entry(identifier.to_string())
            .or_insert_with(|| Module::new(identifier));
    }

    pub fn current_module(&self) -> &str {
        &self.current_module
    }

    /// Allocate a fresh synthetic id.
    pub fn new_id(&mut self, kind: IdKind, name: &str) -> String {
        self.ids.alloc(kind, name)
    }

    /// Allocate a table id and its TableInfo.
    pub fn new_table_id(&mut self, name: &str) -> String {
        let id = self.ids.alloc(IdKind::Table, name);
        let info = TableInfo {
            original_name: (!name.is_empty()).then(|| name.to_string()),
            defining_module: Some(self.current_module.clone()),
            ..TableInfo::default()
        };
        self.tables.insert(id.clone(), info);
        id
    }

    /// Allocate a function id and its FunctionInfo.
    pub fn new_function_id(&mut self, name: &str) -> String {
        let id = self.ids.alloc(IdKind::Function, name);
        let info = FunctionInfo {
            name: name.to_string(),
            defining_module: Some(self.current_module.clone()),
            ..FunctionInfo::default()
        };
        self.functions.insert(id.clone(), info);
        id
    }

    pub fn table_info(&self, id: &str) -> Option<&TableInfo> {
        self.tables.get(id)
    }

    pub fn table_info_mut(&mut self, id: &str) -> Option<&mut TableInfo> {
        self.tables.get_mut(id)
    }

    pub fn function_info(&self, id: &str) -> Option<&FunctionInfo> {
        self.functions.get(id)
    }

    pub fn function_info_mut(&mut self, id: &str) -> Option<&mut FunctionInfo> {
        self.functions.get_mut(id)
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &String> {
        self.tables.keys()
    }

    pub fn function_ids(&self) -> impl Iterator<Item = &String> {
        self.functions.keys()
    }

    /// Record a definition for an identifier or id.
    pub fn add_definition(&mut self, target: impl Into<String>, mut info: ExpressionInfo) {
        if info.defining_module.is_none() {
            info.defining_module = Some(self.current_module.clone());
        }
        self.definitions.entry(target.into()).or_default().push(info);
    }

    pub fn definitions_of(&self, target: &str) -> Option<&[ExpressionInfo]> {
        self.definitions.get(target).map(|v| v.as_slice())
    }

    /// Usage record for an expression, created on first access.
    pub fn usage_mut(&mut self, expression: ExprId) -> &mut Usage {
        self.usage.entry(expression).or_default()
    }

    /// Cached normalized expression for an AST node, if the reader has
    /// already lowered it. Identity is stable per node within a module.
    pub fn cached_expr(&self, node: NodeId) -> Option<ExprId> {
        self.expr_cache.get(&node).copied()
    }

    pub fn cache_expr(&mut self, node: NodeId, expression: ExprId) {
        self.expr_cache.insert(node, expression);
    }

    /// Allocate a normalized expression outside the AST cache (synthetic
    /// expressions the reader fabricates).
    pub fn alloc_expr(&mut self, expression: Expression) -> ExprId {
        self.exprs.alloc(expression)
    }

    /// Placeholder class table for an unknown global, cached per name per
    /// module.
    pub fn unknown_class(&mut self, name: &str) -> String {
        if let Some(id) = self.unknown_classes.get(name) {
            return id.clone();
        }
        let id = self.new_table_id(name);
        if let Some(info) = self.tables.get_mut(&id) {
            info.class_name = Some(name.to_string());
        }
        self.unknown_classes.insert(name.to_string(), id.clone());
        id
    }

    /// The placeholder for a name, if one exists in the current module.
    pub fn existing_unknown_class(&self, name: &str) -> Option<&str> {
        self.unknown_classes.get(name).map(|s| s.as_str())
    }

    /// Look up a module by identifier, optionally through the alias map.
    pub fn module(&self, name: &str, check_aliases: bool) -> Option<&Module> {
        if let Some(module) = self.modules.get(name) {
            return Some(module);
        }
        if !check_aliases {
            return None;
        }
        let candidates = self.aliases.get(name)?;
        match candidates.as_slice() {
            [single] => self.modules.get(single),
            _ => None,
        }
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::expr::{Expression, LiteralExpr, LuaType};

    fn ctx() -> AnalysisContext {
        let mut ctx = AnalysisContext::new(Options::default());
        ctx.set_current_module("shared/Test");
        ctx
    }

    #[test]
    fn table_ids_get_exactly_one_info() {
        let mut ctx = ctx();
        let id = ctx.new_table_id("Foo");
        assert!(ctx.table_info(&id).is_some());
        assert_eq!(
            ctx.table_info(&id).unwrap().defining_module.as_deref(),
            Some("shared/Test")
        );
    }

    #[test]
    fn expr_cache_returns_stable_identity() {
        let mut ctx = ctx();
        let node = NodeId(7);
        let a = ctx.alloc_expr(Expression::Literal(LiteralExpr::of(LuaType::Nil)));
        ctx.cache_expr(node, a);
        assert_eq!(ctx.cached_expr(node), Some(a));
    }

    #[test]
    fn expr_cache_clears_on_module_switch() {
        let mut ctx = ctx();
        let node = NodeId(7);
        let a = ctx.alloc_expr(Expression::Literal(LiteralExpr::of(LuaType::Nil)));
        ctx.cache_expr(node, a);
        ctx.set_current_module("shared/Other");
        assert_eq!(ctx.cached_expr(node), None);
    }

    #[test]
    fn unknown_class_cached_per_name() {
        let mut ctx = ctx();
        let a = ctx.unknown_class("Events");
        let b = ctx.unknown_class("Events");
        assert_eq!(a, b);
        ctx.set_current_module("shared/Other");
        let c = ctx.unknown_class("Events");
        assert_ne!(a, c);
    }

    #[test]
    fn module_lookup_through_unique_alias() {
        let mut ctx = ctx();
        ctx.modules
            .insert("client/ui/Widget".to_string(), Module::new("client/ui/Widget"));
        ctx.aliases.insert(
            "Widget".to_string(),
            vec!["client/ui/Widget".to_string()],
        );
        assert!(ctx.module("Widget", true).is_some());
        assert!(ctx.module("Widget", false).is_none());
    }
}
