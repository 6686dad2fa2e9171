// src/sema/scope.rs

use rustc_hash::FxHashMap;

use crate::sema::expr::ExprId;
use crate::sema::model::ResolvedScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeKind {
    #[default]
    Module,
    Function,
    Block,
}

/// Ordered analysis items collected while reading a scope. The resolver
/// walks these at scope exit.
#[derive(Debug, Clone)]
pub enum ScopeItem {
    Assignment(AssignmentItem),
    /// `x = require("module")`
    RequireAssignment { target: String, module: String },
    /// A `return` statement's argument expressions
    Returns { expressions: Vec<ExprId> },
    /// A statement-level expression resolved for its side effects
    /// (argument-type accumulation on calls)
    Usage { expression: ExprId },
    /// `setmetatable(target, class_expr)` and equivalent forms; recorded
    /// for ordering, applied when read
    Partial { target: String, class_expr: ExprId },
    /// A resolved child scope
    Resolved(ResolvedScope),
}

#[derive(Debug, Clone)]
pub struct AssignmentItem {
    /// Synthetic id for locals, raw global name otherwise
    pub target: String,
    /// Source-level name being assigned
    pub name: String,
    pub expression: ExprId,
    /// Return position when the RHS is a call (1-based)
    pub index: Option<usize>,
    pub is_local: bool,
}

/// A lexical scope. Parents are owned through a box chain (the reader
/// pushes and pops scopes as it walks); resolved children become items.
#[derive(Debug, Default)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Owning module or function id; blocks inherit the parent's
    pub id: String,
    pub items: Vec<ScopeItem>,
    /// Function id for function scopes
    pub function_id: Option<String>,
    /// Closure-class detection state: the local the body builds itself on
    pub class_self_name: Option<String>,
    pub class_table_id: Option<String>,
    /// Set when the body contains a `self.X = function` definition
    pub has_self_function: bool,
    names_to_ids: FxHashMap<String, String>,
    ids_to_names: FxHashMap<String, String>,
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(kind: ScopeKind, id: impl Into<String>, parent: Scope) -> Self {
        Self {
            kind,
            id: id.into(),
            parent: Some(Box::new(parent)),
            ..Self::default()
        }
    }

    /// Detach and return the parent scope.
    pub fn take_parent(&mut self) -> Option<Scope> {
        self.parent.take().map(|b| *b)
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_deref()
    }

    pub fn parent_mut(&mut self) -> Option<&mut Scope> {
        self.parent.as_deref_mut()
    }

    /// Bind a local name to a synthetic id in this scope.
    pub fn define_local(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        self.ids_to_names.insert(id.clone(), name.clone());
        self.names_to_ids.insert(name, id);
    }

    /// Resolve a name to its local id, walking outward.
    pub fn find_id(&self, name: &str) -> Option<&str> {
        match self.names_to_ids.get(name) {
            Some(id) => Some(id),
            None => self.parent.as_ref().and_then(|p| p.find_id(name)),
        }
    }

    /// Resolve a local id back to its source name, walking outward.
    pub fn find_name(&self, id: &str) -> Option<&str> {
        match self.ids_to_names.get(id) {
            Some(name) => Some(name),
            None => self.parent.as_ref().and_then(|p| p.find_name(id)),
        }
    }

    /// True when the name is bound in this scope or any enclosing one.
    pub fn is_local(&self, name: &str) -> bool {
        self.find_id(name).is_some()
    }

    pub fn push(&mut self, item: ScopeItem) {
        self.items.push(item);
    }

    /// The nearest enclosing function id (for blocks inside functions).
    pub fn enclosing_function(&self) -> Option<&str> {
        match &self.function_id {
            Some(id) => Some(id),
            None => self.parent.as_ref().and_then(|p| p.enclosing_function()),
        }
    }

    /// The nearest enclosing function scope, this one included.
    pub fn nearest_function_mut(&mut self) -> Option<&mut Scope> {
        if matches!(self.kind, ScopeKind::Function) {
            Some(self)
        } else {
            self.parent
                .as_deref_mut()
                .and_then(|p| p.nearest_function_mut())
        }
    }

    /// Record the closure-class seed (`local self = {}`) on the owning
    /// function scope.
    pub fn mark_class_self(&mut self, local_id: &str, table_id: &str) {
        if let Some(function) = self.nearest_function_mut() {
            if function.class_self_name.is_none() {
                function.class_self_name = Some(local_id.to_string());
                function.class_table_id = Some(table_id.to_string());
            }
        }
    }

    /// Record a `self.X = function` sighting against the closure-class
    /// seed, if the base local matches it.
    pub fn mark_self_function(&mut self, local_id: &str) {
        if let Some(function) = self.nearest_function_mut() {
            if function.class_self_name.as_deref() == Some(local_id) {
                function.has_self_function = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_resolve_through_parents() {
        let mut module = Scope::new(ScopeKind::Module, "@module(0)[m]");
        module.define_local("x", "@local(1)[x]");
        let block = Scope::with_parent(ScopeKind::Block, "@module(0)[m]", module);
        assert_eq!(block.find_id("x"), Some("@local(1)[x]"));
        assert_eq!(block.find_name("@local(1)[x]"), Some("x"));
        assert!(block.find_id("y").is_none());
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut module = Scope::new(ScopeKind::Module, "@module(0)[m]");
        module.define_local("x", "@local(1)[x]");
        let mut block = Scope::with_parent(ScopeKind::Block, "@module(0)[m]", module);
        block.define_local("x", "@local(2)[x]");
        assert_eq!(block.find_id("x"), Some("@local(2)[x]"));
    }

    #[test]
    fn take_parent_restores_chain() {
        let module = Scope::new(ScopeKind::Module, "@module(0)[m]");
        let mut block = Scope::with_parent(ScopeKind::Block, "@module(0)[m]", module);
        let parent = block.take_parent().unwrap();
        assert_eq!(parent.kind, ScopeKind::Module);
    }
}
