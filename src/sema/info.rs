// src/sema/info.rs
//
// Per-entity metadata owned by the analysis context. Everything here is
// keyed by synthetic string id; cross-references are ids, never pointers.

use indexmap::IndexMap;

use crate::sema::expr::ExprId;
use crate::sema::model::ResolvedScope;
use crate::sema::types::TypeSet;

/// A recorded definition site: an expression plus how to read it.
#[derive(Debug, Clone)]
pub struct ExpressionInfo {
    pub expression: ExprId,
    /// Return position when the expression is a call (1-based)
    pub index: Option<usize>,
    /// The definition binds an instance of a class, not the class itself
    pub instance: bool,
    /// The definition came from a literal in source
    pub from_literal: bool,
    pub defining_module: Option<String>,
}

impl ExpressionInfo {
    pub fn new(expression: ExprId) -> Self {
        Self {
            expression,
            index: None,
            instance: false,
            from_literal: false,
            defining_module: None,
        }
    }

    pub fn with_index(expression: ExprId, index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::new(expression)
        }
    }
}

/// Metadata for one function id.
#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    pub name: String,
    pub parameter_ids: Vec<String>,
    pub parameter_names: Vec<String>,
    /// Accumulated possible types per parameter position
    pub parameter_types: Vec<TypeSet>,
    /// Possible types per return position
    pub return_types: Vec<TypeSet>,
    /// Raw return-site expressions, one list per `return` statement
    pub return_expressions: Vec<Vec<ExprId>>,
    /// Smallest return arity observed across all return sites
    pub min_returns: Option<usize>,
    pub is_constructor: bool,
    pub is_method: bool,
    pub identifier_expression: Option<ExprId>,
    pub defining_module: Option<String>,
}

impl FunctionInfo {
    /// Record one observed return arity.
    pub fn observe_arity(&mut self, arity: usize) {
        self.min_returns = Some(match self.min_returns {
            Some(m) => m.min(arity),
            None => arity,
        });
    }

    /// Make sure per-position collections can hold `len` returns.
    pub fn ensure_returns(&mut self, len: usize) {
        while self.return_types.len() < len {
            self.return_types.push(TypeSet::default());
        }
    }
}

/// Metadata for one table id. A table may or may not be promoted to a
/// class; promotion sets `class_name` (at most once, except the
/// local-derive reassignment case).
#[derive(Debug, Clone, Default)]
pub struct TableInfo {
    /// Positional constructor fields, in source order
    pub literal_fields: Vec<ExpressionInfo>,
    /// Keyed field definitions, ordered by first definition
    pub definitions: IndexMap<String, Vec<ExpressionInfo>>,
    pub class_name: Option<String>,
    pub extends: Option<String>,
    pub derive_name: Option<String>,
    /// Enclosing class table, for nested tables
    pub container_id: Option<String>,
    /// Source-level name the table was first bound to
    pub original_name: Option<String>,
    pub is_closure_class: bool,
    pub is_local_class: bool,
    pub is_local_derive_class: bool,
    /// Placeholder absorbed into a real class; suppressed from output
    pub is_empty_class: bool,
    pub is_atom_ui: bool,
    pub is_atom_ui_base: bool,
    /// Emit as a plain table even though a class name exists
    pub emit_as_table: bool,
    pub instance_name: Option<String>,
    pub instance_id: Option<String>,
    pub defining_module: Option<String>,
}

impl TableInfo {
    pub fn is_class(&self) -> bool {
        self.class_name.is_some()
    }

    pub fn add_definition(&mut self, key: impl Into<String>, info: ExpressionInfo) {
        self.definitions.entry(key.into()).or_default().push(info);
    }
}

/// One analyzed source file.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Path-derived identifier, no extension, `/`-separated
    pub identifier: String,
    /// Tags contributed by schema files
    pub tags: Vec<String>,
    /// Raw text emitted near the top of the stub, from schema
    pub prefix: Option<String>,
    pub resolved: Option<ResolvedScope>,
}

impl Module {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// Last path segment of the identifier.
    pub fn last_segment(&self) -> &str {
        self.identifier
            .rsplit('/')
            .next()
            .unwrap_or(&self.identifier)
    }

    /// Resolved return types at a 1-based position, if any.
    pub fn return_types(&self, index: usize) -> Option<&TypeSet> {
        self.resolved
            .as_ref()
            .and_then(|r| r.returns.get(index.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_arity_keeps_minimum() {
        let mut info = FunctionInfo::default();
        info.observe_arity(3);
        info.observe_arity(1);
        info.observe_arity(2);
        assert_eq!(info.min_returns, Some(1));
    }

    #[test]
    fn module_last_segment() {
        let module = Module::new("client/ui/Widget");
        assert_eq!(module.last_segment(), "Widget");
        let flat = Module::new("Widget");
        assert_eq!(flat.last_segment(), "Widget");
    }
}
