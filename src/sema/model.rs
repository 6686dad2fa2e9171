// src/sema/model.rs
//
// Resolved forms: what a scope exposes after resolution, and the
// user-facing per-module outputs the finalizer assembles.

use indexmap::IndexSet;

use crate::sema::types::TypeSet;

/// What one scope exposes after `resolve_scope`. For module scopes this is
/// the module's resolved form; for inner scopes it bubbles up through the
/// parent's items.
#[derive(Debug, Clone, Default)]
pub struct ResolvedScope {
    /// Module-level functions (not methods), by function id
    pub functions: Vec<ResolvedFunction>,
    /// Promoted class tables, by table id, first-seen order
    pub classes: IndexSet<String>,
    /// Plain tables exposed at module level, by table id
    pub tables: IndexSet<String>,
    /// Module-level value fields
    pub fields: Vec<ResolvedField>,
    /// Resolved return type sets, one per position
    pub returns: Vec<TypeSet>,
    /// Every class table encountered in this scope or below
    pub seen_classes: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedFunction {
    pub function_id: String,
    pub name: String,
    pub is_local: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub types: TypeSet,
}

/// Finalized output for one module: synthetic markers replaced with
/// user-facing names. This is what the schema bridge and the stub emitter
/// consume.
#[derive(Debug, Clone, Default)]
pub struct ModuleOutput {
    pub identifier: String,
    pub tags: Vec<String>,
    pub prefix: Option<String>,
    /// Type aliases carried through from schema files
    pub aliases: indexmap::IndexMap<String, String>,
    pub classes: Vec<ClassOutput>,
    pub tables: Vec<TableOutput>,
    pub functions: Vec<FunctionOutput>,
    pub fields: Vec<FieldOutput>,
    pub returns: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassOutput {
    pub name: String,
    pub extends: Option<String>,
    pub derive_name: Option<String>,
    pub is_local: bool,
    pub emit_as_table: bool,
    pub notes: Option<String>,
    pub deprecated: bool,
    pub no_initializer: bool,
    pub tags: Vec<String>,
    pub fields: Vec<FieldOutput>,
    pub static_fields: Vec<FieldOutput>,
    pub methods: Vec<FunctionOutput>,
    pub static_methods: Vec<FunctionOutput>,
    pub constructors: Vec<FunctionOutput>,
    /// Schema-only payloads, carried through the merge untouched
    pub overloads: Vec<serde_json::Value>,
    pub operators: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct TableOutput {
    pub name: String,
    pub is_local: bool,
    pub notes: Option<String>,
    pub deprecated: bool,
    pub no_initializer: bool,
    pub tags: Vec<String>,
    pub fields: Vec<FieldOutput>,
    pub methods: Vec<FunctionOutput>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionOutput {
    pub name: String,
    pub parameters: Vec<ParameterOutput>,
    /// Type names per return position
    pub returns: Vec<Vec<String>>,
    pub is_method: bool,
    pub is_constructor: bool,
    pub notes: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
    /// Schema-only payload, carried through the merge untouched
    pub overloads: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterOutput {
    pub name: String,
    pub types: Vec<String>,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FieldOutput {
    pub name: String,
    pub types: Vec<String>,
    pub nullable: bool,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}
