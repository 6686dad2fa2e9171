// src/sema/types.rs
//
// Type sets and usage-based narrowing.

use indexmap::IndexSet;

use crate::sema::expr::ExprId;
use crate::sema::ids::{parse_id, IdKind};

/// A set of possible types for an expression. Members are primitive names
/// (`boolean`, `number`, `string`, `table`, `function`, `nil`, `true`,
/// `false`, `unknown`) or synthetic `@kind(n)[name]` markers. Insertion
/// order is preserved so output is deterministic.
pub type TypeSet = IndexSet<String>;

/// Coarse kind of a type-set member, used for usage narrowing.
/// Unresolved markers (parameters, locals, instances of unknown shape)
/// return None and survive narrowing.
pub fn coarse_kind(ty: &str) -> Option<&'static str> {
    if let Some(id) = parse_id(ty) {
        return match id.kind {
            IdKind::Function => Some("function"),
            IdKind::Table | IdKind::Instance => Some("table"),
            _ => None,
        };
    }
    match ty {
        "true" | "false" | "boolean" => Some("boolean"),
        "number" => Some("number"),
        "string" => Some("string"),
        "table" => Some("table"),
        "function" => Some("function"),
        "nil" => Some("nil"),
        _ => None,
    }
}

/// If both boolean literals are present, collapse them into `boolean`.
pub fn collapse_booleans(types: &mut TypeSet) {
    if types.contains("true") && types.contains("false") {
        types.shift_remove("true");
        types.shift_remove("false");
        types.insert("boolean".to_string());
    }
}

/// Capability flags accumulated from how an expression is used.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub supports_concatenation: bool,
    pub supports_indexing: bool,
    pub supports_length: bool,
    pub supports_index_assignment: bool,
    pub supports_math: bool,
    pub in_numeric_for: bool,
    /// Set when the expression is called; holds the call's per-position
    /// argument expressions.
    pub arguments: Option<Vec<ExprId>>,
}

impl Usage {
    pub fn is_empty(&self) -> bool {
        !(self.supports_concatenation
            || self.supports_indexing
            || self.supports_length
            || self.supports_index_assignment
            || self.supports_math
            || self.in_numeric_for
            || self.arguments.is_some())
    }

    /// Candidate types consistent with every observed capability.
    /// An empty result means the capabilities contradict each other;
    /// narrowing is skipped in that case.
    pub fn candidates(&self) -> IndexSet<&'static str> {
        let mut set: IndexSet<&'static str> =
            ["boolean", "function", "number", "string", "table"]
                .into_iter()
                .collect();
        let mut constrain = |allowed: &[&'static str]| {
            set.retain(|t| allowed.contains(t));
        };
        if self.supports_concatenation {
            constrain(&["string", "number"]);
        }
        if self.supports_math {
            constrain(&["number"]);
        }
        if self.supports_length {
            constrain(&["table", "string"]);
        }
        if self.supports_indexing {
            constrain(&["table", "string"]);
        }
        if self.supports_index_assignment {
            constrain(&["table"]);
        }
        if self.in_numeric_for {
            constrain(&["number"]);
        }
        if self.arguments.is_some() {
            constrain(&["function"]);
        }
        set
    }
}

/// Narrow a resolved type set against a usage record. Narrowing is skipped
/// when the candidate set is trivial (empty or unconstrained) or when it
/// would leave nothing behind.
pub fn narrow(types: &mut TypeSet, usage: &Usage) {
    if usage.is_empty() {
        return;
    }
    let candidates = usage.candidates();
    if candidates.is_empty() || candidates.len() >= 5 {
        return;
    }
    let narrowed: TypeSet = types
        .iter()
        .filter(|ty| {
            ty.as_str() == "unknown"
                || match coarse_kind(ty) {
                    Some(kind) => candidates.contains(kind),
                    None => true,
                }
        })
        .cloned()
        .collect();
    if !narrowed.is_empty() {
        *types = narrowed;
    }
}
