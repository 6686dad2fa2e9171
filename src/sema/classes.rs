// src/sema/classes.rs
//
// Class materialization. Each detector matches one of the class-defining
// idioms the target sources use and promotes tables to classes on the
// shared context. Detectors are independent; the reader fires them while
// it processes assignments and method definitions.

use crate::frontend::Indexer;
use crate::sema::context::AnalysisContext;
use crate::sema::expr::{ExprId, Expression, LiteralExpr, LuaType, Operator};
use crate::sema::ids::{is_kind, IdKind};
use crate::sema::info::ExpressionInfo;
use crate::sema::resolver::{resolve, table_ids_in, Seen};
use crate::sema::scope::Scope;

/// Marker field that identifies UI-node factory argument tables.
pub const ATOM_UI_MARKER: &str = "_ATOM_UI_CLASS";

/// `X = Base:derive("Name")`. Returns a literal table expression carrying
/// the freshly promoted class, to be recorded as X's definition in place
/// of the call.
pub fn try_derive(
    ctx: &mut AnalysisContext,
    scope: &Scope,
    rhs: ExprId,
    name_path: &str,
    is_local: bool,
) -> Option<ExprId> {
    let Expression::Operation {
        operator: Operator::Call,
        arguments,
    } = ctx.exprs.get(rhs).clone()
    else {
        return None;
    };
    if arguments.len() != 2 {
        return None;
    }
    let Expression::Member {
        base,
        indexer: Indexer::Colon,
        member,
    } = ctx.exprs.get(arguments[0]).clone()
    else {
        return None;
    };
    if member != "derive" {
        return None;
    }
    let Expression::Literal(lit) = ctx.exprs.get(arguments[1]) else {
        return None;
    };
    if lit.lua_type != Some(LuaType::String) {
        return None;
    }
    let derive_name = lit.literal.clone().unwrap_or_default();
    let extends = expr_source_name(ctx, scope, base);

    // Local derive classes are prefixed with the module's last segment so
    // they cannot collide with a global of the same name
    let module_segment = module_last_segment(ctx);
    let class_name = if is_local {
        format!("{module_segment}_{name_path}")
    } else {
        name_path.to_string()
    };

    let table_id = ctx.new_table_id(name_path);
    if let Some(info) = ctx.table_info_mut(&table_id) {
        info.class_name = Some(class_name);
        info.extends = extends;
        info.derive_name = Some(derive_name);
        info.is_local_class = is_local;
        info.is_local_derive_class = is_local;
    }

    Some(ctx.alloc_expr(Expression::Literal(LiteralExpr {
        lua_type: Some(LuaType::Table),
        table_id: Some(table_id),
        ..LiteralExpr::default()
    })))
}

/// `GlobalName = localDeriveClass`. The one case where a class name is
/// reassigned: the local derive class becomes a global class under the
/// new name. Returns the class literal to record for the global.
pub fn try_promote_local_derive(
    ctx: &mut AnalysisContext,
    rhs: ExprId,
    global_name: &str,
) -> Option<ExprId> {
    let Expression::Reference { id } = ctx.exprs.get(rhs) else {
        return None;
    };
    if !is_kind(id, IdKind::Local) {
        return None;
    }
    let definitions = ctx.definitions_of(id)?.to_vec();
    for info in definitions {
        if let Expression::Literal(lit) = ctx.exprs.get(info.expression) {
            if let Some(table_id) = lit.table_id.clone() {
                let table = ctx.table_info_mut(&table_id)?;
                if table.is_local_derive_class {
                    table.class_name = Some(global_name.to_string());
                    table.is_local_class = false;
                    table.is_local_derive_class = false;
                    return Some(info.expression);
                }
            }
        }
    }
    None
}

/// `setmetatable(target, class)` and its equivalents. Binds `target` as
/// an instance of the class and copies any fields already recorded on a
/// literal target table into the class as instance fields.
pub fn bind_instance(
    ctx: &mut AnalysisContext,
    target_key: &str,
    target_name: &str,
    class_expr: ExprId,
    fields_from: Option<ExprId>,
) {
    let mut seen = Seen::default();
    let class_types = resolve(ctx, class_expr, 1, &mut seen);
    let mut class_ids = table_ids_in(ctx, &class_types, &mut seen);

    // `setmetatable(a, { __index = C })`: the class is behind __index
    let mut indirect = Vec::new();
    for id in &class_ids {
        let index_defs = match ctx.table_info(id) {
            Some(info) if !info.is_class() => {
                info.definitions.get("__index").map(|defs| defs.to_vec())
            }
            _ => None,
        };
        let Some(index_defs) = index_defs else { continue };
        for def in index_defs {
            let resolved = resolve(ctx, def.expression, 1, &mut seen);
            if let Some(found) = table_ids_in(ctx, &resolved, &mut seen).into_iter().next() {
                if !indirect.contains(&found) {
                    indirect.push(found);
                }
            }
        }
    }
    if !indirect.is_empty() {
        class_ids = indirect;
    }

    let Some(class_id) = class_ids.into_iter().find(|id| {
        ctx.table_info(id)
            .is_some_and(|info| info.is_class() || !info.definitions.is_empty())
    }) else {
        return;
    };

    // A plain table used as a metatable class is a class in all but name
    if let Some(info) = ctx.table_info_mut(&class_id) {
        if info.class_name.is_none() {
            info.class_name = info.original_name.clone();
        }
    }

    let instance_id = ctx.new_id(IdKind::Instance, target_name);
    ctx.add_definition(instance_id.clone(), ExpressionInfo::new(class_expr));
    let instance_ref = ctx.alloc_expr(Expression::Reference {
        id: instance_id.clone(),
    });
    let mut info = ExpressionInfo::new(instance_ref);
    info.instance = true;
    ctx.add_definition(target_key, info);

    // Copy fields of a literal target table into the class
    let copied: Vec<(String, Vec<ExpressionInfo>)> = fields_from
        .and_then(|expr| ctx.exprs.table_id_of(expr).map(|s| s.to_string()))
        .and_then(|table_id| ctx.table_info(&table_id).cloned())
        .map(|source| {
            source
                .definitions
                .iter()
                .map(|(key, defs)| (key.clone(), defs.clone()))
                .collect()
        })
        .unwrap_or_default();

    if let Some(class) = ctx.table_info_mut(&class_id) {
        if class.instance_id.is_none() {
            class.instance_id = Some(instance_id);
            class.instance_name = Some(target_name.to_string());
        }
        for (key, defs) in copied {
            for mut def in defs {
                def.instance = true;
                class.add_definition(key.clone(), def);
            }
        }
    }
}

/// Closure-class detection, run when a function scope exits. The body
/// must have declared `local self = {}` (or `publ`, or `self =
/// Base.new(...)`), defined at least one `self.X = function`, and the
/// function must be named through a member expression.
pub fn detect_closure_class(
    ctx: &mut AnalysisContext,
    function_scope: &Scope,
    parent_scope: &Scope,
    method_name: &str,
    identifier: Option<ExprId>,
) {
    let Some(table_id) = function_scope.class_table_id.clone() else {
        return;
    };
    if !function_scope.has_self_function {
        return;
    }
    let Some(identifier) = identifier else { return };
    let Expression::Member { base, .. } = ctx.exprs.get(identifier).clone() else {
        return;
    };
    if ctx
        .table_info(&table_id)
        .is_some_and(|info| info.is_class())
    {
        return;
    }

    let class_name = if matches!(method_name, "new" | "getInstance") {
        expr_source_name(ctx, parent_scope, base)
            .unwrap_or_else(|| module_last_segment(ctx))
    } else {
        module_last_segment(ctx)
    };

    // A container already emitting a class of this name would collide;
    // the container yields and emits as a table
    let mut seen = Seen::default();
    let base_types = resolve(ctx, base, 1, &mut seen);
    for container_id in table_ids_in(ctx, &base_types, &mut seen) {
        let container = ctx.table_info_mut(&container_id);
        if let Some(container) = container {
            if container.class_name.as_deref() == Some(class_name.as_str()) {
                container.emit_as_table = true;
            }
        }
    }

    if let Some(info) = ctx.table_info_mut(&table_id) {
        info.class_name = Some(class_name);
        info.is_closure_class = true;
        info.is_local_class = true;
    }

    if let Some(function_id) = function_scope.function_id.clone() {
        if let Some(info) = ctx.function_info_mut(&function_id) {
            info.is_constructor = true;
            info.ensure_returns(1);
            info.return_types[0].insert(table_id);
        }
    }
}

/// `function X:new(...)` on a table that is not yet a class promotes the
/// table and flags the method as a constructor.
pub fn implied_new(
    ctx: &mut AnalysisContext,
    scope: &Scope,
    table_id: &str,
    base: ExprId,
    function_id: &str,
) {
    let already_class = ctx
        .table_info(table_id)
        .is_some_and(|info| info.is_class());
    if !already_class {
        let name = expr_source_name(ctx, scope, base);
        if let Some(info) = ctx.table_info_mut(table_id) {
            info.class_name = name.or_else(|| info.original_name.clone());
        }
    }
    if let Some(info) = ctx.function_info_mut(function_id) {
        if !info.is_constructor {
            info.is_constructor = true;
            info.ensure_returns(1);
            info.return_types[0].insert(table_id.to_string());
        }
    }
}

/// A function assigned into a plain table nested in a class promotes the
/// table to a nested class named through its container.
pub fn promote_nested(ctx: &mut AnalysisContext, table_id: &str) {
    let Some(info) = ctx.table_info(table_id) else {
        return;
    };
    if info.is_class() {
        return;
    }
    let (Some(container_id), Some(own)) = (info.container_id.clone(), info.original_name.clone())
    else {
        return;
    };
    let container_name = match ctx.table_info(&container_id) {
        Some(container) if container.is_class() => container.class_name.clone(),
        _ => None,
    };
    let Some(container_name) = container_name else {
        return;
    };
    let segment = container_name
        .rsplit('.')
        .next()
        .unwrap_or(container_name.as_str())
        .to_string();
    if let Some(info) = ctx.table_info_mut(table_id) {
        info.class_name = Some(format!("{segment}.{own}"));
    }
}

/// UI-node factory calls: `Foo = A.__call({ _ATOM_UI_CLASS = X, … })`
/// creates a base AtomUI class; `Foo = Parent({ … })` with an AtomUI
/// parent derives one. Returns the argument-table literal to record as
/// the global's definition.
pub fn try_atom_ui(
    ctx: &mut AnalysisContext,
    rhs: ExprId,
    class_name: &str,
) -> Option<ExprId> {
    let Expression::Operation {
        operator: Operator::Call,
        arguments,
    } = ctx.exprs.get(rhs).clone()
    else {
        return None;
    };
    if arguments.len() != 2 {
        return None;
    }
    let argument = arguments[1];
    let argument_table = ctx.exprs.table_id_of(argument)?.to_string();

    // Base form: explicit marker field in the argument table
    let has_marker = ctx
        .table_info(&argument_table)
        .is_some_and(|info| info.definitions.contains_key(ATOM_UI_MARKER));
    let is_dunder_call = matches!(
        ctx.exprs.get(arguments[0]),
        Expression::Member {
            indexer: Indexer::Dot,
            member,
            ..
        } if member == "__call"
    );
    if has_marker && is_dunder_call {
        if let Some(info) = ctx.table_info_mut(&argument_table) {
            info.class_name = Some(class_name.to_string());
            info.is_atom_ui = true;
            info.is_atom_ui_base = true;
        }
        mark_self_methods(ctx, &argument_table);
        return Some(argument);
    }

    // Derived form: the callee resolves to an AtomUI class
    let mut seen = Seen::default();
    let callee_types = resolve(ctx, arguments[0], 1, &mut seen);
    for parent_id in table_ids_in(ctx, &callee_types, &mut seen) {
        let parent_name = match ctx.table_info(&parent_id) {
            Some(parent) if parent.is_atom_ui => parent.class_name.clone(),
            _ => continue,
        };
        if let Some(info) = ctx.table_info_mut(&argument_table) {
            info.class_name = Some(class_name.to_string());
            info.is_atom_ui = true;
            info.extends = parent_name;
        }
        mark_self_methods(ctx, &argument_table);
        return Some(argument);
    }

    None
}

/// Functions in an AtomUI argument table whose first parameter is `self`
/// are methods; rewrite them so emission treats them as such.
fn mark_self_methods(ctx: &mut AnalysisContext, table_id: &str) {
    let definitions: Vec<ExprId> = match ctx.table_info(table_id) {
        Some(info) => info
            .definitions
            .values()
            .flatten()
            .map(|def| def.expression)
            .collect(),
        None => return,
    };
    for expression in definitions {
        let function_id = match ctx.exprs.get_mut(expression) {
            Expression::Literal(lit)
                if lit.function_id.is_some()
                    && lit.parameters.first().map(String::as_str) == Some("self") =>
            {
                lit.is_method = true;
                lit.parameters.remove(0);
                lit.function_id.clone()
            }
            _ => None,
        };
        if let Some(function_id) = function_id {
            if let Some(info) = ctx.function_info_mut(&function_id) {
                info.is_method = true;
                if !info.parameter_names.is_empty() {
                    info.parameter_names.remove(0);
                    info.parameter_ids.remove(0);
                    info.parameter_types.remove(0);
                }
            }
        }
    }
}

/// Absorb an unknown-global placeholder into a real class definition for
/// the same name. The placeholder's definitions move into the real table
/// and the placeholder stops being emitted.
pub fn merge_unknown_class(ctx: &mut AnalysisContext, name: &str, new_table_id: &str) {
    let Some(placeholder_id) = ctx.existing_unknown_class(name).map(|s| s.to_string()) else {
        return;
    };
    if placeholder_id == new_table_id {
        return;
    }
    let moved: Vec<(String, Vec<ExpressionInfo>)> = match ctx.table_info_mut(&placeholder_id) {
        Some(placeholder) => {
            placeholder.is_empty_class = true;
            placeholder
                .definitions
                .drain(..)
                .collect()
        }
        None => return,
    };
    if let Some(target) = ctx.table_info_mut(new_table_id) {
        for (key, defs) in moved {
            // An empty single-definition slot in the real table is
            // replaceable; otherwise definitions accumulate
            for def in defs {
                target.add_definition(key.clone(), def);
            }
        }
        if target.class_name.is_none() {
            target.class_name = Some(name.to_string());
        }
    }
}

/// Source-level name of an expression: references resolve back through
/// the scope's local map, member chains join with dots.
pub fn expr_source_name(
    ctx: &AnalysisContext,
    scope: &Scope,
    expression: ExprId,
) -> Option<String> {
    match ctx.exprs.get(expression) {
        Expression::Reference { id } => match crate::sema::ids::parse_id(id) {
            Some(_) => scope.find_name(id).map(|s| s.to_string()),
            None => Some(id.clone()),
        },
        Expression::Member { base, member, .. } => {
            let base_name = expr_source_name(ctx, scope, *base)?;
            Some(format!("{base_name}.{member}"))
        }
        Expression::Literal(lit) => {
            let table_id = lit.table_id.as_deref()?;
            let info = ctx.table_info(table_id)?;
            info.class_name.clone().or_else(|| info.original_name.clone())
        }
        _ => None,
    }
}

fn module_last_segment(ctx: &AnalysisContext) -> String {
    ctx.current_module()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::sema::scope::{Scope, ScopeKind};
    use smallvec::smallvec;

    fn ctx() -> AnalysisContext {
        let mut ctx = AnalysisContext::new(Options::default());
        ctx.set_current_module("shared/Widget");
        ctx
    }

    fn derive_call(ctx: &mut AnalysisContext, base_name: &str, derive_name: &str) -> ExprId {
        let base = ctx.alloc_expr(Expression::Reference {
            id: base_name.to_string(),
        });
        let callee = ctx.alloc_expr(Expression::Member {
            base,
            indexer: Indexer::Colon,
            member: "derive".to_string(),
        });
        let name = ctx.alloc_expr(Expression::Literal(LiteralExpr::with_text(
            LuaType::String,
            derive_name,
        )));
        ctx.alloc_expr(Expression::Operation {
            operator: Operator::Call,
            arguments: smallvec![callee, name],
        })
    }

    #[test]
    fn derive_promotes_fresh_class() {
        let mut ctx = ctx();
        let scope = Scope::new(ScopeKind::Module, "@module(0)[Widget]");
        let call = derive_call(&mut ctx, "Base", "Foo");
        let literal = try_derive(&mut ctx, &scope, call, "Foo", false).unwrap();
        let table_id = ctx.exprs.table_id_of(literal).unwrap().to_string();
        let info = ctx.table_info(&table_id).unwrap();
        assert_eq!(info.class_name.as_deref(), Some("Foo"));
        assert_eq!(info.extends.as_deref(), Some("Base"));
        assert_eq!(info.derive_name.as_deref(), Some("Foo"));
        assert!(!info.is_local_class);
    }

    #[test]
    fn local_derive_gets_module_prefix() {
        let mut ctx = ctx();
        let scope = Scope::new(ScopeKind::Module, "@module(0)[Widget]");
        let call = derive_call(&mut ctx, "Base", "Helper");
        let literal = try_derive(&mut ctx, &scope, call, "Helper", true).unwrap();
        let table_id = ctx.exprs.table_id_of(literal).unwrap().to_string();
        let info = ctx.table_info(&table_id).unwrap();
        assert_eq!(info.class_name.as_deref(), Some("Widget_Helper"));
        assert!(info.is_local_class);
        assert!(info.is_local_derive_class);
    }

    #[test]
    fn non_derive_calls_are_ignored() {
        let mut ctx = ctx();
        let scope = Scope::new(ScopeKind::Module, "@module(0)[Widget]");
        let base = ctx.alloc_expr(Expression::Reference {
            id: "Base".to_string(),
        });
        let callee = ctx.alloc_expr(Expression::Member {
            base,
            indexer: Indexer::Colon,
            member: "extend".to_string(),
        });
        let call = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Call,
            arguments: smallvec![callee],
        });
        assert!(try_derive(&mut ctx, &scope, call, "X", false).is_none());
    }

    #[test]
    fn unknown_class_merges_into_real_table() {
        let mut ctx = ctx();
        let placeholder = ctx.unknown_class("Events");
        let n = ctx.alloc_expr(Expression::Literal(LiteralExpr::with_text(
            LuaType::Number,
            "1",
        )));
        ctx.table_info_mut(&placeholder)
            .unwrap()
            .add_definition("count", ExpressionInfo::new(n));

        let real = ctx.new_table_id("Events");
        merge_unknown_class(&mut ctx, "Events", &real);

        assert!(ctx.table_info(&placeholder).unwrap().is_empty_class);
        assert!(ctx
            .table_info(&real)
            .unwrap()
            .definitions
            .contains_key("count"));
        assert_eq!(
            ctx.table_info(&real).unwrap().class_name.as_deref(),
            Some("Events")
        );
    }
}
