// src/sema/resolver.rs
//
// Expression type resolution. `resolve` computes the possible-type set of
// a normalized expression by fixed-point descent over definitions, fields,
// call returns, and operator semantics, then narrows against usage facts.
//
// The `seen` map is the cycle guard: the first entry for an
// `(expression, index)` pair inserts an empty running set, and recursive
// encounters return that set instead of descending again. It is a
// per-call parameter, never context state.

use rustc_hash::FxHashMap;

use crate::frontend::Indexer;
use crate::sema::context::AnalysisContext;
use crate::sema::expr::{ExprId, Expression, LuaType, Operator};
use crate::sema::ids::{is_kind, parse_id, IdKind};
use crate::sema::info::ExpressionInfo;
use crate::sema::model::{ResolvedField, ResolvedFunction, ResolvedScope};
use crate::sema::scope::{Scope, ScopeItem, ScopeKind};
use crate::sema::types::{collapse_booleans, narrow, TypeSet};

pub type Seen = FxHashMap<(ExprId, usize), TypeSet>;

/// Resolve an expression's possible types at a return position (1-based,
/// meaningful for calls; everything else ignores it).
pub fn resolve(
    ctx: &mut AnalysisContext,
    expression: ExprId,
    index: usize,
    seen: &mut Seen,
) -> TypeSet {
    let key = (expression, index);
    if let Some(running) = seen.get(&key) {
        return running.clone();
    }
    seen.insert(key, TypeSet::default());

    let mut types = resolve_uncached(ctx, expression, index, seen);

    if let Some(usage) = ctx.usage.get(&expression).cloned() {
        narrow(&mut types, &usage);
    }
    collapse_booleans(&mut types);

    let entry = seen.entry(key).or_default();
    for ty in types {
        entry.insert(ty);
    }
    entry.clone()
}

fn resolve_uncached(
    ctx: &mut AnalysisContext,
    expression: ExprId,
    index: usize,
    seen: &mut Seen,
) -> TypeSet {
    let mut types = TypeSet::default();

    match ctx.exprs.get(expression).clone() {
        Expression::Literal(lit) => {
            if let Some(id) = &lit.table_id {
                types.insert(id.clone());
            } else if let Some(id) = &lit.function_id {
                types.insert(id.clone());
            } else if let Some(lua_type) = lit.lua_type {
                match lua_type {
                    LuaType::Boolean => {
                        let text = lit.literal.as_deref().unwrap_or("false");
                        types.insert(text.to_string());
                    }
                    other => {
                        types.insert(other.as_str().to_string());
                    }
                }
            }
        }

        Expression::Reference { id } => {
            if let Some(parsed) = parse_id(&id) {
                if matches!(
                    parsed.kind,
                    IdKind::Parameter | IdKind::SelfParam | IdKind::Function | IdKind::Instance
                ) {
                    types.insert(id.clone());
                }
            }
            if let Some(definitions) = ctx.definitions_of(&id).map(|d| d.to_vec()) {
                for info in definitions {
                    let resolved =
                        resolve(ctx, info.expression, info.index.unwrap_or(1), seen);
                    types.extend(resolved);
                }
            }
        }

        Expression::Member { base, member, .. } => {
            let base_types = resolve(ctx, base, 1, seen);
            types.extend(member_types(ctx, &base_types, &member, seen));
        }

        Expression::Index { base, index: key } => {
            if let Some(key) = static_index_key(ctx, key) {
                let base_types = resolve(ctx, base, 1, seen);
                types.extend(member_types(ctx, &base_types, &key, seen));
            }
        }

        Expression::Require { module } => {
            let normalized = module.replace('.', "/");
            if let Some(module) = ctx.module(&normalized, true) {
                if let Some(returned) = module.return_types(index) {
                    types.extend(returned.iter().cloned());
                }
            }
        }

        Expression::Operation {
            operator,
            arguments,
        } => {
            types = resolve_operation(ctx, expression, operator, &arguments, index, seen);
        }
    }

    types
}

fn resolve_operation(
    ctx: &mut AnalysisContext,
    expression: ExprId,
    operator: Operator,
    arguments: &[ExprId],
    index: usize,
    seen: &mut Seen,
) -> TypeSet {
    let mut types = TypeSet::default();

    match operator {
        Operator::Call => {
            types = resolve_call(ctx, expression, arguments, index, seen);
        }

        Operator::Concat => {
            types.insert("string".to_string());
        }

        op if op.is_comparison() => {
            types.insert("boolean".to_string());
        }

        op if op.is_arithmetic() => {
            types.insert("number".to_string());
        }

        Operator::Not => {
            let argument = arguments.first().copied();
            match argument.and_then(|a| static_truthiness(ctx, a)) {
                Some(true) => {
                    types.insert("false".to_string());
                }
                Some(false) => {
                    types.insert("true".to_string());
                }
                None => {
                    types.insert("boolean".to_string());
                }
            }
        }

        Operator::And => {
            let (lhs, rhs) = (arguments[0], arguments[1]);
            match static_truthiness(ctx, lhs) {
                Some(true) => types = resolve(ctx, rhs, 1, seen),
                Some(false) => types = resolve(ctx, lhs, 1, seen),
                None => {
                    types = resolve(ctx, lhs, 1, seen);
                    types.extend(resolve(ctx, rhs, 1, seen));
                }
            }
        }

        Operator::Or => {
            let (lhs, rhs) = (arguments[0], arguments[1]);
            match static_truthiness(ctx, lhs) {
                Some(false) => types = resolve(ctx, rhs, 1, seen),
                _ => {
                    // `X and Y or Z` reads as a ternary: take Y for the
                    // left side, not the whole `and`
                    let effective_lhs = match ctx.exprs.get(lhs) {
                        Expression::Operation {
                            operator: Operator::And,
                            arguments,
                        } if arguments.len() == 2 => arguments[1],
                        _ => lhs,
                    };
                    types = resolve(ctx, effective_lhs, 1, seen);
                    types.extend(resolve(ctx, rhs, 1, seen));
                }
            }
        }

        _ => {}
    }

    types
}

fn resolve_call(
    ctx: &mut AnalysisContext,
    _expression: ExprId,
    arguments: &[ExprId],
    index: usize,
    seen: &mut Seen,
) -> TypeSet {
    let mut types = TypeSet::default();
    let Some(&callee) = arguments.first() else {
        return types;
    };
    let call_args = &arguments[1..];

    // Intrinsics are matched by raw global name
    if let Expression::Reference { id } = ctx.exprs.get(callee) {
        match id.as_str() {
            "tonumber" => {
                types.insert("number".to_string());
                types.insert("nil".to_string());
                return types;
            }
            "tostring" | "getText" => {
                types.insert("string".to_string());
                return types;
            }
            "getTextOrNull" => {
                types.insert("string".to_string());
                types.insert("nil".to_string());
                return types;
            }
            _ => {}
        }
    }

    // `C:new(...)` on a known table infers a constructor on C
    constructor_inference(ctx, callee, seen);

    let callee_types = resolve(ctx, callee, 1, seen);

    // Accumulate argument types into parameter type sets before reading
    // returns, so recursive definitions see them
    let arg_types: Vec<TypeSet> = call_args
        .iter()
        .map(|&arg| resolve(ctx, arg, 1, seen))
        .collect();

    for ty in &callee_types {
        if !is_kind(ty, IdKind::Function) {
            continue;
        }
        let Some(info) = ctx.function_info_mut(ty) else {
            continue;
        };
        for (position, resolved) in arg_types.iter().enumerate() {
            if let Some(slot) = info.parameter_types.get_mut(position) {
                slot.extend(resolved.iter().cloned());
            }
        }

        if info.is_constructor {
            if let Some(first) = info.return_types.first() {
                types.extend(first.iter().cloned());
            }
            continue;
        }

        if info.return_types.is_empty() {
            continue;
        }
        match info.return_types.get(index.saturating_sub(1)) {
            Some(returned) => types.extend(returned.iter().cloned()),
            // Asking past the declared returns yields nil
            None => {
                types.insert("nil".to_string());
            }
        }
    }

    types
}

/// `C:new(...)` where C resolves to a known table: flag the method as a
/// constructor whose return set is C's table id.
fn constructor_inference(ctx: &mut AnalysisContext, callee: ExprId, seen: &mut Seen) {
    let Expression::Member {
        base,
        indexer: Indexer::Colon,
        member,
    } = ctx.exprs.get(callee).clone()
    else {
        return;
    };
    if member != "new" {
        return;
    }
    let base_types = resolve(ctx, base, 1, seen);
    let table_ids = table_ids_in(ctx, &base_types, seen);
    let Some(table_id) = table_ids.first().cloned() else {
        return;
    };

    // Find the method's function ids through the table definitions
    let mut function_ids = Vec::new();
    if let Some(info) = ctx.table_info(&table_id) {
        if let Some(defs) = info.definitions.get("new") {
            for def in defs.clone() {
                if let Expression::Literal(lit) = ctx.exprs.get(def.expression) {
                    if let Some(fid) = &lit.function_id {
                        function_ids.push(fid.clone());
                    }
                }
            }
        }
    }
    for fid in function_ids {
        if let Some(info) = ctx.function_info_mut(&fid) {
            if !info.is_constructor {
                info.is_constructor = true;
                info.ensure_returns(1);
                info.return_types[0].insert(table_id.clone());
            }
        }
    }
}

/// Field lookup: for every base type that is (or leads to) a table id,
/// union the resolved definitions under `key`.
fn member_types(
    ctx: &mut AnalysisContext,
    base_types: &TypeSet,
    key: &str,
    seen: &mut Seen,
) -> TypeSet {
    let mut types = TypeSet::default();
    for table_id in table_ids_in(ctx, base_types, seen) {
        let definitions: Vec<ExpressionInfo> = match ctx.table_info(&table_id) {
            Some(info) => info
                .definitions
                .get(key)
                .map(|defs| defs.to_vec())
                .unwrap_or_default(),
            None => Vec::new(),
        };
        for def in definitions {
            let resolved = resolve(ctx, def.expression, def.index.unwrap_or(1), seen);
            types.extend(resolved);
        }
        // Inherited fields through the derive chain
        if types.is_empty() {
            if let Some(base_id) = extends_table_id(ctx, &table_id, seen) {
                let mut base_set = TypeSet::default();
                base_set.insert(base_id);
                types.extend(member_types(ctx, &base_set, key, seen));
            }
        }
    }
    types
}

/// Table ids reachable from a type set: table ids directly, and instance
/// markers resolved through their bound class expression.
pub fn table_ids_in(ctx: &mut AnalysisContext, types: &TypeSet, seen: &mut Seen) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |ids: &mut Vec<String>, id: String| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };
    for ty in types {
        let Some(parsed) = parse_id(ty) else { continue };
        match parsed.kind {
            IdKind::Table => push(&mut ids, ty.clone()),
            IdKind::Instance => {
                if let Some(defs) = ctx.definitions_of(ty).map(|d| d.to_vec()) {
                    for def in defs {
                        let resolved = resolve(ctx, def.expression, 1, seen);
                        for inner in &resolved {
                            if is_kind(inner, IdKind::Table) {
                                push(&mut ids, inner.clone());
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    ids
}

/// The table id of a class's base class, resolved by name.
fn extends_table_id(ctx: &mut AnalysisContext, table_id: &str, seen: &mut Seen) -> Option<String> {
    let extends = ctx.table_info(table_id)?.extends.clone()?;
    let defs = ctx.definitions_of(&extends)?.to_vec();
    for def in defs {
        let resolved = resolve(ctx, def.expression, 1, seen);
        for ty in &resolved {
            if is_kind(ty, IdKind::Table) && ty != table_id {
                return Some(ty.clone());
            }
        }
    }
    None
}

/// Literal-only truthiness: nil and false are falsy, every other literal
/// is truthy, anything non-literal is unknown.
fn static_truthiness(ctx: &AnalysisContext, expression: ExprId) -> Option<bool> {
    match ctx.exprs.get(expression) {
        Expression::Literal(lit) => match lit.lua_type {
            Some(LuaType::Nil) => Some(false),
            Some(LuaType::Boolean) => Some(lit.literal.as_deref() == Some("true")),
            Some(_) => Some(true),
            None => None,
        },
        _ => None,
    }
}

/// A literal string or number index, reduced to a field key.
fn static_index_key(ctx: &AnalysisContext, index: ExprId) -> Option<String> {
    match ctx.exprs.get(index) {
        Expression::Literal(lit) => match lit.lua_type {
            Some(LuaType::String) | Some(LuaType::Number) => lit.literal.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a scope's collected items into its exposed form. For function
/// scopes this merges return sites into the FunctionInfo (with tail-call
/// unpacking and return-arity nullability); for module scopes it surfaces
/// classes, tables, functions, fields, and module returns.
///
/// `inherited_function` names the enclosing function for block scopes,
/// whose parent link is already detached when they resolve.
pub fn resolve_scope(
    ctx: &mut AnalysisContext,
    mut scope: Scope,
    inherited_function: Option<&str>,
) -> ResolvedScope {
    let mut resolved = ResolvedScope::default();
    let items = std::mem::take(&mut scope.items);
    let function_id = scope
        .function_id
        .clone()
        .or_else(|| inherited_function.map(|s| s.to_string()));
    let is_module = scope.kind == ScopeKind::Module;

    for item in items {
        match item {
            ScopeItem::Assignment(assignment) => {
                let mut seen = Seen::default();
                let types = resolve(
                    ctx,
                    assignment.expression,
                    assignment.index.unwrap_or(1),
                    &mut seen,
                );

                let expr = ctx.exprs.get(assignment.expression).clone();
                if let Expression::Literal(lit) = &expr {
                    if let Some(table_id) = &lit.table_id {
                        let info = ctx.table_info(table_id);
                        let is_class = info.is_some_and(|i| i.is_class());
                        if is_class {
                            resolved.seen_classes.insert(table_id.clone());
                            if is_module {
                                resolved.classes.insert(table_id.clone());
                            }
                        } else if is_module && !assignment.is_local {
                            resolved.tables.insert(table_id.clone());
                        }
                        continue;
                    }
                    if let Some(function_id) = &lit.function_id {
                        if is_module {
                            resolved.functions.push(ResolvedFunction {
                                function_id: function_id.clone(),
                                name: assignment.name.clone(),
                                is_local: assignment.is_local,
                            });
                        }
                        continue;
                    }
                }

                // A self-referential rebind (`X = X or {}`) is not a new
                // value field
                let self_rebind = matches!(
                    &expr,
                    Expression::Reference { id }
                        if *id == assignment.name || *id == assignment.target
                );
                if is_module && !assignment.is_local && !self_rebind {
                    resolved.fields.push(ResolvedField {
                        name: assignment.name.clone(),
                        types,
                    });
                }
            }

            ScopeItem::RequireAssignment { .. } => {}

            ScopeItem::Usage { expression } => {
                let mut seen = Seen::default();
                let _ = resolve(ctx, expression, 1, &mut seen);
            }

            ScopeItem::Partial { .. } => {
                // Applied when read; kept for ordering only
            }

            ScopeItem::Returns { expressions } => {
                let mut seen = Seen::default();
                let site = resolve_return_site(ctx, &expressions, &mut seen);

                if let Some(function_id) = &function_id {
                    let is_constructor = ctx
                        .function_info(function_id)
                        .is_some_and(|f| f.is_constructor);
                    if let Some(info) = ctx.function_info_mut(function_id) {
                        info.return_expressions.push(expressions.clone());
                    }
                    if let Some(info) = ctx.function_info_mut(function_id) {
                        info.observe_arity(site.len());
                        if !is_constructor {
                            info.ensure_returns(site.len());
                            for (position, types) in site.into_iter().enumerate() {
                                info.return_types[position].extend(types);
                            }
                        }
                    }
                } else if is_module {
                    // Module returns: last write wins, which matches the
                    // single trailing return of well-formed modules
                    resolved.returns = site;
                }
            }

            ScopeItem::Resolved(child) => {
                for class in &child.seen_classes {
                    resolved.seen_classes.insert(class.clone());
                }
            }
        }
    }

    // A closure-class function surfaces its class through the scope marker
    if let Some(table_id) = &scope.class_table_id {
        if ctx.table_info(table_id).is_some_and(|i| i.is_class()) {
            resolved.seen_classes.insert(table_id.clone());
        }
    }

    // Arity bookkeeping runs once, when the function's own scope exits
    if let Some(function_id) = &scope.function_id {
        finish_function(ctx, function_id);
    }

    if is_module {
        for class in resolved.seen_classes.clone() {
            resolved.classes.insert(class);
        }
    }

    resolved
}

/// Resolve one return site into per-position type sets, unpacking a
/// trailing call's full return list.
fn resolve_return_site(
    ctx: &mut AnalysisContext,
    expressions: &[ExprId],
    seen: &mut Seen,
) -> Vec<TypeSet> {
    let mut site = Vec::new();
    for (position, &expression) in expressions.iter().enumerate() {
        let last = position + 1 == expressions.len();
        if last {
            if let Some(callee) = ctx.exprs.callee_of(expression) {
                let callee_types = resolve(ctx, callee, 1, seen);
                let mut unpacked: Option<Vec<TypeSet>> = None;
                for ty in &callee_types {
                    if !is_kind(ty, IdKind::Function) {
                        continue;
                    }
                    if let Some(info) = ctx.function_info(ty) {
                        if !info.return_types.is_empty() {
                            unpacked = Some(info.return_types.clone());
                            break;
                        }
                    }
                }
                if let Some(tail) = unpacked {
                    site.extend(tail);
                    continue;
                }
            }
        }
        site.push(resolve(ctx, expression, 1, seen));
    }
    site
}

/// Post-resolution bookkeeping for a function: positions past the minimum
/// observed arity acquire nil.
fn finish_function(ctx: &mut AnalysisContext, function_id: &str) {
    let Some(info) = ctx.function_info_mut(function_id) else {
        return;
    };
    if info.is_constructor {
        return;
    }
    if let Some(min) = info.min_returns {
        let len = info.return_types.len();
        for position in min..len {
            info.return_types[position].insert("nil".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::sema::expr::LiteralExpr;
    use smallvec::smallvec;

    fn ctx() -> AnalysisContext {
        let mut ctx = AnalysisContext::new(Options::default());
        ctx.set_current_module("shared/test");
        ctx
    }

    fn literal(ctx: &mut AnalysisContext, lit: LiteralExpr) -> ExprId {
        ctx.alloc_expr(Expression::Literal(lit))
    }

    #[test]
    fn literal_types() {
        let mut ctx = ctx();
        let n = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        let s = literal(&mut ctx, LiteralExpr::with_text(LuaType::String, "hi"));
        let mut seen = Seen::default();
        assert!(resolve(&mut ctx, n, 1, &mut seen).contains("number"));
        assert!(resolve(&mut ctx, s, 1, &mut seen).contains("string"));
    }

    #[test]
    fn reference_unions_definitions() {
        let mut ctx = ctx();
        let n = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        let s = literal(&mut ctx, LiteralExpr::with_text(LuaType::String, "hi"));
        ctx.add_definition("x", ExpressionInfo::new(n));
        ctx.add_definition("x", ExpressionInfo::new(s));
        let reference = ctx.alloc_expr(Expression::Reference {
            id: "x".to_string(),
        });
        let mut seen = Seen::default();
        let types = resolve(&mut ctx, reference, 1, &mut seen);
        assert!(types.contains("number"));
        assert!(types.contains("string"));
    }

    #[test]
    fn self_referential_definition_terminates() {
        let mut ctx = ctx();
        let reference = ctx.alloc_expr(Expression::Reference {
            id: "x".to_string(),
        });
        ctx.add_definition("x", ExpressionInfo::new(reference));
        let n = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        ctx.add_definition("x", ExpressionInfo::new(n));
        let mut seen = Seen::default();
        let types = resolve(&mut ctx, reference, 1, &mut seen);
        assert!(types.contains("number"));
    }

    #[test]
    fn concat_yields_string() {
        let mut ctx = ctx();
        let a = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        let b = literal(&mut ctx, LiteralExpr::with_text(LuaType::String, "s"));
        let op = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Concat,
            arguments: smallvec![a, b],
        });
        let mut seen = Seen::default();
        assert_eq!(
            resolve(&mut ctx, op, 1, &mut seen),
            std::iter::once("string".to_string()).collect::<TypeSet>()
        );
    }

    #[test]
    fn not_on_literal_folds() {
        let mut ctx = ctx();
        let t = literal(&mut ctx, LiteralExpr::with_text(LuaType::Boolean, "true"));
        let op = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Not,
            arguments: smallvec![t],
        });
        let mut seen = Seen::default();
        assert!(resolve(&mut ctx, op, 1, &mut seen).contains("false"));
    }

    #[test]
    fn and_with_truthy_lhs_is_rhs() {
        let mut ctx = ctx();
        let lhs = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        let rhs = literal(&mut ctx, LiteralExpr::with_text(LuaType::String, "s"));
        let op = ctx.alloc_expr(Expression::Operation {
            operator: Operator::And,
            arguments: smallvec![lhs, rhs],
        });
        let mut seen = Seen::default();
        let types = resolve(&mut ctx, op, 1, &mut seen);
        assert!(types.contains("string"));
        assert!(!types.contains("number"));
    }

    #[test]
    fn ternary_or_substitutes_then_branch() {
        let mut ctx = ctx();
        let cond = ctx.alloc_expr(Expression::Reference {
            id: "cond".to_string(),
        });
        let then_value = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        let else_value = literal(&mut ctx, LiteralExpr::with_text(LuaType::String, "s"));
        let and = ctx.alloc_expr(Expression::Operation {
            operator: Operator::And,
            arguments: smallvec![cond, then_value],
        });
        let or = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Or,
            arguments: smallvec![and, else_value],
        });
        let mut seen = Seen::default();
        let types = resolve(&mut ctx, or, 1, &mut seen);
        assert!(types.contains("number"));
        assert!(types.contains("string"));
    }

    #[test]
    fn tonumber_intrinsic() {
        let mut ctx = ctx();
        let callee = ctx.alloc_expr(Expression::Reference {
            id: "tonumber".to_string(),
        });
        let call = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Call,
            arguments: smallvec![callee],
        });
        let mut seen = Seen::default();
        let types = resolve(&mut ctx, call, 1, &mut seen);
        assert!(types.contains("number"));
        assert!(types.contains("nil"));
    }

    #[test]
    fn call_past_declared_returns_is_nil() {
        let mut ctx = ctx();
        let fid = ctx.new_function_id("f");
        {
            let info = ctx.function_info_mut(&fid).unwrap();
            info.ensure_returns(1);
            info.return_types[0].insert("number".to_string());
            info.min_returns = Some(1);
        }
        let f_lit = literal(
            &mut ctx,
            LiteralExpr {
                lua_type: Some(LuaType::Function),
                function_id: Some(fid),
                ..LiteralExpr::default()
            },
        );
        ctx.add_definition("f", ExpressionInfo::new(f_lit));
        let callee = ctx.alloc_expr(Expression::Reference {
            id: "f".to_string(),
        });
        let call = ctx.alloc_expr(Expression::Operation {
            operator: Operator::Call,
            arguments: smallvec![callee],
        });
        let mut seen = Seen::default();
        assert!(resolve(&mut ctx, call, 1, &mut seen).contains("number"));
        let mut seen = Seen::default();
        assert!(resolve(&mut ctx, call, 2, &mut seen).contains("nil"));
    }

    #[test]
    fn member_reads_table_definitions() {
        let mut ctx = ctx();
        let table_id = ctx.new_table_id("T");
        let n = literal(&mut ctx, LiteralExpr::with_text(LuaType::Number, "1"));
        ctx.table_info_mut(&table_id)
            .unwrap()
            .add_definition("x", ExpressionInfo::new(n));
        let t_lit = literal(
            &mut ctx,
            LiteralExpr {
                lua_type: Some(LuaType::Table),
                table_id: Some(table_id),
                ..LiteralExpr::default()
            },
        );
        ctx.add_definition("T", ExpressionInfo::new(t_lit));
        let base = ctx.alloc_expr(Expression::Reference {
            id: "T".to_string(),
        });
        let member = ctx.alloc_expr(Expression::Member {
            base,
            indexer: Indexer::Dot,
            member: "x".to_string(),
        });
        let mut seen = Seen::default();
        assert!(resolve(&mut ctx, member, 1, &mut seen).contains("number"));
    }
}
