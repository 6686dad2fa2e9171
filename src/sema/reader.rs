// src/sema/reader.rs
//
// The scope reader: walks one parsed file, creates scopes, lowers AST
// expressions into the normalized graph, records assignments, usage facts,
// and definitions, and fires the class detectors. Scopes resolve on exit
// and bubble their results into the parent's items.

use crate::frontend::{
    Chunk, Expr, ExprKind, FunctionDeclaration, Indexer, Stmt, TableField,
};
use crate::sema::classes;
use crate::sema::context::AnalysisContext;
use crate::sema::expr::{ExprId, Expression, LiteralExpr, LuaType, Operator};
use crate::sema::ids::{parse_id, IdKind};
use crate::sema::info::ExpressionInfo;
use crate::sema::model::ResolvedScope;
use crate::sema::resolver::{self, table_ids_in, Seen};
use crate::sema::scope::{AssignmentItem, Scope, ScopeItem, ScopeKind};

pub struct ScopeReader<'a> {
    ctx: &'a mut AnalysisContext,
    scope: Scope,
}

/// Read and resolve one module. The context's current module is switched
/// and per-module state cleared before the walk.
pub fn read_module(
    ctx: &mut AnalysisContext,
    identifier: &str,
    chunk: &Chunk,
) -> ResolvedScope {
    ctx.set_current_module(identifier);
    let segment = identifier
        .rsplit('/')
        .next()
        .unwrap_or(identifier)
        .to_string();
    let module_id = ctx.new_id(IdKind::Module, &segment);

    let mut reader = ScopeReader {
        ctx,
        scope: Scope::new(ScopeKind::Module, module_id),
    };
    reader.read_block(&chunk.body);

    let ScopeReader { ctx, scope } = reader;
    let resolved = resolver::resolve_scope(ctx, scope, None);
    if let Some(module) = ctx.module_mut(identifier) {
        module.resolved = Some(resolved.clone());
    }
    resolved
}

impl<'a> ScopeReader<'a> {
    fn enter_scope(&mut self, kind: ScopeKind, id: String) {
        let parent = std::mem::take(&mut self.scope);
        self.scope = Scope::with_parent(kind, id, parent);
    }

    /// Pop the current scope, resolve it, and push the result onto the
    /// parent's items.
    fn exit_scope(&mut self) -> Scope {
        let mut child = std::mem::take(&mut self.scope);
        self.scope = child.take_parent().unwrap_or_default();
        child
    }

    fn resolve_and_attach(&mut self, child: Scope) {
        // Blocks have already been detached from the chain; hand them the
        // enclosing function for return merging
        let inherited = self
            .scope
            .enclosing_function()
            .map(|s| s.to_string());
        let resolved = resolver::resolve_scope(self.ctx, child, inherited.as_deref());
        self.scope.push(ScopeItem::Resolved(resolved));
    }

    fn read_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.read_statement(stmt);
        }
    }

    fn read_block_scope(&mut self, body: &[Stmt]) {
        let id = self.scope.id.clone();
        self.enter_scope(ScopeKind::Block, id);
        self.read_block(body);
        let child = self.exit_scope();
        self.resolve_and_attach(child);
    }

    fn read_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local(local) => {
                self.analyze_assignment(&local.variables, &local.init, true);
            }
            Stmt::Assignment(assign) => {
                self.analyze_assignment(&assign.variables, &assign.init, false);
            }
            Stmt::Return(ret) => {
                let expressions: Vec<ExprId> =
                    ret.arguments.iter().map(|e| self.normalize(e)).collect();
                self.scope.push(ScopeItem::Returns { expressions });
            }
            Stmt::If(stmt) => {
                for clause in &stmt.clauses {
                    if let Some(condition) = &clause.condition {
                        let expression = self.normalize(condition);
                        self.scope.push(ScopeItem::Usage { expression });
                    }
                    self.read_block_scope(&clause.body);
                }
            }
            Stmt::While(stmt) => {
                let expression = self.normalize(&stmt.condition);
                self.scope.push(ScopeItem::Usage { expression });
                self.read_block_scope(&stmt.body);
            }
            Stmt::Repeat(stmt) => {
                // The until condition sees block locals
                let id = self.scope.id.clone();
                self.enter_scope(ScopeKind::Block, id);
                self.read_block(&stmt.body);
                let expression = self.normalize(&stmt.condition);
                self.scope.push(ScopeItem::Usage { expression });
                let child = self.exit_scope();
                self.resolve_and_attach(child);
            }
            Stmt::Do(stmt) => self.read_block_scope(&stmt.body),
            Stmt::ForNumeric(stmt) => {
                let mut bounds = vec![&stmt.start, &stmt.limit];
                if let Some(step) = &stmt.step {
                    bounds.push(step);
                }
                for bound in bounds {
                    let expression = self.normalize(bound);
                    self.ctx.usage_mut(expression).in_numeric_for = true;
                    self.scope.push(ScopeItem::Usage { expression });
                }

                let id = self.scope.id.clone();
                self.enter_scope(ScopeKind::Block, id);
                if let Some(name) = stmt.variable.as_identifier() {
                    let local_id = self.ctx.new_id(IdKind::Local, name);
                    self.scope.define_local(name, local_id.clone());
                    let number = self.ctx.alloc_expr(Expression::Literal(
                        LiteralExpr::with_text(LuaType::Number, "0"),
                    ));
                    self.ctx
                        .add_definition(local_id, ExpressionInfo::new(number));
                }
                self.read_block(&stmt.body);
                let child = self.exit_scope();
                self.resolve_and_attach(child);
            }
            Stmt::ForGeneric(stmt) => {
                for iterator in &stmt.iterators {
                    let expression = self.normalize(iterator);
                    self.scope.push(ScopeItem::Usage { expression });
                }
                let id = self.scope.id.clone();
                self.enter_scope(ScopeKind::Block, id);
                for variable in &stmt.variables {
                    if let Some(name) = variable.as_identifier() {
                        let local_id = self.ctx.new_id(IdKind::Local, name);
                        self.scope.define_local(name, local_id);
                    }
                }
                self.read_block(&stmt.body);
                let child = self.exit_scope();
                self.resolve_and_attach(child);
            }
            Stmt::Function(decl) => {
                self.read_function_statement(decl);
            }
            Stmt::Call(call) => {
                self.analyze_call_statement(&call.expression);
            }
            Stmt::Break(_) => {}
        }
    }

    // ----- expression normalization -----

    fn normalize(&mut self, expr: &Expr) -> ExprId {
        if let Some(id) = self.ctx.cached_expr(expr.id) {
            return id;
        }
        let id = self.normalize_uncached(expr);
        self.ctx.cache_expr(expr.id, id);
        id
    }

    fn normalize_uncached(&mut self, expr: &Expr) -> ExprId {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                let id = self
                    .scope
                    .find_id(name)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| name.clone());
                self.ctx.alloc_expr(Expression::Reference { id })
            }
            ExprKind::Vararg => self
                .ctx
                .alloc_expr(Expression::Literal(LiteralExpr::default())),
            ExprKind::String(value) => self.ctx.alloc_expr(Expression::Literal(
                LiteralExpr::with_text(LuaType::String, value.clone()),
            )),
            ExprKind::Number(raw) => self.ctx.alloc_expr(Expression::Literal(
                LiteralExpr::with_text(LuaType::Number, raw.clone()),
            )),
            ExprKind::Boolean(value) => self.ctx.alloc_expr(Expression::Literal(
                LiteralExpr::with_text(LuaType::Boolean, if *value { "true" } else { "false" }),
            )),
            ExprKind::Nil => self
                .ctx
                .alloc_expr(Expression::Literal(LiteralExpr::of(LuaType::Nil))),

            ExprKind::Table(fields) => self.normalize_table(fields),

            ExprKind::Member {
                base,
                indexer,
                member,
            } => {
                let base_id = self.normalize(base);
                self.ctx.usage_mut(base_id).supports_indexing = true;
                self.ctx.alloc_expr(Expression::Member {
                    base: base_id,
                    indexer: *indexer,
                    member: member.clone(),
                })
            }

            ExprKind::Index { base, index } => {
                let base_id = self.normalize(base);
                let index_id = self.normalize(index);
                self.ctx.usage_mut(base_id).supports_indexing = true;
                self.ctx.alloc_expr(Expression::Index {
                    base: base_id,
                    index: index_id,
                })
            }

            ExprKind::Unary { op, argument } => {
                use crate::frontend::UnaryOp;
                let argument_id = self.normalize(argument);
                let operator = match op {
                    UnaryOp::Not => Operator::Not,
                    UnaryOp::Neg => Operator::Neg,
                    UnaryOp::Len => Operator::Len,
                    UnaryOp::BNot => Operator::BNot,
                };
                match operator {
                    Operator::Len => {
                        self.ctx.usage_mut(argument_id).supports_length = true;
                    }
                    Operator::Neg | Operator::BNot => {
                        self.ctx.usage_mut(argument_id).supports_math = true;
                    }
                    _ => {}
                }
                self.ctx.alloc_expr(Expression::Operation {
                    operator,
                    arguments: smallvec::smallvec![argument_id],
                })
            }

            ExprKind::Binary { op, lhs, rhs } => {
                use crate::frontend::BinaryOp;
                let lhs_id = self.normalize(lhs);
                let rhs_id = self.normalize(rhs);
                let operator = match op {
                    BinaryOp::Add => Operator::Add,
                    BinaryOp::Sub => Operator::Sub,
                    BinaryOp::Mul => Operator::Mul,
                    BinaryOp::Div => Operator::Div,
                    BinaryOp::IDiv => Operator::IDiv,
                    BinaryOp::Mod => Operator::Mod,
                    BinaryOp::Pow => Operator::Pow,
                    BinaryOp::Concat => Operator::Concat,
                    BinaryOp::Eq => Operator::Eq,
                    BinaryOp::Ne => Operator::Ne,
                    BinaryOp::Lt => Operator::Lt,
                    BinaryOp::Le => Operator::Le,
                    BinaryOp::Gt => Operator::Gt,
                    BinaryOp::Ge => Operator::Ge,
                    BinaryOp::BAnd => Operator::BAnd,
                    BinaryOp::BOr => Operator::BOr,
                    BinaryOp::BXor => Operator::BXor,
                    BinaryOp::Shl => Operator::Shl,
                    BinaryOp::Shr => Operator::Shr,
                };
                if operator == Operator::Concat {
                    self.ctx.usage_mut(lhs_id).supports_concatenation = true;
                    self.ctx.usage_mut(rhs_id).supports_concatenation = true;
                } else if operator.is_arithmetic() {
                    self.ctx.usage_mut(lhs_id).supports_math = true;
                    self.ctx.usage_mut(rhs_id).supports_math = true;
                }
                self.ctx.alloc_expr(Expression::Operation {
                    operator,
                    arguments: smallvec::smallvec![lhs_id, rhs_id],
                })
            }

            ExprKind::Logical { op, lhs, rhs } => {
                use crate::frontend::LogicalOp;
                let lhs_id = self.normalize(lhs);
                let rhs_id = self.normalize(rhs);
                let operator = match op {
                    LogicalOp::And => Operator::And,
                    LogicalOp::Or => Operator::Or,
                };
                self.ctx.alloc_expr(Expression::Operation {
                    operator,
                    arguments: smallvec::smallvec![lhs_id, rhs_id],
                })
            }

            ExprKind::Call { base, arguments } => {
                if base.as_identifier() == Some("require") {
                    if let Some(module) = arguments.first().and_then(|a| a.as_string()) {
                        let module = module.to_string();
                        return self.ctx.alloc_expr(Expression::Require { module });
                    }
                }
                let base_id = self.normalize(base);
                let mut call_arguments = smallvec::SmallVec::from_slice(&[base_id]);
                let mut argument_ids = Vec::new();
                for argument in arguments {
                    let id = self.normalize(argument);
                    call_arguments.push(id);
                    argument_ids.push(id);
                }
                self.ctx.usage_mut(base_id).arguments = Some(argument_ids);
                self.ctx.alloc_expr(Expression::Operation {
                    operator: Operator::Call,
                    arguments: call_arguments,
                })
            }

            ExprKind::TableCall { base, argument } => {
                let base_id = self.normalize(base);
                let argument_id = self.normalize(argument);
                self.ctx.usage_mut(base_id).arguments = Some(vec![argument_id]);
                self.ctx.alloc_expr(Expression::Operation {
                    operator: Operator::Call,
                    arguments: smallvec::smallvec![base_id, argument_id],
                })
            }

            ExprKind::StringCall { base, argument } => {
                if base.as_identifier() == Some("require") {
                    if let Some(module) = argument.as_string() {
                        let module = module.to_string();
                        return self.ctx.alloc_expr(Expression::Require { module });
                    }
                }
                let base_id = self.normalize(base);
                let argument_id = self.normalize(argument);
                self.ctx.usage_mut(base_id).arguments = Some(vec![argument_id]);
                self.ctx.alloc_expr(Expression::Operation {
                    operator: Operator::Call,
                    arguments: smallvec::smallvec![base_id, argument_id],
                })
            }

            ExprKind::Function { parameters, body } => {
                self.read_function(None, parameters, body, None)
            }
        }
    }

    fn normalize_table(&mut self, fields: &[TableField]) -> ExprId {
        let table_id = self.ctx.new_table_id("");
        let literal = self.ctx.alloc_expr(Expression::Literal(LiteralExpr {
            lua_type: Some(LuaType::Table),
            table_id: Some(table_id.clone()),
            ..LiteralExpr::default()
        }));

        for field in fields {
            match field {
                TableField::Value { value } => {
                    let value_id = self.normalize(value);
                    let mut info = ExpressionInfo::new(value_id);
                    info.from_literal = true;
                    if let Some(table) = self.ctx.table_info_mut(&table_id) {
                        table.literal_fields.push(info);
                    }
                }
                TableField::KeyString { key, value } => {
                    let value_id = self.normalize(value);
                    self.record_literal_field(&table_id, key, value_id);
                }
                TableField::Key { key, value } => {
                    let value_id = self.normalize(value);
                    let static_key = match &key.kind {
                        ExprKind::String(s) => Some(s.clone()),
                        ExprKind::Number(n) => Some(n.clone()),
                        _ => {
                            self.normalize(key);
                            None
                        }
                    };
                    if let Some(key) = static_key {
                        self.record_literal_field(&table_id, &key, value_id);
                    }
                }
            }
        }

        literal
    }

    fn record_literal_field(&mut self, table_id: &str, key: &str, value: ExprId) {
        // Nested literal tables remember their container for nested-class
        // promotion
        if let Some(nested) = self.ctx.exprs.table_id_of(value).map(|s| s.to_string()) {
            if let Some(info) = self.ctx.table_info_mut(&nested) {
                info.container_id = Some(table_id.to_string());
                if info.original_name.is_none() {
                    info.original_name = Some(key.to_string());
                }
            }
        }
        let mut info = ExpressionInfo::new(value);
        info.from_literal = true;
        if let Some(table) = self.ctx.table_info_mut(table_id) {
            table.add_definition(key, info);
        }
    }

    // ----- functions -----

    fn read_function_statement(&mut self, decl: &FunctionDeclaration) {
        self.read_function(
            decl.identifier.as_ref(),
            &decl.parameters,
            &decl.body,
            Some(decl.is_local),
        );
    }

    /// Read a function (declaration or literal). Allocates the function
    /// id and literal, records the parent-side definition before the body
    /// is read (so recursive references resolve), then reads the body in
    /// a fresh function scope. Returns the function literal expression.
    fn read_function(
        &mut self,
        identifier: Option<&Expr>,
        parameters: &[Expr],
        body: &[Stmt],
        is_local_decl: Option<bool>,
    ) -> ExprId {
        let (name, is_method, identifier_expr) = match identifier {
            Some(expr) => {
                let normalized = self.normalize(expr);
                match &expr.kind {
                    ExprKind::Identifier(n) => (n.clone(), false, Some(normalized)),
                    ExprKind::Member {
                        member, indexer, ..
                    } => (member.clone(), *indexer == Indexer::Colon, Some(normalized)),
                    _ => (String::new(), false, Some(normalized)),
                }
            }
            None => (String::new(), false, None),
        };

        let base_expr = identifier_expr.and_then(|id| match self.ctx.exprs.get(id) {
            Expression::Member { base, .. } => Some(*base),
            _ => None,
        });

        let function_id = self.ctx.new_function_id(&name);
        let parameter_names: Vec<String> = parameters
            .iter()
            .map(|p| match &p.kind {
                ExprKind::Identifier(n) => n.clone(),
                _ => "...".to_string(),
            })
            .collect();

        let literal = self.ctx.alloc_expr(Expression::Literal(LiteralExpr {
            lua_type: Some(LuaType::Function),
            function_id: Some(function_id.clone()),
            parameters: parameter_names.clone(),
            is_method,
            ..LiteralExpr::default()
        }));

        // Record the parent-side binding before reading the body
        if let Some(is_local) = is_local_decl {
            match identifier.map(|e| &e.kind) {
                Some(ExprKind::Identifier(name)) => {
                    if is_local {
                        let local_id = self.ctx.new_id(IdKind::Local, name);
                        self.scope.define_local(name, local_id.clone());
                        self.ctx
                            .add_definition(local_id.clone(), ExpressionInfo::new(literal));
                        self.scope.push(ScopeItem::Assignment(AssignmentItem {
                            target: local_id,
                            name: name.clone(),
                            expression: literal,
                            index: None,
                            is_local: true,
                        }));
                    } else if let Some(local_id) =
                        self.scope.find_id(name).map(|s| s.to_string())
                    {
                        self.ctx
                            .add_definition(local_id.clone(), ExpressionInfo::new(literal));
                        self.scope.push(ScopeItem::Assignment(AssignmentItem {
                            target: local_id,
                            name: name.clone(),
                            expression: literal,
                            index: None,
                            is_local: true,
                        }));
                    } else {
                        self.ctx
                            .add_definition(name.clone(), ExpressionInfo::new(literal));
                        self.scope.push(ScopeItem::Assignment(AssignmentItem {
                            target: name.clone(),
                            name: name.clone(),
                            expression: literal,
                            index: None,
                            is_local: false,
                        }));
                    }
                }
                Some(ExprKind::Member { .. }) => {
                    if let Some(member_expr) = identifier_expr {
                        self.record_member_definition(member_expr, literal, None);
                    }
                }
                _ => {}
            }
        }

        // Function scope
        self.enter_scope(ScopeKind::Function, function_id.clone());
        self.scope.function_id = Some(function_id.clone());

        if is_method {
            let self_id = self.ctx.new_id(IdKind::SelfParam, "self");
            self.scope.define_local("self", self_id.clone());
            if let Some(base) = base_expr {
                self.ctx.add_definition(self_id, ExpressionInfo::new(base));
            }
        }

        {
            let mut ids = Vec::new();
            for parameter_name in &parameter_names {
                let parameter_id = self.ctx.new_id(IdKind::Parameter, parameter_name);
                if parameter_name != "..." {
                    self.scope
                        .define_local(parameter_name, parameter_id.clone());
                }
                ids.push(parameter_id);
            }
            if let Some(info) = self.ctx.function_info_mut(&function_id) {
                info.parameter_ids = ids;
                info.parameter_names = parameter_names.clone();
                info.parameter_types = vec![Default::default(); parameter_names.len()];
                info.identifier_expression = identifier_expr;
                info.is_method = is_method;
            }
        }

        self.read_block(body);

        // A body with no top-level return still observes arity zero
        if !body.iter().any(|s| matches!(s, Stmt::Return(_))) {
            self.scope.push(ScopeItem::Returns {
                expressions: Vec::new(),
            });
        }

        let function_scope = self.exit_scope();
        classes::detect_closure_class(
            self.ctx,
            &function_scope,
            &self.scope,
            &name,
            identifier_expr,
        );
        let resolved = resolver::resolve_scope(self.ctx, function_scope, None);
        self.scope.push(ScopeItem::Resolved(resolved));

        literal
    }

    // ----- assignments -----

    fn analyze_assignment(&mut self, variables: &[Expr], init: &[Expr], is_local: bool) {
        let init_ids: Vec<ExprId> = init.iter().map(|e| self.normalize(e)).collect();

        let single_call = init_ids.len() == 1
            && matches!(
                self.ctx.exprs.get(init_ids[0]),
                Expression::Operation {
                    operator: Operator::Call,
                    ..
                } | Expression::Require { .. }
            );

        if single_call {
            let rhs = init_ids[0];
            let require_module = match self.ctx.exprs.get(rhs) {
                Expression::Require { module } => Some(module.clone()),
                _ => None,
            };
            for (position, variable) in variables.iter().enumerate() {
                if position == 0 {
                    if let Some(module) = &require_module {
                        self.assign_require(variable, rhs, module, is_local);
                        continue;
                    }
                }
                // Multiple-return unpacking: every position reads the
                // same call at an incremented index
                self.assign_one(variable, rhs, Some(position + 1), is_local);
            }
            return;
        }

        for (position, variable) in variables.iter().enumerate() {
            match init_ids.get(position) {
                Some(&rhs) => self.assign_one(variable, rhs, None, is_local),
                None => {
                    let unpackable = init_ids.last().copied().filter(|&last| {
                        matches!(
                            self.ctx.exprs.get(last),
                            Expression::Operation {
                                operator: Operator::Call,
                                ..
                            }
                        )
                    });
                    match unpackable {
                        Some(last) => {
                            let index = position + 2 - init_ids.len();
                            self.assign_one(variable, last, Some(index), is_local);
                        }
                        None if is_local => {
                            if let Some(name) = variable.as_identifier() {
                                let local_id = self.ctx.new_id(IdKind::Local, name);
                                self.scope.define_local(name, local_id);
                            }
                        }
                        None => {}
                    }
                }
            }
        }
    }

    fn assign_require(&mut self, variable: &Expr, rhs: ExprId, module: &str, is_local: bool) {
        match &variable.kind {
            ExprKind::Identifier(name) => {
                let target = if is_local {
                    let local_id = self.ctx.new_id(IdKind::Local, name);
                    self.scope.define_local(name, local_id.clone());
                    local_id
                } else {
                    name.clone()
                };
                self.ctx
                    .add_definition(target.clone(), ExpressionInfo::with_index(rhs, 1));
                self.scope.push(ScopeItem::RequireAssignment {
                    target,
                    module: module.to_string(),
                });
            }
            _ => {
                self.assign_one(variable, rhs, Some(1), is_local);
            }
        }
    }

    fn assign_one(
        &mut self,
        variable: &Expr,
        rhs: ExprId,
        index: Option<usize>,
        is_local: bool,
    ) {
        match &variable.kind {
            ExprKind::Identifier(name) => {
                let name = name.clone();
                self.assign_name(&name, rhs, index, is_local);
            }
            ExprKind::Member { .. } => {
                let member_expr = self.normalize(variable);
                if let Expression::Member { base, .. } = self.ctx.exprs.get(member_expr) {
                    let base = *base;
                    self.ctx.usage_mut(base).supports_index_assignment = true;
                }

                // Class idioms fire on member paths too; the class is
                // named by the full path with locals resolved
                let mut value = rhs;
                if index.unwrap_or(1) == 1 {
                    if let Some(path) =
                        classes::expr_source_name(self.ctx, &self.scope, member_expr)
                    {
                        if let Some(literal) =
                            classes::try_derive(self.ctx, &self.scope, value, &path, false)
                        {
                            value = literal;
                        } else if let Some(literal) =
                            classes::try_atom_ui(self.ctx, value, &path)
                        {
                            value = literal;
                        }
                    }
                }
                self.record_member_definition(member_expr, value, index);
            }
            ExprKind::Index { .. } => {
                let index_expr = self.normalize(variable);
                if let Expression::Index { base, .. } = self.ctx.exprs.get(index_expr) {
                    let base = *base;
                    self.ctx.usage_mut(base).supports_index_assignment = true;
                }
                self.record_index_definition(index_expr, rhs, index);
            }
            _ => {}
        }
    }

    fn assign_name(&mut self, name: &str, rhs: ExprId, index: Option<usize>, is_local: bool) {
        let mut rhs = rhs;
        let mut index = index;

        if index.unwrap_or(1) == 1 {
            // Class-defining idioms on the right-hand side
            if let Some(literal) = classes::try_derive(self.ctx, &self.scope, rhs, name, is_local)
            {
                rhs = literal;
                index = None;
            } else if !is_local && !self.scope.is_local(name) {
                if let Some(literal) = classes::try_promote_local_derive(self.ctx, rhs, name) {
                    rhs = literal;
                    index = None;
                } else if let Some(literal) = classes::try_atom_ui(self.ctx, rhs, name) {
                    rhs = literal;
                    index = None;
                }
            }

            if self.try_assign_setmetatable(name, rhs, is_local) {
                return;
            }
            if is_local && self.try_assign_instance_new(name, rhs) {
                return;
            }

            rhs = self.fold_or_self_table(name, rhs);
        }

        if is_local {
            let local_id = self.ctx.new_id(IdKind::Local, name);
            self.scope.define_local(name, local_id.clone());

            // Closure-class seed: `local self = {}` / `local publ = {}` /
            // `local self = Base.new(...)`
            if matches!(name, "self" | "publ") {
                if let Some(table_id) = self.ctx.exprs.table_id_of(rhs).map(|s| s.to_string()) {
                    self.scope.mark_class_self(&local_id, &table_id);
                } else if let Some(base_name) = self.base_of_new_call(rhs) {
                    let table_id = self.ctx.new_table_id(name);
                    if let Some(info) = self.ctx.table_info_mut(&table_id) {
                        info.extends = base_name;
                    }
                    let literal = self.ctx.alloc_expr(Expression::Literal(LiteralExpr {
                        lua_type: Some(LuaType::Table),
                        table_id: Some(table_id.clone()),
                        ..LiteralExpr::default()
                    }));
                    self.ctx
                        .add_definition(local_id.clone(), ExpressionInfo::new(literal));
                    self.scope.mark_class_self(&local_id, &table_id);
                }
            }

            let mut info = ExpressionInfo::new(rhs);
            info.index = index;
            self.ctx.add_definition(local_id.clone(), info);
            self.scope.push(ScopeItem::Assignment(AssignmentItem {
                target: local_id,
                name: name.to_string(),
                expression: rhs,
                index,
                is_local: true,
            }));
            return;
        }

        // Assignment to an existing local binding
        if let Some(local_id) = self.scope.find_id(name).map(|s| s.to_string()) {
            let mut info = ExpressionInfo::new(rhs);
            info.index = index;
            self.ctx.add_definition(local_id.clone(), info);
            self.scope.push(ScopeItem::Assignment(AssignmentItem {
                target: local_id,
                name: name.to_string(),
                expression: rhs,
                index,
                is_local: true,
            }));
            return;
        }

        // Global assignment
        if let Some(table_id) = self.ctx.exprs.table_id_of(rhs).map(|s| s.to_string()) {
            if let Some(info) = self.ctx.table_info_mut(&table_id) {
                if info.original_name.is_none() {
                    info.original_name = Some(name.to_string());
                }
            }
            self.absorb_empty_reassignment(name, rhs, &table_id);
            classes::merge_unknown_class(self.ctx, name, &table_id);
        }

        let mut info = ExpressionInfo::new(rhs);
        info.index = index;
        self.ctx.add_definition(name.to_string(), info);
        self.scope.push(ScopeItem::Assignment(AssignmentItem {
            target: name.to_string(),
            name: name.to_string(),
            expression: rhs,
            index,
            is_local: false,
        }));
    }

    /// The constructor base of an `X.new(...)` call, for the closure-class
    /// seed that builds on an inherited instance.
    fn base_of_new_call(&self, rhs: ExprId) -> Option<Option<String>> {
        let Expression::Operation {
            operator: Operator::Call,
            arguments,
        } = self.ctx.exprs.get(rhs)
        else {
            return None;
        };
        let Expression::Member {
            base,
            indexer: Indexer::Dot,
            member,
        } = self.ctx.exprs.get(*arguments.first()?)
        else {
            return None;
        };
        if member != "new" {
            return None;
        }
        Some(classes::expr_source_name(self.ctx, &self.scope, *base))
    }

    /// `B = setmetatable(a, b)` assignment form: bind B as an instance of
    /// b's class, with a's literal fields copied in.
    fn try_assign_setmetatable(&mut self, name: &str, rhs: ExprId, is_local: bool) -> bool {
        let Expression::Operation {
            operator: Operator::Call,
            arguments,
        } = self.ctx.exprs.get(rhs).clone()
        else {
            return false;
        };
        if arguments.len() != 3 {
            return false;
        }
        let is_setmetatable = matches!(
            self.ctx.exprs.get(arguments[0]),
            Expression::Reference { id } if id == "setmetatable"
        );
        if !is_setmetatable {
            return false;
        }

        let target_key = if is_local {
            let local_id = self.ctx.new_id(IdKind::Local, name);
            self.scope.define_local(name, local_id.clone());
            local_id
        } else {
            name.to_string()
        };
        classes::bind_instance(
            self.ctx,
            &target_key,
            name,
            arguments[2],
            Some(arguments[1]),
        );
        self.scope.push(ScopeItem::Partial {
            target: target_key.clone(),
            class_expr: arguments[2],
        });

        // Surface the binding as an assignment to the instance reference
        if let Some(definition) = self
            .ctx
            .definitions_of(&target_key)
            .and_then(|defs| defs.last())
            .map(|d| d.expression)
        {
            self.scope.push(ScopeItem::Assignment(AssignmentItem {
                target: target_key,
                name: name.to_string(),
                expression: definition,
                index: None,
                is_local,
            }));
        }
        true
    }

    /// `local o = Base.new(self, ...)`: reads as `setmetatable(o, self)`,
    /// so `o` inherits the class under construction.
    fn try_assign_instance_new(&mut self, name: &str, rhs: ExprId) -> bool {
        let Expression::Operation {
            operator: Operator::Call,
            arguments,
        } = self.ctx.exprs.get(rhs).clone()
        else {
            return false;
        };
        if arguments.len() < 2 {
            return false;
        }
        let is_dot_new = matches!(
            self.ctx.exprs.get(arguments[0]),
            Expression::Member {
                indexer: Indexer::Dot,
                member,
                ..
            } if member == "new"
        );
        if !is_dot_new {
            return false;
        }
        let first_argument = arguments[1];
        let is_self_argument = match self.ctx.exprs.get(first_argument) {
            Expression::Reference { id } => {
                id == "self"
                    || parse_id(id).is_some_and(|p| p.kind == IdKind::SelfParam)
                    || self.scope.find_name(id) == Some("self")
            }
            _ => false,
        };
        if !is_self_argument {
            return false;
        }

        let local_id = self.ctx.new_id(IdKind::Local, name);
        self.scope.define_local(name, local_id.clone());
        classes::bind_instance(self.ctx, &local_id, name, first_argument, None);
        self.scope.push(ScopeItem::Partial {
            target: local_id.clone(),
            class_expr: first_argument,
        });
        if let Some(definition) = self
            .ctx
            .definitions_of(&local_id)
            .and_then(|defs| defs.last())
            .map(|d| d.expression)
        {
            self.scope.push(ScopeItem::Assignment(AssignmentItem {
                target: local_id,
                name: name.to_string(),
                expression: definition,
                index: None,
                is_local: true,
            }));
        }
        true
    }

    /// `X = X or {}` resolves to the same table as X rather than a fresh
    /// one, when X already has a definition.
    fn fold_or_self_table(&mut self, name: &str, rhs: ExprId) -> ExprId {
        let Expression::Operation {
            operator: Operator::Or,
            arguments,
        } = self.ctx.exprs.get(rhs).clone()
        else {
            return rhs;
        };
        if arguments.len() != 2 {
            return rhs;
        }
        let lhs_matches = match self.ctx.exprs.get(arguments[0]) {
            Expression::Reference { id } => {
                id == name || self.scope.find_name(id) == Some(name)
            }
            _ => false,
        };
        if !lhs_matches {
            return rhs;
        }
        let rhs_is_empty_table = self
            .ctx
            .exprs
            .table_id_of(arguments[1])
            .and_then(|id| self.ctx.table_info(id))
            .is_some_and(|info| info.definitions.is_empty() && info.literal_fields.is_empty());
        if !rhs_is_empty_table {
            return rhs;
        }
        let target = match self.ctx.exprs.get(arguments[0]) {
            Expression::Reference { id } => id.clone(),
            _ => return rhs,
        };
        if self.ctx.definitions_of(&target).is_some() {
            arguments[0]
        } else {
            // First sight: keep the fresh table
            arguments[1]
        }
    }

    /// An already-classed global reassigned an empty table literal keeps
    /// its class table instead of shadowing it.
    fn absorb_empty_reassignment(&mut self, name: &str, rhs: ExprId, table_id: &str) {
        let is_empty = self
            .ctx
            .table_info(table_id)
            .is_some_and(|info| info.definitions.is_empty() && info.literal_fields.is_empty());
        if !is_empty {
            return;
        }
        let existing: Option<String> = self
            .ctx
            .definitions_of(name)
            .map(|defs| defs.to_vec())
            .unwrap_or_default()
            .iter()
            .find_map(|def| {
                let id = self.ctx.exprs.table_id_of(def.expression)?;
                let info = self.ctx.table_info(id)?;
                info.is_class().then(|| id.to_string())
            });
        let Some(existing) = existing else { return };
        if existing == table_id {
            return;
        }
        if let Expression::Literal(lit) = self.ctx.exprs.get_mut(rhs) {
            lit.table_id = Some(existing);
        }
        if let Some(orphan) = self.ctx.table_info_mut(table_id) {
            orphan.is_empty_class = true;
        }
    }

    // ----- field definitions -----

    fn record_member_definition(&mut self, member_expr: ExprId, value: ExprId, index: Option<usize>) {
        let Expression::Member {
            base,
            indexer,
            member,
        } = self.ctx.exprs.get(member_expr).clone()
        else {
            return;
        };
        self.record_field(base, &member, value, index, indexer == Indexer::Colon);
    }

    fn record_index_definition(&mut self, index_expr: ExprId, value: ExprId, index: Option<usize>) {
        let Expression::Index { base, index: key } = self.ctx.exprs.get(index_expr).clone() else {
            return;
        };
        let static_key = match self.ctx.exprs.get(key) {
            Expression::Literal(lit) => match lit.lua_type {
                Some(LuaType::String) | Some(LuaType::Number) => lit.literal.clone(),
                _ => None,
            },
            _ => None,
        };
        if let Some(static_key) = static_key {
            self.record_field(base, &static_key, value, index, false);
        }
    }

    fn record_field(
        &mut self,
        base: ExprId,
        key: &str,
        value: ExprId,
        index: Option<usize>,
        via_colon: bool,
    ) {
        // Closure-class sighting: `self.X = function` on the seed local
        if let Expression::Reference { id } = self.ctx.exprs.get(base) {
            let id = id.clone();
            let value_is_function = matches!(
                self.ctx.exprs.get(value),
                Expression::Literal(lit) if lit.function_id.is_some()
            );
            if value_is_function {
                self.scope.mark_self_function(&id);
            }
        }

        let mut seen = Seen::default();
        let base_types = resolver::resolve(self.ctx, base, 1, &mut seen);
        let instance = base_types
            .iter()
            .any(|t| crate::sema::ids::is_kind(t, IdKind::Instance));
        let mut targets = table_ids_in(self.ctx, &base_types, &mut seen);

        if targets.is_empty() {
            targets = self.materialize_unknown(base);
        }

        let function_id = match self.ctx.exprs.get(value) {
            Expression::Literal(lit) => lit.function_id.clone(),
            _ => None,
        };

        for table_id in targets {
            let mut info = ExpressionInfo::new(value);
            info.index = index;
            info.instance = instance;
            if let Some(table) = self.ctx.table_info_mut(&table_id) {
                table.add_definition(key, info);
            }

            if let Some(function_id) = &function_id {
                if via_colon && key == "new" {
                    classes::implied_new(self.ctx, &self.scope, &table_id, base, function_id);
                }
                classes::promote_nested(self.ctx, &table_id);
            }
        }
    }

    /// Make an unresolvable field-definition base resolvable: an unknown
    /// global gets a per-module placeholder class, and a member chain on
    /// one gets nested tables hung off the placeholder.
    fn materialize_unknown(&mut self, base: ExprId) -> Vec<String> {
        match self.ctx.exprs.get(base).clone() {
            Expression::Reference { id } if parse_id(&id).is_none() => {
                let placeholder = self.ctx.unknown_class(&id);
                if self.ctx.definitions_of(&id).is_none() {
                    let literal = self.ctx.alloc_expr(Expression::Literal(LiteralExpr {
                        lua_type: Some(LuaType::Table),
                        table_id: Some(placeholder.clone()),
                        ..LiteralExpr::default()
                    }));
                    self.ctx.add_definition(id, ExpressionInfo::new(literal));
                }
                vec![placeholder]
            }
            Expression::Member {
                base: inner,
                member,
                ..
            } => {
                let mut seen = Seen::default();
                let inner_types = resolver::resolve(self.ctx, inner, 1, &mut seen);
                let mut parents = table_ids_in(self.ctx, &inner_types, &mut seen);
                if parents.is_empty() {
                    parents = self.materialize_unknown(inner);
                }
                let mut out = Vec::new();
                for parent in parents {
                    // Reuse an existing literal child if the field is
                    // already a table
                    let existing = self
                        .ctx
                        .table_info(&parent)
                        .and_then(|info| info.definitions.get(&member))
                        .and_then(|defs| {
                            defs.iter().find_map(|d| {
                                self.ctx.exprs.table_id_of(d.expression).map(String::from)
                            })
                        });
                    if let Some(existing) = existing {
                        out.push(existing);
                        continue;
                    }
                    let child = self.ctx.new_table_id(&member);
                    if let Some(info) = self.ctx.table_info_mut(&child) {
                        info.container_id = Some(parent.clone());
                    }
                    let literal = self.ctx.alloc_expr(Expression::Literal(LiteralExpr {
                        lua_type: Some(LuaType::Table),
                        table_id: Some(child.clone()),
                        ..LiteralExpr::default()
                    }));
                    let mut info = ExpressionInfo::new(literal);
                    info.from_literal = false;
                    if let Some(parent_info) = self.ctx.table_info_mut(&parent) {
                        parent_info.add_definition(member.clone(), info);
                    }
                    out.push(child);
                }
                out
            }
            _ => Vec::new(),
        }
    }

    // ----- call statements -----

    fn analyze_call_statement(&mut self, expr: &Expr) {
        let expression = self.normalize(expr);

        // `setmetatable(a, b)` statement form
        if let Expression::Operation {
            operator: Operator::Call,
            arguments,
        } = self.ctx.exprs.get(expression).clone()
        {
            let is_setmetatable = matches!(
                self.ctx.exprs.get(arguments[0]),
                Expression::Reference { id } if id == "setmetatable"
            );
            if is_setmetatable && arguments.len() == 3 {
                if let Expression::Reference { id } = self.ctx.exprs.get(arguments[1]).clone() {
                    let name = self
                        .scope
                        .find_name(&id)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| id.clone());
                    classes::bind_instance(self.ctx, &id, &name, arguments[2], None);
                    self.scope.push(ScopeItem::Partial {
                        target: id,
                        class_expr: arguments[2],
                    });
                    return;
                }
            }
        }

        self.scope.push(ScopeItem::Usage { expression });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::frontend::Parser;

    fn analyze(files: &[(&str, &str)]) -> AnalysisContext {
        let mut ctx = AnalysisContext::new(Options::default());
        for (identifier, source) in files {
            let chunk = Parser::new(source).parse_chunk().expect("parse failed");
            read_module(&mut ctx, identifier, &chunk);
        }
        ctx
    }

    fn class_named<'c>(
        ctx: &'c AnalysisContext,
        name: &str,
    ) -> Option<&'c crate::sema::info::TableInfo> {
        ctx.table_ids()
            .filter_map(|id| ctx.table_info(id))
            .find(|info| info.class_name.as_deref() == Some(name) && !info.is_empty_class)
    }

    #[test]
    fn derive_assignment_creates_class() {
        let ctx = analyze(&[("shared/Foo", "Foo = Base:derive(\"Foo\")")]);
        let class = class_named(&ctx, "Foo").expect("class Foo");
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.derive_name.as_deref(), Some("Foo"));
    }

    #[test]
    fn method_definition_lands_on_class() {
        let ctx = analyze(&[(
            "shared/Foo",
            "Foo = Base:derive(\"Foo\")\nfunction Foo:getName() return \"x\" end",
        )]);
        let class = class_named(&ctx, "Foo").expect("class Foo");
        assert!(class.definitions.contains_key("getName"));
    }

    #[test]
    fn implied_new_promotes_table() {
        let ctx = analyze(&[(
            "shared/Thing",
            "Thing = {}\nfunction Thing:new(x) local o = {} return o end",
        )]);
        let class = class_named(&ctx, "Thing").expect("class Thing");
        assert!(class.definitions.contains_key("new"));
    }

    #[test]
    fn module_resolved_form_lists_class() {
        let ctx = analyze(&[("shared/Foo", "Foo = Base:derive(\"Foo\")")]);
        let module = ctx.module("shared/Foo", false).unwrap();
        let resolved = module.resolved.as_ref().unwrap();
        assert_eq!(resolved.classes.len(), 1);
    }

    #[test]
    fn multi_return_unpacks_indices() {
        let ctx = analyze(&[(
            "shared/m",
            "function f() return 1, \"s\" end\nlocal a, b = f()",
        )]);
        let module = ctx.module("shared/m", false).unwrap();
        assert!(module.resolved.is_some());
        // The local definitions carry incremented call indices
        let defs: Vec<_> = ctx
            .definitions
            .iter()
            .filter(|(k, _)| k.contains("[a]") || k.contains("[b]"))
            .collect();
        assert_eq!(defs.len(), 2);
        let indices: Vec<Option<usize>> =
            defs.iter().flat_map(|(_, v)| v.iter().map(|d| d.index)).collect();
        assert!(indices.contains(&Some(1)));
        assert!(indices.contains(&Some(2)));
    }

    #[test]
    fn local_function_binds_locally() {
        let ctx = analyze(&[(
            "shared/m",
            "local function helper() return 1 end\nG = helper()",
        )]);
        // helper is not a global definition
        assert!(ctx.definitions_of("helper").is_none());
        assert!(ctx.definitions_of("G").is_some());
    }

    #[test]
    fn setmetatable_statement_binds_instance() {
        let ctx = analyze(&[(
            "shared/m",
            "A = {}\nA.__index = A\nfunction A:m() end\nB = setmetatable({}, A)",
        )]);
        let defs = ctx.definitions_of("B").expect("B defined");
        assert!(!defs.is_empty());
    }

    #[test]
    fn closure_class_detected() {
        let ctx = analyze(&[(
            "shared/M",
            "M = {}\nfunction M.make()\n local self = {}\n function self:greet() return \"hi\" end\n return self\nend",
        )]);
        // The closure table is promoted and named after the module
        let class = class_named(&ctx, "M").expect("closure class M");
        assert!(class.is_closure_class);
        assert!(class.definitions.contains_key("greet"));
    }

    #[test]
    fn x_or_empty_table_reuses_definition() {
        let ctx = analyze(&[("shared/m", "X = {}\nX.a = 1\nX = X or {}")]);
        // Only one table carries the `a` definition and X resolves to it
        let with_field: Vec<_> = ctx
            .table_ids()
            .filter(|id| {
                ctx.table_info(id)
                    .is_some_and(|info| info.definitions.contains_key("a"))
            })
            .collect();
        assert_eq!(with_field.len(), 1);
    }
}
