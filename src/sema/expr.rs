// src/sema/expr.rs
//
// The normalized expression graph. The reader lowers AST expressions into
// this form once per AST node; everything downstream (definitions, usage,
// type resolution) works on `ExprId`s.

use smallvec::SmallVec;

use crate::frontend::Indexer;

/// Index into the expression arena. Identity is meaningful: the usage map
/// and the resolver's cycle map key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Primitive Lua value kinds carried by literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuaType {
    Boolean,
    Function,
    Nil,
    Number,
    String,
    Table,
}

impl LuaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Function => "function",
            Self::Nil => "nil",
            Self::Number => "number",
            Self::String => "string",
            Self::Table => "table",
        }
    }
}

/// Operators in normalized `operation` expressions. `Call` carries the
/// callee as its first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Call,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Neg,
    BNot,
    Len,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    And,
    Or,
}

impl Operator {
    /// Operators whose result is always a number.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::IDiv
                | Self::Mod
                | Self::Pow
                | Self::BAnd
                | Self::BOr
                | Self::BXor
                | Self::Shl
                | Self::Shr
                | Self::Neg
                | Self::BNot
                | Self::Len
        )
    }

    /// Operators whose result is always a boolean.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// Literal payload. Tables carry the id of their TableInfo; functions the
/// id of their FunctionInfo.
#[derive(Debug, Clone, Default)]
pub struct LiteralExpr {
    pub lua_type: Option<LuaType>,
    /// Raw literal text for strings/numbers/booleans
    pub literal: Option<String>,
    pub table_id: Option<String>,
    pub function_id: Option<String>,
    /// Parameter names for function literals
    pub parameters: Vec<String>,
    pub is_method: bool,
}

impl LiteralExpr {
    pub fn of(lua_type: LuaType) -> Self {
        Self {
            lua_type: Some(lua_type),
            ..Self::default()
        }
    }

    pub fn with_text(lua_type: LuaType, literal: impl Into<String>) -> Self {
        Self {
            lua_type: Some(lua_type),
            literal: Some(literal.into()),
            ..Self::default()
        }
    }
}

/// A normalized expression. Closed union; the resolver matches
/// exhaustively.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A name: either a synthetic id (resolved local/parameter) or a raw
    /// global name.
    Reference { id: String },
    /// `require("module")` with a syntactically-resolvable argument
    Require { module: String },
    Literal(LiteralExpr),
    Member {
        base: ExprId,
        indexer: Indexer,
        member: String,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    Operation {
        operator: Operator,
        arguments: SmallVec<[ExprId; 2]>,
    },
}

/// Flat arena owning every normalized expression of the session.
/// Cross-module definitions hold `ExprId`s into this arena, so it lives as
/// long as the analysis context.
#[derive(Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Expression>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expression: Expression) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expression);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expression {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expression {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The table id carried by a literal table expression, if any.
    pub fn table_id_of(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expression::Literal(lit) => lit.table_id.as_deref(),
            _ => None,
        }
    }

    /// The callee of a call operation, if this is one.
    pub fn callee_of(&self, id: ExprId) -> Option<ExprId> {
        match self.get(id) {
            Expression::Operation {
                operator: Operator::Call,
                arguments,
            } => arguments.first().copied(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_allocates_sequential_ids() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(Expression::Literal(LiteralExpr::of(LuaType::Nil)));
        let b = arena.alloc(Expression::Reference {
            id: "x".to_string(),
        });
        assert_eq!(a, ExprId(0));
        assert_eq!(b, ExprId(1));
        assert!(matches!(arena.get(a), Expression::Literal(_)));
    }

    #[test]
    fn callee_of_call_operation() {
        let mut arena = ExprArena::new();
        let callee = arena.alloc(Expression::Reference {
            id: "f".to_string(),
        });
        let call = arena.alloc(Expression::Operation {
            operator: Operator::Call,
            arguments: smallvec::smallvec![callee],
        });
        assert_eq!(arena.callee_of(call), Some(callee));
        assert_eq!(arena.callee_of(callee), None);
    }
}
