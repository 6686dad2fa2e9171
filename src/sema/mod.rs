// src/sema/mod.rs
pub mod analyzer;
pub mod classes;
pub mod context;
pub mod deps;
pub mod expr;
pub mod finalize;
pub mod heuristics;
pub mod ids;
pub mod info;
pub mod model;
pub mod reader;
pub mod resolver;
pub mod scope;
pub mod types;

pub use analyzer::{Analyzer, SourceError};
pub use context::AnalysisContext;
pub use deps::{DependencyResolver, FileFacts};
pub use expr::{ExprArena, ExprId, Expression, LiteralExpr, LuaType, Operator};
pub use finalize::Finalizer;
pub use ids::{IdAllocator, IdKind};
pub use info::{ExpressionInfo, FunctionInfo, Module, TableInfo};
pub use model::{
    ClassOutput, FieldOutput, FunctionOutput, ModuleOutput, ParameterOutput, ResolvedField,
    ResolvedFunction, ResolvedScope, TableOutput,
};
pub use scope::{AssignmentItem, Scope, ScopeItem, ScopeKind};
pub use types::{TypeSet, Usage};
