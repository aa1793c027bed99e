//! Analysis and rewrite core of the fosk SQL engine.
//!
//! Expressions come in unresolved, get their names resolved against an input
//! schema by the [`Analyzer`], are rewritten by the [`Optimizer`] and finally
//! bound to row ordinals with [`BindReferences`]. Both drivers are
//! [`RuleExecutor`]s that run named batches of rules to a fixed point and
//! report per-rule timings to the current [`QueryPlanningTracker`].

pub mod expression;
pub use expression::{
    Alias, AttributeReference, BinaryOp, BoundReference, DataType, Expr, ExprId, Resolver, ScalarFunction,
    StructField, Transformed, UnaryOp, UnresolvedAttribute, Value, case_insensitive_resolution,
    case_sensitive_resolution,
};

pub mod analyzer;
pub use analyzer::{
    Analyzer, AnalyzerError, AnalyzerResult, AttributeSeq, AttributeSet, BindReferences, ResolveReferences,
};

pub mod executor;
pub use executor::{Batch, FnRule, QueryPlanningTracker, Rule, RuleExecutor, Strategy};

pub mod optimizer;
pub use optimizer::{ConstantFolding, EquivalentExpressions, ExpressionSet, Optimizer};

pub mod config;
pub use config::AnalyzerConfig;

pub mod compiler;
pub use compiler::{CompiledExpressions, ExpressionCompiler};

mod testing;
