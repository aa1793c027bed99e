use std::sync::Arc;

use tracing::debug;

use crate::{
    analyzer::{Analyzer, AnalyzerResult, AttributeSeq, BindReferences},
    config::AnalyzerConfig,
    executor::{ANALYSIS, OPTIMIZATION, PLANNING, QueryPlanningTracker, RuleExecutor},
    expression::{Expr, Value},
    optimizer::{EquivalentExpressions, Optimizer},
};

/// Output of [`ExpressionCompiler::compile`].
#[derive(Debug, Clone)]
pub struct CompiledExpressions {
    /// Ordinal-addressed expressions, one per input expression
    pub bound: Vec<Expr>,
    /// Bound subexpressions used more than once, shortest first
    pub common_subexpressions: Vec<Expr>,
    pub tracker: Arc<QueryPlanningTracker>,
}

impl CompiledExpressions {
    pub fn eval(&self, row: &[Value]) -> AnalyzerResult<Vec<Value>> {
        self.bound.iter().map(|e| e.eval(row)).collect()
    }
}

/// Runs analysis, optimization and binding of a projection list over one input schema.
pub struct ExpressionCompiler {
    config: AnalyzerConfig,
}

impl ExpressionCompiler {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, exprs: Vec<Expr>, schema: AttributeSeq) -> AnalyzerResult<CompiledExpressions> {
        let tracker = QueryPlanningTracker::shared();
        let analyzer = Analyzer::new(schema, self.config.clone());
        let optimizer = Optimizer::new(self.config.clone());

        QueryPlanningTracker::with_tracker(Arc::clone(&tracker), || {
            let analyzed = tracker.measure_phase(ANALYSIS, || {
                exprs.into_iter().map(|e| analyzer.analyze(e)).collect::<AnalyzerResult<Vec<_>>>()
            })?;

            let optimized = tracker.measure_phase(OPTIMIZATION, || {
                analyzed.into_iter().map(|e| optimizer.execute(e)).collect::<AnalyzerResult<Vec<_>>>()
            })?;

            let (bound, common_subexpressions) = tracker.measure_phase(PLANNING, || -> AnalyzerResult<_> {
                let mut equivalence = EquivalentExpressions::new();
                for e in &optimized {
                    equivalence.add_expr_tree(e)?;
                }
                let common = BindReferences::bind_references(equivalence.get_common_subexpressions(), analyzer.input())?;
                let bound = BindReferences::bind_references(optimized, analyzer.input())?;
                Ok((bound, common))
            })?;

            debug!(expressions = bound.len(), common = common_subexpressions.len(), "compiled expressions");
            Ok(CompiledExpressions { bound, common_subexpressions, tracker: Arc::clone(&tracker) })
        })
    }
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
