use crate::{
    config::AnalyzerConfig,
    executor::{Batch, Rule, RuleExecutor},
    expression::Expr,
    optimizer::ConstantFolding,
};

/// Rewrites resolved expressions into cheaper equivalents.
pub struct Optimizer {
    config: AnalyzerConfig,
    batches: Vec<Batch<Expr>>,
}

impl Optimizer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let rules: Vec<Box<dyn Rule<Expr>>> = vec![Box::new(ConstantFolding)];
        let batches = vec![Batch::new("Operator Optimization", config.fixed_point(), rules)];
        Self { config, batches }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl RuleExecutor<Expr> for Optimizer {
    fn name(&self) -> &str {
        "Optimizer"
    }

    fn batches(&self) -> &[Batch<Expr>] {
        &self.batches
    }

    /// A resolved tree must stay resolved.
    fn is_plan_integral(&self, previous: &Expr, current: &Expr) -> bool {
        !previous.resolved() || current.resolved()
    }

    fn plan_change_logging(&self) -> bool {
        self.config.plan_change_logging
    }

    fn check_once_idempotence(&self) -> bool {
        self.config.check_once_idempotence
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        analyzer::{AnalyzerError, AnalyzerResult},
        executor::{FnRule, QueryPlanningTracker, Strategy},
        testing::fixtures::int_attr,
    };

    #[test]
    fn folds_to_fixed_point_and_records_rules() {
        let a = Expr::Attribute(int_attr("a"));
        let e = Expr::multiply(a.clone(), Expr::add(Expr::literal(1), Expr::literal(2)));
        let tracker = QueryPlanningTracker::shared();

        let out = Optimizer::default().execute_and_track(e, Arc::clone(&tracker)).unwrap();
        assert_eq!(out, Expr::multiply(a, Expr::literal(3)));

        let stats = tracker.rules()["ConstantFolding"];
        assert_eq!(stats.num_invocations, 2);
        assert_eq!(stats.num_effective_invocations, 1);
    }

    #[test]
    fn rules_that_unresolve_the_tree_are_rejected() {
        let breaking = FnRule::boxed("Unresolve", |_: Expr| -> AnalyzerResult<Expr> { Ok(Expr::unresolved(["x"])) });
        let optimizer = Optimizer {
            config: AnalyzerConfig::default(),
            batches: vec![Batch::new("b", Strategy::Once, vec![breaking])],
        };
        assert_eq!(
            optimizer.execute(Expr::literal(1)).unwrap_err(),
            AnalyzerError::PlanIntegrity { rule: "Unresolve".into(), batch: "b".into() }
        );
    }
}
