use std::sync::Arc;

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult, AttributeSeq, ResolveReferences},
    config::AnalyzerConfig,
    executor::{Batch, Rule, RuleExecutor},
    expression::Expr,
};

/// Turns expressions over an input schema into fully resolved ones.
pub struct Analyzer {
    input: Arc<AttributeSeq>,
    config: AnalyzerConfig,
    batches: Vec<Batch<Expr>>,
}

impl Analyzer {
    pub fn new(input: AttributeSeq, config: AnalyzerConfig) -> Self {
        let input = Arc::new(input);
        let rules: Vec<Box<dyn Rule<Expr>>> = vec![Box::new(ResolveReferences::new(input.clone(), config.resolver()))];
        let batches = vec![Batch::new("Resolution", config.fixed_point(), rules)];
        Self { input, config, batches }
    }

    pub fn input(&self) -> &AttributeSeq {
        &self.input
    }

    /// Run the resolution batch, then reject anything left unresolved.
    pub fn analyze(&self, expr: Expr) -> AnalyzerResult<Expr> {
        let analyzed = self.execute(expr)?;
        self.check_analysis(&analyzed)?;
        Ok(analyzed)
    }

    pub fn check_analysis(&self, expr: &Expr) -> AnalyzerResult<()> {
        if let Some(Expr::UnresolvedAttribute(u)) = expr.find(&mut |e| matches!(e, Expr::UnresolvedAttribute(_))) {
            return Err(AnalyzerError::UnresolvedColumn {
                name: u.name(),
                candidates: self.input.iter().map(|a| a.qualified_name()).collect(),
            });
        }
        if expr.resolved() {
            return Ok(());
        }
        // the lowest node that failed its own type check explains the failure
        match expr.find(&mut |e| e.children_resolved() && !e.resolved()) {
            Some(failed) => {
                failed.check_input_data_types()?;
                Err(failed.unresolved_error("analysis"))
            }
            None => Err(expr.unresolved_error("analysis")),
        }
    }
}

impl RuleExecutor<Expr> for Analyzer {
    fn name(&self) -> &str {
        "Analyzer"
    }

    fn batches(&self) -> &[Batch<Expr>] {
        &self.batches
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
    use super::*;
    use crate::{
        expression::DataType,
        testing::fixtures::{attr, int_attr},
    };

    fn schema() -> AttributeSeq {
        AttributeSeq::new(vec![
            int_attr("a").with_qualifier(["t"]),
            attr("s", DataType::String, true).with_qualifier(["t"]),
        ])
    }

    #[test]
    fn resolves_whole_tree() {
        let analyzer = Analyzer::new(schema(), AnalyzerConfig::new());
        let e = Expr::unresolved_alias(Expr::add(Expr::unresolved(["t", "a"]), Expr::literal(1)));
        let out = analyzer.analyze(e).unwrap();
        assert!(out.resolved());
        assert_eq!(out.data_type().unwrap(), DataType::Int);
    }

    #[test]
    fn unknown_column_lists_input_columns() {
        let analyzer = Analyzer::new(schema(), AnalyzerConfig::new());
        assert_eq!(
            analyzer.analyze(Expr::unresolved(["nope"])).unwrap_err(),
            AnalyzerError::UnresolvedColumn { name: "nope".into(), candidates: vec!["t.a".into(), "t.s".into()] }
        );
    }

    #[test]
    fn case_sensitive_session_rejects_wrong_case() {
        let analyzer = Analyzer::new(schema(), AnalyzerConfig::case_sensitive());
        assert!(matches!(analyzer.analyze(Expr::unresolved(["A"])), Err(AnalyzerError::UnresolvedColumn { .. })));
    }

    #[test]
    fn type_errors_surface_after_resolution() {
        let analyzer = Analyzer::new(schema(), AnalyzerConfig::new());
        let e = Expr::add(Expr::unresolved(["s"]), Expr::literal(1));
        assert!(matches!(analyzer.analyze(e), Err(AnalyzerError::DataTypeMismatch { .. })));
    }

    #[test]
    fn ambiguity_is_reported_immediately() {
        let seq = AttributeSeq::new(vec![int_attr("x").with_qualifier(["l"]), int_attr("x").with_qualifier(["r"])]);
        let analyzer = Analyzer::new(seq, AnalyzerConfig::new());
        assert!(matches!(analyzer.analyze(Expr::unresolved(["x"])), Err(AnalyzerError::AmbiguousReference { .. })));
    }
}
