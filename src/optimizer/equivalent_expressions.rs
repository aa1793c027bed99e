use std::fmt::Write;

use indexmap::IndexMap;

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult},
    expression::Expr,
    optimizer::{ExpressionEquals, ExpressionStats},
};

type EquivalenceMap = IndexMap<ExpressionEquals, ExpressionStats>;

/// Common subexpression table keyed by semantic equality.
///
/// Only deterministic expressions are tracked. Children of conditionally
/// evaluated nodes count only when they occur in every branch.
#[derive(Debug, Clone, Default)]
pub struct EquivalentExpressions {
    map: EquivalenceMap,
}

impl EquivalentExpressions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `expr` once without looking at its children.
    /// Returns true if an equivalent expression was already present.
    pub fn add_expr(&mut self, expr: &Expr) -> AnalyzerResult<bool> {
        Self::update_expr_in_map(expr, &mut self.map, 1)
    }

    /// Count `expr` and, the first time it is seen, its subexpressions.
    pub fn add_expr_tree(&mut self, expr: &Expr) -> AnalyzerResult<()> {
        Self::update_expr_tree(expr, &mut self.map, 1)
    }

    pub fn get_expr_state(&self, expr: &Expr) -> Option<&ExpressionStats> {
        self.map.get(&ExpressionEquals::new(expr.clone()))
    }

    /// Representatives used more than once, shortest first.
    pub fn get_common_subexpressions(&self) -> Vec<Expr> {
        let mut common: Vec<(&ExpressionEquals, &ExpressionStats)> =
            self.map.iter().filter(|(_, stats)| stats.use_count > 1).collect();
        common.sort_by_key(|(key, _)| key.height);
        common.into_iter().map(|(_, stats)| stats.expr.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn debug_string(&self, all: bool) -> String {
        let mut out = String::from("Equivalent expressions:\n");
        for stats in self.map.values().filter(|s| all || s.use_count > 1) {
            let _ = writeln!(out, "  {}: useCount = {}", stats.expr, stats.use_count);
        }
        out
    }

    fn update_expr_in_map(expr: &Expr, map: &mut EquivalenceMap, use_count: i64) -> AnalyzerResult<bool> {
        if !expr.deterministic() {
            return Ok(false);
        }
        let wrapper = ExpressionEquals::new(expr.clone());
        match map.get_mut(&wrapper) {
            Some(stats) => {
                stats.use_count += use_count;
                match stats.use_count {
                    n if n > 0 => Ok(true),
                    0 => {
                        map.shift_remove(&wrapper);
                        Ok(false)
                    }
                    n => Err(AnalyzerError::InvalidUseCount { expr: expr.to_string(), count: n }),
                }
            }
            None if use_count > 0 => {
                map.insert(wrapper, ExpressionStats { expr: expr.clone(), use_count });
                Ok(false)
            }
            None => Err(AnalyzerError::InvalidUseCount { expr: expr.to_string(), count: use_count }),
        }
    }

    fn update_expr_tree(expr: &Expr, map: &mut EquivalenceMap, use_count: i64) -> AnalyzerResult<()> {
        if use_count == 0 || expr.is_leaf() {
            return Ok(());
        }
        if Self::update_expr_in_map(expr, map, use_count)? {
            return Ok(());
        }
        let uc = use_count.signum();
        for child in Self::children_to_recurse(expr) {
            Self::update_expr_tree(child, map, uc)?;
        }
        for group in Self::common_children_to_recurse(expr) {
            if group.len() > 1 {
                Self::update_common_exprs(&group, map, uc)?;
            }
        }
        Ok(())
    }

    /// Promote what is common to every member of `exprs` into `map`, tallest first.
    fn update_common_exprs(exprs: &[&Expr], map: &mut EquivalenceMap, use_count: i64) -> AnalyzerResult<()> {
        let Some((first, rest)) = exprs.split_first() else {
            return Ok(());
        };
        let mut local = EquivalenceMap::new();
        Self::update_expr_tree(first, &mut local, 1)?;
        for expr in rest {
            let mut other = EquivalenceMap::new();
            Self::update_expr_tree(expr, &mut other, 1)?;
            local.retain(|key, _| other.contains_key(key));
        }

        while let Some(stats) = Self::tallest(&local) {
            Self::update_expr_tree(&stats.expr, &mut local, -stats.use_count)?;
            Self::update_expr_tree(&stats.expr, map, use_count)?;
        }
        Ok(())
    }

    fn tallest(map: &EquivalenceMap) -> Option<ExpressionStats> {
        let mut best: Option<(&ExpressionEquals, &ExpressionStats)> = None;
        for (key, stats) in map {
            if best.is_none_or(|(b, _)| key.height > b.height) {
                best = Some((key, stats));
            }
        }
        best.map(|(_, stats)| stats.clone())
    }

    /// Children evaluated every time `expr` is.
    fn children_to_recurse(expr: &Expr) -> Vec<&Expr> {
        match expr {
            Expr::ScalarFunction(f) if f.fallback => Vec::new(),
            Expr::If { predicate, .. } => vec![predicate.as_ref()],
            Expr::CaseWhen { branches, .. } => branches.first().map(|(c, _)| vec![c]).unwrap_or_default(),
            Expr::Coalesce(children) => children.first().into_iter().collect(),
            other => other.children(),
        }
    }

    /// Groups of conditionally evaluated children; one of each group always runs.
    fn common_children_to_recurse(expr: &Expr) -> Vec<Vec<&Expr>> {
        match expr {
            Expr::ScalarFunction(f) if f.fallback => Vec::new(),
            Expr::If { true_value, false_value, .. } => vec![vec![true_value.as_ref(), false_value.as_ref()]],
            Expr::CaseWhen { branches, else_value } => {
                // a single condition is already covered by children_to_recurse
                let conditions = if branches.len() > 1 { branches.iter().map(|(c, _)| c).collect() } else { Vec::new() };
                // a value is only certain to run if the else branch has it too
                let values = match else_value {
                    Some(e) => branches.iter().map(|(_, v)| v).chain(std::iter::once(e.as_ref())).collect(),
                    None => Vec::new(),
                };
                vec![conditions, values]
            }
            Expr::Coalesce(children) if children.len() > 1 => vec![children.iter().collect()],
            _ => Vec::new(),
        }
    }
}
