use std::hash::{DefaultHasher, Hash, Hasher};

use once_cell::sync::Lazy;
use tracing::error;

use crate::{
    analyzer::AnalyzerResult,
    executor::{Batch, FnRule, RuleExecutor, Strategy},
    expression::{AttributeReference, BinaryOp, Expr, Transformed},
};

const CLEAN_EXPRESSIONS: &str = "CleanExpressions";

static CANONICALIZER: Lazy<Canonicalizer> = Lazy::new(Canonicalizer::new);

/// Rewrites an expression into its canonical form.
///
/// Cosmetic differences are removed: naming wrappers, attribute names and
/// qualifiers, field names of struct extractions, and the operand order of
/// commutative operators and flipped comparisons.
pub struct Canonicalizer {
    batches: Vec<Batch<Expr>>,
}

impl Canonicalizer {
    fn new() -> Self {
        let clean = FnRule::boxed(CLEAN_EXPRESSIONS, |e: Expr| Ok(clean_expression(e)?.into_inner()));
        Self { batches: vec![Batch::new(CLEAN_EXPRESSIONS, Strategy::fixed_point(20), vec![clean])] }
    }

    pub fn canonicalize(expr: Expr) -> AnalyzerResult<Expr> {
        CANONICALIZER.execute(expr)
    }
}

impl RuleExecutor<Expr> for Canonicalizer {
    fn name(&self) -> &str {
        "Canonicalizer"
    }

    fn batches(&self) -> &[Batch<Expr>] {
        &self.batches
    }
}

fn hash_of(e: &Expr) -> u64 {
    let mut h = DefaultHasher::new();
    e.hash(&mut h);
    h.finish()
}

fn normalize_attribute(a: &AttributeReference) -> AttributeReference {
    AttributeReference::with_id("none", a.data_type.clone(), true, a.expr_id)
}

/// Operands of a chain of the same commutative operator, left to right.
fn gather_operands(op: BinaryOp, e: Expr, out: &mut Vec<Expr>) {
    match e {
        Expr::Binary { op: inner, left, right } if inner == op => {
            gather_operands(op, *left, out);
            gather_operands(op, *right, out);
        }
        other => out.push(other),
    }
}

fn reorder_commutative(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let mut operands = Vec::new();
    gather_operands(op, left, &mut operands);
    gather_operands(op, right, &mut operands);
    operands.sort_by_cached_key(hash_of);

    let mut iter = operands.into_iter();
    // a chain always has at least two operands
    let first = iter.next().unwrap_or_else(|| Expr::literal(false));
    iter.fold(first, |acc, e| Expr::binary(op, acc, e))
}

fn flipped(op: BinaryOp) -> Option<BinaryOp> {
    match op {
        BinaryOp::Gt => Some(BinaryOp::Lt),
        BinaryOp::Lt => Some(BinaryOp::Gt),
        BinaryOp::GtEq => Some(BinaryOp::LtEq),
        BinaryOp::LtEq => Some(BinaryOp::GtEq),
        BinaryOp::Eq | BinaryOp::NotEq => Some(op),
        _ => None,
    }
}

fn clean_expression(expr: Expr) -> AnalyzerResult<Transformed<Expr>> {
    expr.transform_up(&mut |node| {
        let original = node.clone();
        let cleaned = match node {
            Expr::Alias(a) => *a.child,
            Expr::UnresolvedAlias(child) => *child,
            Expr::Attribute(a) => Expr::Attribute(normalize_attribute(&a)),
            Expr::GetStructField { child, ordinal, .. } => Expr::GetStructField { child, ordinal, name: None },
            Expr::Binary { op, left, right } => match op {
                BinaryOp::Add | BinaryOp::Multiply => reorder_commutative(op, *left, *right),
                BinaryOp::And | BinaryOp::Or if left.deterministic() && right.deterministic() => {
                    reorder_commutative(op, *left, *right)
                }
                _ => match flipped(op) {
                    Some(flip) if hash_of(&left) > hash_of(&right) => Expr::binary(flip, *right, *left),
                    _ => Expr::Binary { op, left, right },
                },
            },
            other => other,
        };
        let changed = cleaned != original;
        Ok(Transformed::new(cleaned, changed))
    })
}

impl Expr {
    /// Canonical form used for semantic comparison.
    pub fn canonicalized(&self) -> Expr {
        match Canonicalizer::canonicalize(self.clone()) {
            Ok(e) => e,
            Err(err) => {
                error!(expr = %self, error = %err, "canonicalization failed");
                self.clone()
            }
        }
    }

    /// Same computation, cosmetics aside. Never true for non-deterministic trees.
    pub fn semantic_equals(&self, other: &Expr) -> bool {
        self.deterministic() && other.deterministic() && self.canonicalized() == other.canonicalized()
    }

    pub fn semantic_hash(&self) -> u64 {
        hash_of(&self.canonicalized())
    }
}
