use std::collections::HashSet;

use crate::expression::Expr;

/// A set of expressions where membership is decided by canonical form.
///
/// Iteration yields the first-seen instance of every member, in insertion
/// order. Non-deterministic expressions bypass the canonical set: each added
/// instance is kept, even if an equal one is already there.
#[derive(Debug, Clone, Default)]
pub struct ExpressionSet {
    base_set: HashSet<Expr>,
    originals: Vec<Expr>,
}

impl ExpressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: Expr) {
        if !expr.deterministic() {
            self.originals.push(expr);
        } else if self.base_set.insert(expr.canonicalized()) {
            self.originals.push(expr);
        }
    }

    /// Remove every semantically equal member; non-deterministic members only
    /// go when structurally equal.
    pub fn remove(&mut self, expr: &Expr) {
        if expr.deterministic() {
            let canonical = expr.canonicalized();
            if self.base_set.remove(&canonical) {
                self.originals.retain(|o| !(o.deterministic() && o.canonicalized() == canonical));
            }
        } else {
            self.originals.retain(|o| o != expr);
        }
    }

    /// Non-deterministic expressions are never contained.
    pub fn contains(&self, expr: &Expr) -> bool {
        expr.deterministic() && self.base_set.contains(&expr.canonicalized())
    }

    pub fn union(&self, other: &ExpressionSet) -> ExpressionSet {
        let mut out = self.clone();
        for e in other.iter() {
            out.add(e.clone());
        }
        out
    }

    pub fn difference(&self, other: &ExpressionSet) -> ExpressionSet {
        let mut out = self.clone();
        for e in other.iter() {
            out.remove(e);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.originals.iter()
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn to_debug_string(&self) -> String {
        let base: Vec<String> = self.base_set.iter().map(ToString::to_string).collect();
        let originals: Vec<String> = self.originals.iter().map(ToString::to_string).collect();
        format!("baseSet: {}\noriginals: {}", base.join(", "), originals.join(", "))
    }
}

impl PartialEq for ExpressionSet {
    fn eq(&self, other: &Self) -> bool {
        self.base_set == other.base_set
    }
}

impl FromIterator<Expr> for ExpressionSet {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        let mut set = ExpressionSet::new();
        for e in iter {
            set.add(e);
        }
        set
    }
}

impl IntoIterator for ExpressionSet {
    type Item = Expr;
    type IntoIter = std::vec::IntoIter<Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.originals.into_iter()
    }
}
