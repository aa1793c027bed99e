use std::hash::{DefaultHasher, Hash, Hasher};

use crate::expression::Expr;

/// Map key comparing expressions by canonical form.
///
/// Canonical form, its hash and the height of the wrapped tree are computed
/// once at construction. Height doubles as a cheap reject before the full
/// comparison, and keeps a naming wrapper apart from the expression it names.
#[derive(Debug, Clone)]
pub struct ExpressionEquals {
    pub expr: Expr,
    pub height: usize,
    canonical: Expr,
    hash: u64,
}

impl ExpressionEquals {
    pub fn new(expr: Expr) -> Self {
        let canonical = expr.canonicalized();
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        Self { height: expr.height(), hash: hasher.finish(), expr, canonical }
    }

    pub fn canonical(&self) -> &Expr {
        &self.canonical
    }
}

impl PartialEq for ExpressionEquals {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height && self.hash == other.hash && self.canonical == other.canonical
    }
}

impl Eq for ExpressionEquals {}

impl Hash for ExpressionEquals {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Representative instance of an equivalence class and how often it is used.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStats {
    pub expr: Expr,
    pub use_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::int_attr;

    #[test]
    fn wrappers_compare_semantically() {
        let (a, b) = (Expr::Attribute(int_attr("a")), Expr::Attribute(int_attr("b")));
        let sum = Expr::add(a.clone(), b.clone());
        let x = ExpressionEquals::new(sum.clone());
        let y = ExpressionEquals::new(Expr::add(b, a.clone()));
        assert_eq!(x, y);
        assert_eq!(x.height, 2);

        let aliased = ExpressionEquals::new(Expr::alias(sum.clone(), "x"));
        assert_eq!(aliased.height, 3);
        assert_eq!(aliased.canonical(), x.canonical());
        assert_ne!(aliased, x);
        assert_ne!(ExpressionEquals::new(sum), ExpressionEquals::new(a));
    }
}
