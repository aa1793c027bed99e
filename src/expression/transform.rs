use crate::{analyzer::AnalyzerResult, expression::Expr};

/// Outcome of a rewrite: whether the tree was actually changed.
///
/// Rewrites hand back `Unchanged` with the original value when no rule fired,
/// so callers never have to compare trees to find out.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed<T> {
    Unchanged(T),
    Changed(T),
}

impl<T> Transformed<T> {
    pub fn new(data: T, changed: bool) -> Self {
        if changed { Transformed::Changed(data) } else { Transformed::Unchanged(data) }
    }

    pub fn yes(data: T) -> Self {
        Transformed::Changed(data)
    }

    pub fn no(data: T) -> Self {
        Transformed::Unchanged(data)
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Transformed::Changed(_))
    }

    pub fn data(&self) -> &T {
        match self {
            Transformed::Unchanged(d) | Transformed::Changed(d) => d,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Transformed::Unchanged(d) | Transformed::Changed(d) => d,
        }
    }

    /// Mark as changed if `changed` is set, otherwise keep the current tag.
    pub fn or_changed(self, changed: bool) -> Self {
        if changed { Transformed::Changed(self.into_inner()) } else { self }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transformed<U> {
        match self {
            Transformed::Unchanged(d) => Transformed::Unchanged(f(d)),
            Transformed::Changed(d) => Transformed::Changed(f(d)),
        }
    }
}

impl Expr {
    /// Pre-order rewrite: `f` sees a node before its (possibly rewritten) children.
    pub fn transform_down<F>(self, f: &mut F) -> AnalyzerResult<Transformed<Expr>>
    where
        F: FnMut(Expr) -> AnalyzerResult<Transformed<Expr>>,
    {
        let node = f(self)?;
        let changed = node.is_changed();
        let after = node.into_inner().map_children(|c| c.transform_down(&mut *f))?;
        Ok(after.or_changed(changed))
    }

    /// Post-order rewrite: children first, then `f` on the rebuilt node.
    pub fn transform_up<F>(self, f: &mut F) -> AnalyzerResult<Transformed<Expr>>
    where
        F: FnMut(Expr) -> AnalyzerResult<Transformed<Expr>>,
    {
        let after_children = self.map_children(|c| c.transform_up(&mut *f))?;
        let changed = after_children.is_changed();
        Ok(f(after_children.into_inner())?.or_changed(changed))
    }

    pub fn transform<F>(self, f: &mut F) -> AnalyzerResult<Transformed<Expr>>
    where
        F: FnMut(Expr) -> AnalyzerResult<Transformed<Expr>>,
    {
        self.transform_down(f)
    }

    /// Visit every node, parents before children.
    pub fn foreach(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        for child in self.children() {
            child.foreach(&mut *f);
        }
    }

    pub fn exists(&self, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.exists(&mut *pred))
    }

    /// Pre-order collection of everything `f` maps to `Some`.
    pub fn collect<T>(&self, f: &mut impl FnMut(&Expr) -> Option<T>) -> Vec<T> {
        let mut out = Vec::new();
        self.foreach(&mut |e| {
            if let Some(t) = f(e) {
                out.push(t);
            }
        });
        out
    }

    pub fn find(&self, pred: &mut impl FnMut(&Expr) -> bool) -> Option<&Expr> {
        if pred(self) {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(&mut *pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expression::Value, testing::fixtures::int_attr};

    fn bump_literals(e: Expr) -> AnalyzerResult<Transformed<Expr>> {
        Ok(match e {
            Expr::Literal { value: Value::Int(i), data_type } => {
                Transformed::yes(Expr::Literal { value: Value::Int(i + 1), data_type })
            }
            other => Transformed::no(other),
        })
    }

    #[test]
    fn untouched_tree_comes_back_unchanged_and_equal() {
        let e = Expr::add(Expr::Attribute(int_attr("a")), Expr::Attribute(int_attr("b")));
        let out = e.clone().transform_up(&mut bump_literals).unwrap();
        assert!(!out.is_changed());
        assert_eq!(out.into_inner(), e);
    }

    #[test]
    fn a_change_deep_in_the_tree_marks_the_root_changed() {
        let a = Expr::Attribute(int_attr("a"));
        let e = Expr::add(a.clone(), Expr::multiply(a.clone(), Expr::literal(1)));
        let out = e.transform_down(&mut bump_literals).unwrap();
        assert!(out.is_changed());
        assert_eq!(out.into_inner(), Expr::add(a.clone(), Expr::multiply(a, Expr::literal(2))));
    }

    #[test]
    fn transform_up_sees_rewritten_children() {
        // replace (1 + 1) by 2 bottom-up, then the parent sees literal children only
        let e = Expr::add(Expr::add(Expr::literal(1), Expr::literal(1)), Expr::literal(3));
        let mut parents_seen_with_literal_children = 0;
        let out = e
            .transform_up(&mut |e| {
                if let Expr::Binary { left, right, .. } = &e {
                    if matches!(**left, Expr::Literal { .. }) && matches!(**right, Expr::Literal { .. }) {
                        parents_seen_with_literal_children += 1;
                        return Ok(Transformed::yes(Expr::literal(0)));
                    }
                }
                Ok(Transformed::no(e))
            })
            .unwrap();
        assert_eq!(parents_seen_with_literal_children, 2);
        assert_eq!(out.into_inner(), Expr::literal(0));
    }

    #[test]
    fn errors_abort_the_rewrite() {
        let e = Expr::add(Expr::literal(1), Expr::literal(2));
        let out = e.transform_up(&mut |e| match e {
            Expr::Literal { .. } => Err(crate::analyzer::AnalyzerError::Other("boom".into())),
            other => Ok(Transformed::no(other)),
        });
        assert!(out.is_err());
    }

    #[test]
    fn collect_and_find_walk_pre_order() {
        let e = Expr::add(Expr::literal(1), Expr::multiply(Expr::literal(2), Expr::literal(3)));
        let ints = e.collect(&mut |e| match e {
            Expr::Literal { value: Value::Int(i), .. } => Some(*i),
            _ => None,
        });
        assert_eq!(ints, vec![1, 2, 3]);
        assert!(e.exists(&mut |e| matches!(e, Expr::Binary { .. })));
        assert_eq!(e.find(&mut |e| matches!(e, Expr::Literal { .. })), Some(&Expr::literal(1)));
    }
}
