use crate::{
    analyzer::AnalyzerResult,
    executor::Rule,
    expression::{Expr, Transformed},
};

/// Evaluates literal-only subtrees at planning time.
pub struct ConstantFolding;

impl Rule<Expr> for ConstantFolding {
    fn name(&self) -> &str {
        "ConstantFolding"
    }

    fn apply(&self, expr: Expr) -> AnalyzerResult<Expr> {
        // bottom-up, so a foldable subtree already has literal children by the time its root is visited
        let folded = expr.transform_up(&mut |e| {
            let literal_children = e.children().iter().all(|c| matches!(c, Expr::Literal { .. }));
            if matches!(e, Expr::Literal { .. }) || !literal_children || !e.foldable_node() || !e.resolved() {
                return Ok(Transformed::no(e));
            }
            let data_type = e.data_type()?;
            let value = e.eval(&[])?.cast_to(&data_type);
            Ok(Transformed::yes(Expr::typed_literal(value, data_type)))
        })?;
        Ok(folded.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expression::{BinaryOp, DataType, ScalarFunction, Value},
        testing::fixtures::int_attr,
    };

    #[test]
    fn folds_literal_arithmetic_inside_larger_trees() {
        let a = Expr::Attribute(int_attr("a"));
        let e = Expr::add(a.clone(), Expr::multiply(Expr::literal(2), Expr::literal(3)));
        assert_eq!(ConstantFolding.apply(e).unwrap(), Expr::add(a, Expr::literal(6)));
    }

    #[test]
    fn keeps_declared_type_of_folded_value() {
        let div = Expr::binary(BinaryOp::Divide, Expr::literal(1), Expr::literal(0));
        assert_eq!(ConstantFolding.apply(div).unwrap(), Expr::typed_literal(Value::Null, DataType::Double));
    }

    #[test]
    fn folds_through_aliases_and_builtins() {
        let upper = Expr::function(ScalarFunction::new("upper", vec![Expr::literal("ab")], DataType::String));
        let folded = ConstantFolding.apply(Expr::alias(upper, "u")).unwrap();
        let Expr::Alias(alias) = folded else { panic!("expected alias") };
        assert_eq!(*alias.child, Expr::literal("AB"));
    }

    #[test]
    fn folded_conditional_is_widened_to_its_type() {
        let iff = Expr::if_else(Expr::literal(true), Expr::literal(i32::MAX), Expr::literal(0i64));
        let folded = ConstantFolding.apply(Expr::add(iff, Expr::literal(1))).unwrap();
        assert_eq!(folded, Expr::typed_literal(Value::Long(i64::from(i32::MAX) + 1), DataType::Long));
    }

    #[test]
    fn deep_literal_chain_folds_in_a_single_pass() {
        let chain = (0..300).fold(Expr::literal(0), |acc, _| Expr::add(acc, Expr::literal(1)));
        assert_eq!(ConstantFolding.apply(chain).unwrap(), Expr::literal(300));
    }

    #[test]
    fn subtrees_over_attributes_are_not_folded() {
        let a = Expr::Attribute(int_attr("a"));
        let e = Expr::multiply(Expr::add(a, Expr::literal(1)), Expr::literal(2));
        assert_eq!(ConstantFolding.apply(e.clone()).unwrap(), e);
    }

    #[test]
    fn leaves_non_deterministic_calls_alone() {
        let rand = Expr::function(ScalarFunction::new("uuid", vec![], DataType::String).non_deterministic());
        assert_eq!(ConstantFolding.apply(rand.clone()).unwrap(), rand);
    }
}
