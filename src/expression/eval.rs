use std::cmp::Ordering;

use uuid::Uuid;

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult},
    expression::{BinaryOp, Expr, UnaryOp, Value},
};

const BUILTINS: [&str; 7] = ["upper", "lower", "trim", "length", "abs", "concat", "uuid"];

/// Row-at-a-time interpreter over bound expressions.
pub struct Eval;

impl Eval {
    pub fn is_builtin(name: &str) -> bool {
        BUILTINS.iter().any(|b| b.eq_ignore_ascii_case(name))
    }

    pub fn eval_expr(expr: &Expr, row: &[Value]) -> AnalyzerResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::BoundReference(b) => row.get(b.ordinal).cloned().ok_or_else(|| {
                AnalyzerError::Other(format!("row of {} values has no ordinal {}", row.len(), b.ordinal))
            }),
            Expr::Attribute(a) => Err(AnalyzerError::UnboundAttribute(a.to_string())),
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedAlias(_) => Err(expr.unresolved_error("eval")),
            Expr::Alias(a) => Self::eval_expr(&a.child, row),
            Expr::Binary { op, left, right } => Self::eval_binary(*op, left, right, row),
            Expr::Unary { op, child } => {
                let v = Self::eval_expr(child, row)?;
                Ok(match (op, v) {
                    (UnaryOp::IsNull, v) => Value::Boolean(v.is_null()),
                    (UnaryOp::IsNotNull, v) => Value::Boolean(!v.is_null()),
                    (_, Value::Null) => Value::Null,
                    (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!b),
                    (UnaryOp::Negate, Value::Int(i)) => Value::Int(i.wrapping_neg()),
                    (UnaryOp::Negate, Value::Long(l)) => Value::Long(l.wrapping_neg()),
                    (UnaryOp::Negate, Value::Double(d)) => Value::from(-d.into_inner()),
                    (_, other) => return Err(Self::type_error(expr, &other)),
                })
            }
            Expr::If { .. } | Expr::CaseWhen { .. } | Expr::Coalesce(_) => {
                // branches may be narrower than the node's declared type
                let chosen = Self::eval_conditional(expr, row)?;
                Ok(chosen.cast_to(&expr.output_type()?))
            }
            Expr::GetStructField { child, ordinal, .. } => match Self::eval_expr(child, row)? {
                Value::Null => Ok(Value::Null),
                Value::Struct(fields) => Ok(fields.get(*ordinal).cloned().unwrap_or(Value::Null)),
                other => Err(Self::type_error(expr, &other)),
            },
            Expr::ScalarFunction(f) => {
                let args = f.args.iter().map(|a| Self::eval_expr(a, row)).collect::<AnalyzerResult<Vec<_>>>()?;
                Self::eval_function(&f.name, &args)
            }
        }
    }

    fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, row: &[Value]) -> AnalyzerResult<Value> {
        let l = Self::eval_expr(left, row)?;

        // three-valued logic, with short circuit on the deciding value
        if op.is_logical() {
            let short = op == BinaryOp::Or;
            if l == Value::Boolean(short) {
                return Ok(l);
            }
            let r = Self::eval_expr(right, row)?;
            return Ok(match (l, r) {
                (_, Value::Boolean(b)) if b == short => Value::Boolean(short),
                (Value::Null, _) | (_, Value::Null) => Value::Null,
                _ => Value::Boolean(!short),
            });
        }

        let r = Self::eval_expr(right, row)?;
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }

        if op.is_comparison() {
            let ord = l.sql_cmp(&r).ok_or_else(|| {
                AnalyzerError::Other(format!("cannot compare {l} with {r}"))
            })?;
            return Ok(Value::Boolean(match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }));
        }

        Self::eval_arithmetic(op, &l, &r)
    }

    fn eval_conditional(expr: &Expr, row: &[Value]) -> AnalyzerResult<Value> {
        match expr {
            Expr::If { predicate, true_value, false_value } => {
                if Self::eval_expr(predicate, row)? == Value::Boolean(true) {
                    Self::eval_expr(true_value, row)
                } else {
                    Self::eval_expr(false_value, row)
                }
            }
            Expr::CaseWhen { branches, else_value } => {
                for (cond, value) in branches {
                    if Self::eval_expr(cond, row)? == Value::Boolean(true) {
                        return Self::eval_expr(value, row);
                    }
                }
                match else_value {
                    Some(e) => Self::eval_expr(e, row),
                    None => Ok(Value::Null),
                }
            }
            Expr::Coalesce(children) => {
                for c in children {
                    let v = Self::eval_expr(c, row)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            _ => Self::eval_expr(expr, row),
        }
    }

    fn eval_arithmetic(op: BinaryOp, l: &Value, r: &Value) -> AnalyzerResult<Value> {
        let mismatch = || AnalyzerError::Other(format!("cannot apply '{}' to {l} and {r}", op.symbol()));

        if op == BinaryOp::Divide {
            let (x, y) = (l.as_f64().ok_or_else(mismatch)?, r.as_f64().ok_or_else(mismatch)?);
            return Ok(if y == 0.0 { Value::Null } else { Value::from(x / y) });
        }

        match (l, r) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
                BinaryOp::Add => x.wrapping_add(*y),
                BinaryOp::Subtract => x.wrapping_sub(*y),
                _ => x.wrapping_mul(*y),
            })),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                let (x, y) = (l.as_f64().ok_or_else(mismatch)?, r.as_f64().ok_or_else(mismatch)?);
                Ok(Value::from(match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Subtract => x - y,
                    _ => x * y,
                }))
            }
            _ => {
                let (x, y) = (l.as_i64().ok_or_else(mismatch)?, r.as_i64().ok_or_else(mismatch)?);
                Ok(Value::Long(match op {
                    BinaryOp::Add => x.wrapping_add(y),
                    BinaryOp::Subtract => x.wrapping_sub(y),
                    _ => x.wrapping_mul(y),
                }))
            }
        }
    }

    fn eval_function(name: &str, args: &[Value]) -> AnalyzerResult<Value> {
        let lname = name.to_ascii_lowercase();
        if lname != "concat" && args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        match (lname.as_str(), args) {
            ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
            ("lower", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
            ("trim", [Value::String(s)]) => Ok(Value::String(s.trim().to_string())),
            ("length", [Value::String(s)]) => Ok(Value::Int(s.chars().count() as i32)),
            ("abs", [Value::Int(i)]) => Ok(Value::Int(i.wrapping_abs())),
            ("abs", [Value::Long(l)]) => Ok(Value::Long(l.wrapping_abs())),
            ("abs", [Value::Double(d)]) => Ok(Value::from(d.into_inner().abs())),
            ("concat", args) => {
                if args.iter().any(Value::is_null) {
                    return Ok(Value::Null);
                }
                Ok(Value::String(args.iter().map(ToString::to_string).collect()))
            }
            ("uuid", []) => Ok(Value::String(Uuid::new_v4().to_string())),
            _ => Err(AnalyzerError::UnsupportedFunction(name.to_string())),
        }
    }

    fn type_error(expr: &Expr, value: &Value) -> AnalyzerError {
        AnalyzerError::Other(format!("unexpected value {value} while evaluating {expr}"))
    }
}

impl Expr {
    /// Evaluate against a positional row. Only bound trees can be evaluated.
    pub fn eval(&self, row: &[Value]) -> AnalyzerResult<Value> {
        Eval::eval_expr(self, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expression::{BoundReference, DataType, ScalarFunction},
        testing::fixtures::int_attr,
    };

    // --- helpers -------------------------------------------------------------

    fn bound(ordinal: usize, data_type: DataType) -> Expr {
        Expr::BoundReference(BoundReference { ordinal, data_type, nullable: true })
    }

    fn fun(name: &str, args: Vec<Expr>) -> Expr {
        Expr::function(ScalarFunction::new(name, args, DataType::String))
    }

    // --- evaluation ----------------------------------------------------------

    #[test]
    fn bound_references_read_row_slots() {
        let row = vec![Value::Int(4), Value::from("x")];
        let e = Expr::add(bound(0, DataType::Int), Expr::literal(1));
        assert_eq!(e.eval(&row).unwrap(), Value::Int(5));
        assert_eq!(bound(1, DataType::String).eval(&row).unwrap(), Value::from("x"));
        assert!(bound(2, DataType::Int).eval(&row).is_err());
    }

    #[test]
    fn arithmetic_widens_and_divide_by_zero_is_null() {
        let row = [];
        assert_eq!(Expr::add(Expr::literal(1), Expr::literal(2i64)).eval(&row).unwrap(), Value::Long(3));
        assert_eq!(Expr::multiply(Expr::literal(2), Expr::literal(1.5)).eval(&row).unwrap(), Value::from(3.0));
        let div = Expr::binary(BinaryOp::Divide, Expr::literal(1), Expr::literal(0));
        assert_eq!(div.eval(&row).unwrap(), Value::Null);
    }

    #[test]
    fn logic_is_three_valued() {
        let null = Expr::null(DataType::Boolean);
        let t = Expr::literal(true);
        let f = Expr::literal(false);
        let and = |l: &Expr, r: &Expr| Expr::binary(BinaryOp::And, l.clone(), r.clone()).eval(&[]).unwrap();
        let or = |l: &Expr, r: &Expr| Expr::binary(BinaryOp::Or, l.clone(), r.clone()).eval(&[]).unwrap();
        assert_eq!(and(&null, &f), Value::Boolean(false));
        assert_eq!(and(&null, &t), Value::Null);
        assert_eq!(or(&null, &t), Value::Boolean(true));
        assert_eq!(or(&null, &f), Value::Null);
        assert_eq!(or(&f, &f), Value::Boolean(false));
    }

    #[test]
    fn conditionals_pick_the_first_true_branch() {
        let row = [Value::Int(10)];
        let x = bound(0, DataType::Int);
        let cw = Expr::case_when(
            vec![
                (Expr::greater_than(x.clone(), Expr::literal(100)), Expr::literal("big")),
                (Expr::greater_than(x.clone(), Expr::literal(5)), Expr::literal("medium")),
            ],
            Some(Expr::literal("small")),
        );
        assert_eq!(cw.eval(&row).unwrap(), Value::from("medium"));
        let iff = Expr::if_else(Expr::null(DataType::Boolean), Expr::literal(1), Expr::literal(2));
        assert_eq!(iff.eval(&row).unwrap(), Value::Int(2));
        let co = Expr::Coalesce(vec![Expr::null(DataType::Int), x]);
        assert_eq!(co.eval(&row).unwrap(), Value::Int(10));
    }

    #[test]
    fn conditional_results_take_the_declared_type() {
        let iff = Expr::if_else(Expr::literal(true), Expr::literal(i32::MAX), Expr::literal(0i64));
        let sum = Expr::add(iff, Expr::literal(1));
        assert_eq!(sum.data_type().unwrap(), DataType::Long);
        assert_eq!(sum.eval(&[]).unwrap(), Value::Long(i64::from(i32::MAX) + 1));

        let cw = Expr::case_when(vec![(Expr::literal(true), Expr::literal(1))], Some(Expr::literal(2i64)));
        assert_eq!(cw.eval(&[]).unwrap(), Value::Long(1));
        let co = Expr::Coalesce(vec![Expr::null(DataType::Int), Expr::literal(2), Expr::literal(0.5)]);
        assert_eq!(co.eval(&[]).unwrap(), Value::from(2.0));
        let all_null = Expr::Coalesce(vec![Expr::null(DataType::Int), Expr::null(DataType::Long)]);
        assert_eq!(all_null.eval(&[]).unwrap(), Value::Null);
    }

    #[test]
    fn builtin_functions() {
        assert_eq!(fun("upper", vec![Expr::literal("aBc")]).eval(&[]).unwrap(), Value::from("ABC"));
        assert_eq!(fun("LENGTH", vec![Expr::literal("héllo")]).eval(&[]).unwrap(), Value::Int(5));
        assert_eq!(fun("concat", vec![Expr::literal("a"), Expr::literal(1)]).eval(&[]).unwrap(), Value::from("a1"));
        assert_eq!(fun("trim", vec![Expr::null(DataType::String)]).eval(&[]).unwrap(), Value::Null);
        assert!(matches!(fun("nope", vec![]).eval(&[]), Err(AnalyzerError::UnsupportedFunction(_))));
    }

    #[test]
    fn unbound_and_unresolved_trees_cannot_be_evaluated() {
        assert!(matches!(Expr::Attribute(int_attr("a")).eval(&[]), Err(AnalyzerError::UnboundAttribute(_))));
        assert!(matches!(
            Expr::unresolved(["a"]).eval(&[]),
            Err(AnalyzerError::Unresolved { operation: "eval", .. })
        ));
    }
}
