use std::fmt::{self, Display};

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult, AttributeSet},
    expression::{Alias, AttributeReference, BoundReference, DataType, Eval, Transformed, UnresolvedAttribute, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Operand order does not change the result.
    pub fn is_commutative(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Multiply | BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

/// A named function call.
///
/// `fallback` marks functions evaluated through a single opaque call: their
/// arguments are never treated as independently computed subexpressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarFunction {
    pub name: String,
    pub args: Vec<Expr>,
    pub return_type: DataType,
    pub deterministic: bool,
    pub fallback: bool,
}

impl ScalarFunction {
    pub fn new(name: impl Into<String>, args: Vec<Expr>, return_type: DataType) -> Self {
        Self { name: name.into(), args, return_type, deterministic: true, fallback: false }
    }

    pub fn non_deterministic(mut self) -> Self {
        self.deterministic = false;
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

/// Expression tree node.
///
/// Derived `PartialEq`/`Hash` are structural: every field, ids included, takes
/// part. Use [`Expr::semantic_equals`] to compare computations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal { value: Value, data_type: DataType },
    Attribute(AttributeReference),
    UnresolvedAttribute(UnresolvedAttribute),
    BoundReference(BoundReference),
    Alias(Alias),
    /// Wrapper awaiting a name, e.g. an un-aliased projection item
    UnresolvedAlias(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, child: Box<Expr> },
    If { predicate: Box<Expr>, true_value: Box<Expr>, false_value: Box<Expr> },
    CaseWhen { branches: Vec<(Expr, Expr)>, else_value: Option<Box<Expr>> },
    Coalesce(Vec<Expr>),
    GetStructField { child: Box<Expr>, ordinal: usize, name: Option<String> },
    ScalarFunction(ScalarFunction),
}

impl Expr {
    // --- constructors --------------------------------------------------------

    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let data_type = match &value {
            Value::Null => DataType::Null,
            Value::Boolean(_) => DataType::Boolean,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::Struct(_) => DataType::Struct(Vec::new()),
        };
        Expr::Literal { value, data_type }
    }

    pub fn typed_literal(value: Value, data_type: DataType) -> Self {
        Expr::Literal { value, data_type }
    }

    pub fn null(data_type: DataType) -> Self {
        Expr::Literal { value: Value::Null, data_type }
    }

    pub fn unresolved<S: Into<String>>(name_parts: impl IntoIterator<Item = S>) -> Self {
        Expr::UnresolvedAttribute(UnresolvedAttribute::new(name_parts))
    }

    pub fn alias(child: Expr, name: impl Into<String>) -> Self {
        Expr::Alias(Alias::new(child, name))
    }

    pub fn unresolved_alias(child: Expr) -> Self {
        Expr::UnresolvedAlias(Box::new(child))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn multiply(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Multiply, left, right)
    }

    pub fn equal_to(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn greater_than(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    pub fn unary(op: UnaryOp, child: Expr) -> Self {
        Expr::Unary { op, child: Box::new(child) }
    }

    pub fn if_else(predicate: Expr, true_value: Expr, false_value: Expr) -> Self {
        Expr::If {
            predicate: Box::new(predicate),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        }
    }

    pub fn case_when(branches: Vec<(Expr, Expr)>, else_value: Option<Expr>) -> Self {
        Expr::CaseWhen { branches, else_value: else_value.map(Box::new) }
    }

    pub fn function(f: ScalarFunction) -> Self {
        Expr::ScalarFunction(f)
    }

    // --- tree shape ----------------------------------------------------------

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal { .. }
            | Expr::Attribute(_)
            | Expr::UnresolvedAttribute(_)
            | Expr::BoundReference(_) => vec![],
            Expr::Alias(a) => vec![a.child.as_ref()],
            Expr::UnresolvedAlias(child) => vec![child.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Unary { child, .. } => vec![child.as_ref()],
            Expr::If { predicate, true_value, false_value } => {
                vec![predicate.as_ref(), true_value.as_ref(), false_value.as_ref()]
            }
            Expr::CaseWhen { branches, else_value } => branches
                .iter()
                .flat_map(|(c, v)| [c, v])
                .chain(else_value.as_deref())
                .collect(),
            Expr::Coalesce(children) => children.iter().collect(),
            Expr::GetStructField { child, .. } => vec![child.as_ref()],
            Expr::ScalarFunction(f) => f.args.iter().collect(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Literal { .. } | Expr::Attribute(_) | Expr::UnresolvedAttribute(_) | Expr::BoundReference(_)
        )
    }

    /// Rebuild this node over `f` applied to each child, keeping every other field.
    ///
    /// The result is `Unchanged` only if no child changed.
    pub fn map_children<F>(self, mut f: F) -> AnalyzerResult<Transformed<Expr>>
    where
        F: FnMut(Expr) -> AnalyzerResult<Transformed<Expr>>,
    {
        let mut changed = false;
        let mut visit = |e: Expr| -> AnalyzerResult<Expr> {
            let t = f(e)?;
            changed |= t.is_changed();
            Ok(t.into_inner())
        };

        let rebuilt = match self {
            leaf @ (Expr::Literal { .. }
            | Expr::Attribute(_)
            | Expr::UnresolvedAttribute(_)
            | Expr::BoundReference(_)) => return Ok(Transformed::no(leaf)),
            Expr::Alias(Alias { child, name, expr_id, qualifier }) => Expr::Alias(Alias {
                child: Box::new(visit(*child)?),
                name,
                expr_id,
                qualifier,
            }),
            Expr::UnresolvedAlias(child) => Expr::UnresolvedAlias(Box::new(visit(*child)?)),
            Expr::Binary { op, left, right } => {
                let left = visit(*left)?;
                let right = visit(*right)?;
                Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
            }
            Expr::Unary { op, child } => Expr::Unary { op, child: Box::new(visit(*child)?) },
            Expr::If { predicate, true_value, false_value } => {
                let predicate = visit(*predicate)?;
                let true_value = visit(*true_value)?;
                let false_value = visit(*false_value)?;
                Expr::if_else(predicate, true_value, false_value)
            }
            Expr::CaseWhen { branches, else_value } => {
                let mut new_branches = Vec::with_capacity(branches.len());
                for (cond, value) in branches {
                    let cond = visit(cond)?;
                    let value = visit(value)?;
                    new_branches.push((cond, value));
                }
                let else_value = match else_value {
                    Some(e) => Some(Box::new(visit(*e)?)),
                    None => None,
                };
                Expr::CaseWhen { branches: new_branches, else_value }
            }
            Expr::Coalesce(children) => {
                Expr::Coalesce(children.into_iter().map(&mut visit).collect::<AnalyzerResult<_>>()?)
            }
            Expr::GetStructField { child, ordinal, name } => {
                Expr::GetStructField { child: Box::new(visit(*child)?), ordinal, name }
            }
            Expr::ScalarFunction(ScalarFunction { name, args, return_type, deterministic, fallback }) => {
                let args = args.into_iter().map(&mut visit).collect::<AnalyzerResult<_>>()?;
                Expr::ScalarFunction(ScalarFunction { name, args, return_type, deterministic, fallback })
            }
        };

        Ok(Transformed::new(rebuilt, changed))
    }

    /// Substitute `children` (same arity and order as [`Expr::children`]) into this node.
    pub fn with_new_children(self, children: Vec<Expr>) -> AnalyzerResult<Expr> {
        let expected = self.children().len();
        if children.len() != expected {
            return Err(AnalyzerError::ChildrenArity { expr: self.to_string(), expected, got: children.len() });
        }
        let mut replacements = children.into_iter();
        let rebuilt = self.map_children(|old| {
            Ok(match replacements.next() {
                Some(new) if new == old => Transformed::no(old),
                Some(new) => Transformed::yes(new),
                None => Transformed::no(old),
            })
        })?;
        Ok(rebuilt.into_inner())
    }

    /// Longest root-to-leaf path; leaves have height 1.
    pub fn height(&self) -> usize {
        1 + self.children().iter().map(|c| c.height()).max().unwrap_or(0)
    }

    /// Every attribute referenced anywhere in this tree.
    pub fn references(&self) -> AttributeSet {
        let mut set = AttributeSet::new();
        self.foreach(&mut |e| {
            if let Expr::Attribute(a) = e {
                set.insert(a.clone());
            }
        });
        set
    }

    // --- properties ----------------------------------------------------------

    /// True iff this node and every descendant produce the same output for the same input.
    pub fn deterministic(&self) -> bool {
        match self {
            Expr::ScalarFunction(f) if !f.deterministic => false,
            _ => self.children().iter().all(|c| c.deterministic()),
        }
    }

    /// True if the node can be evaluated once at planning time.
    pub fn foldable(&self) -> bool {
        self.foldable_node() && self.children().iter().all(|c| c.foldable())
    }

    /// Foldability of this node alone, assuming foldable children.
    pub(crate) fn foldable_node(&self) -> bool {
        match self {
            Expr::Literal { .. } => true,
            Expr::Attribute(_)
            | Expr::UnresolvedAttribute(_)
            | Expr::BoundReference(_)
            | Expr::Alias(_)
            | Expr::UnresolvedAlias(_) => false,
            Expr::ScalarFunction(f) => f.deterministic && !f.fallback && Eval::is_builtin(&f.name),
            _ => true,
        }
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// True iff every child is resolved and this node's own input types check out.
    pub fn resolved(&self) -> bool {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedAlias(_) => false,
            _ => self.children_resolved() && self.check_input_data_types().is_ok(),
        }
    }

    pub fn data_type(&self) -> AnalyzerResult<DataType> {
        if !self.resolved() {
            return Err(self.unresolved_error("dataType"));
        }
        self.output_type()
    }

    pub fn nullable(&self) -> AnalyzerResult<bool> {
        if !self.resolved() {
            return Err(self.unresolved_error("nullable"));
        }
        self.output_nullable()
    }

    pub(crate) fn unresolved_error(&self, operation: &'static str) -> AnalyzerError {
        AnalyzerError::Unresolved { operation, expr: self.to_string() }
    }

    fn mismatch(&self, message: impl Into<String>) -> AnalyzerError {
        AnalyzerError::DataTypeMismatch { expr: self.sql(), message: message.into() }
    }

    /// Type-check this node against its children's output types.
    pub fn check_input_data_types(&self) -> AnalyzerResult<()> {
        match self {
            Expr::Binary { op, left, right } => {
                let (l, r) = (left.output_type()?, right.output_type()?);
                if op.is_arithmetic() {
                    if !(l.is_numeric() || l == DataType::Null) || !(r.is_numeric() || r == DataType::Null) {
                        return Err(self.mismatch(format!("'{}' requires numeric operands, not {l} and {r}", op.symbol())));
                    }
                } else if op.is_logical() {
                    for t in [&l, &r] {
                        if !matches!(t, DataType::Boolean | DataType::Null) {
                            return Err(self.mismatch(format!("'{}' requires boolean operands, not {t}", op.symbol())));
                        }
                    }
                } else if DataType::wider(&l, &r).is_none() {
                    return Err(self.mismatch(format!("cannot compare {l} with {r}")));
                }
                Ok(())
            }
            Expr::Unary { op, child } => {
                let t = child.output_type()?;
                match op {
                    UnaryOp::Not if !matches!(t, DataType::Boolean | DataType::Null) => {
                        Err(self.mismatch(format!("NOT requires a boolean operand, not {t}")))
                    }
                    UnaryOp::Negate if !(t.is_numeric() || t == DataType::Null) => {
                        Err(self.mismatch(format!("negation requires a numeric operand, not {t}")))
                    }
                    _ => Ok(()),
                }
            }
            Expr::If { predicate, true_value, false_value } => {
                let p = predicate.output_type()?;
                if !matches!(p, DataType::Boolean | DataType::Null) {
                    return Err(self.mismatch(format!("IF predicate must be boolean, not {p}")));
                }
                let (t, f) = (true_value.output_type()?, false_value.output_type()?);
                DataType::wider(&t, &f)
                    .map(|_| ())
                    .ok_or_else(|| self.mismatch(format!("IF branches differ in type: {t} and {f}")))
            }
            Expr::CaseWhen { branches, else_value } => {
                if branches.is_empty() {
                    return Err(self.mismatch("CASE requires at least one branch"));
                }
                for (cond, _) in branches {
                    let c = cond.output_type()?;
                    if !matches!(c, DataType::Boolean | DataType::Null) {
                        return Err(self.mismatch(format!("WHEN condition must be boolean, not {c}")));
                    }
                }
                self.case_value_type().map(|_| ())
            }
            Expr::Coalesce(children) => {
                if children.is_empty() {
                    return Err(self.mismatch("coalesce requires at least one argument"));
                }
                let types = children.iter().map(|c| c.output_type()).collect::<AnalyzerResult<Vec<_>>>()?;
                DataType::wider_all(types.iter())
                    .map(|_| ())
                    .ok_or_else(|| self.mismatch("coalesce arguments have no common type"))
            }
            Expr::GetStructField { child, ordinal, .. } => match child.output_type()? {
                DataType::Struct(fields) if *ordinal < fields.len() => Ok(()),
                DataType::Struct(fields) => {
                    Err(self.mismatch(format!("field ordinal {ordinal} out of range for {} fields", fields.len())))
                }
                other => Err(self.mismatch(format!("field access requires a struct, not {other}"))),
            },
            _ => Ok(()),
        }
    }

    fn case_value_type(&self) -> AnalyzerResult<DataType> {
        let Expr::CaseWhen { branches, else_value } = self else {
            return self.output_type();
        };
        let mut types = Vec::with_capacity(branches.len() + 1);
        for (_, value) in branches {
            types.push(value.output_type()?);
        }
        if let Some(e) = else_value {
            types.push(e.output_type()?);
        }
        DataType::wider_all(types.iter()).ok_or_else(|| self.mismatch("CASE branches have no common type"))
    }

    /// Output type assuming the tree is resolved; type-check failures still surface as errors.
    pub(crate) fn output_type(&self) -> AnalyzerResult<DataType> {
        match self {
            Expr::Literal { data_type, .. } => Ok(data_type.clone()),
            Expr::Attribute(a) => Ok(a.data_type.clone()),
            Expr::BoundReference(b) => Ok(b.data_type.clone()),
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedAlias(_) => Err(self.unresolved_error("dataType")),
            Expr::Alias(a) => a.child.output_type(),
            Expr::Binary { op, left, right } => {
                if op.is_arithmetic() {
                    if *op == BinaryOp::Divide {
                        return Ok(DataType::Double);
                    }
                    let (l, r) = (left.output_type()?, right.output_type()?);
                    DataType::wider(&l, &r).ok_or_else(|| self.mismatch(format!("no common type for {l} and {r}")))
                } else {
                    Ok(DataType::Boolean)
                }
            }
            Expr::Unary { op: UnaryOp::Negate, child } => child.output_type(),
            Expr::Unary { .. } => Ok(DataType::Boolean),
            Expr::If { true_value, false_value, .. } => {
                let (t, f) = (true_value.output_type()?, false_value.output_type()?);
                DataType::wider(&t, &f).ok_or_else(|| self.mismatch(format!("IF branches differ in type: {t} and {f}")))
            }
            Expr::CaseWhen { .. } => self.case_value_type(),
            Expr::Coalesce(children) => {
                let types = children.iter().map(|c| c.output_type()).collect::<AnalyzerResult<Vec<_>>>()?;
                DataType::wider_all(types.iter()).ok_or_else(|| self.mismatch("coalesce arguments have no common type"))
            }
            Expr::GetStructField { child, ordinal, .. } => match child.output_type()? {
                DataType::Struct(fields) => fields
                    .get(*ordinal)
                    .map(|f| f.data_type.clone())
                    .ok_or_else(|| self.mismatch(format!("field ordinal {ordinal} out of range"))),
                other => Err(self.mismatch(format!("field access requires a struct, not {other}"))),
            },
            Expr::ScalarFunction(f) => Ok(f.return_type.clone()),
        }
    }

    fn output_nullable(&self) -> AnalyzerResult<bool> {
        Ok(match self {
            Expr::Literal { value, .. } => value.is_null(),
            Expr::Attribute(a) => a.nullable,
            Expr::BoundReference(b) => b.nullable,
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedAlias(_) => {
                return Err(self.unresolved_error("nullable"));
            }
            Expr::Alias(a) => a.child.output_nullable()?,
            Expr::Binary { op: BinaryOp::Divide, .. } => true,
            Expr::Binary { left, right, .. } => left.output_nullable()? || right.output_nullable()?,
            Expr::Unary { op: UnaryOp::IsNull | UnaryOp::IsNotNull, .. } => false,
            Expr::Unary { child, .. } => child.output_nullable()?,
            Expr::If { true_value, false_value, .. } => {
                true_value.output_nullable()? || false_value.output_nullable()?
            }
            Expr::CaseWhen { branches, else_value } => match else_value {
                None => true,
                Some(e) => {
                    let mut nullable = e.output_nullable()?;
                    for (_, v) in branches {
                        nullable |= v.output_nullable()?;
                    }
                    nullable
                }
            },
            Expr::Coalesce(children) => {
                let mut nullable = true;
                for c in children {
                    nullable &= c.output_nullable()?;
                }
                nullable
            }
            Expr::GetStructField { child, ordinal, .. } => {
                let field_nullable = match child.output_type()? {
                    DataType::Struct(fields) => fields.get(*ordinal).map(|f| f.nullable).unwrap_or(true),
                    _ => true,
                };
                child.output_nullable()? || field_nullable
            }
            Expr::ScalarFunction(f) => {
                let mut nullable = false;
                for a in &f.args {
                    nullable |= a.output_nullable()?;
                }
                nullable
            }
        })
    }

    // --- rendering -----------------------------------------------------------

    /// SQL-like text without expression ids, used to name un-aliased expressions.
    pub fn sql(&self) -> String {
        Sql(self).to_string()
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, with_ids: bool) -> fmt::Result {
        let child = |e: &Expr| if with_ids { e.to_string() } else { e.sql() };
        match self {
            Expr::Literal { value: Value::String(s), .. } if !with_ids => write!(f, "'{s}'"),
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::Attribute(a) if with_ids => write!(f, "{a}"),
            Expr::Attribute(a) => write!(f, "{}", a.qualified_name()),
            Expr::UnresolvedAttribute(u) => write!(f, "{u}"),
            Expr::BoundReference(b) => write!(f, "{b}"),
            Expr::Alias(a) if with_ids => write!(f, "{} AS {}#{}", child(&a.child), a.name, a.expr_id),
            Expr::Alias(a) => write!(f, "{} AS {}", child(&a.child), a.name),
            Expr::UnresolvedAlias(c) => write!(f, "unresolvedalias({})", child(c)),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", child(left), op.symbol(), child(right)),
            Expr::Unary { op, child: c } => match op {
                UnaryOp::Not => write!(f, "(NOT {})", child(c)),
                UnaryOp::Negate => write!(f, "(- {})", child(c)),
                UnaryOp::IsNull => write!(f, "({} IS NULL)", child(c)),
                UnaryOp::IsNotNull => write!(f, "({} IS NOT NULL)", child(c)),
            },
            Expr::If { predicate, true_value, false_value } => {
                write!(f, "(IF({}, {}, {}))", child(predicate), child(true_value), child(false_value))
            }
            Expr::CaseWhen { branches, else_value } => {
                write!(f, "CASE")?;
                for (c, v) in branches {
                    write!(f, " WHEN {} THEN {}", child(c), child(v))?;
                }
                if let Some(e) = else_value {
                    write!(f, " ELSE {}", child(e))?;
                }
                write!(f, " END")
            }
            Expr::Coalesce(children) => {
                let args: Vec<String> = children.iter().map(child).collect();
                write!(f, "coalesce({})", args.join(", "))
            }
            Expr::GetStructField { child: c, ordinal, name } => match name {
                Some(n) => write!(f, "{}.{}", child(c), n),
                None => write!(f, "{}.col{}", child(c), ordinal),
            },
            Expr::ScalarFunction(func) => {
                let args: Vec<String> = func.args.iter().map(child).collect();
                write!(f, "{}({})", func.name, args.join(", "))
            }
        }
    }
}

struct Sql<'a>(&'a Expr);

impl Display for Sql<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f, false)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expression::StructField, testing::fixtures::{attr, int_attr}};

    // --- helpers -------------------------------------------------------------

    fn person() -> DataType {
        DataType::Struct(vec![
            StructField::new("name", DataType::String, false),
            StructField::new("age", DataType::Int, true),
        ])
    }

    // --- shape ---------------------------------------------------------------

    #[test]
    fn case_when_children_are_flattened_in_order() {
        let c1 = Expr::literal(true);
        let v1 = Expr::literal(1);
        let e = Expr::literal(2);
        let cw = Expr::case_when(vec![(c1.clone(), v1.clone())], Some(e.clone()));
        assert_eq!(cw.children(), vec![&c1, &v1, &e]);
    }

    #[test]
    fn with_new_children_keeps_non_child_fields() {
        let a = int_attr("a");
        let alias = Expr::alias(Expr::Attribute(a.clone()), "x");
        let Expr::Alias(original) = &alias else { panic!() };
        let (name, id) = (original.name.clone(), original.expr_id);

        let rebuilt = alias.clone().with_new_children(vec![Expr::literal(5)]).unwrap();
        match rebuilt {
            Expr::Alias(al) => {
                assert_eq!(al.name, name);
                assert_eq!(al.expr_id, id);
                assert_eq!(*al.child, Expr::literal(5));
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn with_new_children_rejects_wrong_arity() {
        let e = Expr::add(Expr::literal(1), Expr::literal(2));
        let err = e.with_new_children(vec![Expr::literal(1)]).unwrap_err();
        assert!(matches!(err, AnalyzerError::ChildrenArity { expected: 2, got: 1, .. }));
    }

    #[test]
    fn height_counts_levels() {
        let a = Expr::Attribute(int_attr("a"));
        assert_eq!(a.height(), 1);
        let e = Expr::multiply(Expr::add(a.clone(), Expr::literal(1)), a);
        assert_eq!(e.height(), 3);
    }

    #[test]
    fn references_collect_attributes_by_id() {
        let a = int_attr("a");
        let b = int_attr("b");
        let e = Expr::add(Expr::Attribute(a.clone()), Expr::multiply(Expr::Attribute(b.clone()), Expr::Attribute(a.clone())));
        let refs = e.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&a));
        assert!(refs.contains(&b));
    }

    // --- properties ----------------------------------------------------------

    #[test]
    fn determinism_propagates_from_leaves() {
        let uuid = Expr::function(ScalarFunction::new("uuid", vec![], DataType::String).non_deterministic());
        let e = Expr::binary(BinaryOp::Eq, uuid, Expr::literal("x"));
        assert!(!e.deterministic());
        assert!(Expr::add(Expr::literal(1), Expr::Attribute(int_attr("a"))).deterministic());
    }

    #[test]
    fn unresolved_nodes_refuse_type_questions() {
        let e = Expr::add(Expr::unresolved(["a"]), Expr::literal(1));
        assert!(!e.resolved());
        assert!(matches!(e.data_type(), Err(AnalyzerError::Unresolved { operation: "dataType", .. })));
        assert!(matches!(e.nullable(), Err(AnalyzerError::Unresolved { operation: "nullable", .. })));
    }

    #[test]
    fn type_mismatch_leaves_node_unresolved() {
        let e = Expr::add(Expr::Attribute(attr("s", DataType::String, false)), Expr::literal(1));
        assert!(e.children_resolved());
        assert!(!e.resolved());
        assert!(matches!(e.check_input_data_types(), Err(AnalyzerError::DataTypeMismatch { .. })));
        assert!(e.data_type().is_err());
    }

    #[test]
    fn arithmetic_widens_and_divide_is_double() {
        let i = Expr::Attribute(int_attr("i"));
        let l = Expr::Attribute(attr("l", DataType::Long, true));
        assert_eq!(Expr::add(i.clone(), l.clone()).data_type().unwrap(), DataType::Long);
        assert!(Expr::add(i.clone(), l).nullable().unwrap());
        assert_eq!(Expr::binary(BinaryOp::Divide, i.clone(), i).data_type().unwrap(), DataType::Double);
    }

    #[test]
    fn struct_field_type_and_nullability() {
        let p = Expr::Attribute(attr("p", person(), false));
        let age = Expr::GetStructField { child: Box::new(p.clone()), ordinal: 1, name: Some("age".into()) };
        assert_eq!(age.data_type().unwrap(), DataType::Int);
        assert!(age.nullable().unwrap());
        let bad = Expr::GetStructField { child: Box::new(p), ordinal: 7, name: None };
        assert!(!bad.resolved());
    }

    #[test]
    fn coalesce_is_nullable_only_if_all_children_are() {
        let a = Expr::Attribute(attr("a", DataType::Int, true));
        let b = Expr::Attribute(attr("b", DataType::Int, false));
        assert!(!Expr::Coalesce(vec![a.clone(), b]).nullable().unwrap());
        assert!(Expr::Coalesce(vec![a.clone(), a]).nullable().unwrap());
    }

    #[test]
    fn foldable_requires_literal_leaves() {
        assert!(Expr::add(Expr::literal(1), Expr::literal(2)).foldable());
        assert!(!Expr::add(Expr::literal(1), Expr::Attribute(int_attr("a"))).foldable());
        let upper = ScalarFunction::new("upper", vec![Expr::literal("a")], DataType::String);
        assert!(Expr::function(upper.clone()).foldable());
        assert!(!Expr::function(upper.with_fallback()).foldable());
    }

    // --- rendering -----------------------------------------------------------

    #[test]
    fn display_shows_ids_and_sql_hides_them() {
        let a = int_attr("a").with_qualifier(["t"]);
        let e = Expr::add(Expr::Attribute(a.clone()), Expr::literal(1));
        assert_eq!(e.to_string(), format!("(a#{} + 1)", a.expr_id));
        assert_eq!(e.sql(), "(t.a + 1)");
    }
}
