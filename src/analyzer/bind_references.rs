use crate::{
    analyzer::{AnalyzerError, AnalyzerResult, AttributeSeq},
    expression::{BoundReference, Expr, Transformed},
};

/// Rewrites attribute references into ordinal-addressed slots of an input schema.
pub struct BindReferences;

impl BindReferences {
    /// Replace every attribute in `expr` by its slot in `schema`.
    ///
    /// The bound leaf takes the slot's declared type and nullability. An id
    /// missing from the schema is left as is when `allow_failures` is set and
    /// is an error otherwise.
    pub fn bind_reference(expr: Expr, schema: &AttributeSeq, allow_failures: bool) -> AnalyzerResult<Expr> {
        let bound = expr.transform_down(&mut |e| match e {
            Expr::Attribute(a) => match schema.index_of(&a.expr_id) {
                Some(ordinal) => {
                    let slot = &schema.attrs()[ordinal];
                    Ok(Transformed::yes(Expr::BoundReference(BoundReference {
                        ordinal,
                        data_type: slot.data_type.clone(),
                        nullable: slot.nullable,
                    })))
                }
                None if allow_failures => Ok(Transformed::no(Expr::Attribute(a))),
                None => Err(AnalyzerError::BindingFailure {
                    reference: a.to_string(),
                    schema: schema.iter().map(ToString::to_string).collect(),
                }),
            },
            other => Ok(Transformed::no(other)),
        })?;
        Ok(bound.into_inner())
    }

    /// Bind each expression against the same schema; any failure fails the whole list.
    pub fn bind_references(exprs: Vec<Expr>, schema: &AttributeSeq) -> AnalyzerResult<Vec<Expr>> {
        exprs.into_iter().map(|e| Self::bind_reference(e, schema, false)).collect()
    }
}
