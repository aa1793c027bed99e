use std::sync::Arc;

use crate::{
    analyzer::{AnalyzerResult, AttributeSeq},
    executor::Rule,
    expression::{Alias, Expr, Resolver, Transformed},
};

/// Resolves column names against the input schema and names un-aliased
/// expressions once their child is resolved.
pub struct ResolveReferences {
    input: Arc<AttributeSeq>,
    resolver: Resolver,
}

impl ResolveReferences {
    pub fn new(input: Arc<AttributeSeq>, resolver: Resolver) -> Self {
        Self { input, resolver }
    }

    fn alias_name(child: &Expr) -> String {
        match child {
            Expr::Attribute(a) => a.name.clone(),
            Expr::GetStructField { name: Some(name), .. } => name.clone(),
            other => other.sql(),
        }
    }
}

impl Rule<Expr> for ResolveReferences {
    fn name(&self) -> &str {
        "ResolveReferences"
    }

    fn apply(&self, expr: Expr) -> AnalyzerResult<Expr> {
        let resolved = expr.transform_up(&mut |e| match e {
            Expr::UnresolvedAttribute(u) => Ok(match self.input.resolve(&u.name_parts, self.resolver)? {
                Some(found) => Transformed::yes(found),
                None => Transformed::no(Expr::UnresolvedAttribute(u)),
            }),
            Expr::UnresolvedAlias(child) if child.resolved() => Ok(Transformed::yes(match *child {
                named @ Expr::Alias(_) => named,
                child => {
                    let name = Self::alias_name(&child);
                    Expr::Alias(Alias::new(child, name))
                }
            })),
            other => Ok(Transformed::no(other)),
        })?;
        Ok(resolved.into_inner())
    }
}
