use std::fmt::Display;

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult},
    expression::{DataType, Expr, ExprId},
};

/// A resolved reference to a column of some relation's output.
///
/// Immutable: every `with_*` returns a new value. Identity is carried by
/// `expr_id`, the name and qualifier are cosmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeReference {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub expr_id: ExprId,
    /// Up to catalog, database and table, outermost first
    pub qualifier: Vec<String>,
}

impl AttributeReference {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self::with_id(name, data_type, nullable, ExprId::new_id())
    }

    pub fn with_id(name: impl Into<String>, data_type: DataType, nullable: bool, expr_id: ExprId) -> Self {
        Self { name: name.into(), data_type, nullable, expr_id, qualifier: Vec::new() }
    }

    /// Same column shape under a fresh id.
    pub fn new_instance(&self) -> Self {
        Self { expr_id: ExprId::new_id(), ..self.clone() }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    pub fn with_qualifier<S: Into<String>>(&self, qualifier: impl IntoIterator<Item = S>) -> Self {
        Self { qualifier: qualifier.into_iter().map(Into::into).collect(), ..self.clone() }
    }

    pub fn with_nullability(&self, nullable: bool) -> Self {
        Self { nullable, ..self.clone() }
    }

    pub fn with_expr_id(&self, expr_id: ExprId) -> Self {
        Self { expr_id, ..self.clone() }
    }

    /// Qualifier and name joined with dots, each part quoted when it needs to be.
    pub fn qualified_name(&self) -> String {
        self.qualifier
            .iter()
            .chain(std::iter::once(&self.name))
            .map(|p| quote_if_needed(p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Display for AttributeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.expr_id)
    }
}

impl From<AttributeReference> for Expr {
    fn from(a: AttributeReference) -> Self {
        Expr::Attribute(a)
    }
}

/// A column name as written in the query, not yet matched against any schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedAttribute {
    pub name_parts: Vec<String>,
}

impl UnresolvedAttribute {
    pub fn new<S: Into<String>>(name_parts: impl IntoIterator<Item = S>) -> Self {
        Self { name_parts: name_parts.into_iter().map(Into::into).collect() }
    }

    /// A single-part name that is never split on dots.
    pub fn quoted(name: impl Into<String>) -> Self {
        Self { name_parts: vec![name.into()] }
    }

    /// Split on every dot, no quoting rules.
    pub fn from_dotted(name: &str) -> Self {
        Self::new(name.split('.'))
    }

    /// Split a dotted name honoring back-tick quoting, e.g. ``a.`b.c` `` -> `["a", "b.c"]`.
    pub fn parse(name: &str) -> AnalyzerResult<Self> {
        Ok(Self { name_parts: parse_attribute_name(name)? })
    }

    pub fn name(&self) -> String {
        self.name_parts.iter().map(|p| quote_if_needed(p)).collect::<Vec<_>>().join(".")
    }
}

impl Display for UnresolvedAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}", self.name())
    }
}

pub fn quote_if_needed(part: &str) -> String {
    if part.contains('.') || part.contains('`') {
        format!("`{}`", part.replace('`', "``"))
    } else {
        part.to_string()
    }
}

pub fn parse_attribute_name(name: &str) -> AnalyzerResult<Vec<String>> {
    let err = || AnalyzerError::AttributeNameSyntax(name.to_string());
    let chars: Vec<char> = name.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_backtick = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_backtick {
            if ch == '`' {
                if chars.get(i + 1) == Some(&'`') {
                    current.push('`');
                    i += 1;
                } else {
                    in_backtick = false;
                    if matches!(chars.get(i + 1), Some(next) if *next != '.') {
                        return Err(err());
                    }
                }
            } else {
                current.push(ch);
            }
        } else if ch == '`' {
            if !current.is_empty() {
                return Err(err());
            }
            in_backtick = true;
        } else if ch == '.' {
            if i == 0 || chars[i - 1] == '.' || i == chars.len() - 1 {
                return Err(err());
            }
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
        i += 1;
    }

    if in_backtick {
        return Err(err());
    }
    parts.push(current);
    Ok(parts)
}

/// An ordinal-addressed input column, produced by binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundReference {
    pub ordinal: usize,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Display for BoundReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input[{}, {}, {}]", self.ordinal, self.data_type, self.nullable)
    }
}

/// Gives its child a name and an identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias {
    pub child: Box<Expr>,
    pub name: String,
    pub expr_id: ExprId,
    pub qualifier: Vec<String>,
}

impl Alias {
    pub fn new(child: Expr, name: impl Into<String>) -> Self {
        Self::with_id(child, name, ExprId::new_id())
    }

    pub fn with_id(child: Expr, name: impl Into<String>, expr_id: ExprId) -> Self {
        Self { child: Box::new(child), name: name.into(), expr_id, qualifier: Vec::new() }
    }

    /// The attribute downstream operators use to refer to this alias' output.
    pub fn to_attribute(&self) -> AnalyzerResult<AttributeReference> {
        Ok(AttributeReference {
            name: self.name.clone(),
            data_type: self.child.data_type()?,
            nullable: self.child.nullable()?,
            expr_id: self.expr_id,
            qualifier: self.qualifier.clone(),
        })
    }
}
