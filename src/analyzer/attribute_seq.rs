use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use once_cell::sync::OnceCell;

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult, ExtractValue},
    expression::{Alias, AttributeReference, Expr, ExprId, Resolver, UnresolvedAttribute, parse_attribute_name},
};

/// Name lookup tables, keyed by lower-cased parts and holding ordinals.
#[derive(Debug, Clone, Default)]
struct NameIndex {
    by_name: HashMap<String, Vec<usize>>,
    /// (table, name)
    by_two_parts: HashMap<(String, String), Vec<usize>>,
    /// (db, table, name)
    by_three_parts: HashMap<(String, String, String), Vec<usize>>,
    /// (catalog, db, table, name)
    by_four_parts: HashMap<(String, String, String, String), Vec<usize>>,
    has_long_qualifier: bool,
}

impl NameIndex {
    fn build(attrs: &[AttributeReference]) -> Self {
        let mut index = NameIndex::default();
        for (ordinal, a) in attrs.iter().enumerate() {
            let name = a.name.to_lowercase();
            let q: Vec<String> = a.qualifier.iter().map(|p| p.to_lowercase()).collect();

            index.by_name.entry(name.clone()).or_default().push(ordinal);
            if let Some(table) = q.last() {
                index.by_two_parts.entry((table.clone(), name.clone())).or_default().push(ordinal);
            }
            match q.as_slice() {
                [db, table] => {
                    index.by_three_parts.entry((db.clone(), table.clone(), name.clone())).or_default().push(ordinal);
                }
                [catalog, db, table] => {
                    index.by_three_parts.entry((db.clone(), table.clone(), name.clone())).or_default().push(ordinal);
                    index
                        .by_four_parts
                        .entry((catalog.clone(), db.clone(), table.clone(), name))
                        .or_default()
                        .push(ordinal);
                }
                _ => {}
            }
            index.has_long_qualifier |= q.len() > 3;
        }
        index
    }
}

/// The ordered output columns of a relation, with name resolution over them.
///
/// Lookup tables are built on first use and reused by every later call.
/// A nested-field name resolves under the same alias id every time it is
/// asked of the same sequence (or a clone of it).
#[derive(Debug, Clone, Default)]
pub struct AttributeSeq {
    attrs: Vec<AttributeReference>,
    ordinals: OnceCell<HashMap<ExprId, usize>>,
    names: OnceCell<NameIndex>,
    nested_aliases: Arc<Mutex<HashMap<(ExprId, Vec<String>), ExprId>>>,
}

impl AttributeSeq {
    pub fn new(attrs: Vec<AttributeReference>) -> Self {
        Self { attrs, ordinals: OnceCell::new(), names: OnceCell::new(), nested_aliases: Arc::default() }
    }

    pub fn attrs(&self) -> &[AttributeReference] {
        &self.attrs
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeReference> {
        self.attrs.iter()
    }

    pub fn get(&self, ordinal: usize) -> Option<&AttributeReference> {
        self.attrs.get(ordinal)
    }

    /// Ordinal of the first attribute carrying `expr_id`.
    pub fn index_of(&self, expr_id: &ExprId) -> Option<usize> {
        let ordinals = self.ordinals.get_or_init(|| {
            let mut map = HashMap::with_capacity(self.attrs.len());
            for (i, a) in self.attrs.iter().enumerate() {
                map.entry(a.expr_id).or_insert(i);
            }
            map
        });
        ordinals.get(expr_id).copied()
    }

    fn nested_alias_id(&self, attr: ExprId, name_parts: &[String]) -> ExprId {
        let mut aliases = self.nested_aliases.lock().unwrap_or_else(PoisonError::into_inner);
        *aliases.entry((attr, name_parts.to_vec())).or_insert_with(ExprId::new_id)
    }

    fn names(&self) -> &NameIndex {
        self.names.get_or_init(|| NameIndex::build(&self.attrs))
    }

    fn lookup<K>(&self, map: &HashMap<K, Vec<usize>>, key: &K) -> Vec<&AttributeReference>
    where
        K: std::hash::Hash + Eq,
    {
        map.get(key).map(|ords| ords.iter().map(|&i| &self.attrs[i]).collect()).unwrap_or_default()
    }

    /// Resolve a dotted name written with optional back-tick quoting.
    pub fn resolve_name(&self, name: &str, resolver: Resolver) -> AnalyzerResult<Option<Expr>> {
        self.resolve(&parse_attribute_name(name)?, resolver)
    }

    /// Resolve `name_parts` to a column, or to a field extraction over one.
    ///
    /// `Ok(None)` means nothing matched. More than one distinct match is an
    /// ambiguity error.
    pub fn resolve(&self, name_parts: &[String], resolver: Resolver) -> AnalyzerResult<Option<Expr>> {
        if name_parts.is_empty() {
            return Ok(None);
        }

        let (candidates, nested_fields) = if self.names().has_long_qualifier {
            self.match_with_long_qualifiers(name_parts, resolver)
        } else {
            self.match_with_short_qualifiers(name_parts, resolver)
        };

        let mut seen = Vec::with_capacity(candidates.len());
        let mut distinct = Vec::with_capacity(candidates.len());
        for c in candidates {
            if !seen.contains(&c.expr_id) {
                seen.push(c.expr_id);
                distinct.push(c);
            }
        }

        match distinct.as_slice() {
            [] => Ok(None),
            [single] if nested_fields.is_empty() => Ok(Some(Expr::Attribute(single.clone()))),
            [single] => {
                let mut extracted = Expr::Attribute(single.clone());
                for field in nested_fields {
                    extracted = ExtractValue::extract(extracted, field, resolver)?;
                }
                let alias_name = nested_fields.last().cloned().unwrap_or_default();
                let alias_id = self.nested_alias_id(single.expr_id, name_parts);
                Ok(Some(Expr::Alias(Alias::with_id(extracted, alias_name, alias_id))))
            }
            many => Err(AnalyzerError::AmbiguousReference {
                name: UnresolvedAttribute::new(name_parts.iter().cloned()).name(),
                candidates: many.iter().map(|a| a.qualified_name()).collect(),
            }),
        }
    }

    /// Longest qualifier first: 4, 3 and 2 parts, then the bare name.
    fn match_with_short_qualifiers<'p>(
        &self,
        parts: &'p [String],
        resolver: Resolver,
    ) -> (Vec<AttributeReference>, &'p [String]) {
        let idx = self.names();
        let lower: Vec<String> = parts.iter().map(|p| p.to_lowercase()).collect();

        if let [catalog, db, table, name, ..] = parts {
            let key = (lower[0].clone(), lower[1].clone(), lower[2].clone(), lower[3].clone());
            let found = Self::renamed(
                self.lookup(&idx.by_four_parts, &key).into_iter().filter(|a| {
                    resolver(&a.name, name) && Self::qualifier_matches(&a.qualifier, &[catalog, db, table], resolver)
                }),
                name,
            );
            if !found.is_empty() {
                return (found, &parts[4..]);
            }
        }

        if let [db, table, name, ..] = parts {
            let key = (lower[0].clone(), lower[1].clone(), lower[2].clone());
            let found = Self::renamed(
                self.lookup(&idx.by_three_parts, &key).into_iter().filter(|a| {
                    let q = &a.qualifier;
                    let tail = &q[q.len().saturating_sub(2)..];
                    resolver(&a.name, name) && Self::qualifier_matches(tail, &[db, table], resolver)
                }),
                name,
            );
            if !found.is_empty() {
                return (found, &parts[3..]);
            }
        }

        if let [table, name, ..] = parts {
            let key = (lower[0].clone(), lower[1].clone());
            let found = Self::renamed(
                self.lookup(&idx.by_two_parts, &key).into_iter().filter(|a| {
                    resolver(&a.name, name) && a.qualifier.last().is_some_and(|t| resolver(t, table))
                }),
                name,
            );
            if !found.is_empty() {
                return (found, &parts[2..]);
            }
        }

        let name = &parts[0];
        let found = Self::renamed(
            self.lookup(&idx.by_name, &lower[0]).into_iter().filter(|a| resolver(&a.name, name)),
            name,
        );
        (found, &parts[1..])
    }

    /// Scan name positions right to left; the parts before the position must
    /// match the tail of the attribute's qualifier.
    fn match_with_long_qualifiers<'p>(
        &self,
        parts: &'p [String],
        resolver: Resolver,
    ) -> (Vec<AttributeReference>, &'p [String]) {
        for i in (0..parts.len()).rev() {
            let name = &parts[i];
            let prefix: Vec<&String> = parts[..i].iter().collect();
            let found = Self::renamed(
                self.attrs.iter().filter(|a| {
                    resolver(&a.name, name) && (prefix.is_empty() || Self::qualifier_suffix_matches(&a.qualifier, &prefix, resolver))
                }),
                name,
            );
            if !found.is_empty() {
                return (found, &parts[i + 1..]);
            }
        }
        (Vec::new(), &[])
    }

    fn qualifier_matches(qualifier: &[String], expected: &[&String], resolver: Resolver) -> bool {
        qualifier.len() == expected.len() && qualifier.iter().zip(expected).all(|(q, e)| resolver(q, e))
    }

    fn qualifier_suffix_matches(qualifier: &[String], short: &[&String], resolver: Resolver) -> bool {
        qualifier.len() >= short.len()
            && qualifier[qualifier.len() - short.len()..].iter().zip(short).all(|(q, s)| resolver(q, s))
    }

    /// Matched attributes take the spelling used in the query.
    fn renamed<'a>(found: impl Iterator<Item = &'a AttributeReference>, name: &str) -> Vec<AttributeReference> {
        found.map(|a| a.with_name(name)).collect()
    }
}

impl From<Vec<AttributeReference>> for AttributeSeq {
    fn from(attrs: Vec<AttributeReference>) -> Self {
        Self::new(attrs)
    }
}

impl FromIterator<AttributeReference> for AttributeSeq {
    fn from_iter<I: IntoIterator<Item = AttributeReference>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
