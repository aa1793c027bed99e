use std::fmt::{self, Display};

use indexmap::IndexMap;

use crate::{analyzer::AttributeSeq, expression::{AttributeReference, ExprId}};

/// A set of attributes keyed by [`ExprId`] alone.
///
/// Two attributes with the same id are the same member even if their names or
/// qualifiers differ. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    members: IndexMap<ExprId, AttributeReference>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `attr` unless a member with the same id is present. Returns true if added.
    pub fn insert(&mut self, attr: AttributeReference) -> bool {
        if self.members.contains_key(&attr.expr_id) {
            return false;
        }
        self.members.insert(attr.expr_id, attr);
        true
    }

    pub fn remove(&mut self, attr: &AttributeReference) -> bool {
        self.members.shift_remove(&attr.expr_id).is_some()
    }

    pub fn contains(&self, attr: &AttributeReference) -> bool {
        self.contains_id(&attr.expr_id)
    }

    pub fn contains_id(&self, expr_id: &ExprId) -> bool {
        self.members.contains_key(expr_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeReference> {
        self.members.values()
    }

    pub fn union(&self, other: &AttributeSet) -> AttributeSet {
        let mut out = self.clone();
        for a in other.iter() {
            out.insert(a.clone());
        }
        out
    }

    pub fn intersect(&self, other: &AttributeSet) -> AttributeSet {
        self.iter().filter(|a| other.contains(a)).cloned().collect()
    }

    pub fn difference(&self, other: &AttributeSet) -> AttributeSet {
        self.iter().filter(|a| !other.contains(a)).cloned().collect()
    }

    pub fn subset_of(&self, other: &AttributeSet) -> bool {
        self.iter().all(|a| other.contains(a))
    }

    /// Members ordered by name, then id, then process instance.
    pub fn to_sorted_vec(&self) -> Vec<AttributeReference> {
        let mut v: Vec<AttributeReference> = self.members.values().cloned().collect();
        v.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.expr_id.id.cmp(&b.expr_id.id))
                .then(a.expr_id.instance.cmp(&b.expr_id.instance))
        });
        v
    }

    pub fn to_seq(&self) -> AttributeSeq {
        AttributeSeq::new(self.members.values().cloned().collect())
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.subset_of(other)
    }
}

impl Eq for AttributeSet {}

impl FromIterator<AttributeReference> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = AttributeReference>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for a in iter {
            set.insert(a);
        }
        set
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a AttributeReference;
    type IntoIter = indexmap::map::Values<'a, ExprId, AttributeReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.values()
    }
}

impl Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.to_sorted_vec().iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::int_attr;

    #[test]
    fn membership_is_by_id_not_by_name() {
        let a = int_attr("a");
        let mut set = AttributeSet::new();
        assert!(set.insert(a.clone()));
        assert!(!set.insert(a.with_name("renamed").with_qualifier(["t"])));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&a.with_name("other")));
        assert!(!set.contains(&a.new_instance()));
        assert_eq!(set.iter().next().unwrap().name, "a");
    }

    #[test]
    fn set_algebra() {
        let (a, b, c) = (int_attr("a"), int_attr("b"), int_attr("c"));
        let ab: AttributeSet = [a.clone(), b.clone()].into_iter().collect();
        let bc: AttributeSet = [b.clone(), c.clone()].into_iter().collect();

        assert_eq!(ab.union(&bc).len(), 3);
        assert_eq!(ab.intersect(&bc), [b.clone()].into_iter().collect());
        assert_eq!(ab.difference(&bc), [a.clone()].into_iter().collect());
        assert!(ab.intersect(&bc).subset_of(&ab));
        assert!(!ab.subset_of(&bc));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let (a, b) = (int_attr("a"), int_attr("b"));
        let ab: AttributeSet = [a.clone(), b.clone()].into_iter().collect();
        let ba: AttributeSet = [b, a].into_iter().collect();
        assert_eq!(ab, ba);
        assert_eq!(ab.to_string(), ba.to_string());
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let (a, b, c) = (int_attr("a"), int_attr("b"), int_attr("c"));
        let mut set: AttributeSet = [a.clone(), b.clone(), c.clone()].into_iter().collect();
        assert!(set.remove(&b.with_name("x")));
        assert!(!set.remove(&b));
        let names: Vec<&str> = set.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn sorted_by_name_then_id() {
        let first = int_attr("x");
        let second = int_attr("x");
        let a = int_attr("a");
        let set: AttributeSet = [second.clone(), a.clone(), first.clone()].into_iter().collect();
        let sorted: Vec<ExprId> = set.to_sorted_vec().into_iter().map(|x| x.expr_id).collect();
        assert_eq!(sorted, vec![a.expr_id, first.expr_id, second.expr_id]);
    }
}
