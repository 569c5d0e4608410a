//! Symmetric before/after diffs over records with a closed set of fields.
//!
//! A [`Delta`] holds two partial records: `from` carries the previous value of
//! every field that changed, `to` the new one. Both sides always have the same
//! key set unless a post-processing step rewrote them in tandem.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A record whose fields can be read and written one at a time
pub trait Diffable: Clone + fmt::Debug {
    type Field: Copy + Ord + fmt::Debug + 'static;
    type Value: Clone + PartialEq + fmt::Debug;

    /// Every tracked field, in a stable order
    fn fields() -> &'static [Self::Field];

    fn get(&self, field: Self::Field) -> Self::Value;

    fn set(&mut self, field: Self::Field, value: Self::Value);

    /// Compare one field of two records
    fn field_eq(&self, other: &Self, field: Self::Field) -> bool {
        self.get(field) == other.get(field)
    }

    /// Every tracked field of this record as a partial
    fn to_partial(&self) -> Partial<Self> {
        Self::fields().iter().map(|f| (*f, self.get(*f))).collect()
    }

    /// Write every field of `partial` onto this record
    fn apply_partial(&mut self, partial: &Partial<Self>) {
        for (field, value) in partial {
            self.set(*field, value.clone());
        }
    }
}

/// A subset of a record's fields
pub type Partial<T> = BTreeMap<<T as Diffable>::Field, <T as Diffable>::Value>;

/// Which side(s) of a delta a modifier rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSide {
    From,
    To,
    Both,
}

/// Before/after diff of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Delta<T: Diffable> {
    from: Partial<T>,
    to: Partial<T>,
}

impl<T: Diffable> Default for Delta<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Diffable> Delta<T> {
    pub fn empty() -> Self {
        Self {
            from: BTreeMap::new(),
            to: BTreeMap::new(),
        }
    }

    pub fn create(from: Partial<T>, to: Partial<T>) -> Self {
        Self { from, to }
    }

    /// Create a delta, rewriting one or both sides with `modifier`
    pub fn create_with(
        from: Partial<T>,
        to: Partial<T>,
        modifier: impl Fn(Partial<T>) -> Partial<T>,
        side: DeltaSide,
    ) -> Self {
        let from = match side {
            DeltaSide::From | DeltaSide::Both => modifier(from),
            DeltaSide::To => from,
        };
        let to = match side {
            DeltaSide::To | DeltaSide::Both => modifier(to),
            DeltaSide::From => to,
        };
        Self { from, to }
    }

    /// Diff two records field by field
    pub fn calculate(prev: &T, next: &T) -> Self {
        Self::calculate_with(prev, next, |_, _| {})
    }

    /// Diff two records, then let `post_process` rewrite both sides in tandem.
    ///
    /// Used for fields whose diff is a set of gained/lost members rather than a
    /// whole-value replacement.
    pub fn calculate_with(
        prev: &T,
        next: &T,
        post_process: impl FnOnce(&mut Partial<T>, &mut Partial<T>),
    ) -> Self {
        if std::ptr::eq(prev, next) {
            return Self::empty();
        }

        let mut from = BTreeMap::new();
        let mut to = BTreeMap::new();
        for &field in T::fields() {
            if !prev.field_eq(next, field) {
                from.insert(field, prev.get(field));
                to.insert(field, next.get(field));
            }
        }

        if !from.is_empty() {
            post_process(&mut from, &mut to);
        }
        Self { from, to }
    }

    pub fn from(&self) -> &Partial<T> {
        &self.from
    }

    pub fn to(&self) -> &Partial<T> {
        &self.to
    }

    pub fn into_parts(self) -> (Partial<T>, Partial<T>) {
        (self.from, self.to)
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }

    /// Field is present on either side
    pub fn contains(&self, field: T::Field) -> bool {
        self.from.contains_key(&field) || self.to.contains_key(&field)
    }

    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

/// Apply `removed` then overlay `added` onto a set
pub fn merge_sets<K: Ord + Clone>(
    prev: &BTreeSet<K>,
    added: &BTreeSet<K>,
    removed: &BTreeSet<K>,
) -> BTreeSet<K> {
    prev.difference(removed).chain(added.iter()).cloned().collect()
}

/// Apply `removed` then overlay `added` onto a list of keyed values.
///
/// Surviving entries keep their position; an added entry replaces an existing
/// one with the same key in place, otherwise it is appended.
pub fn merge_lists<V: Clone, K: PartialEq>(
    prev: &[V],
    added: &[V],
    removed: &[V],
    key: impl Fn(&V) -> K,
) -> Vec<V> {
    let mut merged: Vec<V> = prev
        .iter()
        .filter(|value| !removed.iter().any(|r| key(r) == key(value)))
        .cloned()
        .collect();

    for value in added {
        match merged.iter_mut().find(|m| key(m) == key(value)) {
            Some(existing) => *existing = value.clone(),
            None => merged.push(value.clone()),
        }
    }
    merged
}

/// Split two lists into (lost, gained) members
pub fn diff_lists<V: Clone + PartialEq>(prev: &[V], next: &[V]) -> (Vec<V>, Vec<V>) {
    let lost = prev.iter().filter(|v| !next.contains(v)).cloned().collect();
    let gained = next.iter().filter(|v| !prev.contains(v)).cloned().collect();
    (lost, gained)
}

/// Keys of `left` whose value is missing or different in `right`
pub fn left_differences<K: Ord + Clone, V: PartialEq>(
    left: &BTreeMap<K, V>,
    right: &BTreeMap<K, V>,
) -> Vec<K> {
    left.iter()
        .filter(|(key, value)| right.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Keys of `right` whose value is missing or different in `left`
pub fn right_differences<K: Ord + Clone, V: PartialEq>(
    left: &BTreeMap<K, V>,
    right: &BTreeMap<K, V>,
) -> Vec<K> {
    left_differences(right, left)
}

pub fn is_left_different<K: Ord, V: PartialEq>(left: &BTreeMap<K, V>, right: &BTreeMap<K, V>) -> bool {
    left.iter().any(|(key, value)| right.get(key) != Some(value))
}

pub fn is_right_different<K: Ord, V: PartialEq>(left: &BTreeMap<K, V>, right: &BTreeMap<K, V>) -> bool {
    is_left_different(right, left)
}

/// Writing `partial` onto `record` would change at least one field
pub fn record_differs<T: Diffable>(record: &T, partial: &Partial<T>) -> bool {
    partial.iter().any(|(field, value)| record.get(*field) != *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Card {
        title: String,
        tags: Vec<String>,
        done: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum CardField {
        Title,
        Tags,
        Done,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CardValue {
        Text(String),
        Tags(Vec<String>),
        Flag(bool),
    }

    impl Diffable for Card {
        type Field = CardField;
        type Value = CardValue;

        fn fields() -> &'static [CardField] {
            &[CardField::Title, CardField::Tags, CardField::Done]
        }

        fn get(&self, field: CardField) -> CardValue {
            match field {
                CardField::Title => CardValue::Text(self.title.clone()),
                CardField::Tags => CardValue::Tags(self.tags.clone()),
                CardField::Done => CardValue::Flag(self.done),
            }
        }

        fn set(&mut self, field: CardField, value: CardValue) {
            match (field, value) {
                (CardField::Title, CardValue::Text(v)) => self.title = v,
                (CardField::Tags, CardValue::Tags(v)) => self.tags = v,
                (CardField::Done, CardValue::Flag(v)) => self.done = v,
                (field, value) => panic!("mismatched {field:?} = {value:?}"),
            }
        }
    }

    fn card(title: &str, tags: &[&str], done: bool) -> Card {
        Card {
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            done,
        }
    }

    fn tags(value: Option<&CardValue>) -> Vec<String> {
        match value {
            Some(CardValue::Tags(tags)) => tags.clone(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn calculate_of_equal_records_is_empty() {
        let a = card("a", &["x"], false);
        assert!(Delta::calculate(&a, &a).is_empty());
        assert!(Delta::calculate(&a, &a.clone()).is_empty());
    }

    #[test]
    fn calculate_records_only_changed_fields_on_both_sides() {
        let prev = card("draft", &["x"], false);
        let next = card("draft", &["x"], true);

        let delta = Delta::calculate(&prev, &next);

        assert_eq!(delta.from().len(), 1);
        assert_eq!(delta.from().get(&CardField::Done), Some(&CardValue::Flag(false)));
        assert_eq!(delta.to().get(&CardField::Done), Some(&CardValue::Flag(true)));
        assert!(!delta.contains(CardField::Title));
    }

    #[test]
    fn post_process_turns_lists_into_gained_and_lost() {
        let prev = card("a", &["keep", "old"], false);
        let next = card("a", &["keep", "new"], false);

        let delta = Delta::calculate_with(&prev, &next, |from, to| {
            let (lost, gained) = diff_lists(&tags(from.get(&CardField::Tags)), &tags(to.get(&CardField::Tags)));
            from.insert(CardField::Tags, CardValue::Tags(lost));
            to.insert(CardField::Tags, CardValue::Tags(gained));
        });

        assert_eq!(tags(delta.from().get(&CardField::Tags)), vec!["old"]);
        assert_eq!(tags(delta.to().get(&CardField::Tags)), vec!["new"]);
    }

    #[test]
    fn create_with_modifies_requested_side_only() {
        let from: Partial<Card> = [(CardField::Title, CardValue::Text("a".into()))].into();
        let to: Partial<Card> = [(CardField::Title, CardValue::Text("b".into()))].into();
        let latest = |partial: Partial<Card>| -> Partial<Card> {
            partial
                .into_keys()
                .map(|k| (k, CardValue::Text("latest".into())))
                .collect()
        };

        let delta = Delta::<Card>::create_with(from, to, latest, DeltaSide::From);

        assert_eq!(delta.from().get(&CardField::Title), Some(&CardValue::Text("latest".into())));
        assert_eq!(delta.to().get(&CardField::Title), Some(&CardValue::Text("b".into())));
    }

    #[test]
    fn inverse_swaps_sides() {
        let delta = Delta::calculate(&card("a", &[], false), &card("b", &[], false));
        let inverse = delta.inverse();

        assert_eq!(inverse.from(), delta.to());
        assert_eq!(inverse.to(), delta.from());
        assert_eq!(inverse.inverse(), delta);
    }

    #[test]
    fn merge_sets_removes_then_adds() {
        let prev: BTreeSet<u8> = [1, 2, 3].into();
        let added: BTreeSet<u8> = [3, 4].into();
        let removed: BTreeSet<u8> = [1, 3].into();

        assert_eq!(merge_sets(&prev, &added, &removed), BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn merge_lists_keeps_positions_and_replaces_by_key() {
        let prev = vec![("a", 1), ("b", 1), ("c", 1)];
        let added = vec![("b", 2), ("d", 1)];
        let removed = vec![("a", 1)];

        let merged = merge_lists(&prev, &added, &removed, |(k, _)| *k);

        assert_eq!(merged, vec![("b", 2), ("c", 1), ("d", 1)]);
    }

    #[test]
    fn left_and_right_differences_are_asymmetric() {
        let left: BTreeMap<&str, u8> = [("a", 1), ("b", 2)].into();
        let right: BTreeMap<&str, u8> = [("b", 3), ("c", 4)].into();

        assert_eq!(left_differences(&left, &right), vec!["a", "b"]);
        assert_eq!(right_differences(&left, &right), vec!["b", "c"]);
        assert!(is_left_different(&left, &right));

        let subset: BTreeMap<&str, u8> = [("a", 1)].into();
        assert!(!is_left_different(&subset, &left));
        assert!(is_right_different(&subset, &left));
    }

    #[test]
    fn record_differs_checks_partial_against_record() {
        let record = card("a", &[], false);
        let same: Partial<Card> = [(CardField::Done, CardValue::Flag(false))].into();
        let other: Partial<Card> = [(CardField::Done, CardValue::Flag(true))].into();

        assert!(!record_differs(&record, &same));
        assert!(record_differs(&record, &other));
    }
}
