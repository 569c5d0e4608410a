//! The live element collection.
//!
//! [`ElementsMap`] keeps elements in insertion order (the render order until
//! it is re-sorted by fractional index) and stores them behind [`Arc`], so
//! cloning the collection shares every element that is not replaced later.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::element::{Element, ElementId, FractionalIndex};

/// Ordered id -> element map with copy-on-write element values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementsMap {
    inner: IndexMap<ElementId, Arc<Element>>,
}

impl ElementsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Arc<Element>> {
        self.inner.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.inner.contains_key(id)
    }

    /// Insert or replace an element. Replacing keeps the element's position.
    pub fn insert(&mut self, element: Element) -> Option<Arc<Element>> {
        self.insert_arc(Arc::new(element))
    }

    pub fn insert_arc(&mut self, element: Arc<Element>) -> Option<Arc<Element>> {
        self.inner.insert(element.id.clone(), element)
    }

    /// Remove an element entirely (not a tombstone), preserving the order of the rest
    pub fn remove(&mut self, id: &ElementId) -> Option<Arc<Element>> {
        self.inner.shift_remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementId, &Arc<Element>)> {
        self.inner.iter()
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = &ElementId> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &Arc<Element>> {
        self.inner.values()
    }

    pub fn non_deleted(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.inner.values().filter(|e| !e.is_deleted)
    }

    /// Append an element at the top of the stacking order, assigning it an index
    pub fn push(&mut self, mut element: Element) -> ElementId {
        element.index = Some(match self.last_index() {
            Some(last) => last.after(),
            None => FractionalIndex::first(),
        });
        let id = element.id.clone();
        self.insert(element);
        id
    }

    /// Edit an element in place of its entry, bumping its version.
    ///
    /// Returns false when the element does not exist.
    pub fn mutate(&mut self, id: &ElementId, edit: impl FnOnce(&mut Element)) -> bool {
        let Some(current) = self.inner.get(id) else {
            return false;
        };
        let next = current.updated_with(edit);
        self.insert(next);
        true
    }

    /// Highest fractional index present in the collection
    pub fn last_index(&self) -> Option<&FractionalIndex> {
        self.inner.values().filter_map(|e| e.index.as_ref()).max()
    }

    /// Re-sort the whole collection by fractional index.
    ///
    /// Elements without an index keep their relative order after the indexed ones.
    pub fn sort_by_fractional_index(&mut self) {
        self.inner.sort_by(|_, a, _, b| compare_by_index(a, b));
    }
}

fn compare_by_index(a: &Element, b: &Element) -> Ordering {
    match (&a.index, &b.index) {
        (Some(ia), Some(ib)) => ia.cmp(ib).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl FromIterator<Element> for ElementsMap {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut map = Self::new();
        for element in iter {
            map.insert(element);
        }
        map
    }
}

impl FromIterator<Arc<Element>> for ElementsMap {
    fn from_iter<I: IntoIterator<Item = Arc<Element>>>(iter: I) -> Self {
        let mut map = Self::new();
        for element in iter {
            map.insert_arc(element);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(map: &ElementsMap) -> Vec<&str> {
        map.ids().map(|id| id.as_str()).collect()
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map: ElementsMap = [
            Element::rectangle().with_id("a"),
            Element::rectangle().with_id("b"),
        ]
        .into_iter()
        .collect();

        map.insert(Element::rectangle().with_id("a").at(5.0, 5.0));

        assert_eq!(ids(&map), vec!["a", "b"]);
        assert_eq!(map.get(&"a".into()).unwrap().x, 5.0);
    }

    #[test]
    fn clone_shares_untouched_elements() {
        let mut map: ElementsMap = [Element::rectangle().with_id("a"), Element::rectangle().with_id("b")]
            .into_iter()
            .collect();
        let before = map.clone();

        map.mutate(&"a".into(), |e| e.x = 1.0);

        let a: ElementId = "a".into();
        let b: ElementId = "b".into();
        assert!(Arc::ptr_eq(before.get(&b).unwrap(), map.get(&b).unwrap()));
        assert!(!Arc::ptr_eq(before.get(&a).unwrap(), map.get(&a).unwrap()));
        assert_eq!(before.get(&a).unwrap().x, 0.0);
    }

    #[test]
    fn values_iterate_from_the_top_when_reversed() {
        let mut map = ElementsMap::new();
        map.push(Element::rectangle().with_id("bottom"));
        map.push(Element::rectangle().with_id("top"));

        let reversed: Vec<&str> = map.values().rev().map(|e| e.id.as_str()).collect();

        assert_eq!(reversed, vec!["top", "bottom"]);
    }

    #[test]
    fn mutate_missing_element_is_noop() {
        let mut map = ElementsMap::new();
        assert!(!map.mutate(&"ghost".into(), |e| e.x = 1.0));
        assert!(map.is_empty());
    }

    #[test]
    fn push_assigns_increasing_indices() {
        let mut map = ElementsMap::new();
        let a = map.push(Element::rectangle().with_id("a"));
        let b = map.push(Element::rectangle().with_id("b"));

        assert!(map.get(&a).unwrap().index < map.get(&b).unwrap().index);
    }

    #[test]
    fn sort_by_fractional_index_puts_unindexed_last() {
        let mut map: ElementsMap = [
            Element::rectangle().with_id("loose"),
            Element::rectangle().with_id("top").with_index("a2"),
            Element::rectangle().with_id("bottom").with_index("a1"),
        ]
        .into_iter()
        .collect();

        map.sort_by_fractional_index();

        assert_eq!(ids(&map), vec!["bottom", "top", "loose"]);
    }

    #[test]
    fn remove_keeps_order() {
        let mut map: ElementsMap = ["a", "b", "c"]
            .into_iter()
            .map(|id| Element::rectangle().with_id(id))
            .collect();

        map.remove(&"b".into());

        assert_eq!(ids(&map), vec!["a", "c"]);
    }
}
