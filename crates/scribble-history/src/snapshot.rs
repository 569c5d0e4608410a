//! Immutable diffing baseline.

use std::ptr;
use std::sync::Arc;

use scribble_core::{ElementsMap, ObservedAppState};

/// What changed when a snapshot was cloned from its predecessor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub did_elements_change: bool,
    pub did_app_state_change: bool,
    pub is_empty: bool,
}

/// Point-in-time copy of the element collection and observed app state.
///
/// Cloning shares every element whose `version_nonce` did not change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    elements: Arc<ElementsMap>,
    app_state: Arc<ObservedAppState>,
    meta: SnapshotMeta,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            elements: Arc::new(ElementsMap::new()),
            app_state: Arc::new(ObservedAppState::default()),
            meta: SnapshotMeta {
                is_empty: true,
                ..SnapshotMeta::default()
            },
        }
    }

    pub fn elements(&self) -> &ElementsMap {
        &self.elements
    }

    pub fn app_state(&self) -> &ObservedAppState {
        &self.app_state
    }

    pub fn meta(&self) -> SnapshotMeta {
        self.meta
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty
    }

    /// Build the next snapshot, or `None` if nothing changed.
    ///
    /// Elements that disappeared from `elements` are kept as deleted
    /// tombstones so later diffs still see them go.
    pub fn maybe_clone(
        &self,
        elements: Option<&ElementsMap>,
        app_state: Option<&ObservedAppState>,
    ) -> Option<Snapshot> {
        let did_elements_change = elements.is_some_and(|next| self.detect_changed_elements(next));
        let did_app_state_change = app_state.is_some_and(|next| *next != *self.app_state);

        if !did_elements_change && !did_app_state_change {
            return None;
        }

        let elements = match elements {
            Some(next) if did_elements_change => Arc::new(self.create_elements_snapshot(next)),
            _ => self.elements.clone(),
        };
        let app_state = match app_state {
            Some(next) if did_app_state_change => Arc::new(next.clone()),
            _ => self.app_state.clone(),
        };

        Some(Snapshot {
            elements,
            app_state,
            meta: SnapshotMeta {
                did_elements_change,
                did_app_state_change,
                is_empty: false,
            },
        })
    }

    fn detect_changed_elements(&self, next: &ElementsMap) -> bool {
        if ptr::eq(self.elements.as_ref(), next) {
            return false;
        }
        if self.elements.len() != next.len() {
            return true;
        }
        // recent edits usually sit at the end
        next.values().rev().any(|element| {
            self.elements
                .get(&element.id)
                .is_none_or(|prev| prev.version_nonce != element.version_nonce)
        })
    }

    fn create_elements_snapshot(&self, next: &ElementsMap) -> ElementsMap {
        let mut cloned = ElementsMap::new();

        for (id, prev) in self.elements.iter() {
            if next.contains(id) || prev.is_deleted {
                cloned.insert_arc(prev.clone());
            } else {
                cloned.insert(prev.deleted());
            }
        }

        for (id, element) in next.iter() {
            let unchanged = cloned
                .get(id)
                .is_some_and(|prev| prev.version_nonce == element.version_nonce);
            if !unchanged {
                cloned.insert_arc(element.clone());
            }
        }
        cloned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_core::{Element, ElementId};

    fn scene(elements: impl IntoIterator<Item = Element>) -> ElementsMap {
        elements.into_iter().collect()
    }

    #[test]
    fn unchanged_inputs_produce_no_clone() {
        let elements = scene([Element::rectangle().with_id("a")]);
        let snapshot = Snapshot::empty()
            .maybe_clone(Some(&elements), Some(&ObservedAppState::default()))
            .unwrap();

        assert!(snapshot.maybe_clone(Some(&elements), None).is_none());
        assert!(snapshot.maybe_clone(Some(&elements.clone()), Some(&ObservedAppState::default())).is_none());
        assert!(snapshot.maybe_clone(None, None).is_none());
    }

    #[test]
    fn meta_records_which_axis_changed() {
        let elements = scene([Element::rectangle().with_id("a")]);
        let snapshot = Snapshot::empty().maybe_clone(Some(&elements), None).unwrap();

        assert!(snapshot.meta().did_elements_change);
        assert!(!snapshot.meta().did_app_state_change);
        assert!(!snapshot.is_empty());

        let mut renamed = ObservedAppState::default();
        renamed.name = "Plan".to_string();
        let next = snapshot.maybe_clone(Some(&elements), Some(&renamed)).unwrap();

        assert!(!next.meta().did_elements_change);
        assert!(next.meta().did_app_state_change);
        assert_eq!(next.app_state().name, "Plan");
    }

    #[test]
    fn edit_anywhere_in_same_sized_scene_is_detected() {
        let a = Element::rectangle().with_id("a");
        let elements = scene([a.clone(), Element::rectangle().with_id("b"), Element::rectangle().with_id("c")]);
        let snapshot = Snapshot::empty().maybe_clone(Some(&elements), None).unwrap();

        let mut edited = elements.clone();
        edited.insert(a.updated_with(|e| e.y = 3.0));
        let next = snapshot.maybe_clone(Some(&edited), None).unwrap();

        assert!(next.meta().did_elements_change);
        assert_eq!(next.elements().get(&"a".into()).unwrap().y, 3.0);
    }

    #[test]
    fn untouched_elements_are_shared() {
        let a = Element::rectangle().with_id("a");
        let b = Element::rectangle().with_id("b");
        let elements = scene([a, b.clone()]);
        let snapshot = Snapshot::empty().maybe_clone(Some(&elements), None).unwrap();

        let mut edited = elements.clone();
        edited.insert(b.updated_with(|e| e.x = 10.0));
        let next = snapshot.maybe_clone(Some(&edited), None).unwrap();

        let a_id = ElementId::from("a");
        let b_id = ElementId::from("b");
        assert!(Arc::ptr_eq(
            snapshot.elements().get(&a_id).unwrap(),
            next.elements().get(&a_id).unwrap()
        ));
        assert_eq!(next.elements().get(&b_id).unwrap().x, 10.0);
    }

    #[test]
    fn vanished_elements_become_tombstones() {
        let elements = scene([Element::rectangle().with_id("a"), Element::rectangle().with_id("b")]);
        let snapshot = Snapshot::empty().maybe_clone(Some(&elements), None).unwrap();

        let mut shrunk = elements.clone();
        shrunk.remove(&"b".into());
        let next = snapshot.maybe_clone(Some(&shrunk), None).unwrap();

        let tombstone = next.elements().get(&"b".into()).unwrap();
        assert!(tombstone.is_deleted);
        assert_eq!(next.elements().len(), 2);

        // an existing tombstone is kept as-is
        let again = next.maybe_clone(Some(&scene([Element::rectangle().with_id("c")])), None).unwrap();
        assert!(Arc::ptr_eq(tombstone, again.elements().get(&"b".into()).unwrap()));
    }
}
