//! Changes across the whole element collection.
//!
//! An [`ElementsChange`] files every per-element delta under one of three
//! buckets:
//!
//! - `added`: the element goes from deleted (or absent) to live
//! - `removed`: the element goes from live to deleted (or absent)
//! - `updated`: the element stays live and some of its fields change
//!
//! Applying a change runs the buckets in the order removed, updated, added so
//! that label/container side effects compose.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use scribble_core::binding::{container_of, is_bound_text, is_text_container, label_of};
use scribble_core::{BoundElement, BoundElementKind, Element, ElementId, ElementsMap, GroupId, LabelLayout};

use crate::delta::{Delta, DeltaSide, Diffable, diff_lists, merge_lists};
use crate::error::{Error, Result};
use crate::partial::{ElementField, ElementPartial, ElementValue, partial_is_deleted};

/// Delta of a single element
pub type ElementDelta = Delta<Element>;

/// The bucket an element delta is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Added,
    Removed,
    Updated,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bucket::Added => "added",
            Bucket::Removed => "removed",
            Bucket::Updated => "updated",
        };
        f.write_str(name)
    }
}

impl Bucket {
    /// Whether a delta with these `is_deleted` sides belongs in this bucket
    fn accepts(self, from_deleted: Option<bool>, to_deleted: Option<bool>) -> bool {
        match self {
            Bucket::Added => from_deleted == Some(true) && to_deleted != Some(true),
            Bucket::Removed => from_deleted != Some(true) && to_deleted == Some(true),
            Bucket::Updated => from_deleted != Some(true) && to_deleted != Some(true),
        }
    }
}

/// Transition of the whole element collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementsChange {
    added: IndexMap<ElementId, ElementDelta>,
    removed: IndexMap<ElementId, ElementDelta>,
    updated: IndexMap<ElementId, ElementDelta>,
}

impl ElementsChange {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a change from pre-sorted buckets.
    ///
    /// Bucket invariants are verified in debug builds and with the
    /// `strict-invariants` feature.
    pub fn create(
        added: IndexMap<ElementId, ElementDelta>,
        removed: IndexMap<ElementId, ElementDelta>,
        updated: IndexMap<ElementId, ElementDelta>,
    ) -> Result<Self> {
        let change = Self { added, removed, updated };
        if cfg!(any(debug_assertions, feature = "strict-invariants")) {
            if let Err(err) = change.validate() {
                tracing::error!(%err, "refusing to build elements change");
                return Err(err);
            }
        }
        Ok(change)
    }

    fn validate(&self) -> Result<()> {
        for (bucket, deltas) in self.buckets() {
            for (id, delta) in deltas {
                if !bucket.accepts(partial_is_deleted(delta.from()), partial_is_deleted(delta.to())) {
                    return Err(Error::BrokenInvariant { bucket, id: id.clone() });
                }
            }
        }

        let checks = [
            (Bucket::Added, &self.added, Bucket::Removed, &self.removed),
            (Bucket::Added, &self.added, Bucket::Updated, &self.updated),
            (Bucket::Removed, &self.removed, Bucket::Updated, &self.updated),
        ];
        for (first, left, second, right) in checks {
            if let Some(id) = left.keys().find(|id| right.contains_key(*id)) {
                return Err(Error::DuplicateElement {
                    id: id.clone(),
                    first,
                    second,
                });
            }
        }
        Ok(())
    }

    fn buckets(&self) -> [(Bucket, &IndexMap<ElementId, ElementDelta>); 3] {
        [
            (Bucket::Added, &self.added),
            (Bucket::Removed, &self.removed),
            (Bucket::Updated, &self.updated),
        ]
    }

    /// Diff two element collections
    pub fn calculate(prev: &ElementsMap, next: &ElementsMap) -> Result<Self> {
        if ptr::eq(prev, next) {
            return Ok(Self::empty());
        }

        let mut added = IndexMap::new();
        let mut removed = IndexMap::new();
        let mut updated = IndexMap::new();

        for (id, prev_element) in prev.iter() {
            // a tombstone that vanished was already recorded as removed
            if next.contains(id) || prev_element.is_deleted {
                continue;
            }
            let mut from = prev_element.to_partial();
            from.insert(ElementField::IsDeleted, ElementValue::Flag(false));
            let to = ElementPartial::from([(ElementField::IsDeleted, ElementValue::Flag(true))]);
            removed.insert(id.clone(), ElementDelta::create(from, to));
        }

        for (id, next_element) in next.iter() {
            let Some(prev_element) = prev.get(id) else {
                if next_element.is_deleted {
                    continue;
                }
                let from = ElementPartial::from([(ElementField::IsDeleted, ElementValue::Flag(true))]);
                let mut to = next_element.to_partial();
                to.insert(ElementField::IsDeleted, ElementValue::Flag(false));
                added.insert(id.clone(), ElementDelta::create(from, to));
                continue;
            };

            if prev_element.version_nonce == next_element.version_nonce {
                continue;
            }

            let delta = Delta::calculate_with(prev_element.as_ref(), next_element.as_ref(), split_structural_lists);
            match (prev_element.is_deleted, next_element.is_deleted) {
                (true, false) => {
                    added.insert(id.clone(), delta);
                }
                (false, true) => {
                    removed.insert(id.clone(), delta);
                }
                _ if !delta.is_empty() => {
                    updated.insert(id.clone(), delta);
                }
                _ => {}
            }
        }

        Self::create(added, removed, updated)
    }

    /// Deltas that bring an element back to life
    pub fn added(&self) -> &IndexMap<ElementId, ElementDelta> {
        &self.added
    }

    /// Deltas that delete an element
    pub fn removed(&self) -> &IndexMap<ElementId, ElementDelta> {
        &self.removed
    }

    /// Deltas of elements that stay live
    pub fn updated(&self) -> &IndexMap<ElementId, ElementDelta> {
        &self.updated
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Number of elements touched by this change
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }

    /// Invert every delta; what was added becomes removed and vice versa
    pub fn inverse(&self) -> Self {
        fn invert(deltas: &IndexMap<ElementId, ElementDelta>) -> IndexMap<ElementId, ElementDelta> {
            deltas.iter().map(|(id, delta)| (id.clone(), delta.inverse())).collect()
        }

        Self {
            added: invert(&self.removed),
            removed: invert(&self.added),
            updated: invert(&self.updated),
        }
    }

    /// Refresh one side of every updated delta with the current values from
    /// `elements`.
    ///
    /// Added and removed deltas are left alone so the author can always bring
    /// their element back. Structural lists and custom data keep their
    /// recorded values.
    pub fn apply_latest_changes(&self, elements: &ElementsMap, side: DeltaSide) -> Result<Self> {
        let updated = self
            .updated
            .iter()
            .map(|(id, delta)| {
                let Some(element) = elements.get(id) else {
                    return (id.clone(), delta.clone());
                };
                let latest = |partial: ElementPartial| -> ElementPartial {
                    partial
                        .into_iter()
                        .map(|(field, value)| {
                            if field.keeps_recorded_value() {
                                (field, value)
                            } else {
                                (field, element.get(field))
                            }
                        })
                        .collect()
                };
                let (from, to) = delta.clone().into_parts();
                (id.clone(), ElementDelta::create_with(from, to, latest, side))
            })
            .collect();

        Self::create(self.added.clone(), self.removed.clone(), updated)
    }

    /// Apply this change onto `elements`.
    ///
    /// Elements missing from `elements` are looked up in `snapshot`. Returns
    /// the new collection and whether the result differs visibly.
    pub fn apply_to(
        &self,
        elements: &ElementsMap,
        snapshot: &ElementsMap,
        layout: &dyn LabelLayout,
    ) -> (ElementsMap, bool) {
        let mut applier = Applier {
            elements: elements.clone(),
            snapshot,
            visible: false,
            z_index: false,
            touched: IndexSet::new(),
        };

        for (id, delta) in &self.removed {
            if applier.apply_delta(id, delta) {
                applier.unbind_removed(id);
            }
        }
        for (id, delta) in &self.updated {
            applier.apply_delta(id, delta);
        }
        for (id, delta) in &self.added {
            if applier.apply_delta(id, delta) {
                applier.restore_added(id);
            }
        }

        if applier.z_index {
            applier.elements.sort_by_fractional_index();
            if !applier.visible {
                applier.visible = !non_deleted_order(elements).eq(non_deleted_order(&applier.elements));
            }
        }
        applier.redraw_labels(layout);

        (applier.elements, applier.visible)
    }
}

/// Turn whole-list replacements of `bound_elements` and `group_ids` into
/// lost (`from`) and gained (`to`) members
fn split_structural_lists(from: &mut ElementPartial, to: &mut ElementPartial) {
    split_list::<BoundElement>(
        from,
        to,
        ElementField::BoundElements,
        ElementValue::as_bound_elements,
        ElementValue::BoundElements,
    );
    split_list::<GroupId>(
        from,
        to,
        ElementField::GroupIds,
        ElementValue::as_group_ids,
        ElementValue::GroupIds,
    );
}

fn split_list<V: Clone + PartialEq>(
    from: &mut ElementPartial,
    to: &mut ElementPartial,
    field: ElementField,
    read: fn(&ElementValue) -> Option<&[V]>,
    wrap: fn(Vec<V>) -> ElementValue,
) {
    let (Some(prev), Some(next)) = (from.get(&field).and_then(read), to.get(&field).and_then(read)) else {
        return;
    };
    let (lost, gained) = diff_lists(prev, next);

    if lost.is_empty() && gained.is_empty() {
        from.remove(&field);
        to.remove(&field);
    } else {
        from.insert(field, wrap(lost));
        to.insert(field, wrap(gained));
    }
}

fn non_deleted_order(elements: &ElementsMap) -> impl Iterator<Item = &ElementId> {
    elements.non_deleted().map(|e| &e.id)
}

/// Mutable state threaded through one `apply_to` call
struct Applier<'a> {
    elements: ElementsMap,
    snapshot: &'a ElementsMap,
    visible: bool,
    z_index: bool,
    touched: IndexSet<ElementId>,
}

impl Applier<'_> {
    /// Live element, falling back to the snapshot copy
    fn lookup(&mut self, id: &ElementId, partial: &ElementPartial) -> Option<Arc<Element>> {
        if let Some(element) = self.elements.get(id) {
            return Some(element.clone());
        }
        let element = self.snapshot.get(id)?.clone();

        // re-inserted elements land at the end and need re-sorting
        self.z_index = true;
        let revived = match partial_is_deleted(partial) {
            Some(deleted) => !deleted,
            None => !element.is_deleted,
        };
        if revived {
            self.visible = true;
        }
        Some(element)
    }

    /// Returns false if the element could not be found anywhere
    fn apply_delta(&mut self, id: &ElementId, delta: &ElementDelta) -> bool {
        let Some(current) = self.lookup(id, delta.to()) else {
            tracing::debug!(%id, "element missing from scene and snapshot, skipping delta");
            return false;
        };

        let next = current.updated_with(|element| {
            for (&field, value) in delta.to() {
                match (field, value) {
                    (ElementField::GroupIds, ElementValue::GroupIds(added)) => {
                        let removed = delta.from().get(&field).and_then(ElementValue::as_group_ids).unwrap_or(&[]);
                        element.group_ids = merge_lists(&current.group_ids, added, removed, |g| g.clone());
                    }
                    (ElementField::BoundElements, ElementValue::BoundElements(added)) => {
                        let removed = delta
                            .from()
                            .get(&field)
                            .and_then(ElementValue::as_bound_elements)
                            .unwrap_or(&[]);
                        element.bound_elements =
                            merge_lists(&current.bound_elements, added, removed, |b| b.id.clone());
                    }
                    _ => element.set(field, value.clone()),
                }
            }
        });

        if !self.visible && is_visibly_different(&current, &next) {
            self.visible = true;
        }
        if current.index != next.index {
            self.z_index = true;
        }

        self.elements.insert(next);
        self.touched.insert(id.clone());
        true
    }

    /// Side effects of removing `id`: a container takes its label with it, a
    /// label drops out of its container
    fn unbind_removed(&mut self, id: &ElementId) {
        let Some(element) = self.elements.get(id).cloned() else {
            return;
        };

        if is_text_container(&element) {
            match label_of(&element, &self.elements) {
                Some(label) if !label.is_deleted => {
                    let label = label.deleted();
                    self.touched.insert(label.id.clone());
                    self.elements.insert(label);
                }
                Some(_) => {}
                None => tracing::debug!(%id, "label of removed container not found"),
            }
        }

        if is_bound_text(&element) {
            let unbound = container_of(&element, &self.elements).and_then(|container| {
                let listed = container.bound_elements.iter().any(|b| &b.id == id);
                listed.then(|| container.updated_with(|c| c.bound_elements.retain(|b| &b.id != id)))
            });
            if let Some(container) = unbound {
                self.touched.insert(container.id.clone());
                self.elements.insert(container);
            }
        }
    }

    /// Side effects of adding `id` back: a container restores its label, a
    /// label restores its container
    fn restore_added(&mut self, id: &ElementId) {
        let Some(element) = self.elements.get(id).cloned() else {
            return;
        };

        if is_text_container(&element) {
            match label_of(&element, &self.elements).cloned() {
                Some(label) => {
                    let label_id = label.id.clone();
                    if label.is_deleted || label.container_id.as_ref() != Some(id) {
                        let label = label.updated_with(|l| {
                            l.is_deleted = false;
                            l.container_id = Some(id.clone());
                        });
                        self.elements.insert(label);
                    }
                    self.touched.insert(label_id);
                }
                None => {
                    tracing::debug!(%id, "restored container lost its label, unbinding");
                    let container = element
                        .updated_with(|c| c.bound_elements.retain(|b| b.kind != BoundElementKind::Text));
                    self.elements.insert(container);
                }
            }
        }

        if is_bound_text(&element) {
            match container_of(&element, &self.elements).cloned() {
                Some(container) => {
                    let container_id = container.id.clone();
                    let listed = container.bound_elements.iter().any(|b| &b.id == id);
                    if container.is_deleted || !listed {
                        let container = container.updated_with(|c| {
                            c.is_deleted = false;
                            if !listed {
                                c.bound_elements.push(BoundElement::text(id.clone()));
                            }
                        });
                        self.elements.insert(container);
                    }
                    self.touched.insert(container_id);
                }
                None => {
                    tracing::debug!(%id, "restored label lost its container, unbinding");
                    let label = element.updated_with(|l| l.container_id = None);
                    self.elements.insert(label);
                }
            }
        }
    }

    /// Reposition labels of every touched label/container pair
    fn redraw_labels(&mut self, layout: &dyn LabelLayout) {
        let touched = std::mem::take(&mut self.touched);
        for id in &touched {
            let Some(element) = self.elements.get(id).cloned() else {
                continue;
            };
            if element.is_deleted {
                continue;
            }

            let pair = if is_bound_text(&element) {
                container_of(&element, &self.elements).map(|container| (container.clone(), element.as_ref().clone()))
            } else if is_text_container(&element) {
                label_of(&element, &self.elements).map(|label| (element.as_ref().clone(), label.clone()))
            } else {
                None
            };

            let Some((container, label)) = pair else {
                continue;
            };
            if container.is_deleted || label.is_deleted {
                continue;
            }
            if let Some(placed) = layout.layout(&container, &label) {
                self.elements.insert(placed);
            }
        }
    }
}

/// Whether going from `prev` to `next` changes anything the user can see,
/// ignoring the stacking order
fn is_visibly_different(prev: &Element, next: &Element) -> bool {
    match (prev.is_deleted, next.is_deleted) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => ElementField::ALL
            .iter()
            .filter(|field| **field != ElementField::Index)
            .any(|field| !prev.field_eq(next, *field)),
    }
}
