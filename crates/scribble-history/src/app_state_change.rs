//! Changes to the observed slice of app state.

use std::collections::BTreeSet;

use scribble_core::{AppState, ElementId, ElementsMap, GroupId, ObservedAppState};

use crate::delta::{Delta, Diffable, Partial, merge_sets, right_differences};
use crate::partial::{AppStateField, AppStateValue};

/// One delta over [`ObservedAppState`].
///
/// Selection sets are stored as the ids lost (`from`) and gained (`to`), so
/// applying the change merges into whatever selection exists at that point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppStateChange {
    delta: Delta<ObservedAppState>,
}

impl AppStateChange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn calculate(prev: &ObservedAppState, next: &ObservedAppState) -> Self {
        let delta = Delta::calculate_with(prev, next, |from, to| {
            split_selection(from, to, AppStateField::SelectedElementIds, element_ids, AppStateValue::ElementIds);
            split_selection(from, to, AppStateField::SelectedGroupIds, group_ids, AppStateValue::GroupIds);
        });
        Self { delta }
    }

    pub fn delta(&self) -> &Delta<ObservedAppState> {
        &self.delta
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    pub fn inverse(&self) -> Self {
        Self {
            delta: self.delta.inverse(),
        }
    }

    /// Apply onto `app_state`, filtering references against `elements`.
    ///
    /// Returns the new state and whether the change is visible to the user.
    pub fn apply_to(&self, app_state: &AppState, elements: &ElementsMap) -> (AppState, bool) {
        let prev = app_state.observed();
        let mut next = prev.clone();

        for (&field, value) in self.delta.to() {
            match (field, value) {
                (AppStateField::SelectedElementIds, AppStateValue::ElementIds(added)) => {
                    let removed = element_ids(self.delta.from().get(&field)).cloned().unwrap_or_default();
                    next.selected_element_ids = merge_sets(&prev.selected_element_ids, added, &removed);
                }
                (AppStateField::SelectedGroupIds, AppStateValue::GroupIds(added)) => {
                    let removed = group_ids(self.delta.from().get(&field)).cloned().unwrap_or_default();
                    next.selected_group_ids = merge_sets(&prev.selected_group_ids, added, &removed);
                }
                _ => next.set(field, value.clone()),
            }
        }

        let (next, visible) = filter_invisible_changes(&prev, next, elements);
        (app_state.with_observed(next), visible)
    }
}

fn element_ids(value: Option<&AppStateValue>) -> Option<&BTreeSet<ElementId>> {
    match value {
        Some(AppStateValue::ElementIds(ids)) => Some(ids),
        _ => None,
    }
}

fn group_ids(value: Option<&AppStateValue>) -> Option<&BTreeSet<GroupId>> {
    match value {
        Some(AppStateValue::GroupIds(ids)) => Some(ids),
        _ => None,
    }
}

/// Rewrite a whole-set diff into lost/gained members
fn split_selection<K: Ord + Clone>(
    from: &mut Partial<ObservedAppState>,
    to: &mut Partial<ObservedAppState>,
    field: AppStateField,
    read: fn(Option<&AppStateValue>) -> Option<&BTreeSet<K>>,
    wrap: fn(BTreeSet<K>) -> AppStateValue,
) {
    let (Some(prev), Some(next)) = (read(from.get(&field)), read(to.get(&field))) else {
        return;
    };
    let lost: BTreeSet<K> = prev.difference(next).cloned().collect();
    let gained: BTreeSet<K> = next.difference(prev).cloned().collect();

    if lost.is_empty() && gained.is_empty() {
        from.remove(&field);
        to.remove(&field);
    } else {
        from.insert(field, wrap(lost));
        to.insert(field, wrap(gained));
    }
}

/// Drop references to elements and groups that are gone and report whether
/// anything the user can see actually changed
fn filter_invisible_changes(
    prev: &ObservedAppState,
    mut next: ObservedAppState,
    elements: &ElementsMap,
) -> (ObservedAppState, bool) {
    let changed = right_differences(&prev.to_partial(), &next.to_partial());
    if changed.is_empty() {
        return (next, false);
    }

    let live_groups: BTreeSet<&GroupId> = elements.non_deleted().flat_map(|e| e.group_ids.iter()).collect();
    let is_live = |id: &ElementId| elements.get(id).is_some_and(|e| !e.is_deleted);

    let mut visible = false;
    for field in changed {
        match field {
            AppStateField::Name | AppStateField::ViewBackgroundColor => visible = true,
            AppStateField::SelectedElementIds => {
                next.selected_element_ids.retain(|id| is_live(id));
                // any survivor is visible, and so is emptying a selection
                visible |= !next.selected_element_ids.is_empty() || !prev.selected_element_ids.is_empty();
            }
            AppStateField::SelectedGroupIds => {
                next.selected_group_ids.retain(|id| live_groups.contains(id));
                visible |= next.selected_group_ids != prev.selected_group_ids;
            }
            AppStateField::EditingGroupId => {
                if next.editing_group_id.as_ref().is_some_and(|id| !live_groups.contains(id)) {
                    next.editing_group_id = None;
                }
                visible |= next.editing_group_id != prev.editing_group_id;
            }
            AppStateField::EditingLinearElementId => {
                if next.editing_linear_element_id.as_ref().is_some_and(|id| !is_live(id)) {
                    next.editing_linear_element_id = None;
                }
                visible |= next.editing_linear_element_id != prev.editing_linear_element_id;
            }
            AppStateField::SelectedLinearElementId => {
                if next.selected_linear_element_id.as_ref().is_some_and(|id| !is_live(id)) {
                    next.selected_linear_element_id = None;
                }
                visible |= next.selected_linear_element_id != prev.selected_linear_element_id;
            }
        }
    }

    if !visible {
        tracing::trace!("app state change only touches deleted elements");
    }
    (next, visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_core::Element;

    fn ids(values: &[&str]) -> BTreeSet<ElementId> {
        values.iter().map(|v| ElementId::from(*v)).collect()
    }

    fn scene(live: &[&str], deleted: &[&str]) -> ElementsMap {
        live.iter()
            .map(|id| Element::rectangle().with_id(*id))
            .chain(deleted.iter().map(|id| Element::rectangle().with_id(*id).deleted()))
            .collect()
    }

    fn selecting(values: &[&str]) -> AppState {
        let mut state = AppState::default();
        state.select(ids(values));
        state
    }

    #[test]
    fn selection_is_stored_as_lost_and_gained() {
        let prev = selecting(&["a", "b"]).observed();
        let next = selecting(&["b", "c"]).observed();

        let change = AppStateChange::calculate(&prev, &next);

        assert_eq!(
            change.delta().from().get(&AppStateField::SelectedElementIds),
            Some(&AppStateValue::ElementIds(ids(&["a"])))
        );
        assert_eq!(
            change.delta().to().get(&AppStateField::SelectedElementIds),
            Some(&AppStateValue::ElementIds(ids(&["c"])))
        );
    }

    #[test]
    fn apply_merges_into_current_selection() {
        let change = AppStateChange::calculate(&selecting(&[]).observed(), &selecting(&["a"]).observed());
        // someone else selected b in the meantime
        let current = selecting(&["b"]);

        let (next, visible) = change.apply_to(&current, &scene(&["a", "b"], &[]));

        assert!(visible);
        assert_eq!(next.selected_element_ids, ids(&["a", "b"]));
    }

    #[test]
    fn selecting_only_deleted_elements_is_invisible() {
        let change = AppStateChange::calculate(&selecting(&[]).observed(), &selecting(&["a", "b"]).observed());

        let (next, visible) = change.apply_to(&AppState::default(), &scene(&[], &["a", "b"]));

        assert!(!visible);
        assert!(next.selected_element_ids.is_empty());
    }

    #[test]
    fn restoring_selection_keeps_survivors() {
        let change = AppStateChange::calculate(&selecting(&["a", "b"]).observed(), &selecting(&[]).observed());

        let (next, visible) = change.inverse().apply_to(&AppState::default(), &scene(&["a"], &["b"]));

        assert!(visible);
        assert_eq!(next.selected_element_ids, ids(&["a"]));
    }

    #[test]
    fn selection_with_a_surviving_id_is_visible() {
        let change = AppStateChange::calculate(&selecting(&["a"]).observed(), &selecting(&["a", "b"]).observed());

        let (next, visible) = change.apply_to(&selecting(&["a"]), &scene(&["a"], &["b"]));

        assert!(visible);
        assert_eq!(next.selected_element_ids, ids(&["a"]));
    }

    #[test]
    fn clearing_selection_is_visible() {
        let change = AppStateChange::calculate(&selecting(&["a"]).observed(), &selecting(&[]).observed());

        let (next, visible) = change.apply_to(&selecting(&["a"]), &scene(&["a"], &[]));

        assert!(visible);
        assert!(next.selected_element_ids.is_empty());
    }

    #[test]
    fn standalone_fields_are_always_visible() {
        let prev = AppState::default();
        let mut renamed = prev.clone();
        renamed.name = "Roadmap".to_string();

        let change = AppStateChange::calculate(&prev.observed(), &renamed.observed());
        let (next, visible) = change.apply_to(&prev, &ElementsMap::new());

        assert!(visible);
        assert_eq!(next.name, "Roadmap");
    }

    #[test]
    fn editing_a_group_without_live_members_is_invisible() {
        let prev = AppState::default();
        let mut editing = prev.clone();
        editing.editing_group_id = Some("g".into());
        let change = AppStateChange::calculate(&prev.observed(), &editing.observed());

        let grouped = Element::rectangle().with_id("a").with_group_ids(vec!["g".into()]);
        let live: ElementsMap = [grouped.clone()].into_iter().collect();
        let gone: ElementsMap = [grouped.deleted()].into_iter().collect();

        let (next, visible) = change.apply_to(&prev, &live);
        assert!(visible);
        assert_eq!(next.editing_group_id, Some(GroupId::from("g")));

        let (next, visible) = change.apply_to(&prev, &gone);
        assert!(!visible);
        assert_eq!(next.editing_group_id, None);
    }

    #[test]
    fn linear_element_reference_is_dropped_when_deleted() {
        let prev = AppState::default();
        let mut editing = prev.clone();
        editing.editing_linear_element_id = Some("line".into());
        let change = AppStateChange::calculate(&prev.observed(), &editing.observed());

        let (next, visible) = change.apply_to(&prev, &scene(&[], &["line"]));

        assert!(!visible);
        assert_eq!(next.editing_linear_element_id, None);
    }

    #[test]
    fn unobserved_state_survives_apply() {
        let change = AppStateChange::calculate(&selecting(&[]).observed(), &selecting(&["a"]).observed());
        let mut current = AppState::default();
        current.zoom = 3.0;

        let (next, _) = change.apply_to(&current, &scene(&["a"], &[]));

        assert_eq!(next.zoom, 3.0);
    }
}
