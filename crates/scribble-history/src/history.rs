//! Undo/redo stacks of coupled element and app state changes.
//!
//! Both stacks hold entries already inverted into the direction they will be
//! applied in. Before an entry is applied it is refreshed against the live
//! scene, so changes made by other peers since it was recorded are carried
//! over instead of overwritten. Entries whose effect is no longer visible are
//! dropped and the traversal moves on to the next one.

use std::fmt;

use scribble_core::{AppState, CenteredLabels, ElementsMap, LabelLayout};
use serde::{Deserialize, Serialize};

use crate::app_state_change::AppStateChange;
use crate::delta::DeltaSide;
use crate::elements_change::ElementsChange;
use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::store::StoreIncrement;

/// History settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries, unbounded if unset
    pub limit: Option<usize>,
}

/// One undoable unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryEntry {
    elements_change: ElementsChange,
    app_state_change: AppStateChange,
}

impl From<StoreIncrement> for HistoryEntry {
    fn from(increment: StoreIncrement) -> Self {
        Self::new(increment.elements_change, increment.app_state_change)
    }
}

impl HistoryEntry {
    pub fn new(elements_change: ElementsChange, app_state_change: AppStateChange) -> Self {
        Self {
            elements_change,
            app_state_change,
        }
    }

    pub fn elements_change(&self) -> &ElementsChange {
        &self.elements_change
    }

    pub fn app_state_change(&self) -> &AppStateChange {
        &self.app_state_change
    }

    pub fn is_empty(&self) -> bool {
        self.elements_change.is_empty() && self.app_state_change.is_empty()
    }

    pub fn inverse(&self) -> Self {
        Self {
            elements_change: self.elements_change.inverse(),
            app_state_change: self.app_state_change.inverse(),
        }
    }

    pub fn apply_latest_changes(&self, elements: &ElementsMap, side: DeltaSide) -> Result<Self> {
        Ok(Self {
            elements_change: self.elements_change.apply_latest_changes(elements, side)?,
            app_state_change: self.app_state_change.clone(),
        })
    }

    /// Apply both changes; the app state is filtered against the new elements
    pub fn apply_to(
        &self,
        elements: &ElementsMap,
        app_state: &AppState,
        snapshot: &Snapshot,
        layout: &dyn LabelLayout,
    ) -> (ElementsMap, AppState, bool) {
        let (elements, elements_visible) = self.elements_change.apply_to(elements, snapshot.elements(), layout);
        let (app_state, app_state_visible) = self.app_state_change.apply_to(app_state, &elements);
        (elements, app_state, elements_visible || app_state_visible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// Linear undo/redo history
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    config: HistoryConfig,
    layout: Box<dyn LabelLayout>,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_stack", &self.undo_stack.len())
            .field("redo_stack", &self.redo_stack.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            config,
            layout: Box::new(CenteredLabels),
        }
    }

    /// Use a different geometry collaborator for label placement
    pub fn with_layout(mut self, layout: impl LabelLayout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Record a fresh local increment. Clears the redo stack.
    pub fn record(&mut self, increment: StoreIncrement) {
        let entry = HistoryEntry::from(increment);
        if entry.is_empty() {
            return;
        }
        self.undo_stack.push(entry.inverse());
        self.redo_stack.clear();
        self.evict();
        tracing::debug!(undo = self.undo_stack.len(), "recorded history entry");
    }

    /// Undo the most recent entry that still changes something visible
    pub fn undo(
        &mut self,
        elements: &ElementsMap,
        app_state: &AppState,
        snapshot: &Snapshot,
    ) -> Result<Option<(ElementsMap, AppState)>> {
        self.perform(Direction::Undo, elements, app_state, snapshot)
    }

    /// Redo the most recently undone entry that still changes something visible
    pub fn redo(
        &mut self,
        elements: &ElementsMap,
        app_state: &AppState,
        snapshot: &Snapshot,
    ) -> Result<Option<(ElementsMap, AppState)>> {
        self.perform(Direction::Redo, elements, app_state, snapshot)
    }

    fn perform(
        &mut self,
        direction: Direction,
        elements: &ElementsMap,
        app_state: &AppState,
        snapshot: &Snapshot,
    ) -> Result<Option<(ElementsMap, AppState)>> {
        let mut next_elements = elements.clone();
        let mut next_app_state = app_state.clone();

        loop {
            let Some(entry) = self.source_mut(direction).pop() else {
                tracing::debug!(?direction, "nothing visible left to apply");
                return Ok(None);
            };

            let entry = match entry.apply_latest_changes(&next_elements, DeltaSide::From) {
                Ok(latest) => latest,
                Err(err) => {
                    self.source_mut(direction).push(entry);
                    return Err(err);
                }
            };

            let (applied_elements, applied_app_state, visible) =
                entry.apply_to(&next_elements, &next_app_state, snapshot, self.layout.as_ref());
            next_elements = applied_elements;
            next_app_state = applied_app_state;

            if visible {
                self.target_mut(direction).push(entry.inverse());
                self.evict();
                tracing::debug!(
                    ?direction,
                    undo = self.undo_stack.len(),
                    redo = self.redo_stack.len(),
                    "applied history entry"
                );
                return Ok(Some((next_elements, next_app_state)));
            }

            tracing::debug!(?direction, "skipping history entry with no visible effect");
        }
    }

    fn source_mut(&mut self, direction: Direction) -> &mut Vec<HistoryEntry> {
        match direction {
            Direction::Undo => &mut self.undo_stack,
            Direction::Redo => &mut self.redo_stack,
        }
    }

    fn target_mut(&mut self, direction: Direction) -> &mut Vec<HistoryEntry> {
        match direction {
            Direction::Undo => &mut self.redo_stack,
            Direction::Redo => &mut self.undo_stack,
        }
    }

    fn evict(&mut self) {
        let Some(limit) = self.config.limit else {
            return;
        };
        while self.undo_stack.len() > limit {
            self.undo_stack.remove(0);
        }
    }

    /// Whether the undo stack holds any entry
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether the redo stack holds any entry
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop both stacks
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
