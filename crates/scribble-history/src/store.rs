//! Turns committed state transitions into history increments.

use std::fmt;
use std::mem;

use scribble_core::{AppState, ElementsMap};

use crate::app_state_change::AppStateChange;
use crate::elements_change::ElementsChange;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// How the next [`Store::capture`] treats the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreAction {
    /// Diff against the snapshot and emit an increment
    Capture,
    /// Rebase the snapshot without emitting anything
    Update,
    /// Leave the change uncommitted
    #[default]
    None,
}

/// One captured transition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreIncrement {
    pub elements_change: ElementsChange,
    pub app_state_change: AppStateChange,
}

impl StoreIncrement {
    pub fn is_empty(&self) -> bool {
        self.elements_change.is_empty() && self.app_state_change.is_empty()
    }
}

/// Handle returned by [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreIncrement)>;

/// Owns the snapshot and decides when a capture produces an increment
pub struct Store {
    snapshot: Snapshot,
    capture_scheduled: bool,
    update_scheduled: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("snapshot", &self.snapshot)
            .field("capture_scheduled", &self.capture_scheduled)
            .field("update_scheduled", &self.update_scheduled)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::empty(),
            capture_scheduled: false,
            update_scheduled: false,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The last committed state, used as the diffing baseline
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Schedule a diff-and-emit on the next capture
    pub fn should_capture_increment(&mut self) {
        self.capture_scheduled = true;
    }

    /// Schedule a silent snapshot rebase on the next capture
    pub fn should_update_snapshot(&mut self) {
        self.update_scheduled = true;
    }

    /// Set the flag matching `action` for the next capture
    pub fn schedule(&mut self, action: StoreAction) {
        match action {
            StoreAction::Capture => self.should_capture_increment(),
            StoreAction::Update => self.should_update_snapshot(),
            StoreAction::None => {}
        }
    }

    /// Register a listener for emitted increments
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreIncrement) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(subscription, _)| *subscription != id);
        self.listeners.len() != before
    }

    /// Commit the current state if a capture or update was scheduled.
    ///
    /// Both schedules are consumed whatever the outcome. A non-empty
    /// increment is published to subscribers before the snapshot moves and is
    /// also returned.
    pub fn capture(&mut self, elements: &ElementsMap, app_state: &AppState) -> Result<Option<StoreIncrement>> {
        let capture = mem::take(&mut self.capture_scheduled);
        let update = mem::take(&mut self.update_scheduled);
        if !capture && !update {
            return Ok(None);
        }

        let observed = app_state.observed();
        let Some(next) = self.snapshot.maybe_clone(Some(elements), Some(&observed)) else {
            tracing::trace!(capture, "nothing changed since the last snapshot");
            return Ok(None);
        };

        let mut emitted = None;
        if capture {
            let increment = self.calculate_increment(&next)?;
            if !increment.is_empty() {
                tracing::debug!(
                    elements = increment.elements_change.len(),
                    app_state = !increment.app_state_change.is_empty(),
                    "captured increment"
                );
                for (_, listener) in &mut self.listeners {
                    listener(&increment);
                }
                emitted = Some(increment);
            }
        }

        self.snapshot = next;
        Ok(emitted)
    }

    fn calculate_increment(&self, next: &Snapshot) -> Result<StoreIncrement> {
        let meta = next.meta();
        let elements_change = if meta.did_elements_change {
            ElementsChange::calculate(self.snapshot.elements(), next.elements())?
        } else {
            ElementsChange::empty()
        };
        let app_state_change = if meta.did_app_state_change {
            AppStateChange::calculate(self.snapshot.app_state(), next.app_state())
        } else {
            AppStateChange::empty()
        };
        Ok(StoreIncrement {
            elements_change,
            app_state_change,
        })
    }

    /// Shield uncommitted local edits from an incoming replacement.
    ///
    /// For every element in both `prev` and `next`: if the snapshot has no
    /// entry for it, it was never committed and is dropped from `next`; if the
    /// snapshot entry is older than `prev`, a local gesture is in progress and
    /// the snapshot entry replaces the incoming one.
    pub fn ignore_uncommitted_elements(&self, prev: &ElementsMap, next: ElementsMap) -> ElementsMap {
        let mut next = next;
        let committed = self.snapshot.elements();

        for (id, local) in prev.iter() {
            if !next.contains(id) {
                continue;
            }
            match committed.get(id) {
                None => {
                    tracing::trace!(%id, "dropping uncommitted element");
                    next.remove(id);
                }
                Some(snapshot) if snapshot.version < local.version => {
                    tracing::trace!(%id, "keeping committed version of element under local edit");
                    next.insert_arc(snapshot.clone());
                }
                Some(_) => {}
            }
        }
        next
    }

    /// Forget the snapshot and any pending schedule
    pub fn clear(&mut self) {
        self.snapshot = Snapshot::empty();
        self.capture_scheduled = false;
        self.update_scheduled = false;
    }
}
