//! The editing runtime: live scene, store and history wired together.

use std::mem;

use scribble_core::{AppState, Element, ElementId, ElementsMap, LabelLayout};
use scribble_history::{History, Store, StoreAction, StoreIncrement, SubscriptionId};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::remote::reconcile_remote;

/// One participant's view of a shared document
#[derive(Debug)]
pub struct Session {
    elements: ElementsMap,
    app_state: AppState,
    store: Store,
    history: History,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        let app_state = AppState {
            name: config.document_name.clone(),
            ..AppState::default()
        };
        Self {
            elements: ElementsMap::new(),
            app_state,
            store: Store::new(),
            history: History::new(config.history.clone()),
        }
    }

    /// Use a different geometry collaborator for label placement
    pub fn with_layout(mut self, layout: impl LabelLayout + 'static) -> Self {
        self.history = mem::take(&mut self.history).with_layout(layout);
        self
    }

    pub fn elements(&self) -> &ElementsMap {
        &self.elements
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id).map(|e| e.as_ref())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Listen for increments recorded by this session
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreIncrement) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Replace the whole document without recording history
    pub fn load(&mut self, elements: ElementsMap, app_state: AppState) -> Result<()> {
        self.elements = elements;
        self.app_state = app_state;
        self.history.clear();
        self.store.clear();
        self.store.should_update_snapshot();
        self.store.capture(&self.elements, &self.app_state)?;
        Ok(())
    }

    /// Mutate the live scene, then commit according to `action`.
    ///
    /// [`StoreAction::None`] leaves the edit uncommitted, as during a drag;
    /// the next capturing edit records it.
    pub fn edit<R>(
        &mut self,
        action: StoreAction,
        edit: impl FnOnce(&mut ElementsMap, &mut AppState) -> R,
    ) -> Result<R> {
        let result = edit(&mut self.elements, &mut self.app_state);
        self.commit(action)?;
        Ok(result)
    }

    /// Commit the live scene according to `action`
    pub fn commit(&mut self, action: StoreAction) -> Result<()> {
        self.store.schedule(action);
        if let Some(increment) = self.store.capture(&self.elements, &self.app_state)? {
            self.history.record(increment);
        }
        Ok(())
    }

    /// Merge elements received from another peer.
    ///
    /// Remote edits never become history entries. Elements under an
    /// uncommitted local edit keep their local value and their committed
    /// snapshot entry. Returns the number of accepted elements.
    pub fn apply_remote(&mut self, remote: impl IntoIterator<Item = Element>) -> Result<usize> {
        let remote: Vec<Element> = remote
            .into_iter()
            .filter(|element| {
                let pending = self.has_uncommitted_edit(&element.id);
                if pending {
                    tracing::debug!(id = %element.id, "remote copy arrived mid-edit, keeping local");
                }
                !pending
            })
            .collect();

        let (merged, accepted) = reconcile_remote(&self.elements, remote);
        if accepted == 0 {
            return Ok(0);
        }

        let committed = self.store.ignore_uncommitted_elements(&self.elements, merged.clone());
        let committed_state = self.app_state.with_observed(self.store.snapshot().app_state().clone());
        self.elements = merged;

        self.store.should_update_snapshot();
        self.store.capture(&committed, &committed_state)?;
        tracing::debug!(accepted, "applied remote update");
        Ok(accepted)
    }

    fn has_uncommitted_edit(&self, id: &ElementId) -> bool {
        let Some(local) = self.elements.get(id) else {
            return false;
        };
        self.store
            .snapshot()
            .elements()
            .get(id)
            .is_none_or(|committed| committed.version < local.version)
    }

    /// Undo the most recent visible entry. Returns false if there was none.
    pub fn undo(&mut self) -> Result<bool> {
        let result = self
            .history
            .undo(&self.elements, &self.app_state, self.store.snapshot())?;
        self.adopt(result)
    }

    /// Redo the most recently undone visible entry. Returns false if there was none.
    pub fn redo(&mut self) -> Result<bool> {
        let result = self
            .history
            .redo(&self.elements, &self.app_state, self.store.snapshot())?;
        self.adopt(result)
    }

    fn adopt(&mut self, result: Option<(ElementsMap, AppState)>) -> Result<bool> {
        let Some((elements, app_state)) = result else {
            return Ok(false);
        };
        self.elements = elements;
        self.app_state = app_state;
        self.store.should_update_snapshot();
        self.store.capture(&self.elements, &self.app_state)?;
        Ok(true)
    }
}
