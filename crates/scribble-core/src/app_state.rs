//! Editor UI state and the slice of it that history tracks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, GroupId};

/// Active drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Selection,
    Rectangle,
    Diamond,
    Ellipse,
    Arrow,
    Line,
    Freedraw,
    Text,
    Eraser,
    Hand,
}

/// Full UI state owned by the editor runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    pub name: String,
    pub view_background_color: String,
    pub editing_group_id: Option<GroupId>,
    pub selected_element_ids: BTreeSet<ElementId>,
    pub selected_group_ids: BTreeSet<GroupId>,
    pub editing_linear_element_id: Option<ElementId>,
    pub selected_linear_element_id: Option<ElementId>,
    pub active_tool: Tool,
    pub zoom: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub open_dialog: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            view_background_color: "#ffffff".to_string(),
            editing_group_id: None,
            selected_element_ids: BTreeSet::new(),
            selected_group_ids: BTreeSet::new(),
            editing_linear_element_id: None,
            selected_linear_element_id: None,
            active_tool: Tool::default(),
            zoom: 1.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            open_dialog: None,
        }
    }
}

impl AppState {
    /// Project the fields whose changes are visible in the document
    pub fn observed(&self) -> ObservedAppState {
        ObservedAppState {
            name: self.name.clone(),
            view_background_color: self.view_background_color.clone(),
            editing_group_id: self.editing_group_id.clone(),
            selected_element_ids: self.selected_element_ids.clone(),
            selected_group_ids: self.selected_group_ids.clone(),
            editing_linear_element_id: self.editing_linear_element_id.clone(),
            selected_linear_element_id: self.selected_linear_element_id.clone(),
        }
    }

    /// Overwrite the observed fields, keeping everything else (tool, zoom, scroll...)
    pub fn with_observed(&self, observed: ObservedAppState) -> AppState {
        AppState {
            name: observed.name,
            view_background_color: observed.view_background_color,
            editing_group_id: observed.editing_group_id,
            selected_element_ids: observed.selected_element_ids,
            selected_group_ids: observed.selected_group_ids,
            editing_linear_element_id: observed.editing_linear_element_id,
            selected_linear_element_id: observed.selected_linear_element_id,
            ..self.clone()
        }
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.selected_element_ids = ids.into_iter().collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected_element_ids.clear();
        self.selected_group_ids.clear();
    }
}

/// The slice of [`AppState`] that produces undoable history entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedAppState {
    pub name: String,
    pub view_background_color: String,
    pub editing_group_id: Option<GroupId>,
    pub selected_element_ids: BTreeSet<ElementId>,
    pub selected_group_ids: BTreeSet<GroupId>,
    pub editing_linear_element_id: Option<ElementId>,
    pub selected_linear_element_id: Option<ElementId>,
}

impl Default for ObservedAppState {
    fn default() -> Self {
        AppState::default().observed()
    }
}
