//! JSON scenario scripts replayed through a session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use scribble_core::{AppState, Element, ElementId, ElementsMap};
use scribble_history::StoreAction;
use scribble_session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scripted editing session
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Document loaded before the first step, without history
    #[serde(default)]
    pub elements: Vec<Element>,
    pub steps: Vec<Step>,
}

/// One scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Create an element, optionally selecting it
    Add {
        element: Element,
        #[serde(default)]
        select: bool,
    },
    /// Merge `patch` into an element and record it
    Update { id: ElementId, patch: Value },
    Delete { id: ElementId },
    Select { ids: Vec<ElementId> },
    /// Like `update`, but left uncommitted until the next `commit`
    Gesture { id: ElementId, patch: Value },
    Commit,
    /// Elements received from another peer
    Remote { elements: Vec<Element> },
    /// Another peer patches its copy of an element
    RemoteEdit { id: ElementId, patch: Value },
    Undo,
    Redo,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Add { .. } => "add",
            Step::Update { .. } => "update",
            Step::Delete { .. } => "delete",
            Step::Select { .. } => "select",
            Step::Gesture { .. } => "gesture",
            Step::Commit => "commit",
            Step::Remote { .. } => "remote",
            Step::RemoteEdit { .. } => "remote_edit",
            Step::Undo => "undo",
            Step::Redo => "redo",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Load the initial document into `session`
    pub fn prepare(&self, session: &mut Session) -> Result<()> {
        if self.elements.is_empty() {
            return Ok(());
        }
        let mut elements: ElementsMap = self.elements.iter().cloned().collect();
        elements.sort_by_fractional_index();
        let app_state = AppState {
            name: session.app_state().name.clone(),
            ..AppState::default()
        };
        session.load(elements, app_state)?;
        Ok(())
    }
}

/// Run one step, returning a short description of what happened
pub fn apply_step(session: &mut Session, step: &Step) -> Result<String> {
    let outcome = match step {
        Step::Add { element, select } => {
            let id = session.edit(StoreAction::Capture, |elements, app_state| {
                let id = elements.push(element.clone());
                if *select {
                    app_state.select([id.clone()]);
                }
                id
            })?;
            format!("added {id}")
        }
        Step::Update { id, patch } => {
            let patched = patch_element(current(session, id)?, patch)?;
            session.edit(StoreAction::Capture, |elements, _| elements.mutate(id, |e| *e = patched))?;
            format!("updated {id}")
        }
        Step::Delete { id } => {
            current(session, id)?;
            session.edit(StoreAction::Capture, |elements, app_state| {
                elements.mutate(id, |e| e.is_deleted = true);
                app_state.selected_element_ids.remove(id);
            })?;
            format!("deleted {id}")
        }
        Step::Select { ids } => {
            session.edit(StoreAction::Capture, |_, app_state| app_state.select(ids.iter().cloned()))?;
            format!("selected {} element(s)", ids.len())
        }
        Step::Gesture { id, patch } => {
            let patched = patch_element(current(session, id)?, patch)?;
            session.edit(StoreAction::None, |elements, _| elements.mutate(id, |e| *e = patched))?;
            format!("moving {id} (uncommitted)")
        }
        Step::Commit => {
            session.commit(StoreAction::Capture)?;
            "committed".to_string()
        }
        Step::Remote { elements } => {
            let accepted = session.apply_remote(elements.iter().cloned())?;
            format!("accepted {accepted} of {} remote element(s)", elements.len())
        }
        Step::RemoteEdit { id, patch } => {
            let current = current(session, id)?;
            let patched = patch_element(current, patch)?;
            let remote = current.updated_with(|e| *e = patched);
            let accepted = session.apply_remote([remote])?;
            format!("accepted {accepted} remote edit(s) of {id}")
        }
        Step::Undo => match session.undo()? {
            true => "undone".to_string(),
            false => "nothing to undo".to_string(),
        },
        Step::Redo => match session.redo()? {
            true => "redone".to_string(),
            false => "nothing to redo".to_string(),
        },
    };
    Ok(outcome)
}

fn current<'a>(session: &'a Session, id: &ElementId) -> Result<&'a Element> {
    match session.element(id) {
        Some(element) => Ok(element),
        None => bail!("Unknown element {id}"),
    }
}

/// Merge the fields of a JSON object into an element, keeping its id
fn patch_element(element: &Element, patch: &Value) -> Result<Element> {
    let Some(fields) = patch.as_object() else {
        bail!("Patch for {} must be a JSON object", element.id);
    };
    let mut value = serde_json::to_value(element).context("Failed to serialize element")?;
    if let Some(target) = value.as_object_mut() {
        for (key, field) in fields {
            target.insert(key.clone(), field.clone());
        }
    }
    let mut patched: Element =
        serde_json::from_value(value).with_context(|| format!("Invalid patch for {}", element.id))?;
    patched.id = element.id.clone();
    Ok(patched)
}

/// Scene state printed after each step
#[derive(Debug, Serialize)]
pub struct SceneSummary {
    pub step: usize,
    pub op: &'static str,
    pub outcome: String,
    pub elements: Vec<ElementSummary>,
    pub selected: Vec<ElementId>,
    pub undo: usize,
    pub redo: usize,
}

#[derive(Debug, Serialize)]
pub struct ElementSummary {
    pub id: ElementId,
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    pub stroke_color: String,
    pub version: u32,
    pub deleted: bool,
}

impl SceneSummary {
    pub fn capture(step: usize, op: &'static str, outcome: String, session: &Session) -> Self {
        let elements = session
            .elements()
            .values()
            .map(|e| ElementSummary {
                id: e.id.clone(),
                kind: e.kind.name(),
                x: e.x,
                y: e.y,
                stroke_color: e.stroke_color.clone(),
                version: e.version,
                deleted: e.is_deleted,
            })
            .collect();
        Self {
            step,
            op,
            outcome,
            elements,
            selected: session.app_state().selected_element_ids.iter().cloned().collect(),
            undo: session.history().undo_len(),
            redo: session.history().redo_len(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("[{}] {}: {}\n", self.step, self.op, self.outcome);
        for element in &self.elements {
            out.push_str(&format!(
                "  {:<12} {:<10} ({}, {}) {}{}\n",
                element.id,
                element.kind,
                element.x,
                element.y,
                element.stroke_color,
                if element.deleted { " [deleted]" } else { "" }
            ));
        }
        if !self.selected.is_empty() {
            let selected: Vec<&str> = self.selected.iter().map(ElementId::as_str).collect();
            out.push_str(&format!("  selected: {}\n", selected.join(", ")));
        }
        out.push_str(&format!("  history: {} undo / {} redo", self.undo, self.redo));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_session::SessionConfig;

    const SCRIPT: &str = r##"{
        "name": "remote interference",
        "elements": [],
        "steps": [
            { "op": "add", "element": { "id": "a", "type": "rectangle" } },
            { "op": "add", "element": { "id": "b", "type": "ellipse" } },
            { "op": "update", "id": "b", "patch": { "strokeColor": "#e03131" } },
            { "op": "remote_edit", "id": "b", "patch": { "isDeleted": true } },
            { "op": "undo" },
            { "op": "undo" }
        ]
    }"##;

    fn run(script: &str) -> (Session, Vec<String>) {
        let scenario: Scenario = serde_json::from_str(script).unwrap();
        let mut session = Session::new(&SessionConfig::default());
        scenario.prepare(&mut session).unwrap();
        let outcomes = scenario
            .steps
            .iter()
            .map(|step| apply_step(&mut session, step).unwrap())
            .collect();
        (session, outcomes)
    }

    #[test]
    fn parses_tagged_steps() {
        let scenario: Scenario = serde_json::from_str(SCRIPT).unwrap();

        assert_eq!(scenario.name.as_deref(), Some("remote interference"));
        let ops: Vec<&str> = scenario.steps.iter().map(Step::name).collect();
        assert_eq!(ops, vec!["add", "add", "update", "remote_edit", "undo", "undo"]);
    }

    #[test]
    fn replay_skips_invisible_entries() {
        let (session, outcomes) = run(SCRIPT);

        assert_eq!(outcomes[4], "undone");
        assert_eq!(outcomes[5], "nothing to undo");
        assert!(session.elements().non_deleted().next().is_none());
    }

    #[test]
    fn patch_keeps_id_and_unpatched_fields() {
        let element = Element::rectangle().with_id("a").at(5.0, 6.0);

        let patched = patch_element(&element, &serde_json::json!({ "id": "other", "x": 40.0 })).unwrap();

        assert_eq!(patched.id, ElementId::from("a"));
        assert_eq!((patched.x, patched.y), (40.0, 6.0));
    }

    #[test]
    fn patch_must_be_object() {
        let element = Element::rectangle();
        assert!(patch_element(&element, &serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn unknown_element_is_an_error() {
        let mut session = Session::new(&SessionConfig::default());
        let step = Step::Delete { id: "ghost".into() };
        assert!(apply_step(&mut session, &step).is_err());
    }

    #[test]
    fn loads_scenario_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        fs::write(&path, SCRIPT).unwrap();

        let scenario = Scenario::load(&path).unwrap();

        assert_eq!(scenario.steps.len(), 6);
        assert!(Scenario::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn summary_renders_deleted_marker() {
        let (session, _) = run(SCRIPT);
        let summary = SceneSummary::capture(6, "undo", "nothing to undo".to_string(), &session);

        let text = summary.render();

        assert!(text.starts_with("[6] undo: nothing to undo"));
        assert!(text.contains("[deleted]"));
        assert!(text.ends_with("history: 0 undo / 1 redo"));
    }
}
