//! Element types for scribble.
//!
//! An [`Element`] is a plain value. Edits never happen in place on a shared
//! element: [`Element::updated_with`] returns a new value with a bumped
//! `version` and a fresh `version_nonce`, which is how the rest of the system
//! tells a real edit apart from a reconstructed-but-equal value.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Element identifier - stable across versions and peers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Group identifier - elements sharing a group id are selected and moved together
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Different kinds of elements on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Rectangle,
    Diamond,
    Ellipse,
    Arrow,
    Line,
    Freedraw,
    Text,
    Image,
    Frame,
}

impl ElementKind {
    /// Get display name for status output
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Rectangle => "rectangle",
            ElementKind::Diamond => "diamond",
            ElementKind::Ellipse => "ellipse",
            ElementKind::Arrow => "arrow",
            ElementKind::Line => "line",
            ElementKind::Freedraw => "freedraw",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Frame => "frame",
        }
    }

    /// Kinds whose geometry is a polyline of `points`
    pub fn is_linear(self) -> bool {
        matches!(self, ElementKind::Arrow | ElementKind::Line)
    }
}

/// What kind of element holds a back-reference in `bound_elements`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundElementKind {
    Text,
    Arrow,
}

/// Back-reference from a host element to an element bound to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: BoundElementKind,
}

impl BoundElement {
    pub fn text(id: impl Into<ElementId>) -> Self {
        Self { id: id.into(), kind: BoundElementKind::Text }
    }

    pub fn arrow(id: impl Into<ElementId>) -> Self {
        Self { id: id.into(), kind: BoundElementKind::Arrow }
    }
}

/// A point relative to the element origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordering key that determines stacking order among elements.
///
/// Keys compare lexicographically; [`FractionalIndex::after`] produces a key
/// that sorts after `self` and before any key `self` is not a prefix of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FractionalIndex(pub String);

impl FractionalIndex {
    pub fn first() -> Self {
        Self("a0".to_string())
    }

    pub fn after(&self) -> Self {
        Self(format!("{}V", self.0))
    }
}

impl From<&str> for FractionalIndex {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A drawable element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub stroke_color: String,
    pub background_color: String,
    pub stroke_width: f64,
    pub opacity: f64,
    pub index: Option<FractionalIndex>,
    pub group_ids: Vec<GroupId>,
    pub frame_id: Option<ElementId>,
    pub bound_elements: Vec<BoundElement>,
    pub container_id: Option<ElementId>,
    pub text: String,
    pub font_size: f64,
    pub points: Vec<Point>,
    pub link: Option<String>,
    pub locked: bool,
    pub custom_data: Option<serde_json::Value>,
    pub is_deleted: bool,
    pub version: u32,
    pub version_nonce: u32,
    /// Last update time in milliseconds since the unix epoch
    pub updated: u64,
    pub seed: u32,
}

impl Element {
    /// Create a new element of the given kind with a fresh id
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            angle: 0.0,
            stroke_color: "#1e1e1e".to_string(),
            background_color: "transparent".to_string(),
            stroke_width: 1.0,
            opacity: 100.0,
            index: None,
            group_ids: Vec::new(),
            frame_id: None,
            bound_elements: Vec::new(),
            container_id: None,
            text: String::new(),
            font_size: 20.0,
            points: Vec::new(),
            link: None,
            locked: false,
            custom_data: None,
            is_deleted: false,
            version: 1,
            version_nonce: rand::random(),
            updated: now_millis(),
            seed: rand::random(),
        }
    }

    pub fn rectangle() -> Self {
        Self::new(ElementKind::Rectangle)
    }

    pub fn text(content: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Text);
        element.text = content.into();
        element.width = 60.0;
        element.height = 25.0;
        element
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_index(mut self, index: impl Into<FractionalIndex>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_stroke_color(mut self, color: impl Into<String>) -> Self {
        self.stroke_color = color.into();
        self
    }

    pub fn with_group_ids(mut self, group_ids: Vec<GroupId>) -> Self {
        self.group_ids = group_ids;
        self
    }

    pub fn with_bound_elements(mut self, bound_elements: Vec<BoundElement>) -> Self {
        self.bound_elements = bound_elements;
        self
    }

    pub fn with_container(mut self, container_id: impl Into<ElementId>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Mark this value as a new edit: bump `version`, regenerate `version_nonce`
    pub fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.version_nonce = rand::random();
        self.updated = now_millis();
    }

    /// Create an edited copy of this element
    pub fn updated_with(&self, edit: impl FnOnce(&mut Element)) -> Element {
        let mut next = self.clone();
        edit(&mut next);
        next.bump_version();
        next
    }

    /// Create a copy with the tombstone flag set
    pub fn deleted(&self) -> Element {
        self.updated_with(|e| e.is_deleted = true)
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new(ElementKind::Rectangle)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
