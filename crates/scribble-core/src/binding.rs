//! Bound text (labels) and their host containers.
//!
//! A label and its container reference each other by id only: the container
//! lists the label in `bound_elements`, the label names the container in
//! `container_id`. Both sides are resolved through an [`ElementsMap`] at the
//! time they are needed, never through embedded pointers.

use crate::element::{BoundElementKind, Element, ElementId, ElementKind};
use crate::elements::ElementsMap;

/// Kinds that can host a text label
pub fn is_text_bindable(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Rectangle | ElementKind::Diamond | ElementKind::Ellipse | ElementKind::Arrow
    )
}

/// Id of the label bound to `element`, if it lists one
pub fn bound_text_id(element: &Element) -> Option<&ElementId> {
    element
        .bound_elements
        .iter()
        .find(|b| b.kind == BoundElementKind::Text)
        .map(|b| &b.id)
}

/// Element is a container currently hosting a label
pub fn is_text_container(element: &Element) -> bool {
    is_text_bindable(element.kind) && bound_text_id(element).is_some()
}

/// Element is a label bound to a container
pub fn is_bound_text(element: &Element) -> bool {
    element.kind == ElementKind::Text && element.container_id.is_some()
}

/// Look up the container of a bound label
pub fn container_of<'a>(label: &Element, elements: &'a ElementsMap) -> Option<&'a Element> {
    let id = label.container_id.as_ref()?;
    elements.get(id).map(|e| e.as_ref())
}

/// Look up the label hosted by a container
pub fn label_of<'a>(container: &Element, elements: &'a ElementsMap) -> Option<&'a Element> {
    let id = bound_text_id(container)?;
    elements.get(id).map(|e| e.as_ref())
}

/// Geometry collaborator positioning a label relative to its container
pub trait LabelLayout {
    /// Returns the repositioned label, or `None` if it already sits where it should
    fn layout(&self, container: &Element, label: &Element) -> Option<Element>;
}

/// Centers labels on the container's bounding box (or the midpoint of a linear element)
#[derive(Debug, Clone, Copy, Default)]
pub struct CenteredLabels;

const EPSILON: f64 = 1e-6;

impl LabelLayout for CenteredLabels {
    fn layout(&self, container: &Element, label: &Element) -> Option<Element> {
        let (cx, cy) = center_of(container);
        let x = cx - label.width / 2.0;
        let y = cy - label.height / 2.0;

        if (label.x - x).abs() < EPSILON && (label.y - y).abs() < EPSILON {
            return None;
        }
        Some(label.updated_with(|l| {
            l.x = x;
            l.y = y;
        }))
    }
}

fn center_of(element: &Element) -> (f64, f64) {
    if element.kind.is_linear() {
        if let (Some(first), Some(last)) = (element.points.first(), element.points.last()) {
            return (
                element.x + (first.x + last.x) / 2.0,
                element.y + (first.y + last.y) / 2.0,
            );
        }
    }
    (element.x + element.width / 2.0, element.y + element.height / 2.0)
}
