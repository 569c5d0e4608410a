//! Core types for scribble: elements, the ordered element collection and UI state.

pub mod app_state;
pub mod binding;
pub mod element;
pub mod elements;

pub use app_state::{AppState, ObservedAppState, Tool};
pub use binding::{CenteredLabels, LabelLayout};
pub use element::{
    BoundElement, BoundElementKind, Element, ElementId, ElementKind, FractionalIndex, GroupId, Point,
};
pub use elements::ElementsMap;
