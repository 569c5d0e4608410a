//! Field-level access for the two tracked domains: elements and the observed
//! slice of app state.
//!
//! Volatile identity fields of an element (`id`, `version`, `version_nonce`,
//! `updated`, `seed`) have no [`ElementField`], so they never appear in a delta.

use std::collections::BTreeSet;

use scribble_core::{
    BoundElement, Element, ElementId, ElementKind, FractionalIndex, GroupId, ObservedAppState, Point,
};

use crate::delta::{Diffable, Partial};

/// Element fields tracked by history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementField {
    Kind,
    X,
    Y,
    Width,
    Height,
    Angle,
    StrokeColor,
    BackgroundColor,
    StrokeWidth,
    Opacity,
    Index,
    GroupIds,
    FrameId,
    BoundElements,
    ContainerId,
    Text,
    FontSize,
    Points,
    Link,
    Locked,
    CustomData,
    IsDeleted,
}

impl ElementField {
    pub const ALL: [ElementField; 22] = [
        ElementField::Kind,
        ElementField::X,
        ElementField::Y,
        ElementField::Width,
        ElementField::Height,
        ElementField::Angle,
        ElementField::StrokeColor,
        ElementField::BackgroundColor,
        ElementField::StrokeWidth,
        ElementField::Opacity,
        ElementField::Index,
        ElementField::GroupIds,
        ElementField::FrameId,
        ElementField::BoundElements,
        ElementField::ContainerId,
        ElementField::Text,
        ElementField::FontSize,
        ElementField::Points,
        ElementField::Link,
        ElementField::Locked,
        ElementField::CustomData,
        ElementField::IsDeleted,
    ];

    /// Structural or opaque fields whose recorded delta values are kept when a
    /// delta is refreshed from the live scene
    pub fn keeps_recorded_value(self) -> bool {
        matches!(
            self,
            ElementField::BoundElements | ElementField::GroupIds | ElementField::CustomData
        )
    }
}

/// Value of a single element field
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Kind(ElementKind),
    Number(f64),
    Text(String),
    OptionalText(Option<String>),
    Flag(bool),
    Index(Option<FractionalIndex>),
    GroupIds(Vec<GroupId>),
    BoundElements(Vec<BoundElement>),
    Reference(Option<ElementId>),
    Points(Vec<Point>),
    CustomData(Option<serde_json::Value>),
}

impl ElementValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ElementValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_group_ids(&self) -> Option<&[GroupId]> {
        match self {
            ElementValue::GroupIds(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_bound_elements(&self) -> Option<&[BoundElement]> {
        match self {
            ElementValue::BoundElements(bound) => Some(bound),
            _ => None,
        }
    }
}

/// An element stripped down to the fields that changed
pub type ElementPartial = Partial<Element>;

/// `is_deleted` as recorded in a partial, if present
pub fn partial_is_deleted(partial: &ElementPartial) -> Option<bool> {
    partial.get(&ElementField::IsDeleted).and_then(ElementValue::as_flag)
}

impl Diffable for Element {
    type Field = ElementField;
    type Value = ElementValue;

    fn fields() -> &'static [ElementField] {
        &ElementField::ALL
    }

    fn get(&self, field: ElementField) -> ElementValue {
        match field {
            ElementField::Kind => ElementValue::Kind(self.kind),
            ElementField::X => ElementValue::Number(self.x),
            ElementField::Y => ElementValue::Number(self.y),
            ElementField::Width => ElementValue::Number(self.width),
            ElementField::Height => ElementValue::Number(self.height),
            ElementField::Angle => ElementValue::Number(self.angle),
            ElementField::StrokeColor => ElementValue::Text(self.stroke_color.clone()),
            ElementField::BackgroundColor => ElementValue::Text(self.background_color.clone()),
            ElementField::StrokeWidth => ElementValue::Number(self.stroke_width),
            ElementField::Opacity => ElementValue::Number(self.opacity),
            ElementField::Index => ElementValue::Index(self.index.clone()),
            ElementField::GroupIds => ElementValue::GroupIds(self.group_ids.clone()),
            ElementField::FrameId => ElementValue::Reference(self.frame_id.clone()),
            ElementField::BoundElements => ElementValue::BoundElements(self.bound_elements.clone()),
            ElementField::ContainerId => ElementValue::Reference(self.container_id.clone()),
            ElementField::Text => ElementValue::Text(self.text.clone()),
            ElementField::FontSize => ElementValue::Number(self.font_size),
            ElementField::Points => ElementValue::Points(self.points.clone()),
            ElementField::Link => ElementValue::OptionalText(self.link.clone()),
            ElementField::Locked => ElementValue::Flag(self.locked),
            ElementField::CustomData => ElementValue::CustomData(self.custom_data.clone()),
            ElementField::IsDeleted => ElementValue::Flag(self.is_deleted),
        }
    }

    fn set(&mut self, field: ElementField, value: ElementValue) {
        match (field, value) {
            (ElementField::Kind, ElementValue::Kind(v)) => self.kind = v,
            (ElementField::X, ElementValue::Number(v)) => self.x = v,
            (ElementField::Y, ElementValue::Number(v)) => self.y = v,
            (ElementField::Width, ElementValue::Number(v)) => self.width = v,
            (ElementField::Height, ElementValue::Number(v)) => self.height = v,
            (ElementField::Angle, ElementValue::Number(v)) => self.angle = v,
            (ElementField::StrokeColor, ElementValue::Text(v)) => self.stroke_color = v,
            (ElementField::BackgroundColor, ElementValue::Text(v)) => self.background_color = v,
            (ElementField::StrokeWidth, ElementValue::Number(v)) => self.stroke_width = v,
            (ElementField::Opacity, ElementValue::Number(v)) => self.opacity = v,
            (ElementField::Index, ElementValue::Index(v)) => self.index = v,
            (ElementField::GroupIds, ElementValue::GroupIds(v)) => self.group_ids = v,
            (ElementField::FrameId, ElementValue::Reference(v)) => self.frame_id = v,
            (ElementField::BoundElements, ElementValue::BoundElements(v)) => self.bound_elements = v,
            (ElementField::ContainerId, ElementValue::Reference(v)) => self.container_id = v,
            (ElementField::Text, ElementValue::Text(v)) => self.text = v,
            (ElementField::FontSize, ElementValue::Number(v)) => self.font_size = v,
            (ElementField::Points, ElementValue::Points(v)) => self.points = v,
            (ElementField::Link, ElementValue::OptionalText(v)) => self.link = v,
            (ElementField::Locked, ElementValue::Flag(v)) => self.locked = v,
            (ElementField::CustomData, ElementValue::CustomData(v)) => self.custom_data = v,
            (ElementField::IsDeleted, ElementValue::Flag(v)) => self.is_deleted = v,
            (field, value) => {
                tracing::warn!(?field, ?value, "ignoring element value of mismatched type");
            }
        }
    }

    fn field_eq(&self, other: &Self, field: ElementField) -> bool {
        match field {
            ElementField::Kind => self.kind == other.kind,
            ElementField::X => self.x == other.x,
            ElementField::Y => self.y == other.y,
            ElementField::Width => self.width == other.width,
            ElementField::Height => self.height == other.height,
            ElementField::Angle => self.angle == other.angle,
            ElementField::StrokeColor => self.stroke_color == other.stroke_color,
            ElementField::BackgroundColor => self.background_color == other.background_color,
            ElementField::StrokeWidth => self.stroke_width == other.stroke_width,
            ElementField::Opacity => self.opacity == other.opacity,
            ElementField::Index => self.index == other.index,
            ElementField::GroupIds => self.group_ids == other.group_ids,
            ElementField::FrameId => self.frame_id == other.frame_id,
            ElementField::BoundElements => self.bound_elements == other.bound_elements,
            ElementField::ContainerId => self.container_id == other.container_id,
            ElementField::Text => self.text == other.text,
            ElementField::FontSize => self.font_size == other.font_size,
            ElementField::Points => self.points == other.points,
            ElementField::Link => self.link == other.link,
            ElementField::Locked => self.locked == other.locked,
            ElementField::CustomData => self.custom_data == other.custom_data,
            ElementField::IsDeleted => self.is_deleted == other.is_deleted,
        }
    }
}

/// Observed app state fields tracked by history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AppStateField {
    Name,
    ViewBackgroundColor,
    EditingGroupId,
    SelectedElementIds,
    SelectedGroupIds,
    EditingLinearElementId,
    SelectedLinearElementId,
}

impl AppStateField {
    pub const ALL: [AppStateField; 7] = [
        AppStateField::Name,
        AppStateField::ViewBackgroundColor,
        AppStateField::EditingGroupId,
        AppStateField::SelectedElementIds,
        AppStateField::SelectedGroupIds,
        AppStateField::EditingLinearElementId,
        AppStateField::SelectedLinearElementId,
    ];

    /// Fields visible regardless of which elements exist
    pub fn is_standalone(self) -> bool {
        matches!(self, AppStateField::Name | AppStateField::ViewBackgroundColor)
    }
}

/// Value of a single observed app state field
#[derive(Debug, Clone, PartialEq)]
pub enum AppStateValue {
    Text(String),
    Group(Option<GroupId>),
    Element(Option<ElementId>),
    ElementIds(BTreeSet<ElementId>),
    GroupIds(BTreeSet<GroupId>),
}

impl Diffable for ObservedAppState {
    type Field = AppStateField;
    type Value = AppStateValue;

    fn fields() -> &'static [AppStateField] {
        &AppStateField::ALL
    }

    fn get(&self, field: AppStateField) -> AppStateValue {
        match field {
            AppStateField::Name => AppStateValue::Text(self.name.clone()),
            AppStateField::ViewBackgroundColor => AppStateValue::Text(self.view_background_color.clone()),
            AppStateField::EditingGroupId => AppStateValue::Group(self.editing_group_id.clone()),
            AppStateField::SelectedElementIds => AppStateValue::ElementIds(self.selected_element_ids.clone()),
            AppStateField::SelectedGroupIds => AppStateValue::GroupIds(self.selected_group_ids.clone()),
            AppStateField::EditingLinearElementId => {
                AppStateValue::Element(self.editing_linear_element_id.clone())
            }
            AppStateField::SelectedLinearElementId => {
                AppStateValue::Element(self.selected_linear_element_id.clone())
            }
        }
    }

    fn set(&mut self, field: AppStateField, value: AppStateValue) {
        match (field, value) {
            (AppStateField::Name, AppStateValue::Text(v)) => self.name = v,
            (AppStateField::ViewBackgroundColor, AppStateValue::Text(v)) => self.view_background_color = v,
            (AppStateField::EditingGroupId, AppStateValue::Group(v)) => self.editing_group_id = v,
            (AppStateField::SelectedElementIds, AppStateValue::ElementIds(v)) => self.selected_element_ids = v,
            (AppStateField::SelectedGroupIds, AppStateValue::GroupIds(v)) => self.selected_group_ids = v,
            (AppStateField::EditingLinearElementId, AppStateValue::Element(v)) => {
                self.editing_linear_element_id = v
            }
            (AppStateField::SelectedLinearElementId, AppStateValue::Element(v)) => {
                self.selected_linear_element_id = v
            }
            (field, value) => {
                tracing::warn!(?field, ?value, "ignoring app state value of mismatched type");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Delta;

    #[test]
    fn element_get_set_round_trips_every_field() {
        let source = Element::text("label")
            .with_id("t")
            .at(3.0, 4.0)
            .with_index("a5")
            .with_container("box")
            .with_group_ids(vec!["g".into()]);
        let mut target = Element::rectangle().with_id("t");

        for field in ElementField::ALL {
            target.set(field, source.get(field));
        }

        // volatile fields are not tracked
        target.version = source.version;
        target.version_nonce = source.version_nonce;
        target.updated = source.updated;
        target.seed = source.seed;
        assert_eq!(target, source);
    }

    #[test]
    fn volatile_fields_never_show_up_in_a_delta() {
        let element = Element::rectangle().with_id("a");
        let bumped = element.updated_with(|_| {});

        assert_ne!(element.version, bumped.version);
        assert!(Delta::calculate(&element, &bumped).is_empty());
    }

    #[test]
    fn mismatched_value_is_ignored() {
        let mut element = Element::rectangle();
        element.set(ElementField::X, ElementValue::Flag(true));
        assert_eq!(element.x, 0.0);
    }

    #[test]
    fn partial_is_deleted_reads_flag() {
        let partial: ElementPartial = [(ElementField::IsDeleted, ElementValue::Flag(true))].into();
        assert_eq!(partial_is_deleted(&partial), Some(true));
        assert_eq!(partial_is_deleted(&ElementPartial::new()), None);
    }

    #[test]
    fn observed_app_state_diff_tracks_selection() {
        let prev = ObservedAppState::default();
        let mut next = prev.clone();
        next.selected_element_ids.insert("a".into());

        let delta = Delta::calculate(&prev, &next);

        assert_eq!(delta.to().len(), 1);
        assert!(delta.contains(AppStateField::SelectedElementIds));
    }
}
