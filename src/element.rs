//! # Element Store
//!
//! The placeable text elements of a session, kept in stacking order
//! (first element is drawn first, i.e. at the bottom).
//!
//! Positions are display-space pixels relative to the template's top-left
//! corner. Updates addressing an element that no longer exists are ignored:
//! a drag that finishes after the batch was replaced must not fail.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LayoutDefaults;
use crate::error::{OverlayError, Result};
use crate::fields::FieldMap;
use crate::transform::{DisplayPoint, DisplaySize};

/// Smallest font size an element can be given.
pub const MIN_FONT_SIZE_PX: f32 = 1.0;

/// Largest font size an element can be given, in display pixels.
pub const MAX_FONT_SIZE_PX: f32 = 1000.0;

/// Stable element identifier. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// A positioned, styled piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub id: ElementId,
    /// Originating field name. Shown in the editor, never rendered.
    pub label: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size_px: f32,
    pub font_family: String,
    pub color: String,
}

impl TextElement {
    pub fn position(&self) -> DisplayPoint {
        DisplayPoint::new(self.x, self.y)
    }
}

/// Single-attribute style edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum StyleUpdate {
    Text(String),
    FontSize(f32),
    FontFamily(String),
    Color(String),
}

fn sanitize_font_size(size: f32) -> f32 {
    if size.is_nan() {
        MIN_FONT_SIZE_PX
    } else {
        size.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX)
    }
}

/// Ordered collection of text elements.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: Vec<TextElement>,
    next_id: u64,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all elements with one per field, in field order, staggered
    /// vertically from the layout origin.
    pub fn load_fields(&mut self, fields: &FieldMap, layout: &LayoutDefaults) -> &[TextElement] {
        self.elements.clear();
        for (index, (label, value)) in fields.iter().enumerate() {
            let id = self.allocate_id();
            self.elements.push(TextElement {
                id,
                label: label.to_string(),
                text: value.to_string(),
                x: layout.origin_x,
                y: layout.origin_y + layout.stagger * index as f32,
                font_size_px: sanitize_font_size(layout.font_size_px),
                font_family: layout.font_family.clone(),
                color: layout.color.clone(),
            });
        }
        tracing::debug!(count = self.elements.len(), "loaded field batch");
        &self.elements
    }

    /// Drop every element. Identifiers keep counting up.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn elements(&self) -> &[TextElement] {
        &self.elements
    }

    pub fn get(&self, id: ElementId) -> Option<&TextElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn get_mut(&mut self, id: ElementId) -> Result<&mut TextElement> {
        self.elements
            .iter_mut()
            .find(|el| el.id == id)
            .ok_or(OverlayError::UnknownElement(id))
    }

    /// Move an element, clamped to `bounds` when the display size is known
    /// (and to non-negative coordinates otherwise).
    pub fn try_update_position(
        &mut self,
        id: ElementId,
        point: DisplayPoint,
        bounds: Option<DisplaySize>,
    ) -> Result<()> {
        let point = match bounds {
            Some(bounds) => bounds.clamp(point),
            None => DisplaySize::new(f32::INFINITY, f32::INFINITY).clamp(point),
        };
        let element = self.get_mut(id)?;
        element.x = point.x;
        element.y = point.y;
        Ok(())
    }

    /// Like [`Self::try_update_position`], but an unknown id is a silent no-op.
    pub fn update_position(&mut self, id: ElementId, point: DisplayPoint, bounds: Option<DisplaySize>) {
        if let Err(e) = self.try_update_position(id, point, bounds) {
            tracing::debug!("ignoring position update: {}", e);
        }
    }

    pub fn try_update_style(&mut self, id: ElementId, update: StyleUpdate) -> Result<()> {
        let element = self.get_mut(id)?;
        match update {
            StyleUpdate::Text(text) => element.text = text,
            StyleUpdate::FontSize(size) => element.font_size_px = sanitize_font_size(size),
            StyleUpdate::FontFamily(family) => element.font_family = family,
            StyleUpdate::Color(color) => element.color = color,
        }
        Ok(())
    }

    /// Apply one style edit; an unknown id is a silent no-op.
    pub fn update_style(&mut self, id: ElementId, update: StyleUpdate) {
        if let Err(e) = self.try_update_style(id, update) {
            tracing::debug!("ignoring style update: {}", e);
        }
    }

    /// Remove an element. Returns whether it existed.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|el| el.id != id);
        before != self.elements.len()
    }

    /// Move an element to the top of the stack.
    pub fn bring_to_front(&mut self, id: ElementId) {
        if let Some(index) = self.elements.iter().position(|el| el.id == id) {
            let element = self.elements.remove(index);
            self.elements.push(element);
        }
    }

    /// Move an element to the bottom of the stack.
    pub fn send_to_back(&mut self, id: ElementId) {
        if let Some(index) = self.elements.iter().position(|el| el.id == id) {
            let element = self.elements.remove(index);
            self.elements.insert(0, element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loaded_store() -> ElementStore {
        let mut store = ElementStore::new();
        store.load_fields(&FieldMap::sample(), &LayoutDefaults::default());
        store
    }

    fn ids(store: &ElementStore) -> Vec<ElementId> {
        store.elements().iter().map(|el| el.id).collect()
    }

    #[test]
    fn test_load_fields_staggers_in_order() {
        let store = loaded_store();
        let placed: Vec<(&str, f32, f32)> = store
            .elements()
            .iter()
            .map(|el| (el.label.as_str(), el.x, el.y))
            .collect();
        assert_eq!(
            placed,
            vec![("Name", 50.0, 50.0), ("ID", 50.0, 90.0), ("Date", 50.0, 130.0)]
        );
        let first = &store.elements()[0];
        assert_eq!(first.text, "John Doe");
        assert_eq!(first.font_size_px, 24.0);
        assert_eq!(first.font_family, "Arial");
        assert_eq!(first.color, "#000000");
    }

    #[test]
    fn test_configurable_stagger() {
        let layout = LayoutDefaults {
            stagger: 60.0,
            ..Default::default()
        };
        let mut store = ElementStore::new();
        store.load_fields(&FieldMap::sample(), &layout);
        assert_eq!(store.elements()[2].y, 170.0);
    }

    #[test]
    fn test_reload_discards_prior_elements_and_never_reuses_ids() {
        let mut store = loaded_store();
        let first_ids = ids(&store);

        let mut fields = FieldMap::new();
        fields.insert("Only", "one");
        store.load_fields(&fields, &LayoutDefaults::default());

        assert_eq!(store.len(), 1);
        assert_eq!(store.elements()[0].label, "Only");
        assert!(!first_ids.contains(&store.elements()[0].id));
    }

    #[test]
    fn test_update_position_clamps_to_bounds() {
        let mut store = loaded_store();
        let id = store.elements()[0].id;
        let bounds = Some(DisplaySize::new(400.0, 300.0));

        store.update_position(id, DisplayPoint::new(-50.0, 20.0), bounds);
        assert_eq!(store.get(id).unwrap().position(), DisplayPoint::new(0.0, 20.0));

        store.update_position(id, DisplayPoint::new(500.0, 20.0), bounds);
        assert_eq!(store.get(id).unwrap().position(), DisplayPoint::new(400.0, 20.0));
    }

    #[test]
    fn test_update_position_without_bounds_keeps_non_negative() {
        let mut store = loaded_store();
        let id = store.elements()[0].id;
        store.update_position(id, DisplayPoint::new(-5.0, 9000.0), None);
        assert_eq!(store.get(id).unwrap().position(), DisplayPoint::new(0.0, 9000.0));
    }

    #[test]
    fn test_stale_update_is_noop() {
        let mut store = loaded_store();
        let stale = store.elements()[1].id;
        assert!(store.remove(stale));
        let before = store.elements().to_vec();

        store.update_position(stale, DisplayPoint::new(10.0, 10.0), None);
        store.update_style(stale, StyleUpdate::Text("x".to_string()));

        assert_eq!(store.elements(), before.as_slice());
        assert!(matches!(
            store.try_update_position(stale, DisplayPoint::new(1.0, 1.0), None),
            Err(OverlayError::UnknownElement(id)) if id == stale
        ));
    }

    #[test]
    fn test_update_style_touches_one_attribute() {
        let mut store = loaded_store();
        let id = store.elements()[0].id;
        let before = store.get(id).unwrap().clone();

        store.update_style(id, StyleUpdate::Color("#ff0000".to_string()));

        let after = store.get(id).unwrap();
        assert_eq!(after.color, "#ff0000");
        assert_eq!(
            TextElement {
                color: before.color.clone(),
                ..after.clone()
            },
            before
        );
    }

    #[test]
    fn test_font_size_clamped_to_minimum() {
        let mut store = loaded_store();
        let id = store.elements()[0].id;

        store.update_style(id, StyleUpdate::FontSize(0.0));
        assert_eq!(store.get(id).unwrap().font_size_px, MIN_FONT_SIZE_PX);

        store.update_style(id, StyleUpdate::FontSize(-12.0));
        assert_eq!(store.get(id).unwrap().font_size_px, MIN_FONT_SIZE_PX);

        store.update_style(id, StyleUpdate::FontSize(f32::NAN));
        assert_eq!(store.get(id).unwrap().font_size_px, MIN_FONT_SIZE_PX);

        store.update_style(id, StyleUpdate::FontSize(30.0));
        assert_eq!(store.get(id).unwrap().font_size_px, 30.0);
    }

    #[test]
    fn test_font_size_has_an_upper_bound() {
        let mut store = loaded_store();
        let id = store.elements()[0].id;

        store.update_style(id, StyleUpdate::FontSize(1e20));
        assert_eq!(store.get(id).unwrap().font_size_px, MAX_FONT_SIZE_PX);

        store.update_style(id, StyleUpdate::FontSize(f32::INFINITY));
        assert_eq!(store.get(id).unwrap().font_size_px, MAX_FONT_SIZE_PX);

        let layout = LayoutDefaults {
            font_size_px: 5000.0,
            ..Default::default()
        };
        store.load_fields(&FieldMap::sample(), &layout);
        assert!(store.elements().iter().all(|el| el.font_size_px == MAX_FONT_SIZE_PX));
    }

    #[test]
    fn test_edits_do_not_reorder() {
        let mut store = loaded_store();
        let order = ids(&store);
        store.update_style(order[0], StyleUpdate::Text("changed".to_string()));
        store.update_position(order[0], DisplayPoint::new(5.0, 5.0), None);
        assert_eq!(ids(&store), order);
    }

    #[test]
    fn test_explicit_reordering() {
        let mut store = loaded_store();
        let order = ids(&store);

        store.bring_to_front(order[0]);
        assert_eq!(ids(&store), vec![order[1], order[2], order[0]]);

        store.send_to_back(order[0]);
        assert_eq!(ids(&store), order);
    }

    #[test]
    fn test_style_update_wire_format() {
        let update: StyleUpdate =
            serde_json::from_str(r#"{"field": "font_size", "value": 30}"#).unwrap();
        assert_eq!(update, StyleUpdate::FontSize(30.0));
        let update: StyleUpdate =
            serde_json::from_str(r##"{"field": "color", "value": "#00ff00"}"##).unwrap();
        assert_eq!(update, StyleUpdate::Color("#00ff00".to_string()));
    }

    #[test]
    fn test_element_id_display() {
        assert_eq!(ElementId(7).to_string(), "field-7");
    }
}
