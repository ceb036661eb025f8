//! # Drag Controller
//!
//! Turns pointer gestures into element moves. At most one element is
//! dragged at a time:
//!
//! ```text
//! Idle --pointer_down (hit)--> Dragging --pointer_up--> Idle (one commit)
//!                               |    ^
//!                               +----+ pointer_move (live position only)
//! ```
//!
//! While dragging, the element store is not touched; the live position is
//! available through [`DragController::live_position`] for previews. Releasing
//! the pointer commits exactly one position update.

use crate::element::{ElementId, ElementStore, TextElement};
use crate::render::font::TextMeasure;
use crate::transform::{DisplayPoint, DisplaySize};

/// Drag state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: ElementId,
        /// Pointer position minus element origin at pointer-down.
        grab_offset: DisplayPoint,
        /// Live (uncommitted) element origin.
        current: DisplayPoint,
    },
}

/// Committed drag result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCommit {
    pub id: ElementId,
    pub position: DisplayPoint,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

fn hit(element: &TextElement, pointer: DisplayPoint, measure: &dyn TextMeasure) -> bool {
    let (width, height) = measure.measure(&element.text, &element.font_family, element.font_size_px);
    pointer.x >= element.x
        && pointer.x <= element.x + width
        && pointer.y >= element.y
        && pointer.y <= element.y + height
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Element currently being dragged.
    pub fn dragged(&self) -> Option<ElementId> {
        match self.state {
            DragState::Dragging { id, .. } => Some(id),
            DragState::Idle => None,
        }
    }

    /// Start dragging the topmost element under `pointer`. Ignored while a
    /// drag is already in progress. Returns the grabbed element.
    pub fn pointer_down(
        &mut self,
        pointer: DisplayPoint,
        store: &ElementStore,
        measure: &dyn TextMeasure,
    ) -> Option<ElementId> {
        if self.is_dragging() {
            return None;
        }
        let element = store
            .elements()
            .iter()
            .rev()
            .find(|el| hit(el, pointer, measure))?;

        self.state = DragState::Dragging {
            id: element.id,
            grab_offset: DisplayPoint::new(pointer.x - element.x, pointer.y - element.y),
            current: element.position(),
        };
        tracing::trace!("drag start {}", element.id);
        Some(element.id)
    }

    /// Follow the pointer, keeping the element origin inside `bounds`.
    pub fn pointer_move(&mut self, pointer: DisplayPoint, bounds: Option<DisplaySize>) {
        if let DragState::Dragging {
            grab_offset,
            current,
            ..
        } = &mut self.state
        {
            let target = DisplayPoint::new(pointer.x - grab_offset.x, pointer.y - grab_offset.y);
            *current = match bounds {
                Some(bounds) => bounds.clamp(target),
                None => target,
            };
        }
    }

    /// Finish the drag and commit the final position to `store`.
    ///
    /// The element may have disappeared during the drag (new batch, new
    /// template); the commit is then a no-op.
    pub fn pointer_up(
        &mut self,
        store: &mut ElementStore,
        bounds: Option<DisplaySize>,
    ) -> Option<DragCommit> {
        let DragState::Dragging { id, current, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        store.update_position(id, current, bounds);
        tracing::trace!("drag end {} at ({}, {})", id, current.x, current.y);
        Some(DragCommit {
            id,
            position: current,
        })
    }

    /// Abandon the drag without committing.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Position to preview for `id`: the live drag position while it is being
    /// dragged, otherwise `None`.
    pub fn live_position(&self, id: ElementId) -> Option<DisplayPoint> {
        match self.state {
            DragState::Dragging {
                id: dragged,
                current,
                ..
            } if dragged == id => Some(current),
            _ => None,
        }
    }
}
