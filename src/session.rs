//! The single drag session.
//!
//! A drag is either in progress, with a dragged window, the container it
//! belongs to and a grab anchor, or it is not and none of those exist.
//! [`DragSession`] encodes that as an `Option<ActiveDrag>` so the fields can
//! never be observed out of sync.

use crate::event::{ContainerId, WindowId};
use crate::geometry::Anchor;

/// Everything known about the drag in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    /// The window under the pointer.
    pub window: WindowId,
    /// Container the window returns to on drop.  Updated when the window
    /// changes workspace during the drag.
    pub original_parent: ContainerId,
    /// Grab point as a fraction of the window size.
    pub anchor: Anchor,
}

/// Drag state owned by the [`DragController`](crate::controller::DragController).
#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_progress(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut ActiveDrag> {
        self.active.as_mut()
    }

    pub fn dragged_window(&self) -> Option<WindowId> {
        self.active.as_ref().map(|d| d.window)
    }

    pub(crate) fn begin(&mut self, drag: ActiveDrag) {
        self.active = Some(drag);
    }

    /// Clear the session, returning what was in it.
    pub(crate) fn finish(&mut self) -> Option<ActiveDrag> {
        self.active.take()
    }
}
