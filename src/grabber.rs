//! The invisible full-screen actor that owns keyboard input during a drag.
//!
//! While a window is being dragged the [`InputGrabber`] sits on top of the
//! stage, sized to the whole display, and holds the modal grab so ordinary
//! window shortcuts do not fire.  Four navigation shortcuts are turned into
//! window-movement actions instead, so the user can still shuffle the
//! dragged window with the keyboard:
//!
//! | Shortcut             | Runs                 |
//! |----------------------|----------------------|
//! | `previous-window`    | `move-window-left`   |
//! | `next-window`        | `move-window-right`  |
//! | `previous-workspace` | `move-window-top`    |
//! | `next-workspace`     | `move-window-bottom` |

use crate::geometry::Rect;
use crate::traits::Shell;
use log::debug;

#[derive(Debug, Default)]
pub struct InputGrabber {
    /// Stage area covered while attached.
    bounds: Option<Rect>,
    /// Whether we hold the modal input grab.
    modal: bool,
}

impl InputGrabber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Add the grabber to the stage, covering the full display.
    pub fn attach<S: Shell>(&mut self, shell: &mut S) {
        if self.is_attached() {
            return;
        }
        let bounds = shell.display_bounds();
        shell.insert_input_grabber(bounds);
        self.bounds = Some(bounds);
    }

    pub fn detach<S: Shell>(&mut self, shell: &mut S) {
        if self.bounds.take().is_some() {
            shell.remove_input_grabber();
        }
    }

    /// Take the modal input grab.
    pub fn grab_modal<S: Shell>(&mut self, shell: &mut S) {
        if !self.modal {
            shell.push_modal();
            self.modal = true;
        }
    }

    /// Give the modal input grab back, if we hold it.
    pub fn release_modal<S: Shell>(&mut self, shell: &mut S) {
        if self.modal {
            shell.pop_modal();
            self.modal = false;
        }
    }

    /// Handle a key press delivered to the grabber.
    ///
    /// Runs the remapped movement action for navigation shortcuts.  Always
    /// returns `false`: the event is not claimed, so it keeps propagating
    /// through the normal mapping.
    pub fn handle_key_press<S: Shell>(
        &self,
        shell: &mut S,
        keycode: u32,
        modifiers: u32,
    ) -> Result<bool, S::Error> {
        let Some(action) = shell.resolve_key_action(keycode, modifiers) else {
            return Ok(false);
        };
        if let Some(movement) = action.drag_remap() {
            debug!("key {} during drag: {} -> {}", keycode, action, movement);
            shell.invoke_action(movement)?;
        }
        Ok(false)
    }
}
