//! Events and types used throughout tiledrag.
//!
//! This module defines the vocabulary that all components share:
//! [`DragEvent`] describes everything the compositor can tell the
//! [`DragController`](crate::controller::DragController), and the id
//! newtypes, [`GrabOp`], [`KeyBindingAction`], [`Cursor`] and [`Tileable`]
//! provide the supporting data types.
//!
//! Events arrive as JSON over the IPC socket, so every type here is
//! serde-compatible.  Key-binding action names are parsed leniently
//! (e.g. "next-window", "NextWindow", "next_window").

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque handle of a managed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

/// Opaque handle of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub u64);

/// Opaque handle of an actor that can parent windows: a workspace's tiling
/// container, the stage's top layer, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workspace#{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Kind of native grab operation announced by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrabOp {
    /// Pointer-driven window move.  The only operation we take over.
    Moving,
    /// Keyboard-driven window move.
    KeyboardMoving,
    /// Pointer-driven resize.
    Resizing,
}

/// Cursor shapes the controller asks the compositor to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    Default,
    DndInDrag,
}

/// Anything that can occupy a slot in a workspace's tile list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tileable {
    /// A managed window, with or without a native backing window.
    Window(WindowId),
    /// Any other tileable (e.g. a nested layout container).  Never a swap
    /// target.
    Other(u64),
}

impl Tileable {
    /// The window behind this tileable, if it is one.
    pub fn window(&self) -> Option<WindowId> {
        match self {
            Tileable::Window(w) => Some(*w),
            Tileable::Other(_) => None,
        }
    }
}

/// Logical key-binding actions known to the key-action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyBindingAction {
    PreviousWindow,
    NextWindow,
    PreviousWorkspace,
    NextWorkspace,
    MoveWindowLeft,
    MoveWindowRight,
    MoveWindowTop,
    MoveWindowBottom,
}

impl KeyBindingAction {
    /// The movement action a navigation action turns into while a window is
    /// being dragged, or `None` for actions that pass through untouched.
    pub fn drag_remap(self) -> Option<KeyBindingAction> {
        match self {
            KeyBindingAction::PreviousWindow => Some(KeyBindingAction::MoveWindowLeft),
            KeyBindingAction::NextWindow => Some(KeyBindingAction::MoveWindowRight),
            KeyBindingAction::PreviousWorkspace => Some(KeyBindingAction::MoveWindowTop),
            KeyBindingAction::NextWorkspace => Some(KeyBindingAction::MoveWindowBottom),
            _ => None,
        }
    }
}

impl fmt::Display for KeyBindingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyBindingAction::PreviousWindow => "previous-window",
            KeyBindingAction::NextWindow => "next-window",
            KeyBindingAction::PreviousWorkspace => "previous-workspace",
            KeyBindingAction::NextWorkspace => "next-workspace",
            KeyBindingAction::MoveWindowLeft => "move-window-left",
            KeyBindingAction::MoveWindowRight => "move-window-right",
            KeyBindingAction::MoveWindowTop => "move-window-top",
            KeyBindingAction::MoveWindowBottom => "move-window-bottom",
        };
        f.write_str(name)
    }
}

/// Parse an action name (case-insensitive; accepts "next-window", "NextWindow", "next_window").
pub fn parse_action(s: &str) -> Option<KeyBindingAction> {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "previouswindow" => Some(KeyBindingAction::PreviousWindow),
        "nextwindow" => Some(KeyBindingAction::NextWindow),
        "previousworkspace" => Some(KeyBindingAction::PreviousWorkspace),
        "nextworkspace" => Some(KeyBindingAction::NextWorkspace),
        "movewindowleft" => Some(KeyBindingAction::MoveWindowLeft),
        "movewindowright" => Some(KeyBindingAction::MoveWindowRight),
        "movewindowtop" => Some(KeyBindingAction::MoveWindowTop),
        "movewindowbottom" => Some(KeyBindingAction::MoveWindowBottom),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for KeyBindingAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_action(&s)
            .ok_or_else(|| DeError::custom(format!("invalid key-binding action: {:?}", s)))
    }
}

/// Everything the compositor, window collection and workspace manager can
/// report to the [`DragController`](crate::controller::DragController).
///
/// Events are consumed one at a time, to completion, on a single thread.
///
/// # Wire format
///
/// ```json
/// {"GrabBegin":{"window":3,"op":"Moving"}}
/// {"Motion":{"x":812.0,"y":440.5}}
/// {"ButtonRelease":{"x":812.0,"y":440.5}}
/// {"KeyPress":{"keycode":113,"modifiers":64}}
/// "ActiveWorkspaceChanged"
/// "PollTick"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DragEvent {
    /// The compositor started a native grab operation on `window`.
    GrabBegin { window: WindowId, op: GrabOp },

    /// Captured stage-wide pointer motion.
    Motion { x: f64, y: f64 },

    /// Captured stage-wide button release.
    ButtonRelease { x: f64, y: f64 },

    /// Pointer motion delivered to a specific window's event stream.
    ///
    /// Only windows the controller has subscribed to produce this event.
    /// `state` is the raw modifier/button bitmask of the event.
    WindowMotion { window: WindowId, state: u32 },

    /// A key press routed to the input grabber.
    KeyPress { keycode: u32, modifiers: u32 },

    /// The active workspace changed.
    ActiveWorkspaceChanged,

    /// A new managed window appeared.
    WindowCreated(WindowId),

    /// A managed window went away.
    WindowDestroyed(WindowId),

    /// The poll timer requested via
    /// [`Shell::schedule_poll`](crate::traits::Shell::schedule_poll) fired.
    PollTick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_display() {
        assert_eq!(KeyBindingAction::PreviousWindow.to_string(), "previous-window");
        assert_eq!(KeyBindingAction::NextWorkspace.to_string(), "next-workspace");
        assert_eq!(KeyBindingAction::MoveWindowBottom.to_string(), "move-window-bottom");
    }

    #[test]
    fn action_parsing_is_lenient() {
        assert_eq!(parse_action("next-window"), Some(KeyBindingAction::NextWindow));
        assert_eq!(parse_action("NextWindow"), Some(KeyBindingAction::NextWindow));
        assert_eq!(parse_action(" move_window_top "), Some(KeyBindingAction::MoveWindowTop));
        assert_eq!(parse_action("close-window"), None);
    }

    #[test]
    fn display_round_trips_through_parser() {
        for action in [
            KeyBindingAction::PreviousWindow,
            KeyBindingAction::NextWindow,
            KeyBindingAction::PreviousWorkspace,
            KeyBindingAction::NextWorkspace,
            KeyBindingAction::MoveWindowLeft,
            KeyBindingAction::MoveWindowRight,
            KeyBindingAction::MoveWindowTop,
            KeyBindingAction::MoveWindowBottom,
        ] {
            assert_eq!(parse_action(&action.to_string()), Some(action));
        }
    }

    #[test]
    fn navigation_actions_remap_to_moves() {
        use KeyBindingAction::*;
        assert_eq!(PreviousWindow.drag_remap(), Some(MoveWindowLeft));
        assert_eq!(NextWindow.drag_remap(), Some(MoveWindowRight));
        assert_eq!(PreviousWorkspace.drag_remap(), Some(MoveWindowTop));
        assert_eq!(NextWorkspace.drag_remap(), Some(MoveWindowBottom));
        assert_eq!(MoveWindowLeft.drag_remap(), None);
    }

    #[test]
    fn events_parse_from_wire_format() {
        let e: DragEvent =
            serde_json::from_str(r#"{"GrabBegin":{"window":3,"op":"Moving"}}"#).unwrap();
        assert_eq!(
            e,
            DragEvent::GrabBegin {
                window: WindowId(3),
                op: GrabOp::Moving
            }
        );
        let e: DragEvent = serde_json::from_str(r#"{"Motion":{"x":12.5,"y":40.0}}"#).unwrap();
        assert_eq!(e, DragEvent::Motion { x: 12.5, y: 40.0 });
        let e: DragEvent = serde_json::from_str(r#""PollTick""#).unwrap();
        assert_eq!(e, DragEvent::PollTick);
        let e: DragEvent = serde_json::from_str(r#"{"WindowDestroyed":7}"#).unwrap();
        assert_eq!(e, DragEvent::WindowDestroyed(WindowId(7)));
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<DragEvent>(r#""Explode""#).is_err());
    }

    #[test]
    fn tileable_window_accessor() {
        assert_eq!(Tileable::Window(WindowId(4)).window(), Some(WindowId(4)));
        assert_eq!(Tileable::Other(4).window(), None);
    }
}
