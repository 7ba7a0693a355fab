//! Core traits that decouple tiledrag from any specific compositor or
//! transport mechanism.
//!
//! Every concrete backend (the in-memory [`HeadlessShell`](crate::headless::HeadlessShell),
//! a Unix-socket listener, a test harness, …) implements one of these traits.
//! The [`DragController`](crate::controller::DragController) only depends on
//! these abstractions.

use crate::event::{
    ContainerId, Cursor, DragEvent, KeyBindingAction, Tileable, WindowId, WorkspaceId,
};
use crate::geometry::{MonitorInfo, Point, Rect};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Token identifying one subscription to a window's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

/// Abstraction over the windowing environment a drag runs in.
///
/// One trait covers every collaborator the drag engine talks to: the window
/// collection, the compositor stage, the workspace manager, the timer and
/// the key-action table.  They are always provided by the same host, and a
/// single trait keeps the controller generic over one parameter.
///
/// Queries about a specific window are fallible because the window may
/// disappear at any time; everything else is expected to succeed.
pub trait Shell {
    /// The error type produced by this shell.
    type Error: std::error::Error + Send + 'static;

    //  Window collection

    /// Every managed window, in collection order.
    fn windows(&self) -> Vec<WindowId>;

    /// Subscribe to `window`'s own event stream.  The host starts delivering
    /// [`DragEvent::WindowMotion`] for it.
    fn subscribe_window(&mut self, window: WindowId) -> SubscriptionToken;

    /// Release a subscription returned by [`subscribe_window`](Shell::subscribe_window).
    fn unsubscribe(&mut self, token: SubscriptionToken);

    //  Window handle

    /// Allocation of `window` in its parent's coordinate space.
    fn window_geometry(&self, window: WindowId) -> Result<Rect, Self::Error>;

    /// Bounds of `window` in stage coordinates.
    fn stage_geometry(&self, window: WindowId) -> Result<Rect, Self::Error>;

    fn set_window_position(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), Self::Error>;

    /// Stop the parent container from recomputing the window's allocation.
    fn freeze_layout(&mut self, window: WindowId) -> Result<(), Self::Error>;

    fn unfreeze_layout(&mut self, window: WindowId) -> Result<(), Self::Error>;

    /// Current parent actor of `window`, or `None` when it is unparented.
    fn parent(&self, window: WindowId) -> Result<Option<ContainerId>, Self::Error>;

    /// Move `window` under `container`, keeping its stage position.
    fn reparent(&mut self, window: WindowId, container: ContainerId) -> Result<(), Self::Error>;

    fn is_visible(&self, window: WindowId) -> Result<bool, Self::Error>;

    /// Re-evaluate whether the native window behind `window` should be shown.
    fn refresh_visibility(&mut self, window: WindowId) -> Result<(), Self::Error>;

    /// Whether `window` is backed by a native window.  Placeholders are not.
    fn has_native_window(&self, window: WindowId) -> Result<bool, Self::Error>;

    /// Whether `window` currently follows another window's position (as
    /// composite and placeholder windows do).
    fn follows_other_window(&self, window: WindowId) -> Result<bool, Self::Error>;

    /// Workspace that currently owns `window`.
    fn window_workspace(&self, window: WindowId) -> Result<WorkspaceId, Self::Error>;

    /// Change the native window's workspace membership directly.
    fn move_native_window(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), Self::Error>;

    //  Workspace manager

    fn monitors(&self) -> Vec<MonitorInfo>;

    /// Usable area of `monitor` (bounds minus panels, docks, …).
    fn work_area(&self, monitor: usize) -> Rect;

    /// The workspace currently shown on the primary monitor.
    fn active_primary_workspace(&self) -> WorkspaceId;

    /// Workspaces assigned to the monitor with the given index, in order.
    fn workspaces_of_monitor(&self, monitor: usize) -> Vec<WorkspaceId>;

    /// Index of the monitor `workspace` is shown on.
    fn workspace_monitor(&self, workspace: WorkspaceId) -> usize;

    /// The tiling container that parents `workspace`'s tiles.
    fn tiling_container(&self, workspace: WorkspaceId) -> ContainerId;

    /// Ordered tile list of `workspace`.
    fn tileables(&self, workspace: WorkspaceId) -> Vec<Tileable>;

    /// Remove `window` from its current workspace's tile list and append it
    /// to `workspace`'s.
    fn assign_to_workspace(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), Self::Error>;

    /// Swap the positions of `a` and `b` in `workspace`'s tile order.
    fn swap_tileables(
        &mut self,
        workspace: WorkspaceId,
        a: WindowId,
        b: WindowId,
    ) -> Result<(), Self::Error>;

    //  Stage

    /// Current pointer position in stage coordinates.
    fn pointer(&self) -> Point;

    /// Bounds of the whole display area.
    fn display_bounds(&self) -> Rect;

    /// Cancel the compositor's own grab operation.
    fn end_native_grab(&mut self);

    /// Add the invisible input-grabber actor covering `bounds` to the stage.
    fn insert_input_grabber(&mut self, bounds: Rect);

    fn remove_input_grabber(&mut self);

    /// Route all input exclusively to the input grabber.
    fn push_modal(&mut self);

    fn pop_modal(&mut self);

    fn set_cursor(&mut self, cursor: Cursor);

    /// Raise `window` above every other actor.
    fn raise_window(&mut self, window: WindowId) -> Result<(), Self::Error>;

    //  Timer

    /// Monotonic clock used for throttling.
    fn now(&self) -> Instant;

    /// Deliver a single [`DragEvent::PollTick`] after `delay`.
    fn schedule_poll(&mut self, delay: Duration);

    //  Key-action table

    /// Resolve a physical key and modifier state to a logical action.
    fn resolve_key_action(&self, keycode: u32, modifiers: u32) -> Option<KeyBindingAction>;

    /// Run the handler bound to `action`.
    fn invoke_action(&mut self, action: KeyBindingAction) -> Result<(), Self::Error>;
}

//  Event Source

/// A source of [`DragEvent`]s.
///
/// Implementations listen on some transport (a Unix socket, a compositor
/// bridge, an in-memory channel, …) and forward parsed events into the
/// provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received event must be sent through `sink` exactly once, in
///   arrival order.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`DragEvent`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<DragEvent>) -> Result<(), Self::Error>;
}
