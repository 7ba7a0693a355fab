//! The drag state machine.
//!
//! [`DragController`] owns the [`DragSession`], the [`InputGrabber`], the
//! hit-test [`Throttle`] and the per-window subscriptions, and reacts to
//! [`DragEvent`]s by driving the [`Shell`].
//!
//! ```text
//!            GrabBegin(Moving) / WindowMotion(drag state)
//!   Idle ───────────────────────────────────────────────▶ Dragging
//!    ▲                                                   │  Motion, PollTick,
//!    │          ButtonRelease / WindowDestroyed          │  KeyPress,
//!    └───────────────────────────────────────────────────┘  ActiveWorkspaceChanged
//! ```
//!
//! Events that make no sense in the current state are dropped.  When a
//! collaborator call about the dragged window fails mid-drag the session is
//! force-ended, so the controller never stays stuck in `Dragging`.

use crate::config::DragConfig;
use crate::event::{Cursor, DragEvent, GrabOp, WindowId};
use crate::geometry::{Anchor, Point};
use crate::grabber::InputGrabber;
use crate::placement::check_under_pointer;
use crate::session::{ActiveDrag, DragSession};
use crate::subscription::WindowSubscriptions;
use crate::throttle::Throttle;
use crate::traits::Shell;
use log::{debug, info, warn};

/// Possible errors from the controller.
#[derive(Debug, thiserror::Error)]
pub enum DragError {
    /// The shell returned an error.
    #[error("shell error: {0}")]
    Shell(String),

    /// A drag was requested while another one is in progress.
    #[error("{0} is already being dragged")]
    AlreadyDragging(WindowId),

    /// A drag was ended while none is in progress.
    #[error("no drag in progress")]
    NotDragging,
}

fn shell_err<E: std::error::Error>(e: E) -> DragError {
    DragError::Shell(e.to_string())
}

/// Drives drag-and-drop tiling.
///
/// The controller is generic over any [`Shell`] implementation, making it
/// independent of any concrete compositor.
///
/// # Typical usage
///
/// ```ignore
/// let shell = HeadlessShell::from_layout(Layout::sample(), Instant::now());
/// let mut controller = DragController::new(shell, DragConfig::default());
/// controller.handle(DragEvent::GrabBegin { window: WindowId(1), op: GrabOp::Moving })?;
/// controller.handle(DragEvent::Motion { x: 800.0, y: 400.0 })?;
/// controller.handle(DragEvent::ButtonRelease { x: 800.0, y: 400.0 })?;
/// ```
pub struct DragController<S: Shell> {
    shell: S,
    config: DragConfig,
    session: DragSession,
    grabber: InputGrabber,
    hit_test: Throttle,
    subscriptions: WindowSubscriptions,
}

impl<S: Shell> DragController<S> {
    /// Create a controller and subscribe to every window the shell manages.
    pub fn new(mut shell: S, config: DragConfig) -> Self {
        let mut subscriptions = WindowSubscriptions::new();
        subscriptions.sync(&mut shell);
        Self {
            hit_test: Throttle::new(config.hit_test_interval()),
            shell,
            config,
            session: DragSession::new(),
            grabber: InputGrabber::new(),
            subscriptions,
        }
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn is_dragging(&self) -> bool {
        self.session.in_progress()
    }

    pub fn subscriptions(&self) -> &WindowSubscriptions {
        &self.subscriptions
    }

    /// Process a single [`DragEvent`].
    pub fn handle(&mut self, event: DragEvent) -> Result<(), DragError> {
        match event {
            DragEvent::GrabBegin { window, op } => self.on_grab_begin(window, op),

            DragEvent::Motion { x, y } => self.on_motion(Point::new(x, y)),

            DragEvent::ButtonRelease { .. } => {
                if self.session.in_progress() {
                    self.end_drag()
                } else {
                    debug!("button release without drag, ignored");
                    Ok(())
                }
            }

            DragEvent::WindowMotion { window, state } => self.on_window_motion(window, state),

            DragEvent::KeyPress { keycode, modifiers } => {
                if !self.session.in_progress() {
                    debug!("key press without drag, ignored");
                    return Ok(());
                }
                self.grabber
                    .handle_key_press(&mut self.shell, keycode, modifiers)
                    .map_err(shell_err)?;
                Ok(())
            }

            DragEvent::ActiveWorkspaceChanged => self.on_workspace_changed(),

            DragEvent::WindowCreated(window) => {
                let added = self.subscriptions.sync(&mut self.shell);
                debug!(
                    "{} created, {} new subscription(s), {} total",
                    window,
                    added,
                    self.subscriptions.len()
                );
                Ok(())
            }

            DragEvent::WindowDestroyed(window) => {
                self.subscriptions.release(&mut self.shell, window);
                if self.session.dragged_window() == Some(window) {
                    warn!("{} destroyed while dragged", window);
                    self.abort_drag();
                }
                Ok(())
            }

            DragEvent::PollTick => self.on_poll_tick(),
        }
    }

    /// Start dragging `window` from the current pointer position.
    pub fn start_drag(&mut self, window: WindowId) -> Result<(), DragError> {
        if let Some(current) = self.session.dragged_window() {
            return Err(DragError::AlreadyDragging(current));
        }

        let original_parent = self
            .shell
            .parent(window)
            .map_err(shell_err)?
            .ok_or_else(|| DragError::Shell(format!("{} has no parent", window)))?;
        let bounds = self.shell.stage_geometry(window).map_err(shell_err)?;
        let pointer = self.shell.pointer();
        let anchor = Anchor::from_pointer(pointer, &bounds);
        debug!("anchor of {}: ({:.3}, {:.3})", window, anchor.fx, anchor.fy);

        info!("start dragging {}", window);
        self.grabber.attach(&mut self.shell);
        self.session.begin(ActiveDrag {
            window,
            original_parent,
            anchor,
        });

        let result = self.lift(window, anchor, pointer);
        self.or_abort(result)?;

        self.grabber.grab_modal(&mut self.shell);
        self.shell.set_cursor(Cursor::DndInDrag);
        Ok(())
    }

    /// Drop the dragged window into its current target container.
    pub fn end_drag(&mut self) -> Result<(), DragError> {
        let drag = self.session.active().cloned().ok_or(DragError::NotDragging)?;

        self.grabber.release_modal(&mut self.shell);
        self.grabber.detach(&mut self.shell);
        let restored = self
            .shell
            .unfreeze_layout(drag.window)
            .and_then(|_| self.shell.reparent(drag.window, drag.original_parent))
            .map_err(shell_err);
        self.session.finish();
        self.refresh_all_visibility();
        self.shell.set_cursor(Cursor::Default);

        info!("dropped {} into {}", drag.window, drag.original_parent);
        restored
    }

    //  Event handlers

    fn on_grab_begin(&mut self, window: WindowId, op: GrabOp) -> Result<(), DragError> {
        if op != GrabOp::Moving {
            debug!("grab {:?} on {}, not a move", op, window);
            return Ok(());
        }
        if self.session.in_progress() {
            debug!("grab on {} during a drag, ignored", window);
            return Ok(());
        }
        match self.shell.follows_other_window(window) {
            Ok(false) => {}
            Ok(true) => {
                debug!("{} follows another window, leaving the grab alone", window);
                return Ok(());
            }
            Err(e) => {
                debug!("grab on unmanaged {}: {}", window, e);
                return Ok(());
            }
        }
        self.shell.end_native_grab();
        self.start_drag(window)
    }

    fn on_motion(&mut self, pointer: Point) -> Result<(), DragError> {
        let Some(drag) = self.session.active() else {
            return Ok(());
        };
        let (window, anchor) = (drag.window, drag.anchor);
        let result = self
            .follow_pointer(window, anchor, pointer)
            .and_then(|_| self.throttled_hit_test());
        self.or_abort(result)
    }

    fn on_window_motion(&mut self, window: WindowId, state: u32) -> Result<(), DragError> {
        if self.session.in_progress() {
            return Ok(());
        }
        if !self.subscriptions.is_subscribed(window) {
            debug!("motion from unsubscribed {}, ignored", window);
            return Ok(());
        }
        if state != self.config.placeholder_drag_state {
            return Ok(());
        }
        self.start_drag(window)
    }

    fn on_workspace_changed(&mut self) -> Result<(), DragError> {
        let Some(window) = self.session.dragged_window() else {
            return Ok(());
        };
        let result = self.follow_active_workspace(window);
        self.or_abort(result)
    }

    fn on_poll_tick(&mut self) -> Result<(), DragError> {
        if !self.session.in_progress() {
            debug!("poll tick after drag ended, loop stops");
            return Ok(());
        }
        let result = self.throttled_hit_test();
        self.or_abort(result)?;
        self.shell.schedule_poll(self.config.poll_interval());
        Ok(())
    }

    //  Drag steps

    /// Detach `window` from the layout and put it under the pointer.
    fn lift(&mut self, window: WindowId, anchor: Anchor, pointer: Point) -> Result<(), DragError> {
        self.shell.freeze_layout(window).map_err(shell_err)?;
        self.refresh_all_visibility();
        self.shell.raise_window(window).map_err(shell_err)?;
        self.throttled_hit_test()?;
        self.shell.schedule_poll(self.config.poll_interval());
        self.follow_pointer(window, anchor, pointer)
    }

    /// Keep `anchor` of `window` under `pointer`.
    fn follow_pointer(
        &mut self,
        window: WindowId,
        anchor: Anchor,
        pointer: Point,
    ) -> Result<(), DragError> {
        let size = self.shell.window_geometry(window).map_err(shell_err)?;
        let (x, y) = anchor.position_under(pointer, size.width, size.height);
        self.shell.set_window_position(window, x, y).map_err(shell_err)
    }

    /// Run a hit-test pass unless one ran within the throttle interval.
    fn throttled_hit_test(&mut self) -> Result<(), DragError> {
        let now = self.shell.now();
        let tie_break = self.config.tie_break;
        let (shell, session) = (&mut self.shell, &mut self.session);
        let pass = self.hit_test.call(now, || match session.active_mut() {
            Some(drag) => check_under_pointer(shell, drag, tie_break).map(Some),
            None => Ok(None),
        });
        if let Some(placement) = pass.transpose().map_err(shell_err)?.flatten() {
            if placement.rehomed_to.is_some() || placement.swapped_with.is_some() {
                debug!("hit-test: {:?}", placement);
            }
        }
        Ok(())
    }

    /// Move the dragged window along with an active-workspace switch.
    fn follow_active_workspace(&mut self, window: WindowId) -> Result<(), DragError> {
        let target = self.shell.active_primary_workspace();
        if self.shell.window_workspace(window).map_err(shell_err)? != target {
            if self.shell.has_native_window(window).map_err(shell_err)? {
                self.shell.move_native_window(window, target).map_err(shell_err)?;
            } else {
                self.shell.assign_to_workspace(window, target).map_err(shell_err)?;
            }
            info!("{} follows the switch to {}", window, target);
        }
        let container = self.shell.tiling_container(target);
        if let Some(drag) = self.session.active_mut() {
            drag.original_parent = container;
        }
        Ok(())
    }

    fn refresh_all_visibility(&mut self) {
        for window in self.shell.windows() {
            if let Err(e) = self.shell.refresh_visibility(window) {
                debug!("visibility refresh of {} failed: {}", window, e);
            }
        }
    }

    /// Force-end the drag after `result` failed.
    fn or_abort<T>(&mut self, result: Result<T, DragError>) -> Result<T, DragError> {
        if let Err(e) = &result {
            if self.session.in_progress() {
                warn!("aborting drag: {}", e);
                self.abort_drag();
            }
        }
        result
    }

    /// End the drag without the normal drop.
    ///
    /// Stage state is always restored.  The window is unfrozen and put back
    /// only if the shell still manages it.
    fn abort_drag(&mut self) {
        let Some(drag) = self.session.finish() else {
            return;
        };
        self.grabber.release_modal(&mut self.shell);
        self.grabber.detach(&mut self.shell);
        if self.shell.windows().contains(&drag.window) {
            if let Err(e) = self
                .shell
                .unfreeze_layout(drag.window)
                .and_then(|_| self.shell.reparent(drag.window, drag.original_parent))
            {
                debug!("could not restore {}: {}", drag.window, e);
            }
        }
        self.refresh_all_visibility();
        self.shell.set_cursor(Cursor::Default);
        info!("drag of {} aborted", drag.window);
    }
}

impl<S: Shell> Drop for DragController<S> {
    fn drop(&mut self) {
        self.subscriptions.release_all(&mut self.shell);
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyBindingAction, Tileable, WorkspaceId};
    use crate::geometry::Rect;
    use crate::headless::{HeadlessShell, Layout, ShellCall};
    use std::time::{Duration, Instant};

    const W1: WindowId = WindowId(1);
    const W2: WindowId = WindowId(2);
    const W3: WindowId = WindowId(3);
    const W4: WindowId = WindowId(4);
    const WS1: WorkspaceId = WorkspaceId(1);
    const WS2: WorkspaceId = WorkspaceId(2);
    const WS3: WorkspaceId = WorkspaceId(3);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn make_controller() -> DragController<HeadlessShell> {
        let mut sh = HeadlessShell::from_layout(Layout::sample(), Instant::now());
        sh.bind_key(114, 64, KeyBindingAction::NextWindow);
        sh.bind_key(113, 64, KeyBindingAction::PreviousWindow);
        DragController::new(sh, DragConfig::default())
    }

    fn motion(c: &mut DragController<HeadlessShell>, x: f64, y: f64) -> Result<(), DragError> {
        c.shell_mut().warp_pointer(Point::new(x, y));
        c.handle(DragEvent::Motion { x, y })
    }

    fn release(c: &mut DragController<HeadlessShell>) {
        let p = c.shell().pointer();
        c.handle(DragEvent::ButtonRelease { x: p.x, y: p.y }).unwrap();
    }

    /// Grab window 1 (left half of monitor 0) at its centre column.
    fn grab_w1(c: &mut DragController<HeadlessShell>) {
        c.shell_mut().warp_pointer(Point::new(480.0, 500.0));
        c.shell_mut().begin_native_grab();
        c.handle(DragEvent::GrabBegin {
            window: W1,
            op: GrabOp::Moving,
        })
        .unwrap();
    }

    fn count(c: &DragController<HeadlessShell>, pred: impl Fn(&ShellCall) -> bool) -> usize {
        c.shell().calls().iter().filter(|call| pred(call)).count()
    }

    #[test]
    fn native_move_grab_starts_drag() {
        let mut c = make_controller();
        grab_w1(&mut c);

        assert!(c.is_dragging());
        let drag = c.session().active().unwrap().clone();
        assert_eq!(drag.window, W1);
        assert_eq!(drag.original_parent, c.shell().tiling_container(WS1));
        assert_eq!(drag.anchor.fx, 0.5);
        assert!((0.0..=1.0).contains(&drag.anchor.fy));

        let sh = c.shell();
        assert!(!sh.native_grab_active());
        assert_eq!(sh.grabber_bounds(), Some(sh.display_bounds()));
        assert_eq!(sh.modal_depth(), 1);
        assert_eq!(sh.cursor(), Cursor::DndInDrag);
        assert!(sh.is_frozen(W1));
        assert_eq!(sh.parent(W1).unwrap(), Some(sh.stage_container()));
        assert!(sh.calls().contains(&ShellCall::Raise(W1)));
        assert!(sh.calls().contains(&ShellCall::SchedulePoll(ms(100))));
        // The window did not jump: the grab point stays under the pointer.
        assert_eq!(sh.window_geometry(W1).unwrap(), Rect::new(0, 32, 960, 1048));
    }

    #[test]
    fn start_sequence_is_ordered() {
        let mut c = make_controller();
        c.shell_mut().clear_calls();
        grab_w1(&mut c);
        let calls = c.shell().calls();
        let pos = |want: &ShellCall| calls.iter().position(|call| call == want).unwrap();
        let insert = ShellCall::InsertGrabber(c.shell().display_bounds());
        assert!(pos(&ShellCall::EndNativeGrab) < pos(&insert));
        assert!(pos(&ShellCall::Freeze(W1)) < pos(&ShellCall::Raise(W1)));
        assert!(pos(&ShellCall::Raise(W1)) < pos(&ShellCall::SchedulePoll(ms(100))));
        assert!(pos(&ShellCall::SchedulePoll(ms(100))) < pos(&ShellCall::PushModal));
        assert_eq!(calls.last(), Some(&ShellCall::SetCursor(Cursor::DndInDrag)));
    }

    #[test]
    fn non_move_grabs_are_ignored() {
        let mut c = make_controller();
        c.shell_mut().clear_calls();
        for op in [GrabOp::Resizing, GrabOp::KeyboardMoving] {
            c.handle(DragEvent::GrabBegin { window: W1, op }).unwrap();
        }
        assert!(!c.is_dragging());
        assert!(c.shell().calls().is_empty());
    }

    #[test]
    fn grab_on_following_window_is_ignored() {
        let mut c = make_controller();
        c.shell_mut().set_follows_other(W1, true);
        c.shell_mut().begin_native_grab();
        c.handle(DragEvent::GrabBegin {
            window: W1,
            op: GrabOp::Moving,
        })
        .unwrap();
        assert!(!c.is_dragging());
        assert!(c.shell().native_grab_active());
    }

    #[test]
    fn grab_on_unknown_window_is_ignored() {
        let mut c = make_controller();
        c.handle(DragEvent::GrabBegin {
            window: WindowId(42),
            op: GrabOp::Moving,
        })
        .unwrap();
        assert!(!c.is_dragging());
    }

    #[test]
    fn only_one_drag_at_a_time() {
        let mut c = make_controller();
        grab_w1(&mut c);
        assert!(matches!(c.start_drag(W2), Err(DragError::AlreadyDragging(W1))));
        c.handle(DragEvent::GrabBegin {
            window: W2,
            op: GrabOp::Moving,
        })
        .unwrap();
        assert_eq!(c.session().dragged_window(), Some(W1));
        assert_eq!(c.shell().modal_depth(), 1);
    }

    #[test]
    fn motion_keeps_anchor_under_pointer() {
        let mut c = make_controller();
        grab_w1(&mut c);
        let anchor = c.session().active().unwrap().anchor;

        motion(&mut c, 700.4, 610.0).unwrap();
        let (x, y) = (
            (700.4 - 960.0 * anchor.fx).round() as i32,
            (610.0 - 1048.0 * anchor.fy).round() as i32,
        );
        let g = c.shell().window_geometry(W1).unwrap();
        assert_eq!((g.x, g.y), (x, y));
        assert_eq!((g.x, g.y), (220, 142));
    }

    #[test]
    fn events_without_drag_are_ignored() {
        let mut c = make_controller();
        c.shell_mut().clear_calls();
        motion(&mut c, 100.0, 100.0).unwrap();
        release(&mut c);
        c.handle(DragEvent::KeyPress {
            keycode: 114,
            modifiers: 64,
        })
        .unwrap();
        c.handle(DragEvent::ActiveWorkspaceChanged).unwrap();
        c.handle(DragEvent::PollTick).unwrap();
        assert!(!c.is_dragging());
        assert!(c.shell().calls().is_empty());
        assert!(matches!(c.end_drag(), Err(DragError::NotDragging)));
    }

    #[test]
    fn release_restores_everything() {
        let mut c = make_controller();
        grab_w1(&mut c);
        motion(&mut c, 300.0, 300.0).unwrap();
        release(&mut c);

        assert!(!c.is_dragging());
        assert!(c.session().active().is_none());
        let sh = c.shell();
        assert_eq!(sh.modal_depth(), 0);
        assert!(sh.grabber_bounds().is_none());
        assert_eq!(sh.cursor(), Cursor::Default);
        assert!(!sh.is_frozen(W1));
        assert_eq!(sh.parent(W1).unwrap(), Some(sh.tiling_container(WS1)));
        // Back in its slot.
        assert_eq!(sh.window_geometry(W1).unwrap(), Rect::new(0, 0, 960, 1048));
        assert!(sh.calls().contains(&ShellCall::RefreshVisibility(W3)));
    }

    #[test]
    fn hovering_a_tile_swaps_after_throttle() {
        let mut c = make_controller();
        grab_w1(&mut c);

        // Same instant as the initial hit-test: throttled away.
        motion(&mut c, 1500.0, 500.0).unwrap();
        assert_eq!(count(&c, |call| matches!(call, ShellCall::Swap(..))), 0);

        c.shell_mut().advance(ms(50));
        motion(&mut c, 1500.0, 500.0).unwrap();
        assert_eq!(count(&c, |call| matches!(call, ShellCall::Swap(..))), 1);
        assert_eq!(c.shell().tileables(WS1), vec![Tileable::Window(W2), Tileable::Window(W1)]);

        release(&mut c);
        assert_eq!(c.shell().window_geometry(W1).unwrap(), Rect::new(960, 0, 960, 1048));
        assert_eq!(c.shell().window_geometry(W2).unwrap(), Rect::new(0, 0, 960, 1048));
    }

    #[test]
    fn hit_test_twice_within_throttle_rehomes_once() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().advance(ms(60));

        motion(&mut c, 2500.0, 300.0).unwrap();
        c.shell_mut().advance(ms(10));
        motion(&mut c, 400.0, 400.0).unwrap();

        assert_eq!(count(&c, |call| matches!(call, ShellCall::Assign(..))), 1);
        assert_eq!(c.shell().window_workspace(W1).unwrap(), WS3);
    }

    #[test]
    fn crossing_monitors_rehomes_and_drops_there() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().advance(ms(60));

        motion(&mut c, 2500.0, 300.0).unwrap();
        let ws3_container = c.shell().tiling_container(WS3);
        assert_eq!(c.session().active().unwrap().original_parent, ws3_container);
        assert!(c.shell().tileables(WS3).contains(&Tileable::Window(W1)));
        assert!(!c.shell().tileables(WS1).contains(&Tileable::Window(W1)));

        release(&mut c);
        assert!(!c.is_dragging());
        assert_eq!(c.shell().parent(W1).unwrap(), Some(ws3_container));
        assert_eq!(c.shell().window_workspace(W1).unwrap(), WS3);
    }

    #[test]
    fn workspace_switch_moves_native_window() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().set_active_primary_workspace(WS2);
        c.handle(DragEvent::ActiveWorkspaceChanged).unwrap();

        assert!(c.shell().calls().contains(&ShellCall::NativeMove(W1, WS2)));
        assert_eq!(c.session().active().unwrap().original_parent, c.shell().tiling_container(WS2));

        release(&mut c);
        assert_eq!(c.shell().window_workspace(W1).unwrap(), WS2);
        assert_eq!(c.shell().parent(W1).unwrap(), Some(c.shell().tiling_container(WS2)));
    }

    #[test]
    fn window_losing_native_backing_is_rehomed() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().detach_native(W1);
        c.shell_mut().set_active_primary_workspace(WS2);
        c.handle(DragEvent::ActiveWorkspaceChanged).unwrap();

        assert!(c.shell().calls().contains(&ShellCall::Assign(W1, WS2)));
        assert_eq!(count(&c, |call| matches!(call, ShellCall::NativeMove(..))), 0);
        assert_eq!(c.session().active().unwrap().original_parent, c.shell().tiling_container(WS2));

        release(&mut c);
        assert_eq!(c.shell().window_workspace(W1).unwrap(), WS2);
    }

    #[test]
    fn placeholder_drag_via_window_motion() {
        let mut c = make_controller();
        c.shell_mut().set_active_primary_workspace(WS2);
        c.shell_mut().warp_pointer(Point::new(100.0, 100.0));

        // Wrong state: nothing happens.
        c.handle(DragEvent::WindowMotion { window: W4, state: 64 }).unwrap();
        assert!(!c.is_dragging());

        c.handle(DragEvent::WindowMotion { window: W4, state: 320 }).unwrap();
        assert_eq!(c.session().dragged_window(), Some(W4));

        // Placeholders have no native window: a workspace switch re-homes them.
        c.shell_mut().set_active_primary_workspace(WS1);
        c.handle(DragEvent::ActiveWorkspaceChanged).unwrap();
        assert!(c.shell().calls().contains(&ShellCall::Assign(W4, WS1)));
        assert_eq!(c.session().active().unwrap().original_parent, c.shell().tiling_container(WS1));
    }

    #[test]
    fn window_motion_needs_subscription() {
        let mut c = make_controller();
        let ws = c.shell().active_primary_workspace();
        let w = c.shell_mut().add_window(ws, false);

        c.handle(DragEvent::WindowMotion { window: w, state: 320 }).unwrap();
        assert!(!c.is_dragging());

        c.handle(DragEvent::WindowCreated(w)).unwrap();
        assert!(c.subscriptions().is_subscribed(w));
        c.handle(DragEvent::WindowMotion { window: w, state: 320 }).unwrap();
        assert_eq!(c.session().dragged_window(), Some(w));
    }

    #[test]
    fn window_created_does_not_double_subscribe() {
        let mut c = make_controller();
        let before = c.shell().live_subscriptions();
        c.handle(DragEvent::WindowCreated(W1)).unwrap();
        assert_eq!(c.shell().live_subscriptions(), before);
    }

    #[test]
    fn key_press_during_drag_is_remapped() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().clear_calls();
        c.handle(DragEvent::KeyPress {
            keycode: 114,
            modifiers: 64,
        })
        .unwrap();
        assert_eq!(c.shell().calls(), &[ShellCall::Action(KeyBindingAction::MoveWindowRight)]);
        assert!(c.is_dragging());
    }

    #[test]
    fn poll_loop_runs_while_dragging_and_stops_after() {
        let mut c = make_controller();
        grab_w1(&mut c);

        // Pointer drifts onto window 2 without a motion event.
        c.shell_mut().warp_pointer(Point::new(1500.0, 500.0));
        c.shell_mut().advance(ms(100));
        assert!(c.shell_mut().take_due_poll());
        c.handle(DragEvent::PollTick).unwrap();
        assert_eq!(count(&c, |call| matches!(call, ShellCall::Swap(..))), 1);
        assert!(c.shell().next_poll().is_some());

        release(&mut c);
        c.shell_mut().clear_calls();
        c.shell_mut().advance(ms(100));
        assert!(c.shell_mut().take_due_poll());
        c.handle(DragEvent::PollTick).unwrap();
        assert!(c.shell().calls().is_empty());
        assert!(c.shell().next_poll().is_none());
    }

    #[test]
    fn destroyed_window_aborts_drag() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().remove_window(W1);
        c.handle(DragEvent::WindowDestroyed(W1)).unwrap();

        assert!(!c.is_dragging());
        assert!(!c.subscriptions().is_subscribed(W1));
        let sh = c.shell();
        assert_eq!(sh.modal_depth(), 0);
        assert!(sh.grabber_bounds().is_none());
        assert_eq!(sh.cursor(), Cursor::Default);
    }

    #[test]
    fn failing_shell_mid_drag_aborts() {
        let mut c = make_controller();
        grab_w1(&mut c);
        // The window vanishes without a notification.
        c.shell_mut().remove_window(W1);

        assert!(matches!(motion(&mut c, 10.0, 10.0), Err(DragError::Shell(_))));
        assert!(!c.is_dragging());
        assert_eq!(c.shell().modal_depth(), 0);
        assert_eq!(c.shell().cursor(), Cursor::Default);

        // A new drag can start afterwards.
        c.shell_mut().warp_pointer(Point::new(1500.0, 500.0));
        c.start_drag(W2).unwrap();
        assert_eq!(c.session().dragged_window(), Some(W2));
    }

    #[test]
    fn other_window_destroyed_keeps_drag() {
        let mut c = make_controller();
        grab_w1(&mut c);
        c.shell_mut().remove_window(W3);
        c.handle(DragEvent::WindowDestroyed(W3)).unwrap();
        assert_eq!(c.session().dragged_window(), Some(W1));
    }
}
