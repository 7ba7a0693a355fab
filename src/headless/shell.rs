//! In-memory [`Shell`] implementation.
//!
//! [`HeadlessShell`] models just enough of a tiling desktop for the drag
//! engine to run against: monitors with work areas, workspaces with an
//! ordered tile list, windows with an allocation and a parent actor, a
//! pointer, a clock and a single pending poll timer.  Stage-level side
//! effects are appended to a call log so callers can inspect exactly what
//! the engine asked for.
//!
//! Tiles are laid out as equal-width columns across the work area.  A frozen
//! window keeps its allocation until it is unfrozen.

use super::layout::Layout;
use crate::event::{ContainerId, Cursor, KeyBindingAction, Tileable, WindowId, WorkspaceId};
use crate::geometry::{MonitorInfo, Point, Rect};
use crate::traits::{Shell, SubscriptionToken};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Errors produced by the headless shell.
#[derive(Debug, thiserror::Error)]
#[error("headless shell error: {0}")]
pub struct HeadlessError(String);

/// A side effect requested through the [`Shell`] trait.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCall {
    EndNativeGrab,
    InsertGrabber(Rect),
    RemoveGrabber,
    PushModal,
    PopModal,
    SetCursor(Cursor),
    Raise(WindowId),
    Freeze(WindowId),
    Unfreeze(WindowId),
    SetPosition(WindowId, i32, i32),
    Reparent(WindowId, ContainerId),
    RefreshVisibility(WindowId),
    Assign(WindowId, WorkspaceId),
    NativeMove(WindowId, WorkspaceId),
    Swap(WorkspaceId, WindowId, WindowId),
    Action(KeyBindingAction),
    SchedulePoll(Duration),
}

#[derive(Debug, Clone)]
struct WorkspaceState {
    id: WorkspaceId,
    monitor: usize,
    container: ContainerId,
    tiles: Vec<Tileable>,
}

#[derive(Debug, Clone)]
struct WindowState {
    geometry: Rect,
    parent: Option<ContainerId>,
    workspace: WorkspaceId,
    visible: bool,
    frozen: bool,
    native: bool,
    follows_other: bool,
}

/// Headless desktop state.
#[derive(Debug)]
pub struct HeadlessShell {
    monitors: Vec<MonitorInfo>,
    work_areas: HashMap<usize, Rect>,
    workspaces: Vec<WorkspaceState>,
    active_primary: WorkspaceId,
    windows: BTreeMap<WindowId, WindowState>,
    pointer: Point,
    clock: Instant,
    pending_poll: Option<Instant>,
    grabber: Option<Rect>,
    modal_depth: u32,
    cursor: Cursor,
    native_grab: bool,
    key_bindings: HashMap<(u32, u32), KeyBindingAction>,
    subscriptions: HashMap<SubscriptionToken, WindowId>,
    next_token: u64,
    calls: Vec<ShellCall>,
}

/// Parent of actors raised above everything else.
const STAGE: ContainerId = ContainerId(0);

impl HeadlessShell {
    /// Build a shell from `layout`, with the clock set to `clock`.
    pub fn from_layout(layout: Layout, clock: Instant) -> Self {
        let primary = layout.primary_monitor();
        let monitors: Vec<MonitorInfo> = layout
            .monitors
            .iter()
            .map(|m| MonitorInfo {
                index: m.index,
                bounds: m.bounds,
                primary: m.index == primary,
            })
            .collect();
        let work_areas = layout
            .monitors
            .iter()
            .map(|m| (m.index, m.work_area.unwrap_or(m.bounds)))
            .collect();

        let mut windows = BTreeMap::new();
        let workspaces: Vec<WorkspaceState> = layout
            .workspaces
            .iter()
            .map(|ws| {
                let container = ContainerId(ws.id.0 + 1);
                for w in &ws.windows {
                    windows.insert(
                        w.id,
                        WindowState {
                            geometry: Rect::default(),
                            parent: Some(container),
                            workspace: ws.id,
                            visible: false,
                            frozen: false,
                            native: w.native,
                            follows_other: false,
                        },
                    );
                }
                WorkspaceState {
                    id: ws.id,
                    monitor: ws.monitor,
                    container,
                    tiles: ws.windows.iter().map(|w| Tileable::Window(w.id)).collect(),
                }
            })
            .collect();

        let active_primary = layout
            .active_primary_workspace
            .or_else(|| workspaces.iter().find(|ws| ws.monitor == primary).map(|ws| ws.id))
            .unwrap_or(WorkspaceId(0));

        let key_bindings = layout
            .key_bindings
            .iter()
            .map(|b| ((b.keycode, b.modifiers), b.action))
            .collect();

        let mut shell = Self {
            monitors,
            work_areas,
            workspaces,
            active_primary,
            windows,
            pointer: Point::default(),
            clock,
            pending_poll: None,
            grabber: None,
            modal_depth: 0,
            cursor: Cursor::Default,
            native_grab: false,
            key_bindings,
            subscriptions: HashMap::new(),
            next_token: 1,
            calls: Vec::new(),
        };
        let ids: Vec<WorkspaceId> = shell.workspaces.iter().map(|ws| ws.id).collect();
        for id in ids {
            shell.relayout(id);
        }
        let window_ids: Vec<WindowId> = shell.windows.keys().copied().collect();
        for w in window_ids {
            shell.update_visibility(w);
        }
        shell
    }

    //  Driving the simulation

    pub fn warp_pointer(&mut self, p: Point) {
        self.pointer = p;
    }

    pub fn set_time(&mut self, now: Instant) {
        self.clock = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
    }

    /// Deadline of the pending poll timer, if any.
    pub fn next_poll(&self) -> Option<Instant> {
        self.pending_poll
    }

    /// Consume the pending poll timer if it is due.
    pub fn take_due_poll(&mut self) -> bool {
        match self.pending_poll {
            Some(at) if at <= self.clock => {
                self.pending_poll = None;
                true
            }
            _ => false,
        }
    }

    /// Simulate the compositor starting a native grab.
    pub fn begin_native_grab(&mut self) {
        self.native_grab = true;
    }

    pub fn set_active_primary_workspace(&mut self, workspace: WorkspaceId) {
        self.active_primary = workspace;
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for w in ids {
            self.update_visibility(w);
        }
    }

    pub fn set_visible(&mut self, window: WindowId, visible: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.visible = visible;
        }
    }

    pub fn set_follows_other(&mut self, window: WindowId, follows: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.follows_other = follows;
        }
    }

    /// Drop the native backing of `window`, turning it into a placeholder.
    pub fn detach_native(&mut self, window: WindowId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.native = false;
        }
    }

    pub fn bind_key(&mut self, keycode: u32, modifiers: u32, action: KeyBindingAction) {
        self.key_bindings.insert((keycode, modifiers), action);
    }

    /// Add a new window at the end of `workspace`'s tile list.
    pub fn add_window(&mut self, workspace: WorkspaceId, native: bool) -> WindowId {
        let id = WindowId(self.windows.keys().next_back().map(|w| w.0 + 1).unwrap_or(1));
        let container = ContainerId(workspace.0 + 1);
        self.windows.insert(
            id,
            WindowState {
                geometry: Rect::default(),
                parent: Some(container),
                workspace,
                visible: false,
                frozen: false,
                native,
                follows_other: false,
            },
        );
        if let Some(ws) = self.workspace_mut(workspace) {
            ws.tiles.push(Tileable::Window(id));
        }
        self.relayout(workspace);
        self.update_visibility(id);
        id
    }

    /// Insert a tileable at `index` in `workspace`'s tile list.
    pub fn insert_tileable(&mut self, workspace: WorkspaceId, index: usize, tile: Tileable) {
        if let Some(ws) = self.workspace_mut(workspace) {
            let index = index.min(ws.tiles.len());
            ws.tiles.insert(index, tile);
        }
        self.relayout(workspace);
    }

    /// Destroy `window`, removing it from its workspace.
    pub fn remove_window(&mut self, window: WindowId) {
        if let Some(state) = self.windows.remove(&window) {
            if let Some(ws) = self.workspace_mut(state.workspace) {
                ws.tiles.retain(|t| *t != Tileable::Window(window));
            }
            self.relayout(state.workspace);
        }
    }

    //  Inspection

    pub fn stage_container(&self) -> ContainerId {
        STAGE
    }

    pub fn calls(&self) -> &[ShellCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn grabber_bounds(&self) -> Option<Rect> {
        self.grabber
    }

    pub fn modal_depth(&self) -> u32 {
        self.modal_depth
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn native_grab_active(&self) -> bool {
        self.native_grab
    }

    pub fn is_frozen(&self, window: WindowId) -> bool {
        self.windows.get(&window).map(|w| w.frozen).unwrap_or(false)
    }

    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Tile order of every workspace, for logging.
    pub fn describe(&self) -> String {
        self.workspaces
            .iter()
            .map(|ws| {
                let tiles: Vec<String> = ws
                    .tiles
                    .iter()
                    .map(|t| match t {
                        Tileable::Window(w) => w.0.to_string(),
                        Tileable::Other(o) => format!("other:{}", o),
                    })
                    .collect();
                format!("{}@{}=[{}]", ws.id, ws.monitor, tiles.join(","))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    //  Internal

    fn window(&self, window: WindowId) -> Result<&WindowState, HeadlessError> {
        self.windows
            .get(&window)
            .ok_or_else(|| HeadlessError(format!("unknown {}", window)))
    }

    fn window_mut(&mut self, window: WindowId) -> Result<&mut WindowState, HeadlessError> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| HeadlessError(format!("unknown {}", window)))
    }

    fn workspace(&self, workspace: WorkspaceId) -> Option<&WorkspaceState> {
        self.workspaces.iter().find(|ws| ws.id == workspace)
    }

    fn workspace_mut(&mut self, workspace: WorkspaceId) -> Option<&mut WorkspaceState> {
        self.workspaces.iter_mut().find(|ws| ws.id == workspace)
    }

    /// Stage position of a container's origin.
    fn container_origin(&self, container: ContainerId) -> (i32, i32) {
        self.workspaces
            .iter()
            .find(|ws| ws.container == container)
            .map(|ws| {
                let area = self.work_area(ws.monitor);
                (area.x, area.y)
            })
            .unwrap_or((0, 0))
    }

    /// Whether `workspace` is the one currently shown on its monitor.
    fn is_shown(&self, workspace: WorkspaceId) -> bool {
        let Some(ws) = self.workspace(workspace) else {
            return false;
        };
        let primary = self.monitors.iter().any(|m| m.index == ws.monitor && m.primary);
        if primary {
            workspace == self.active_primary
        } else {
            self.workspaces_of_monitor(ws.monitor).first() == Some(&workspace)
        }
    }

    fn update_visibility(&mut self, window: WindowId) {
        let Some(state) = self.windows.get(&window) else {
            return;
        };
        let visible = state.parent == Some(STAGE) || self.is_shown(state.workspace);
        if let Some(state) = self.windows.get_mut(&window) {
            state.visible = visible;
        }
    }

    /// Lay the tileables of `workspace` out as equal columns.
    fn relayout(&mut self, workspace: WorkspaceId) {
        let Some(ws) = self.workspace(workspace) else {
            return;
        };
        let area = self.work_area(ws.monitor);
        let container = ws.container;
        let tiles = ws.tiles.clone();
        if tiles.is_empty() {
            return;
        }
        // Every tileable takes a column, windows or not.
        let column = area.width / tiles.len() as u32;
        for (slot, tile) in tiles.iter().enumerate() {
            let Some(id) = tile.window() else { continue };
            if let Some(w) = self.windows.get_mut(&id) {
                if w.frozen || w.parent != Some(container) {
                    continue;
                }
                w.geometry = Rect::new(slot as i32 * column as i32, 0, column, area.height);
            }
        }
    }
}

impl Shell for HeadlessShell {
    type Error = HeadlessError;

    fn windows(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    fn subscribe_window(&mut self, window: WindowId) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.insert(token, window);
        token
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) {
        self.subscriptions.remove(&token);
    }

    fn window_geometry(&self, window: WindowId) -> Result<Rect, HeadlessError> {
        Ok(self.window(window)?.geometry)
    }

    fn stage_geometry(&self, window: WindowId) -> Result<Rect, HeadlessError> {
        let w = self.window(window)?;
        let (ox, oy) = w.parent.map(|c| self.container_origin(c)).unwrap_or((0, 0));
        Ok(Rect::new(w.geometry.x + ox, w.geometry.y + oy, w.geometry.width, w.geometry.height))
    }

    fn set_window_position(
        &mut self,
        window: WindowId,
        x: i32,
        y: i32,
    ) -> Result<(), HeadlessError> {
        let w = self.window_mut(window)?;
        w.geometry.x = x;
        w.geometry.y = y;
        self.calls.push(ShellCall::SetPosition(window, x, y));
        Ok(())
    }

    fn freeze_layout(&mut self, window: WindowId) -> Result<(), HeadlessError> {
        self.window_mut(window)?.frozen = true;
        self.calls.push(ShellCall::Freeze(window));
        Ok(())
    }

    fn unfreeze_layout(&mut self, window: WindowId) -> Result<(), HeadlessError> {
        let w = self.window_mut(window)?;
        w.frozen = false;
        let workspace = w.workspace;
        self.calls.push(ShellCall::Unfreeze(window));
        self.relayout(workspace);
        Ok(())
    }

    fn parent(&self, window: WindowId) -> Result<Option<ContainerId>, HeadlessError> {
        Ok(self.window(window)?.parent)
    }

    fn reparent(&mut self, window: WindowId, container: ContainerId) -> Result<(), HeadlessError> {
        let old = self.window(window)?.parent;
        let (ox, oy) = old.map(|c| self.container_origin(c)).unwrap_or((0, 0));
        let (nx, ny) = self.container_origin(container);
        let w = self.window_mut(window)?;
        w.geometry.x += ox - nx;
        w.geometry.y += oy - ny;
        w.parent = Some(container);
        let workspace = w.workspace;
        self.calls.push(ShellCall::Reparent(window, container));
        self.relayout(workspace);
        Ok(())
    }

    fn is_visible(&self, window: WindowId) -> Result<bool, HeadlessError> {
        Ok(self.window(window)?.visible)
    }

    fn refresh_visibility(&mut self, window: WindowId) -> Result<(), HeadlessError> {
        self.window(window)?;
        self.update_visibility(window);
        self.calls.push(ShellCall::RefreshVisibility(window));
        Ok(())
    }

    fn has_native_window(&self, window: WindowId) -> Result<bool, HeadlessError> {
        Ok(self.window(window)?.native)
    }

    fn follows_other_window(&self, window: WindowId) -> Result<bool, HeadlessError> {
        Ok(self.window(window)?.follows_other)
    }

    fn window_workspace(&self, window: WindowId) -> Result<WorkspaceId, HeadlessError> {
        Ok(self.window(window)?.workspace)
    }

    fn move_native_window(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), HeadlessError> {
        if !self.window(window)?.native {
            return Err(HeadlessError(format!("{} has no native window", window)));
        }
        self.move_between_workspaces(window, workspace)?;
        self.calls.push(ShellCall::NativeMove(window, workspace));
        Ok(())
    }

    fn monitors(&self) -> Vec<MonitorInfo> {
        self.monitors.clone()
    }

    fn work_area(&self, monitor: usize) -> Rect {
        self.work_areas.get(&monitor).copied().unwrap_or_default()
    }

    fn active_primary_workspace(&self) -> WorkspaceId {
        self.active_primary
    }

    fn workspaces_of_monitor(&self, monitor: usize) -> Vec<WorkspaceId> {
        self.workspaces
            .iter()
            .filter(|ws| ws.monitor == monitor)
            .map(|ws| ws.id)
            .collect()
    }

    fn workspace_monitor(&self, workspace: WorkspaceId) -> usize {
        self.workspace(workspace).map(|ws| ws.monitor).unwrap_or(0)
    }

    fn tiling_container(&self, workspace: WorkspaceId) -> ContainerId {
        self.workspace(workspace)
            .map(|ws| ws.container)
            .unwrap_or(ContainerId(workspace.0 + 1))
    }

    fn tileables(&self, workspace: WorkspaceId) -> Vec<Tileable> {
        self.workspace(workspace).map(|ws| ws.tiles.clone()).unwrap_or_default()
    }

    fn assign_to_workspace(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), HeadlessError> {
        self.move_between_workspaces(window, workspace)?;
        self.calls.push(ShellCall::Assign(window, workspace));
        Ok(())
    }

    fn swap_tileables(
        &mut self,
        workspace: WorkspaceId,
        a: WindowId,
        b: WindowId,
    ) -> Result<(), HeadlessError> {
        let ws = self
            .workspace_mut(workspace)
            .ok_or_else(|| HeadlessError(format!("unknown {}", workspace)))?;
        let ia = ws.tiles.iter().position(|t| *t == Tileable::Window(a));
        let ib = ws.tiles.iter().position(|t| *t == Tileable::Window(b));
        match (ia, ib) {
            (Some(ia), Some(ib)) => ws.tiles.swap(ia, ib),
            _ => {
                let msg = format!("{} and {} are not both in {}", a, b, workspace);
                return Err(HeadlessError(msg));
            }
        }
        self.calls.push(ShellCall::Swap(workspace, a, b));
        self.relayout(workspace);
        Ok(())
    }

    fn pointer(&self) -> Point {
        self.pointer
    }

    fn display_bounds(&self) -> Rect {
        let mut left = i32::MAX;
        let mut top = i32::MAX;
        let mut right = i32::MIN;
        let mut bottom = i32::MIN;
        for m in &self.monitors {
            left = left.min(m.bounds.x);
            top = top.min(m.bounds.y);
            right = right.max(m.bounds.x + m.bounds.width as i32);
            bottom = bottom.max(m.bounds.y + m.bounds.height as i32);
        }
        if self.monitors.is_empty() {
            return Rect::default();
        }
        Rect::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }

    fn end_native_grab(&mut self) {
        self.native_grab = false;
        self.calls.push(ShellCall::EndNativeGrab);
    }

    fn insert_input_grabber(&mut self, bounds: Rect) {
        self.grabber = Some(bounds);
        self.calls.push(ShellCall::InsertGrabber(bounds));
    }

    fn remove_input_grabber(&mut self) {
        self.grabber = None;
        self.calls.push(ShellCall::RemoveGrabber);
    }

    fn push_modal(&mut self) {
        self.modal_depth += 1;
        self.calls.push(ShellCall::PushModal);
    }

    fn pop_modal(&mut self) {
        self.modal_depth = self.modal_depth.saturating_sub(1);
        self.calls.push(ShellCall::PopModal);
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.calls.push(ShellCall::SetCursor(cursor));
    }

    fn raise_window(&mut self, window: WindowId) -> Result<(), HeadlessError> {
        self.reparent(window, STAGE)?;
        // The reparent is an implementation detail of raising.
        self.calls.pop();
        self.calls.push(ShellCall::Raise(window));
        Ok(())
    }

    fn now(&self) -> Instant {
        self.clock
    }

    fn schedule_poll(&mut self, delay: Duration) {
        self.pending_poll = Some(self.clock + delay);
        self.calls.push(ShellCall::SchedulePoll(delay));
    }

    fn resolve_key_action(&self, keycode: u32, modifiers: u32) -> Option<KeyBindingAction> {
        self.key_bindings.get(&(keycode, modifiers)).copied()
    }

    fn invoke_action(&mut self, action: KeyBindingAction) -> Result<(), HeadlessError> {
        debug!("headless: run {}", action);
        self.calls.push(ShellCall::Action(action));
        Ok(())
    }
}

impl HeadlessShell {
    fn move_between_workspaces(
        &mut self,
        window: WindowId,
        workspace: WorkspaceId,
    ) -> Result<(), HeadlessError> {
        let target_container = self
            .workspace(workspace)
            .map(|ws| ws.container)
            .ok_or_else(|| HeadlessError(format!("unknown {}", workspace)))?;
        let (old_workspace, old_parent) = {
            let w = self.window(window)?;
            (w.workspace, w.parent)
        };
        if let Some(ws) = self.workspace_mut(old_workspace) {
            ws.tiles.retain(|t| *t != Tileable::Window(window));
        }
        if let Some(ws) = self.workspace_mut(workspace) {
            ws.tiles.push(Tileable::Window(window));
        }
        let old_container = self.tiling_container(old_workspace);
        let w = self.window_mut(window)?;
        w.workspace = workspace;
        // A window lifted onto the stage stays there until it is dropped.
        if old_parent == Some(old_container) {
            w.parent = Some(target_container);
        }
        self.relayout(old_workspace);
        self.relayout(workspace);
        Ok(())
    }
}
