//! Hit-testing: which workspace and which tile slot the dragged window
//! belongs to, given where the pointer is.
//!
//! [`check_under_pointer`] runs one pass:
//!
//! 1. Find the monitor under the pointer.
//! 2. If it is not the monitor of the dragged window's workspace, move the
//!    window into that monitor's workspace (the active one on the primary
//!    monitor, the first one elsewhere) and make that workspace's tiling
//!    container the drop target.
//! 3. Translate the pointer into the workspace's work-area coordinates.
//! 4. Collect the visible window tiles that sit directly in the tiling
//!    container and swap the dragged window with the tile under the pointer.
//!
//! Tiles can overlap while the layout is animating.  Only one swap happens
//! per pass; [`TieBreak`] decides which of several hit tiles wins.

use crate::event::{WindowId, WorkspaceId};
use crate::geometry::{monitor_at_point, MonitorInfo, Point, Rect};
use crate::session::ActiveDrag;
use crate::traits::Shell;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// How to choose between several tiles under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The first hit tile in tile-list order.
    #[default]
    FirstMatch,
    /// The hit tile with the smallest area; list order among equals.
    SmallestArea,
}

/// What a single hit-test pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    /// Workspace the dragged window was moved into, if any.
    pub rehomed_to: Option<WorkspaceId>,
    /// Tile the dragged window was swapped with, if any.
    pub swapped_with: Option<WindowId>,
}

/// Pick the tile under `point` among `candidates`.
pub fn pick_target(
    candidates: &[(WindowId, Rect)],
    point: Point,
    tie_break: TieBreak,
) -> Option<WindowId> {
    let mut hits = candidates.iter().filter(|(_, rect)| rect.contains(point));
    match tie_break {
        TieBreak::FirstMatch => hits.next().map(|(w, _)| *w),
        TieBreak::SmallestArea => hits.min_by_key(|(_, rect)| rect.area()).map(|(w, _)| *w),
    }
}

/// The workspace a window dropped on `monitor` should join.
///
/// Returns `None` when a secondary monitor has no workspace assigned.
pub fn target_workspace<S: Shell>(shell: &S, monitor: &MonitorInfo) -> Option<WorkspaceId> {
    if monitor.primary {
        Some(shell.active_primary_workspace())
    } else {
        shell.workspaces_of_monitor(monitor.index).first().copied()
    }
}

/// Run one hit-test pass for `drag`.
pub fn check_under_pointer<S: Shell>(
    shell: &mut S,
    drag: &mut ActiveDrag,
    tie_break: TieBreak,
) -> Result<Placement, S::Error> {
    let pointer = shell.pointer();
    let mut placement = Placement::default();
    let mut workspace = shell.window_workspace(drag.window)?;

    let monitors = shell.monitors();
    if let Some(monitor) = monitor_at_point(&monitors, pointer) {
        if monitor.index != shell.workspace_monitor(workspace) {
            match target_workspace(shell, monitor) {
                Some(target) if target != workspace => {
                    info!(
                        "{} crossed to monitor {}: {} -> {}",
                        drag.window, monitor.index, workspace, target
                    );
                    shell.assign_to_workspace(drag.window, target)?;
                    drag.original_parent = shell.tiling_container(target);
                    workspace = target;
                    placement.rehomed_to = Some(target);
                }
                Some(_) => {}
                None => warn!("monitor {} has no workspace, keeping {}", monitor.index, workspace),
            }
        }
    }

    let work_area = shell.work_area(shell.workspace_monitor(workspace));
    let relative = pointer.relative_to(&work_area);
    let container = shell.tiling_container(workspace);

    let mut candidates = Vec::new();
    for tile in shell.tileables(workspace) {
        let Some(window) = tile.window() else {
            continue;
        };
        if window == drag.window {
            continue;
        }
        if !shell.is_visible(window)? || shell.parent(window)? != Some(container) {
            continue;
        }
        candidates.push((window, shell.window_geometry(window)?));
    }

    if let Some(target) = pick_target(&candidates, relative, tie_break) {
        debug!("swap {} with {} in {}", drag.window, target, workspace);
        shell.swap_tileables(workspace, drag.window, target)?;
        placement.swapped_with = Some(target);
    }

    Ok(placement)
}
