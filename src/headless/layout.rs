//! Description of a desktop for the [`HeadlessShell`](super::shell::HeadlessShell).
//!
//! The layout is a JSON file:
//!
//! ```json
//! {
//!   "monitors": [
//!     { "index": 0, "bounds": { "x": 0, "y": 0, "width": 1920, "height": 1080 },
//!       "primary": true,
//!       "work_area": { "x": 0, "y": 32, "width": 1920, "height": 1048 } }
//!   ],
//!   "workspaces": [
//!     { "id": 1, "monitor": 0, "windows": [ { "id": 1 }, { "id": 2, "native": false } ] }
//!   ],
//!   "key_bindings": [ { "keycode": 114, "modifiers": 64, "action": "next-window" } ]
//! }
//! ```
//!
//! Window geometry is not part of the layout: windows are tiled into equal
//! columns across their workspace's work area.

use crate::config::ConfigError;
use crate::event::{KeyBindingAction, WindowId, WorkspaceId};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub monitors: Vec<LayoutMonitor>,
    pub workspaces: Vec<LayoutWorkspace>,
    /// Workspace shown on the primary monitor.  Defaults to the primary
    /// monitor's first workspace.
    #[serde(default)]
    pub active_primary_workspace: Option<WorkspaceId>,
    #[serde(default)]
    pub key_bindings: Vec<KeyBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutMonitor {
    pub index: usize,
    pub bounds: Rect,
    #[serde(default)]
    pub primary: bool,
    /// Usable area; the full bounds when absent.
    #[serde(default)]
    pub work_area: Option<Rect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutWorkspace {
    pub id: WorkspaceId,
    pub monitor: usize,
    #[serde(default)]
    pub windows: Vec<LayoutWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutWindow {
    pub id: WindowId,
    /// Whether a native window backs this tile.  Placeholders set `false`.
    #[serde(default = "default_native")]
    pub native: bool,
}

fn default_native() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    pub keycode: u32,
    #[serde(default)]
    pub modifiers: u32,
    pub action: KeyBindingAction,
}

impl Layout {
    /// Load and validate a layout from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let layout: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        layout
            .validate()
            .map_err(|e| ConfigError(format!("invalid layout {}: {}", path.display(), e)))?;
        Ok(layout)
    }

    /// Check the cross references inside the layout.
    pub fn validate(&self) -> Result<(), String> {
        if self.monitors.is_empty() {
            return Err("no monitors".into());
        }
        if self.monitors.iter().filter(|m| m.primary).count() > 1 {
            return Err("more than one primary monitor".into());
        }
        let mut workspace_ids = HashSet::new();
        let mut window_ids = HashSet::new();
        for ws in &self.workspaces {
            if !self.monitors.iter().any(|m| m.index == ws.monitor) {
                return Err(format!("{} is on unknown monitor {}", ws.id, ws.monitor));
            }
            if !workspace_ids.insert(ws.id) {
                return Err(format!("duplicate {}", ws.id));
            }
            for w in &ws.windows {
                if !window_ids.insert(w.id) {
                    return Err(format!("duplicate {}", w.id));
                }
            }
        }
        let primary = self.primary_monitor();
        if !self.workspaces.iter().any(|ws| ws.monitor == primary) {
            return Err(format!("primary monitor {} has no workspace", primary));
        }
        if let Some(active) = self.active_primary_workspace {
            match self.workspaces.iter().find(|ws| ws.id == active) {
                Some(ws) if ws.monitor == primary => {}
                _ => return Err(format!("{} is not a workspace of the primary monitor", active)),
            }
        }
        Ok(())
    }

    /// Index of the primary monitor: the one flagged `primary`, else the
    /// first listed.
    pub fn primary_monitor(&self) -> usize {
        self.monitors
            .iter()
            .find(|m| m.primary)
            .or_else(|| self.monitors.first())
            .map(|m| m.index)
            .unwrap_or(0)
    }

    /// Two side-by-side monitors.
    ///
    /// * Monitor 0 (primary, 1920×1080, 32px top panel): workspace 1 with
    ///   windows 1 and 2, workspace 2 with placeholder window 4.
    /// * Monitor 1 (2560×1440, right of monitor 0): workspace 3 with window 3.
    pub fn sample() -> Self {
        Self {
            monitors: vec![
                LayoutMonitor {
                    index: 0,
                    bounds: Rect::new(0, 0, 1920, 1080),
                    primary: true,
                    work_area: Some(Rect::new(0, 32, 1920, 1048)),
                },
                LayoutMonitor {
                    index: 1,
                    bounds: Rect::new(1920, 0, 2560, 1440),
                    primary: false,
                    work_area: None,
                },
            ],
            workspaces: vec![
                LayoutWorkspace {
                    id: WorkspaceId(1),
                    monitor: 0,
                    windows: vec![
                        LayoutWindow { id: WindowId(1), native: true },
                        LayoutWindow { id: WindowId(2), native: true },
                    ],
                },
                LayoutWorkspace {
                    id: WorkspaceId(2),
                    monitor: 0,
                    windows: vec![LayoutWindow { id: WindowId(4), native: false }],
                },
                LayoutWorkspace {
                    id: WorkspaceId(3),
                    monitor: 1,
                    windows: vec![LayoutWindow { id: WindowId(3), native: true }],
                },
            ],
            active_primary_workspace: None,
            key_bindings: Vec::new(),
        }
    }
}
