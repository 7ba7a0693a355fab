//! Application configuration.
//!
//! The configuration is loaded from a JSON file at
//! `$XDG_CONFIG_HOME/tiledrag/config.json`.  The top-level schema uses a
//! `"drag"` key so the file can be extended with additional sections later
//! without breaking backward compatibility.
//!
//! # Example
//!
//! ```json
//! {
//!   "drag": {
//!     "hit_test_interval_ms": 50,
//!     "poll_interval_ms": 100,
//!     "placeholder_drag_state": 320,
//!     "tie_break": "first-match"
//!   }
//! }
//! ```

use crate::placement::TieBreak;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Modifier bit of the Super key in an event state mask.
pub const MOD_SUPER: u32 = 1 << 6;
/// Primary pointer button bit in an event state mask.
pub const BUTTON1: u32 = 1 << 8;

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Drag session tuning.
    #[serde(default)]
    pub drag: DragConfig,
}

/// Drag session tuning.
///
/// All durations are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Minimum time between two hit-test passes (ms).
    pub hit_test_interval_ms: u64,
    /// Period of the hit-test polling loop while dragging (ms).  The loop
    /// catches pointer positions that produce no motion event, e.g. after a
    /// workspace switch under a still pointer.
    pub poll_interval_ms: u64,
    /// Exact event state that starts a drag on a placeholder window when
    /// the pointer moves over it.  Default: Super + primary button.
    pub placeholder_drag_state: u32,
    /// Which tile wins when several are under the pointer.
    pub tie_break: TieBreak,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            hit_test_interval_ms: 50,
            poll_interval_ms: 100,
            placeholder_drag_state: MOD_SUPER | BUTTON1,
            tie_break: TieBreak::FirstMatch,
        }
    }
}

impl DragConfig {
    pub fn hit_test_interval(&self) -> Duration {
        Duration::from_millis(self.hit_test_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration or layout file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub(crate) String);
