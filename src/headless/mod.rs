//! In-memory desktop backend.
//!
//! Used by the daemon when no compositor bridge is available and by the
//! test suite.  The desktop is described by a JSON [`Layout`] file.

pub mod layout;
pub mod shell;

pub use layout::Layout;
pub use shell::{HeadlessError, HeadlessShell, ShellCall};
