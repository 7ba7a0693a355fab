//! **tiledrag**: drag-and-drop for tiling desktops.
//!
//! A window is picked up either when the compositor starts a move grab on
//! it or when the pointer moves over a placeholder window with the drag
//! chord held.  While the button is down the window follows the pointer and
//! a throttled hit-test keeps re-slotting it: hovering another tile swaps
//! the two, crossing onto another monitor moves the window into that
//! monitor's workspace.  Releasing the button drops it into the tile slot it
//! ended up in.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Shell`]: abstracts the window collection, the stage, the
//!   workspace manager, the timer and the key-action table, so the drag
//!   logic is not coupled to any specific compositor.
//! * [`traits::EventSource`]: abstracts the transport that delivers
//!   [`event::DragEvent`]s (a Unix socket, a compositor bridge, …) so the
//!   main loop is not coupled to any specific IPC mechanism.
//!
//! [`controller::DragController`] is the state machine tying the pieces
//! together.  Concrete implementations live in [`headless`] (in-memory
//! desktop) and [`ipc`] (Unix-socket event listener).

pub mod config;
pub mod controller;
pub mod event;
pub mod geometry;
pub mod grabber;
pub mod headless;
pub mod ipc;
pub mod placement;
pub mod session;
pub mod subscription;
pub mod throttle;
pub mod traits;
