//! IPC listener that accepts drag events over a Unix socket.
//!
//! A compositor bridge (or a test script) connects to the socket and sends
//! newline-delimited JSON events.

pub mod listener;
