//! Unix-socket [`EventSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`DragEvent`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"GrabBegin":{"window":3,"op":"Moving"}}
//! {"Motion":{"x":812.0,"y":440.5}}
//! {"ButtonRelease":{"x":812.0,"y":440.5}}
//! {"WindowMotion":{"window":7,"state":320}}
//! {"KeyPress":{"keycode":114,"modifiers":64}}
//! "ActiveWorkspaceChanged"
//! {"WindowDestroyed":3}
//! ```
//!
//! `"PollTick"` is not accepted from clients; the daemon schedules its own.

use crate::event::DragEvent;
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// An [`EventSource`] that listens on a Unix stream socket for
/// JSON-encoded events.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// events.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](EventSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** until the receiving side of `sink` is dropped.
    /// Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<DragEvent>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    if !forward_events(BufReader::new(stream), &sink) {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                    debug!("client disconnected");
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
        Ok(())
    }
}

/// Forward every event read from `reader` into `sink`.
///
/// Returns `false` once `sink` is closed.  `PollTick` is produced by the
/// daemon's own timer, so ticks arriving from a client are dropped.
fn forward_events(reader: impl BufRead, sink: &mpsc::Sender<DragEvent>) -> bool {
    for line in reader.lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                error!("read error: {}", e);
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<DragEvent>(&text) {
            Ok(DragEvent::PollTick) => {
                warn!("client sent PollTick, ignored");
                continue;
            }
            Ok(event) => event,
            Err(e) => {
                error!("bad event {:?}: {}", text, e);
                continue;
            }
        };
        debug!("received {:?}", event);
        if sink.send(event).is_err() {
            return false;
        }
    }
    true
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{GrabOp, WindowId};
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("tiledrag-test-{}-{}.sock", std::process::id(), id))
    }

    fn spawn_listener(path: &Path) -> mpsc::Receiver<DragEvent> {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path);
            let _ = listener.run(tx);
        });
        // Give the listener a moment to bind.
        std::thread::sleep(Duration::from_millis(150));
        rx
    }

    #[test]
    fn events_arrive_in_order_without_client_ticks() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#"{{"GrabBegin":{{"window":3,"op":"Moving"}}}}"#).unwrap();
            writeln!(stream, r#"{{"Motion":{{"x":1.0,"y":2.0}}}}"#).unwrap();
            writeln!(stream).unwrap();
            writeln!(stream, r#""PollTick""#).unwrap();
            writeln!(stream, r#"{{"WindowDestroyed":3}}"#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(Duration::from_millis(150));
        let events: Vec<DragEvent> = rx.try_iter().collect();

        assert_eq!(
            events,
            vec![
                DragEvent::GrabBegin {
                    window: WindowId(3),
                    op: GrabOp::Moving
                },
                DragEvent::Motion { x: 1.0, y: 2.0 },
                DragEvent::WindowDestroyed(WindowId(3)),
            ]
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_does_not_crash() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "not json at all").unwrap();
            writeln!(stream, r#"{{"Motion":{{"x":"left"}}}}"#).unwrap();
            writeln!(stream, r#""ActiveWorkspaceChanged""#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(Duration::from_millis(150));
        let events: Vec<DragEvent> = rx.try_iter().collect();
        // Only the valid event should have arrived.
        assert_eq!(events, vec![DragEvent::ActiveWorkspaceChanged]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn forward_stops_when_sink_closes() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let input: &[u8] = b"\"ActiveWorkspaceChanged\"\n";
        assert!(!forward_events(input, &tx));
    }

    #[test]
    fn forward_skips_blank_bad_and_tick_lines() {
        let (tx, rx) = mpsc::channel();
        let input: &[u8] = b"\n\"PollTick\"\n{oops\n{\"WindowCreated\":9}\n";
        assert!(forward_events(input, &tx));
        let events: Vec<DragEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![DragEvent::WindowCreated(WindowId(9))]);
    }

    #[test]
    fn second_connection_is_served() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        for x in [1.0, 2.0] {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#"{{"ButtonRelease":{{"x":{:.1},"y":0.0}}}}"#, x).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
            std::thread::sleep(Duration::from_millis(50));
        }

        std::thread::sleep(Duration::from_millis(150));
        let events: Vec<DragEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                DragEvent::ButtonRelease { x: 1.0, y: 0.0 },
                DragEvent::ButtonRelease { x: 2.0, y: 0.0 },
            ]
        );

        let _ = std::fs::remove_file(&path);
    }
}
