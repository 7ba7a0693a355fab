//! Entry point for the **tiledrag** daemon.
//!
//! Spawns the Unix-socket [`EventSource`](tiledrag::traits::EventSource) on
//! a background thread and feeds incoming events to a
//! [`DragController`](tiledrag::controller::DragController) on the main
//! thread.  The desktop is the in-memory headless backend, described by a
//! layout file given with `--layout <file>` (a built-in two-monitor sample
//! otherwise).

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tiledrag::config::Config;
use tiledrag::controller::DragController;
use tiledrag::event::DragEvent;
use tiledrag::geometry::Point;
use tiledrag::headless::{HeadlessShell, Layout};
use tiledrag::ipc::listener::UnixSocketListener;
use tiledrag::traits::EventSource;

/// Default socket path for the event listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/tiledrag.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/tiledrag`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("tiledrag")
}

/// Try to load the config from `$XDG_CONFIG_HOME/tiledrag/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Value following `--layout` on the command line.
fn layout_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--layout" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn load_layout(path: Option<&Path>) -> Layout {
    let Some(path) = path else {
        info!("no --layout given, using the sample desktop");
        return Layout::sample();
    };
    match Layout::load(path) {
        Ok(layout) => {
            info!("loaded layout from {}", path.display());
            layout
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let layout = load_layout(layout_arg().as_deref());
    info!("{} monitor(s), {} workspace(s)", layout.monitors.len(), layout.workspaces.len());

    let shell = HeadlessShell::from_layout(layout, Instant::now());
    let controller = DragController::new(shell, config.drag);

    let (tx, rx) = mpsc::channel::<DragEvent>();
    spawn_event_sources(tx);

    run_event_loop(controller, rx);
}

/// Dispatch socket events and poll timer ticks until every source closes.
///
/// A due tick is delivered after whatever woke the loop, so a steady stream
/// of events cannot starve the poll timer.
fn run_event_loop(mut controller: DragController<HeadlessShell>, rx: mpsc::Receiver<DragEvent>) {
    info!("tiledrag running");
    loop {
        let timeout = controller
            .shell()
            .next_poll()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));

        match rx.recv_timeout(timeout) {
            Ok(event) => dispatch(&mut controller, event, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        deliver_due_poll(&mut controller, Instant::now());
    }
    info!("all event sources closed, exiting");
}

fn dispatch(controller: &mut DragController<HeadlessShell>, event: DragEvent, now: Instant) {
    let shell = controller.shell_mut();
    shell.set_time(now);
    if let DragEvent::Motion { x, y } | DragEvent::ButtonRelease { x, y } = event {
        shell.warp_pointer(Point::new(x, y));
    }

    if let Err(e) = controller.handle(event) {
        warn!("event error: {}", e);
    }
    debug!("layout: {}", controller.shell().describe());
}

/// Dispatch a `PollTick` if the poll deadline has passed at `now`.
fn deliver_due_poll(controller: &mut DragController<HeadlessShell>, now: Instant) -> bool {
    let shell = controller.shell_mut();
    shell.set_time(now);
    if !shell.take_due_poll() {
        return false;
    }
    dispatch(controller, DragEvent::PollTick, now);
    true
}

//  Helpers

fn spawn_event_sources(tx: mpsc::Sender<DragEvent>) {
    let mut source = UnixSocketListener::new(default_socket_path());
    info!("event socket: {}", source.path().display());
    std::thread::spawn(move || {
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
