//! Development server with a reload/exit control loop.
//!
//! Built on `tiny_http`:
//!
//! - Sitemap pages are rendered per request, pass-through assets are served
//!   from `prebuild/`
//! - Automatic port retry when the configured port is taken
//! - Ctrl+C once to reload, twice to exit
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (State Monitor) │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Handle requests         Poll StateFlag
//!    one at a time           unblock server
//! └─────────────────────────────────────────────┘
//!                    │
//!                    ▼
//!      grace period → ServeOutcome::{Reload, Exit}
//! ```
//!
//! The flag is the only state shared between threads. It only moves forward:
//! `Running → ReloadRequested → Exiting`.
//!
//! Reloading is left to the caller: a reload outcome maps to
//! [`RELOAD_EXIT_CODE`], which the supervisor answers by starting a fresh
//! worker.

use crate::{config::ServeConfig, handler::RequestHandler, log};
use anyhow::{Context, Result, anyhow};
use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::{Header, Request, Response, Server};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// How often the watcher checks the state flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code of a worker asking to be restarted.
pub const RELOAD_EXIT_CODE: i32 = 75;

// ============================================================================
// Control State
// ============================================================================

/// Lifecycle of a serving process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Running = 0,
    ReloadRequested = 1,
    Exiting = 2,
}

impl ServerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::ReloadRequested,
            _ => Self::Exiting,
        }
    }
}

/// Tri-state flag shared by the signal handler, the watcher and the listener.
#[derive(Debug, Default)]
pub struct StateFlag(AtomicU8);

impl StateFlag {
    pub fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Advance on an interrupt: the first moves to `ReloadRequested`, any
    /// later one to `Exiting`. Returns the new state.
    pub fn signal(&self) -> ServerState {
        self.advance(|state| match state {
            ServerState::Running => ServerState::ReloadRequested,
            ServerState::ReloadRequested | ServerState::Exiting => ServerState::Exiting,
        })
    }

    /// Move straight to `Exiting`.
    pub fn request_exit(&self) -> ServerState {
        self.advance(|_| ServerState::Exiting)
    }

    fn advance(&self, next: impl Fn(ServerState) -> ServerState) -> ServerState {
        let prev = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                Some(next(ServerState::from_u8(raw)) as u8)
            })
            .unwrap_or_else(|raw| raw);
        next(ServerState::from_u8(prev))
    }
}

/// How a serving session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    Reload,
    Exit,
}

impl ServeOutcome {
    fn from_state(state: ServerState) -> Self {
        match state {
            ServerState::ReloadRequested => Self::Reload,
            ServerState::Running | ServerState::Exiting => Self::Exit,
        }
    }

    /// Process exit code for this outcome.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Reload => RELOAD_EXIT_CODE,
            Self::Exit => 0,
        }
    }
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve `handler` until interrupted.
///
/// This function:
/// 1. Binds to the configured interface and port (with auto-retry on port conflict)
/// 2. Installs the Ctrl+C handler driving the state flag
/// 3. Spawns the watcher thread
/// 4. Handles requests in the calling thread until the watcher unblocks it
/// 5. Waits the grace period and reports whether to reload or exit
pub fn serve_site(handler: &RequestHandler, config: &ServeConfig) -> Result<ServeOutcome> {
    let interface: IpAddr = config
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.interface))?;
    let (server, addr) = try_bind_port(interface, config.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);
    let flag = Arc::new(StateFlag::default());

    let signal_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || match signal_flag.signal() {
        ServerState::ReloadRequested => {
            log!("serve"; "reloading, hit ctrl-c again to exit");
        }
        _ => log!("serve"; "shutting down..."),
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);
    log!("serve"; "hit ctrl-c once to reload, twice to exit");

    let watcher = spawn_watcher(Arc::clone(&server), Arc::clone(&flag));
    serve_requests(&server, handler);

    if flag.get() == ServerState::Running {
        flag.request_exit();
    }
    watcher
        .join()
        .map_err(|_| anyhow!("watcher thread panicked"))?;

    // let in-flight responses drain
    thread::sleep(config.grace());

    Ok(ServeOutcome::from_state(flag.get()))
}

/// Poll `flag` and unblock the listener once it leaves `Running`.
fn spawn_watcher(server: Arc<Server>, flag: Arc<StateFlag>) -> JoinHandle<()> {
    thread::spawn(move || {
        while flag.get() == ServerState::Running {
            thread::sleep(POLL_INTERVAL);
        }
        server.unblock();
    })
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle requests until the server is unblocked.
fn serve_requests(server: &Server, handler: &RequestHandler) {
    for request in server.incoming_requests() {
        if let Err(e) = respond(request, handler) {
            log!("serve"; "request error: {e}");
        }
    }
}

fn respond(request: Request, handler: &RequestHandler) -> Result<()> {
    let method = request.method().as_str().to_owned();
    let url = request.url().to_owned();

    let response = handler.handle(&method, &url);
    log!("serve"; "{} {} -> {}", method, url, response.status);

    let content_type = Header::from_bytes("Content-Type", response.content_type)
        .map_err(|()| anyhow!("invalid content type `{}`", response.content_type))?;
    request.respond(
        Response::from_data(response.body)
            .with_status_code(response.status)
            .with_header(content_type),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Site;
    use serde_json::json;
    use std::{
        fs,
        io::{Read, Write},
        net::TcpStream,
    };
    use tempfile::TempDir;

    #[test]
    fn test_state_transitions() {
        let flag = StateFlag::default();
        assert_eq!(flag.get(), ServerState::Running);
        assert_eq!(flag.signal(), ServerState::ReloadRequested);
        assert_eq!(flag.signal(), ServerState::Exiting);
        assert_eq!(flag.signal(), ServerState::Exiting);
        assert_eq!(flag.get(), ServerState::Exiting);
    }

    #[test]
    fn test_request_exit_never_goes_back() {
        let flag = StateFlag::default();
        flag.request_exit();
        assert_eq!(flag.signal(), ServerState::Exiting);
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(ServeOutcome::from_state(ServerState::ReloadRequested), ServeOutcome::Reload);
        assert_eq!(ServeOutcome::from_state(ServerState::Exiting), ServeOutcome::Exit);
        assert_eq!(ServeOutcome::Reload.exit_code(), RELOAD_EXIT_CODE);
        assert_eq!(ServeOutcome::Exit.exit_code(), 0);
    }

    fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_until_flag_leaves_running() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("about.html"), "about page").unwrap();
        let mut site = Site::new(dir.path());
        site.add_page("about/index.html", json!({"template": "about.html"}))
            .unwrap();
        let handler = RequestHandler::new(Arc::new(site));

        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let flag = Arc::new(StateFlag::default());
        let watcher = spawn_watcher(Arc::clone(&server), Arc::clone(&flag));

        let listener = Arc::clone(&server);
        let serving = thread::spawn(move || serve_requests(&listener, &handler));

        let ok = http_get(addr, "/about");
        assert!(ok.contains("200 OK"), "{ok}");
        assert!(ok.ends_with("about page"), "{ok}");

        let missing = http_get(addr, "/nope.txt");
        assert!(missing.contains("404"), "{missing}");

        assert_eq!(flag.signal(), ServerState::ReloadRequested);
        watcher.join().unwrap();
        serving.join().unwrap();
        assert_eq!(ServeOutcome::from_state(flag.get()), ServeOutcome::Reload);
    }

    #[test]
    fn test_try_bind_port_retries() {
        let taken = Server::http("127.0.0.1:0").unwrap();
        let port = taken.server_addr().to_ip().unwrap().port();
        let interface: IpAddr = "127.0.0.1".parse().unwrap();

        match try_bind_port(interface, port, 3) {
            Ok((_, addr)) => assert_ne!(addr.port(), port),
            // neighbouring ports may be taken on a busy machine
            Err(e) => assert!(e.to_string().contains("Failed to bind")),
        }
    }
}
