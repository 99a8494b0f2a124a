//! Server context and the readiness loop.
//!
//! One thread runs [`Server::run`]. Each iteration it checks the control
//! flags, waits up to [`POLL_TIMEOUT`] for the listener or any watched
//! connection to become readable, then services the ready descriptors in
//! ascending order:
//!
//! ```text
//!            timeout
//!          ┌─────────┐
//!          ▼         │
//!     ┌─────────┐ ───┘    ≥1 ready    ┌─────────────┐
//!     │ polling │ ──────────────────▶ │ dispatching │
//!     └─────────┘ ◀────────────────── └─────────────┘
//!          │          all serviced
//!          │ stop requested
//!          ▼
//!      stopped
//! ```
//!
//! The listener admits one peer per readiness report. A ready connection is
//! read once, answered once, then removed and closed.

pub mod control;
pub mod listener;
pub mod multiplexer;
pub mod signals;

use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigSource};
use crate::content::{ContentStore, LoadKind};
use crate::error::ServerError;
use crate::http::connection::{Connection, MAX_REQUEST};

use control::{Control, ControlHandle};
use listener::{Listener, ListenerConfig};
use multiplexer::{wait_readable, ConnectionSet, POLL_TIMEOUT};

/// Everything the loop owns: listener, watched connections, content,
/// control flags and the active configuration.
#[derive(Debug)]
pub struct Server {
    listener: Listener,
    connections: ConnectionSet,
    content: ContentStore,
    control: Control,
    config: Config,
    source: Option<ConfigSource>,
    saturated: bool,
    read_buf: Box<[u8]>,
}

impl Server {
    /// Opens the listener on `port` and loads the configured content file.
    ///
    /// A content file that cannot be read is logged and the built-in page
    /// is served instead; only listener failures are returned.
    pub fn bind(port: u16, config: Config) -> Result<Self, ServerError> {
        let listener = Listener::open(ListenerConfig {
            port,
            backlog: config.backlog,
        })?;

        let mut content = match &config.html_file {
            Some(path) => ContentStore::with_path(path),
            None => ContentStore::new(),
        };
        if let Err(e) = content.load(LoadKind::Initial) {
            debug!(path = %e.path().display(), "Starting with the default page");
        }

        Ok(Self {
            listener,
            connections: ConnectionSet::new(config.max_connections),
            content,
            control: Control::new(),
            config,
            source: None,
            saturated: false,
            read_buf: vec![0u8; MAX_REQUEST].into_boxed_slice(),
        })
    }

    /// Where a reload re-reads the configuration from.
    pub fn with_config_source(mut self, source: ConfigSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn handle(&self) -> ControlHandle {
        self.control.handle()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// Runs until a stop is requested or a fatal error occurs.
    ///
    /// Connections still open on exit are left to be closed by the caller
    /// dropping the server (or by process exit).
    pub fn run(&mut self) -> Result<(), ServerError> {
        info!(addr = ?self.local_addr(), "Server loop started");

        while self.control.is_running() {
            if self.control.take_reload() {
                self.reload();
            }
            self.turn()?;
        }

        info!(open = self.connections.len(), "Server loop stopped");
        Ok(())
    }

    /// One polling phase followed by one dispatching phase.
    ///
    /// Returns the descriptors that were serviced, in service order.
    fn turn(&mut self) -> Result<Vec<RawFd>, ServerError> {
        let listener_fd = self.listener.as_raw_fd();

        let accepting = !self.connections.is_full();
        if accepting {
            self.saturated = false;
        } else if !self.saturated {
            warn!(
                limit = self.connections.capacity(),
                "Connection limit reached, not accepting"
            );
            self.saturated = true;
        }

        let ready = {
            let mut fds: Vec<BorrowedFd<'_>> = Vec::with_capacity(self.connections.len() + 1);
            fds.extend(self.connections.fds());
            if accepting {
                fds.push(self.listener.as_fd());
            }
            wait_readable(&fds, POLL_TIMEOUT).map_err(|e| {
                error!(error = %e, "Readiness wait failed");
                ServerError::Poll(e)
            })?
        };

        for &fd in &ready {
            if fd == listener_fd {
                self.admit()?;
            } else {
                self.dispatch(fd);
            }
        }
        Ok(ready)
    }

    fn admit(&mut self) -> Result<(), ServerError> {
        match Connection::accept(&self.listener) {
            Ok(Some(conn)) => {
                self.connections.insert(conn);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                error!(error = %e, "Accepting connection failed");
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, fd: RawFd) {
        let Some(conn) = self.connections.get_mut(fd) else {
            return;
        };

        let outcome = conn.serve(&self.content, &mut self.read_buf);
        if outcome.is_done() {
            if let Some(conn) = self.connections.remove(fd) {
                debug!(fd, peer = %conn.peer(), "Closing connection");
                drop(conn);
            }
        }
    }

    /// Re-reads the configuration (when there is a source) and the content file.
    fn reload(&mut self) {
        info!("Reloading");

        match self.source.as_ref().map(ConfigSource::load) {
            Some(Ok(config)) => self.apply_config(config),
            Some(Err(e)) => error!(error = %e, "Keeping previous configuration"),
            None => {}
        }

        if let Err(e) = self.content.load(LoadKind::Reload) {
            debug!(path = %e.path().display(), "Serving the default page after reload");
        }
    }

    fn apply_config(&mut self, mut config: Config) {
        if let Err(e) = self.listener.set_backlog(config.backlog) {
            warn!(error = %e, "Keeping previous backlog");
            config.backlog = self.listener.config().backlog;
        }
        self.connections.set_capacity(config.max_connections);
        self.content.set_path(config.html_file.clone());
        if let Some(path) = self.source.as_ref().and_then(|s| s.path.as_deref()) {
            info!(path = %path.display(), "Reloaded configuration file");
        }
        self.config = config;
    }
}
