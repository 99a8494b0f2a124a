//! Fatal server errors.
//!
//! Everything here ends the process with a failure status. Content load
//! failures ([`crate::content::ContentError`]) and unrecognised requests are
//! handled where they occur and never show up as a `ServerError`.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ServerError {
    /// The listening socket could not be created or configured.
    Socket(io::Error),
    /// `bind()` failed.
    Bind { port: u16, source: io::Error },
    /// `listen()` failed.
    Listen { backlog: u32, source: io::Error },
    /// The readiness wait failed.
    Poll(io::Error),
    /// Accepting a pending connection failed.
    Accept(io::Error),
}

impl ServerError {
    /// True for failures that happen before any connection is served.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            ServerError::Socket(_) | ServerError::Bind { .. } | ServerError::Listen { .. }
        )
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Socket(e) => write!(f, "can not create socket: {}", e),
            ServerError::Bind { port, source } => {
                write!(f, "can not bind() socket to address [::]:{}: {}", port, source)
            }
            ServerError::Listen { backlog, source } => {
                write!(f, "can not listen() with backlog {}: {}", backlog, source)
            }
            ServerError::Poll(e) => write!(f, "poll(): {}", e),
            ServerError::Accept(e) => write!(f, "accept(): {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Socket(e) | ServerError::Poll(e) | ServerError::Accept(e) => Some(e),
            ServerError::Bind { source, .. } | ServerError::Listen { source, .. } => Some(source),
        }
    }
}
