use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use nix::errno::Errno;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{error, info, warn};

use crate::error::ServerError;

/// Port the server listens on.
pub const DEFAULT_PORT: u16 = 8081;

/// Listening socket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    pub port: u16,
    pub backlog: u32,
}

/// Passive, non-blocking, dual-stack socket bound to `[::]:port`.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    config: ListenerConfig,
}

impl Listener {
    /// Creates the listening socket. Every failure is fatal.
    pub fn open(config: ListenerConfig) -> Result<Self, ServerError> {
        let (socket, addr) = match Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP)) {
            Ok(socket) => {
                // IPv4 peers arrive as v4-mapped addresses.
                socket.set_only_v6(false).map_err(|e| configure_failed(&socket, e))?;
                let addr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, config.port, 0, 0);
                (socket, SocketAddr::V6(addr))
            }
            Err(e) if e.raw_os_error() == Some(Errno::EAFNOSUPPORT as i32) => {
                warn!("IPv6 is not available, listening on IPv4 only");
                let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
                    .map_err(create_failed)?;
                (socket, SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port)))
            }
            Err(e) => return Err(create_failed(e)),
        };

        socket
            .set_nonblocking(true)
            .map_err(|e| configure_failed(&socket, e))?;

        socket.bind(&addr.into()).map_err(|e| {
            error!(
                fd = socket.as_raw_fd(),
                port = config.port,
                error = %e,
                "Can not bind() socket"
            );
            ServerError::Bind {
                port: config.port,
                source: e,
            }
        })?;

        listen(SockRef::from(&socket), config.backlog)?;

        let listener = Self {
            inner: socket.into(),
            config,
        };
        info!(addr = ?listener.local_addr(), backlog = config.backlog, "Listening");
        Ok(listener)
    }

    /// Re-applies `listen()` with a new backlog on the live socket.
    pub fn set_backlog(&mut self, backlog: u32) -> Result<(), ServerError> {
        if backlog == self.config.backlog {
            return Ok(());
        }
        listen(SockRef::from(&self.inner), backlog)?;
        self.config.backlog = backlog;
        info!(backlog, "Listen backlog updated");
        Ok(())
    }

    pub fn config(&self) -> ListenerConfig {
        self.config
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr().ok()
    }

    /// Accepts one pending connection.
    pub(crate) fn accept_raw(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept()
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl AsFd for Listener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

fn listen(socket: SockRef<'_>, backlog: u32) -> Result<(), ServerError> {
    let depth = i32::try_from(backlog).unwrap_or(i32::MAX);
    socket.listen(depth).map_err(|e| {
        error!(
            fd = socket.as_raw_fd(),
            backlog,
            error = %e,
            "Can not listen() on socket"
        );
        ServerError::Listen { backlog, source: e }
    })
}

fn create_failed(e: io::Error) -> ServerError {
    error!(error = %e, "Can not create socket");
    ServerError::Socket(e)
}

fn configure_failed(socket: &Socket, e: io::Error) -> ServerError {
    error!(fd = socket.as_raw_fd(), error = %e, "Can not configure socket");
    ServerError::Socket(e)
}
