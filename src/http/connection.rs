use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use tracing::{debug, info, warn};

use crate::content::ContentStore;
use crate::error::ServerError;
use crate::http::classify::{classify, Classification};
use crate::http::response::not_found_page;
use crate::http::writer::{write_best_effort, WriteOutcome};
use crate::server::listener::Listener;

/// Largest request read from a connection.
pub const MAX_REQUEST: usize = 64 * 1024;

/// An accepted client connection waiting for its request.
///
/// Dropping a `Connection` closes its descriptor.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

/// What [`Connection::serve`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The read would have blocked. Nothing was written; keep watching.
    Pending,
    /// A response was written (possibly partially). The connection is done.
    Responded {
        classification: Classification,
        write: Option<WriteOutcome>,
    },
}

impl ServeOutcome {
    pub fn is_done(&self) -> bool {
        !matches!(self, ServeOutcome::Pending)
    }
}

impl Connection {
    /// Accepts one pending peer from `listener`.
    ///
    /// Returns `Ok(None)` when nothing is actually pending. Any other
    /// accept failure is fatal.
    pub fn accept(listener: &Listener) -> Result<Option<Self>, ServerError> {
        let (stream, peer) = match listener.accept_raw() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(None),
            Err(e) => return Err(ServerError::Accept(e)),
        };

        stream.set_nonblocking(true).map_err(ServerError::Accept)?;

        let conn = Self::new(stream, peer);
        info!(fd = conn.as_raw_fd(), peer = %conn.peer, "New connection from");

        Ok(Some(conn))
    }

    /// Wraps an accepted stream. IPv4-mapped peers are reported as IPv4.
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let peer = SocketAddr::new(peer.ip().to_canonical(), peer.port());
        Self { stream, peer }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Reads the request in one go, classifies it and writes the answer.
    ///
    /// Whatever the single read returns is the whole request. A read error
    /// or an empty read classifies as invalid and gets the 404 page.
    /// `buf` is scratch space shared by every connection; at most
    /// [`MAX_REQUEST`] bytes of it are used.
    pub fn serve(&mut self, content: &ContentStore, buf: &mut [u8]) -> ServeOutcome {
        let len = buf.len().min(MAX_REQUEST);
        let buf = &mut buf[..len];
        let n = match self.stream.read(buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ServeOutcome::Pending,
            Err(e) => {
                debug!(fd = self.as_raw_fd(), peer = %self.peer, error = %e, "read() failed");
                0
            }
        };

        let classification = classify(&buf[..n]);
        let payload = match classification {
            Classification::Valid => content.current(),
            Classification::Invalid => not_found_page(),
        };

        debug!(
            fd = self.as_raw_fd(),
            peer = %self.peer,
            request_bytes = n,
            ?classification,
            "Serving request"
        );

        let write = match write_best_effort(&mut self.stream, payload) {
            Ok(WriteOutcome::Complete) => Some(WriteOutcome::Complete),
            Ok(partial @ WriteOutcome::Partial { written, total }) => {
                warn!(peer = %self.peer, written, total, "Response truncated");
                Some(partial)
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "write() failed");
                None
            }
        };

        ServeOutcome::Responded {
            classification,
            write,
        }
    }
}

impl AsRawFd for Connection {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::default_page;
    use crate::server::listener::ListenerConfig;
    use std::io::Write;
    use std::thread;
    use std::time::{Duration, Instant};

    fn accept_one(listener: &Listener) -> Connection {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(conn) = Connection::accept(listener).unwrap() {
                return conn;
            }
            assert!(Instant::now() < deadline, "no connection arrived");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn client(listener: &Listener) -> TcpStream {
        let port = listener.local_addr().unwrap().port();
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    #[test]
    fn nothing_pending_accepts_nothing() {
        let listener = Listener::open(ListenerConfig { port: 0, backlog: 4 }).unwrap();
        assert!(Connection::accept(&listener).unwrap().is_none());
    }

    #[test]
    fn ipv4_peer_is_logged_without_mapping() {
        let listener = Listener::open(ListenerConfig { port: 0, backlog: 4 }).unwrap();
        let _client = client(&listener);
        let conn = accept_one(&listener);
        assert!(conn.peer().is_ipv4());
    }

    #[test]
    fn silent_peer_leaves_connection_pending() {
        let listener = Listener::open(ListenerConfig { port: 0, backlog: 4 }).unwrap();
        let _client = client(&listener);
        let mut conn = accept_one(&listener);
        let mut buf = vec![0u8; MAX_REQUEST];
        assert_eq!(conn.serve(&ContentStore::new(), &mut buf), ServeOutcome::Pending);
    }

    #[test]
    fn valid_request_gets_content() {
        let listener = Listener::open(ListenerConfig { port: 0, backlog: 4 }).unwrap();
        let mut peer = client(&listener);
        let mut conn = accept_one(&listener);

        peer.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let mut buf = vec![0u8; MAX_REQUEST];
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = loop {
            match conn.serve(&ContentStore::new(), &mut buf) {
                ServeOutcome::Pending => {
                    assert!(Instant::now() < deadline);
                    thread::sleep(Duration::from_millis(10));
                }
                done => break done,
            }
        };
        assert_eq!(
            outcome,
            ServeOutcome::Responded {
                classification: Classification::Valid,
                write: Some(WriteOutcome::Complete),
            }
        );
        drop(conn);

        let mut resp = Vec::new();
        peer.read_to_end(&mut resp).unwrap();
        assert_eq!(resp, default_page());
    }

    #[test]
    fn stale_bytes_in_shared_buffer_are_ignored() {
        let listener = Listener::open(ListenerConfig { port: 0, backlog: 4 }).unwrap();
        let mut peer = client(&listener);
        let mut conn = accept_one(&listener);

        // Left over from an earlier, valid request on another connection.
        let mut buf = vec![0u8; MAX_REQUEST];
        buf[..6].copy_from_slice(b"GET / ");

        peer.write_all(b"PUT").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = loop {
            match conn.serve(&ContentStore::new(), &mut buf) {
                ServeOutcome::Pending => {
                    assert!(Instant::now() < deadline);
                    thread::sleep(Duration::from_millis(10));
                }
                done => break done,
            }
        };
        assert!(matches!(
            outcome,
            ServeOutcome::Responded {
                classification: Classification::Invalid,
                ..
            }
        ));
        drop(conn);

        let mut resp = Vec::new();
        peer.read_to_end(&mut resp).unwrap();
        assert_eq!(resp, not_found_page());
    }
}
