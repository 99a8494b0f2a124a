//! Readiness wait and the set of watched connections.

use std::collections::BTreeMap;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::http::connection::Connection;

/// How long one readiness wait may block.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Accepted connections currently being watched, keyed by descriptor.
///
/// The listener is not stored here; the server adds it to each wait.
/// A connection leaves the set exactly once, through [`ConnectionSet::remove`],
/// and is closed when the returned value is dropped.
///
/// There is no idle timeout. A peer that connects and never sends keeps its
/// slot, so `capacity` silent peers stop the server from accepting anyone
/// else until one of them sends or hangs up.
#[derive(Debug)]
pub struct ConnectionSet {
    conns: BTreeMap<RawFd, Connection>,
    capacity: usize,
}

impl ConnectionSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            conns: BTreeMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.conns.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Starts watching `conn`. Returns its descriptor.
    pub fn insert(&mut self, conn: Connection) -> RawFd {
        let fd = conn.as_raw_fd();
        // The kernel never hands out a descriptor that is still open.
        let previous = self.conns.insert(fd, conn);
        debug_assert!(previous.is_none(), "descriptor {fd} watched twice");
        fd
    }

    pub fn get_mut(&mut self, fd: RawFd) -> Option<&mut Connection> {
        self.conns.get_mut(&fd)
    }

    /// Stops watching `fd` and hands the connection back for closing.
    pub fn remove(&mut self, fd: RawFd) -> Option<Connection> {
        self.conns.remove(&fd)
    }

    /// Watched descriptors in ascending order.
    pub fn fds(&self) -> impl Iterator<Item = BorrowedFd<'_>> + '_ {
        self.conns.values().map(|conn| conn.as_fd())
    }
}

/// Blocks until at least one of `fds` is readable or `timeout` elapses.
///
/// Returns the readable descriptors in ascending order; an empty list means
/// the wait timed out or was interrupted by a signal. Hang-ups and socket
/// errors count as readable so the owner gets to close them. A descriptor
/// the kernel reports as invalid fails the whole wait.
pub fn wait_readable(fds: &[BorrowedFd<'_>], timeout: Duration) -> io::Result<Vec<RawFd>> {
    let mut fds = fds.to_vec();
    fds.sort_unstable_by_key(|fd| fd.as_raw_fd());

    let mut pollfds: Vec<PollFd<'_>> = fds
        .iter()
        .map(|fd| PollFd::new(*fd, PollFlags::POLLIN))
        .collect();
    let timeout = PollTimeout::try_from(timeout).unwrap_or(PollTimeout::MAX);

    match poll(&mut pollfds, timeout) {
        Ok(0) | Err(Errno::EINTR) => return Ok(Vec::new()),
        Ok(_) => {}
        Err(e) => return Err(e.into()),
    }

    let mut ready = Vec::new();
    for (fd, p) in fds.iter().zip(&pollfds) {
        let revents = p.revents().unwrap_or(PollFlags::empty());
        if revents.contains(PollFlags::POLLNVAL) {
            return Err(Errno::EBADF.into());
        }
        if revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR) {
            ready.push(fd.as_raw_fd());
        }
    }
    Ok(ready)
}
