//! # The listener type shared across process generations.
//!
//! [`Listener`] wraps an open, bound endpoint in its blocking `std` form —
//! the form a descriptor reconstructs into. The master creates listeners
//! once and holds them for its entire lifetime; children receive equivalent
//! descriptors and typically convert to the tokio types themselves
//! (`set_nonblocking` + `from_std`) before accepting.
//!
//! The supervisor keeps the original `Listener` values alive until it
//! permanently exits, even though only the child accepts on them: a
//! Unix-domain listener's socket path must stay bound for as long as any
//! child generation may accept on an inherited descriptor, and callers
//! remove the path only after the master has returned.

use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixListener;

/// An open, bound network endpoint ready to accept connections.
#[derive(Debug)]
pub enum Listener {
    /// A TCP listener (IPv4 or IPv6).
    Tcp(std::net::TcpListener),
    /// A Unix-domain listener. Its socket path stays bound while this value
    /// is open; callers unlink the path after the supervisor has terminated.
    Unix(UnixListener),
}

impl Listener {
    /// Duplicates the underlying descriptor into an independently owned one.
    ///
    /// The duplicate keeps the OS resource alive regardless of what happens
    /// to this `Listener`; the caller owns both and closes the duplicate
    /// first (see the drop ordering in the supervisor's terminal state).
    pub(crate) fn dup_fd(&self) -> io::Result<OwnedFd> {
        match self {
            Listener::Tcp(l) => l.as_fd().try_clone_to_owned(),
            Listener::Unix(l) => l.as_fd().try_clone_to_owned(),
        }
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Listener::Tcp(l) => l.as_raw_fd(),
            Listener::Unix(l) => l.as_raw_fd(),
        }
    }
}
