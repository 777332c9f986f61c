//! # Listener export.
//!
//! Turns live listeners into OS-level descriptors suitable for inheritance
//! by a child process. The export happens once per master lifetime; the same
//! descriptor set is reused by every spawned child generation.

use std::io;
use std::os::fd::OwnedFd;

use crate::net::Listener;

/// Exports each listener as an independently owned descriptor.
///
/// The result has the same length and order as the input: handle *i*
/// corresponds to listener *i* and will occupy descriptor slot `3 + i` in
/// the child. The caller remains responsible for closing both collections —
/// handles first, listeners last.
pub fn listener_files(listeners: &[Listener]) -> io::Result<Vec<OwnedFd>> {
    listeners.iter().map(Listener::dup_fd).collect()
}
