//! # Socket-activation importer.
//!
//! Reconstructs listeners from descriptors that an earlier process image
//! already bound. Two equivalent sources feed this module:
//!
//! - the master's own re-exec (the role marker carries the count), and
//! - an external activator such as systemd (`LISTEN_PID`/`LISTEN_FDS`).
//!
//! Either way, descriptors occupy contiguous slots starting at 3 and are
//! recovered deterministically by count alone. The address family of each
//! slot is sniffed from the socket itself, so a mixed TCP/Unix set restores
//! into the correct [`Listener`] variants.

use std::env;
use std::io;
use std::os::fd::{FromRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixListener;

use socket2::{Domain, Socket};
use tracing::debug;

use crate::error::ImportError;
use crate::net::Listener;

/// First descriptor slot used for inherited listeners.
pub(crate) const LISTEN_FDS_START: RawFd = 3;

const SD_LISTEN_PID: &str = "LISTEN_PID";
const SD_LISTEN_FDS: &str = "LISTEN_FDS";

/// Restores `count` listeners from the conventional descriptor slots.
///
/// This is the self re-exec path: `count` comes from the already-typed
/// [`Role`](crate::Role), so there is nothing left to parse. A count of 0
/// yields an empty collection, not an error.
///
/// Ownership of each slot descriptor transfers to the returned listener.
pub fn restore_listeners(count: usize) -> Result<Vec<Listener>, ImportError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    debug!(count, "restoring inherited listeners");

    let mut listeners = Vec::with_capacity(count);
    for i in 0..count {
        let fd = LISTEN_FDS_START + i as RawFd;
        let listener =
            listener_from_fd(fd).map_err(|source| ImportError::Restore { fd, source })?;
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Returns listeners handed over by systemd socket activation.
///
/// `LISTEN_PID` absent, unparsable, or naming another process means the
/// activation is not for us: the result is an empty collection, not an
/// error, and the variables are left alone (they may be addressed to a
/// different process image). On a match, `LISTEN_FDS` many listeners are
/// restored from slot 3 and both variables are cleared so a subsequent
/// restart does not reprocess them.
pub fn systemd_listeners() -> Result<Vec<Listener>, ImportError> {
    let pid = env::var(SD_LISTEN_PID)
        .ok()
        .and_then(|v| v.parse::<u32>().ok());
    if pid != Some(std::process::id()) {
        return Ok(Vec::new());
    }
    env::remove_var(SD_LISTEN_PID);

    let value = env::var_os(SD_LISTEN_FDS)
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();
    env::remove_var(SD_LISTEN_FDS);

    let count = value.parse::<usize>().map_err(|source| ImportError::BadCount {
        var: SD_LISTEN_FDS,
        value,
        source,
    })?;
    restore_listeners(count)
}

/// Whether this process looks like it was launched by systemd.
///
/// Detected via `INVOCATION_ID`, which systemd sets for every unit it
/// starts.
pub fn is_systemd_service() -> bool {
    env::var_os("INVOCATION_ID").is_some()
}

/// Takes ownership of `fd` and rebuilds the matching listener variant.
fn listener_from_fd(fd: RawFd) -> io::Result<Listener> {
    // Safety: the re-exec contract hands this slot to us exclusively; no
    // other owner exists in this process.
    let sock = unsafe { Socket::from_raw_fd(fd) };
    let domain = sock.local_addr()?.domain();
    match domain {
        Domain::IPV4 | Domain::IPV6 => {
            let raw = sock.into_raw_fd();
            // Safety: `raw` was just released by the socket2 wrapper.
            Ok(Listener::Tcp(unsafe { std::net::TcpListener::from_raw_fd(raw) }))
        }
        Domain::UNIX => {
            let raw = sock.into_raw_fd();
            // Safety: as above.
            Ok(Listener::Unix(unsafe { UnixListener::from_raw_fd(raw) }))
        }
        other => Err(io::Error::other(format!(
            "unsupported socket domain {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn test_zero_count_is_empty_not_error() {
        assert!(restore_listeners(0).unwrap().is_empty());
    }

    #[test]
    fn test_listener_from_fd_detects_tcp() {
        let ln = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = ln.local_addr().unwrap();
        let dup = ln.as_fd().try_clone_to_owned().unwrap();

        let restored = listener_from_fd(dup.into_raw_fd()).unwrap();
        match restored {
            Listener::Tcp(l) => assert_eq!(l.local_addr().unwrap(), addr),
            other => panic!("expected a TCP listener, got {other:?}"),
        }
    }

    #[test]
    fn test_listener_from_fd_detects_unix() {
        let path = env::temp_dir().join(format!("gracevisor-import-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let ln = UnixListener::bind(&path).unwrap();
        let dup = ln.as_fd().try_clone_to_owned().unwrap();

        let restored = listener_from_fd(dup.into_raw_fd()).unwrap();
        assert!(matches!(restored, Listener::Unix(_)));

        drop(restored);
        drop(ln);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_systemd_foreign_pid_is_not_activated() {
        // Pid 1 is never the test process.
        env::set_var(SD_LISTEN_PID, "1");
        env::set_var(SD_LISTEN_FDS, "3");

        assert!(systemd_listeners().unwrap().is_empty());
        assert!(env::var_os(SD_LISTEN_PID).is_some(), "foreign vars are left alone");

        env::remove_var(SD_LISTEN_PID);
        env::remove_var(SD_LISTEN_FDS);
    }
}
