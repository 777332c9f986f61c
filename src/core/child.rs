//! # One spawned child generation.
//!
//! [`ChildProc`] bundles what the master needs to supervise a single
//! generation: the child's pid, a completion channel fed by a dedicated
//! wait-for-exit task, and the handle of its log relay. Exactly one
//! generation is current at a time; the record is replaced wholesale on
//! reload and only ever touched by the master task.
//!
//! The child is built from the configured argv (by default, this process's
//! own executable and arguments), with its environment reduced to the single
//! role marker and the exported listener descriptors moved into the
//! conventional slots starting at 3.

use std::env;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;
use crate::core::relay::{self, LogSink};
use crate::error::RuntimeError;
use crate::net::LISTEN_FDS_START;
use crate::role::LISTEN_FDS_ENV;

/// A single supervised child generation.
pub(crate) struct ChildProc {
    /// OS process id, used for explicit termination requests.
    pub(crate) pid: u32,
    /// Fires once when the child has been reaped.
    pub(crate) exited: oneshot::Receiver<io::Result<std::process::ExitStatus>>,
    /// The generation's log relay; completes once stderr is drained.
    pub(crate) relay: JoinHandle<()>,
}

impl ChildProc {
    /// Spawns a new generation inheriting the exported descriptors.
    ///
    /// Starts two companion tasks: one waiting for the exit status, one
    /// relaying the stderr pipe into `sink`.
    pub(crate) fn spawn(
        cfg: &Config,
        files: &[OwnedFd],
        sink: &Arc<dyn LogSink>,
    ) -> Result<ChildProc, RuntimeError> {
        let argv = match &cfg.respawn_command {
            Some(argv) => argv.clone(),
            None => env::args_os().collect(),
        };
        let (program, args) = argv.split_first().ok_or_else(|| {
            RuntimeError::Spawn(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty respawn command",
            ))
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .env(LISTEN_FDS_ENV, files.len().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let raw: Vec<RawFd> = files.iter().map(|f| f.as_raw_fd()).collect();
        let mut scratch: Vec<RawFd> = Vec::with_capacity(raw.len());
        // Safety: the hook only performs async-signal-safe descriptor calls
        // and allocates nothing (scratch capacity is reserved up front).
        unsafe {
            cmd.pre_exec(move || move_fds_into_slots(&raw, &mut scratch));
        }

        let mut child = cmd.spawn().map_err(RuntimeError::Spawn)?;
        let pid = child
            .id()
            .ok_or_else(|| RuntimeError::Spawn(io::Error::other("child pid unavailable")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RuntimeError::Spawn(io::Error::other("child stderr not piped")))?;

        let relay = relay::spawn(stderr, Arc::clone(sink));
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(child.wait().await);
        });

        Ok(ChildProc {
            pid,
            exited: rx,
            relay,
        })
    }

    /// Asks the child to terminate. A request, never a forceful kill.
    pub(crate) fn terminate(&self) {
        let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            // Usually means the child beat us to the exit.
            debug!(
                pid = self.pid,
                "termination request failed: {}",
                io::Error::last_os_error()
            );
        }
    }

    /// Waits for the generation to end and its relay to finish flushing.
    pub(crate) async fn reap(self) -> Result<std::process::ExitStatus, RuntimeError> {
        let status = match self.exited.await {
            Ok(res) => res.map_err(RuntimeError::Wait)?,
            Err(_) => {
                return Err(RuntimeError::Wait(io::Error::other(
                    "child wait task vanished",
                )))
            }
        };
        let _ = self.relay.await;
        Ok(status)
    }

    /// Hands the generation to a detached reaper, discarding its outcome.
    ///
    /// Used for a replaced generation after reload: the old child is already
    /// terminating while its successor spawns, and nobody waits on it inline.
    pub(crate) fn reap_detached(self) {
        let pid = self.pid;
        tokio::spawn(async move {
            match self.reap().await {
                Ok(status) => debug!(pid, %status, "replaced child exited"),
                Err(err) => debug!(pid, "replaced child lost: {err}"),
            }
        });
    }
}

/// Moves the exported descriptors into slots `3..3+n` for the child.
///
/// Runs between fork and exec: only async-signal-safe calls, no allocation.
/// Descriptors are first staged above the slot range (`F_DUPFD`) and then
/// `dup2`'d down, so a source sitting inside the target range is never
/// clobbered before it has been copied. `dup2` leaves the slots without
/// `FD_CLOEXEC`; the staged copies are closed before exec.
fn move_fds_into_slots(fds: &[RawFd], scratch: &mut Vec<RawFd>) -> io::Result<()> {
    let base = LISTEN_FDS_START + fds.len() as RawFd;

    scratch.clear();
    for &fd in fds {
        let staged = unsafe { libc::fcntl(fd, libc::F_DUPFD, base) };
        if staged < 0 {
            return Err(io::Error::last_os_error());
        }
        scratch.push(staged);
    }
    for (i, &staged) in scratch.iter().enumerate() {
        let slot = LISTEN_FDS_START + i as RawFd;
        if unsafe { libc::dup2(staged, slot) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    for &staged in scratch.iter() {
        unsafe { libc::close(staged) };
    }
    Ok(())
}
