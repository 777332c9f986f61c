//! # Master supervisor: the restart state machine.
//!
//! The supervisor owns listener creation, spawns and respawns the child, and
//! applies shutdown bounds. It is one long-lived task; each spawned
//! generation adds a wait-for-exit task and a log-relay task, synchronized
//! through completion channels — never shared mutable state.
//!
//! ## States
//! ```text
//! Initializing ──► SpawningChild ──► Supervising ─┬─ reload ──► SpawningChild
//!                                                 ├─ child exit ──► Terminated
//!                                                 └─ cancelled ──► Draining ──► Terminated
//! ```
//!
//! - **Initializing**: invoke the listen callback exactly once, export the
//!   descriptors once. An empty listener set is fatal.
//! - **SpawningChild**: start a generation inheriting the same descriptor
//!   set, plus its relay.
//! - **Supervising**: wait on child exit, a reload event, or cancellation.
//!   Reload terminates the child, pauses for the restart wait, then loops —
//!   restarts are strictly sequential; at most one child exists at a time.
//! - **Draining**: bounded (or unbounded, when no timeout is configured)
//!   wait for the final child and its relay.
//! - **Terminated**: exported handles are released first, original
//!   listeners last. A Unix listener's path-bound socket must outlive every
//!   handle still referencing it, so the path-owning listener goes last.
//!
//! ## Reload queueing
//! Reload events arrive on a bounded channel of capacity 2 and are drained
//! one at a time inside the loop body: a second signal arriving mid-restart
//! is processed on the next iteration, never dropped.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::child::ChildProc;
use crate::core::relay::LogSink;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::net::{listener_files, Listener};

/// Callback producing the listener set, invoked exactly once per master
/// lifetime.
pub(crate) type ListenFn = Box<dyn FnOnce() -> io::Result<Vec<Listener>> + Send>;

/// Drives the master side: listener ownership, child generations, reload
/// and shutdown handling.
pub(crate) struct Supervisor {
    cfg: Config,
    sink: Arc<dyn LogSink>,
}

impl Supervisor {
    pub(crate) fn new(cfg: Config, sink: Arc<dyn LogSink>) -> Self {
        Self { cfg, sink }
    }

    /// Runs the supervisor until the child exits, or cancellation drains it.
    pub(crate) async fn run(
        self,
        listen: ListenFn,
        token: CancellationToken,
    ) -> Result<(), RuntimeError> {
        // Initializing
        let listeners = listen().map_err(RuntimeError::Listen)?;
        if listeners.is_empty() {
            return Err(RuntimeError::NoListeners);
        }
        let files = listener_files(&listeners).map_err(RuntimeError::Export)?;
        let reload = shutdown::reload_events().map_err(RuntimeError::Signal)?;
        info!(listeners = listeners.len(), "supervisor started");

        let outcome = self.supervise(&files, reload, &token).await;

        // Terminated: handles first, listeners last. A not-yet-reaped child
        // may still accept on an inherited handle, and the path-owning
        // Unix-domain listener must be the last reference to go.
        drop(files);
        drop(listeners);
        outcome
    }

    async fn supervise(
        &self,
        files: &[std::os::fd::OwnedFd],
        mut reload: mpsc::Receiver<()>,
        token: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        loop {
            // SpawningChild
            let mut child = ChildProc::spawn(&self.cfg, files, &self.sink)?;
            info!(pid = child.pid, "child spawned");

            // Supervising
            tokio::select! {
                exit = &mut child.exited => {
                    let _ = child.relay.await;
                    return match exit {
                        Ok(Ok(status)) if status.success() => Ok(()),
                        Ok(Ok(status)) => Err(RuntimeError::ChildExited { status }),
                        Ok(Err(err)) => Err(RuntimeError::Wait(err)),
                        Err(_) => Err(RuntimeError::Wait(io::Error::other(
                            "child wait task vanished",
                        ))),
                    };
                }
                Some(()) = reload.recv() => {
                    warn!(pid = child.pid, "reload requested; replacing child");
                    child.terminate();
                    time::sleep(self.cfg.restart_wait).await;
                    child.reap_detached();
                }
                _ = token.cancelled() => {
                    child.terminate();
                    return self.drain(child).await;
                }
            }
        }
    }

    /// Draining: wait for the final generation within the configured bound.
    async fn drain(&self, child: ChildProc) -> Result<(), RuntimeError> {
        let pid = child.pid;
        match self.cfg.drain_timeout() {
            None => {
                let _ = child.reap().await;
                info!(pid, "child exited; supervisor stopping");
                Ok(())
            }
            Some(limit) => match time::timeout(limit, child.reap()).await {
                Ok(_) => {
                    info!(pid, "child exited; supervisor stopping");
                    Ok(())
                }
                Err(_) => {
                    // Accepted leak under time pressure: the child keeps
                    // running and is reaped whenever it finally exits.
                    warn!(pid, timeout = ?limit, "timeout waiting for child exit");
                    Ok(())
                }
            },
        }
    }
}
