//! Error types used by the gracevisor runtime.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] — errors raised by the master supervisor and the
//!   execution environment.
//! - [`ImportError`] — errors raised while reconstructing listeners from
//!   inherited descriptors or activation variables.
//!
//! Both types provide an `as_label` helper for logging/metrics.
//!
//! Two conditions are deliberately *not* errors: a shutdown timeout is
//! downgraded to a warning (the supervisor still terminates cleanly, leaving
//! the child to exit on its own), and a log-sink write failure merely ends
//! the relay task.

use std::io;
use std::num::ParseIntError;
use std::os::fd::RawFd;
use std::process::ExitStatus;

use thiserror::Error;

/// Boxed error payload for caller tasks tracked by the
/// [`Environment`](crate::Environment).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the supervisor runtime.
///
/// These abort the whole supervisor; none of them is retried. A child crash
/// is surfaced here rather than masked by a respawn — only an operator
/// reload triggers respawning.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The listen callback returned an empty set. A supervisor with nothing
    /// to serve is a configuration error, not a retryable condition.
    #[error("listen produced no listeners")]
    NoListeners,

    /// The listen callback itself failed.
    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),

    /// A listener could not be exported as an inheritable descriptor.
    #[error("exporting listeners failed: {0}")]
    Export(#[source] io::Error),

    /// The child process could not be started.
    #[error("spawning child failed: {0}")]
    Spawn(#[source] io::Error),

    /// A signal handler could not be installed.
    #[error("installing signal handler failed: {0}")]
    Signal(#[source] io::Error),

    /// Waiting on the child process failed.
    #[error("waiting for child failed: {0}")]
    Wait(#[source] io::Error),

    /// The child exited on its own with a non-success status.
    #[error("child exited with {status}")]
    ChildExited {
        /// The child's exit status.
        status: ExitStatus,
    },

    /// Restoring inherited listeners failed on the child path.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// A caller task tracked by the execution environment failed.
    #[error("task failed: {0}")]
    Task(#[source] BoxError),
}

impl RuntimeError {
    /// Wraps an arbitrary caller-task error.
    pub fn task<E: Into<BoxError>>(err: E) -> Self {
        RuntimeError::Task(err.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoListeners => "no_listeners",
            RuntimeError::Listen(_) => "listen_failed",
            RuntimeError::Export(_) => "export_failed",
            RuntimeError::Spawn(_) => "spawn_failed",
            RuntimeError::Signal(_) => "signal_failed",
            RuntimeError::Wait(_) => "wait_failed",
            RuntimeError::ChildExited { .. } => "child_exited",
            RuntimeError::Import(_) => "import_failed",
            RuntimeError::Task(_) => "task_failed",
        }
    }
}

/// # Errors produced while importing listeners.
///
/// Raised by the socket-activation importer and the role detector. A count
/// variable that is present but malformed is an error — the importer never
/// guesses a default.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ImportError {
    /// A listener-count variable did not parse as a non-negative integer.
    #[error("{var} is not a valid listener count: {value:?}")]
    BadCount {
        /// Name of the offending environment variable.
        var: &'static str,
        /// The value it held.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseIntError,
    },

    /// A descriptor slot could not be turned back into a listener.
    #[error("cannot restore a listener from fd {fd}: {source}")]
    Restore {
        /// The descriptor slot.
        fd: RawFd,
        /// The underlying failure (includes unsupported socket families).
        #[source]
        source: io::Error,
    },
}

impl ImportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ImportError::BadCount { .. } => "import_bad_count",
            ImportError::Restore { .. } => "import_restore_failed",
        }
    }
}
