//! # Supervisor configuration.
//!
//! Provides [`Config`], the master-held settings for the restart supervisor.
//! All fields are immutable for the process lifetime once the supervisor is
//! running.
//!
//! ## Sentinel values
//! - `exit_timeout = 0s` → wait for the child without bound during draining
//!   (explicit opt-in to an unbounded wait)

use std::ffi::OsString;
use std::time::Duration;

/// Configuration for the master supervisor.
///
/// ## Field semantics
/// - `exit_timeout`: bound on the shutdown drain (`0s` = unbounded)
/// - `restart_wait`: pause between signalling the old child and spawning its
///   replacement
/// - `respawn_command`: argv used to spawn children (`None` = re-exec the
///   current process)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for the child to exit once shutdown has been
    /// requested.
    ///
    /// When the supervisor is cancelled:
    /// - The child is asked to terminate (SIGTERM, never SIGKILL)
    /// - The supervisor waits up to `exit_timeout` for exit and log flush
    /// - On timeout it logs a warning and terminates anyway, leaving the
    ///   child to exit asynchronously
    ///
    /// `Duration::ZERO` waits without bound.
    pub exit_timeout: Duration,

    /// Pause between telling the old child to stop and starting its
    /// replacement on reload.
    ///
    /// Restarts are strictly sequential; this interval is the only window in
    /// which no child is accepting. Bound listeners keep queueing
    /// connections throughout.
    pub restart_wait: Duration,

    /// Argument vector used to spawn child processes.
    ///
    /// - `None` = the current process's own executable and arguments
    /// - `Some(argv)` = an explicit command, e.g. to pick up a replaced
    ///   binary at a known path
    pub respawn_command: Option<Vec<OsString>>,
}

impl Config {
    /// Returns the drain bound as an `Option`.
    ///
    /// - `None` → wait without bound
    /// - `Some(d)` → give up after `d`, leaving the child running
    #[inline]
    pub fn drain_timeout(&self) -> Option<Duration> {
        if self.exit_timeout == Duration::ZERO {
            None
        } else {
            Some(self.exit_timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `exit_timeout = 0s` (wait without bound)
    /// - `restart_wait = 10ms`
    /// - `respawn_command = None` (re-exec the current process)
    fn default() -> Self {
        Self {
            exit_timeout: Duration::ZERO,
            restart_wait: Duration::from_millis(10),
            respawn_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_exit_timeout_means_unbounded() {
        let cfg = Config::default();
        assert_eq!(cfg.drain_timeout(), None);

        let cfg = Config {
            exit_timeout: Duration::from_millis(50),
            ..Config::default()
        };
        assert_eq!(cfg.drain_timeout(), Some(Duration::from_millis(50)));
    }
}
