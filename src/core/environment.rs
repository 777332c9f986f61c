//! # Execution environment.
//!
//! [`Environment`] is the piece of runtime the supervisor hands its loop to:
//! it tracks background tasks, records the first failure among them, and
//! carries the advisory cancellation signal that starts draining.
//!
//! A typical master `main` spawns nothing itself — `Graceful::run` puts the
//! supervisor loop into the environment — and then parks in
//! [`Environment::wait`], which also watches for OS termination signals and
//! turns them into cancellation.
//!
//! ## Cancellation semantics
//! - [`Environment::cancel`] is advisory: the supervisor asks its child to
//!   stop, it does not kill it.
//! - The wait after cancellation is bounded only by the supervisor's own
//!   `exit_timeout`; the environment adds no bound of its own.

use std::future::Future;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::core::shutdown;
use crate::error::RuntimeError;

static GLOBAL: Lazy<Environment> = Lazy::new(Environment::new);

/// Tracks background tasks and the process's cancellation state.
///
/// Cloning is cheap and every clone observes the same tasks, failure slot,
/// and cancellation token.
#[derive(Clone)]
pub struct Environment {
    token: CancellationToken,
    tracker: TaskTracker,
    failure: Arc<Mutex<Option<RuntimeError>>>,
}

impl Environment {
    /// Creates a fresh environment with nothing tracked.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// The process-wide default environment, used by
    /// [`Graceful`](crate::Graceful) when no override is supplied.
    pub fn global() -> &'static Environment {
        &GLOBAL
    }

    /// Spawns and tracks a fallible task.
    ///
    /// The first failure is recorded for [`Environment::wait`] and cancels
    /// the environment, so sibling tasks begin draining.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = Result<(), RuntimeError>> + Send + 'static,
    {
        let env = self.clone();
        self.tracker.spawn(async move {
            if let Err(err) = fut.await {
                error!(label = err.as_label(), "background task failed: {err}");
                env.record_failure(err);
                env.token.cancel();
            }
        });
    }

    /// Requests cancellation of everything tracked.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A child token that is cancelled when the environment is.
    pub fn cancellation(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Waits for all tracked tasks, converting an OS termination signal into
    /// cancellation along the way.
    ///
    /// Returns the first recorded task failure, if any. A signal-initiated
    /// shutdown that drains cleanly is a success.
    pub async fn wait(&self) -> Result<(), RuntimeError> {
        self.tracker.close();

        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                match res {
                    Ok(()) => info!("termination signal received; cancelling"),
                    Err(err) => error!("signal handler failed: {err}"),
                }
                self.token.cancel();
            }
            _ = self.tracker.wait() => {}
        }
        self.tracker.wait().await;

        let mut slot = match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record_failure(&self, err: RuntimeError) {
        let mut slot = match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.get_or_insert(err);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_reports_first_failure() {
        let env = Environment::new();
        env.spawn(async { Err(RuntimeError::NoListeners) });
        let err = env.wait().await.unwrap_err();
        assert!(matches!(err, RuntimeError::NoListeners));
    }

    #[tokio::test]
    async fn test_failure_cancels_siblings() {
        let env = Environment::new();
        let token = env.cancellation();
        env.spawn(async move {
            token.cancelled().await;
            Ok(())
        });
        env.spawn(async { Err(RuntimeError::task("boom")) });
        let err = env.wait().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Task(_)));
    }

    #[tokio::test]
    async fn test_empty_wait_is_ok() {
        let env = Environment::new();
        env.wait().await.unwrap();
    }
}
