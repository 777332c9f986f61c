//! # OS signal handling.
//!
//! Two adapters translate raw signals into the abstract events the rest of
//! the crate consumes:
//!
//! - [`wait_for_shutdown_signal`] completes when the process receives a
//!   termination signal (`SIGINT`, `SIGTERM`, `SIGQUIT`, Ctrl-C);
//! - [`reload_events`] turns `SIGHUP` into events on a bounded channel.
//!
//! The supervisor itself never sees signal numbers. Children are not told to
//! stop by signal fan-out either: the master sends an explicit termination
//! request to the current child only.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Reload events queued ahead of processing. Two slots so a rapid double
/// signal arriving mid-restart is never lost.
const RELOAD_QUEUE: usize = 2;

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Registers for `SIGHUP` and returns the receiving end of a bounded reload
/// queue.
///
/// Signals arriving while the queue is full are dropped beyond the queued
/// two — by then a restart is already pending twice over, and a further one
/// would be indistinguishable. The adapter task ends when the receiver is
/// dropped.
pub(crate) fn reload_events() -> std::io::Result<mpsc::Receiver<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = signal(SignalKind::hangup())?;
    let (tx, rx) = mpsc::channel(RELOAD_QUEUE);
    tokio::spawn(async move {
        while sighup.recv().await.is_some() {
            match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Closed(())) => break,
            }
        }
    });
    Ok(rx)
}
