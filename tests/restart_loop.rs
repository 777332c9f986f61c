//! Reload handling: every reload signal replaces the child exactly once.
//!
//! This is the only test delivering a real `SIGHUP`, and signal dispositions
//! are process-global — it lives alone in this file so no other scenario
//! shares its process.

mod common;

use std::time::Duration;

use common::{loopback_listener, sh_child, LineSink};
use gracevisor::{Config, Environment, Graceful, Listener};

fn raise_sighup() {
    let rc = unsafe { libc::kill(std::process::id() as libc::pid_t, libc::SIGHUP) };
    assert_eq!(rc, 0, "SIGHUP delivery failed");
}

/// Two reloads, the second arriving mid-restart, yield exactly three
/// generations: the queued signal is processed on the next loop iteration,
/// never dropped.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_mid_restart_is_queued_not_dropped() {
    let env = Environment::new();
    let sink = LineSink::new();

    // Children ignore TERM so every generation gets its announcement out and
    // the final drain has to rely on the exit timeout.
    let cfg = Config {
        exit_timeout: Duration::from_millis(200),
        restart_wait: Duration::from_millis(300),
        respawn_command: Some(sh_child("trap '' TERM; echo ready >&2; exec /bin/sleep 30")),
    };

    Graceful::new(loopback_listener, |_: Vec<Listener>| async {})
        .with_config(cfg)
        .with_environment(env.clone())
        .with_log_sink(sink.clone())
        .run()
        .await
        .unwrap();

    // Generation 1 announcing itself also proves the reload handler is
    // installed: registration happens before the first spawn.
    sink.wait_for(1, Duration::from_secs(5)).await;

    raise_sighup();
    // The supervisor is now inside its 300ms restart pause; a second signal
    // here must queue behind the first.
    tokio::time::sleep(Duration::from_millis(100)).await;
    raise_sighup();

    sink.wait_for(3, Duration::from_secs(5)).await;

    env.cancel();
    env.wait().await.unwrap();

    assert_eq!(
        sink.lines(),
        ["ready", "ready", "ready"],
        "each reload must produce exactly one respawn"
    );
}
