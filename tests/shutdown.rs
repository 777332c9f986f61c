//! Draining behavior on cancellation: unbounded by default, bounded by
//! `exit_timeout`.

mod common;

use std::time::{Duration, Instant};

use common::{loopback_listener, sh_child, LineSink};
use gracevisor::{Config, Environment, Graceful, Listener};

/// With no timeout configured, the supervisor returns only after the child
/// has fully exited and its relay has flushed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unbounded_drain_waits_for_child_exit() {
    let env = Environment::new();
    let sink = LineSink::new();

    // The child shrugs off the termination request and exits on its own
    // schedule, 400ms in, with a final line the relay must not lose.
    let cfg = Config {
        respawn_command: Some(sh_child(
            "trap '' TERM; echo up >&2; /bin/sleep 0.4; echo leaving >&2",
        )),
        ..Config::default()
    };

    Graceful::new(loopback_listener, |_: Vec<Listener>| async {})
        .with_config(cfg)
        .with_environment(env.clone())
        .with_log_sink(sink.clone())
        .run()
        .await
        .unwrap();

    sink.wait_for(1, Duration::from_secs(5)).await;

    let cancelled_at = Instant::now();
    env.cancel();
    env.wait().await.unwrap();

    assert!(
        cancelled_at.elapsed() >= Duration::from_millis(250),
        "drain must wait for the child to exit"
    );
    assert_eq!(
        sink.lines(),
        ["up", "leaving"],
        "the relay must flush before the supervisor returns"
    );
}

/// With a timeout configured, a child ignoring termination requests does not
/// hold the supervisor hostage: the loop gives up at the bound, logs a
/// warning, and still reports a clean shutdown.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bounded_drain_gives_up_at_timeout() {
    let env = Environment::new();
    let sink = LineSink::new();

    let cfg = Config {
        exit_timeout: Duration::from_millis(50),
        respawn_command: Some(sh_child("trap '' TERM; echo up >&2; exec /bin/sleep 5")),
        ..Config::default()
    };

    Graceful::new(loopback_listener, |_: Vec<Listener>| async {})
        .with_config(cfg)
        .with_environment(env.clone())
        .with_log_sink(sink.clone())
        .run()
        .await
        .unwrap();

    sink.wait_for(1, Duration::from_secs(5)).await;

    let cancelled_at = Instant::now();
    env.cancel();
    let outcome = env.wait().await;

    assert!(outcome.is_ok(), "a drain timeout is a warning, not an error");
    assert!(
        cancelled_at.elapsed() < Duration::from_secs(2),
        "drain must give up at the timeout, not wait out the child"
    );
}
