//! # Demo: restart
//!
//! A graceful-restart server driving itself through five reloads.
//!
//! The master binds one TCP and one Unix-domain listener and spawns a child
//! that answers `hello <n>` on each accepted connection. A child slows down
//! after its first connection, so a fast `hello 1` proves the answering
//! child is fresh. A self-test client running in the master pings, asks the
//! master to restart, and repeats five times before checking the Unix socket
//! and shutting everything down.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Graceful::run ── role marker? ──┐
//!   │     (master)                      │ (child)
//!   │       bind TCP + Unix listeners   restore listeners
//!   │       spawn child, relay stderr   serve `hello <n>`
//!   │
//!   └─► test client (master only)
//!         loop ×5: ping TCP (expect a fast "hello 1") → SIGHUP the master
//!         then:    ping the Unix socket → cancel the environment
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example restart
//! ```

use std::fs;
use std::io;
use std::net::TcpListener;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gracevisor::{Environment, Graceful, Listener, RuntimeError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

const TCP_ADDR: &str = "127.0.0.1:18556";

fn unix_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("gracevisor-restart-{}.sock", std::process::id()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Log to stderr in both roles: the master relays each child's stderr
    //    through its own tracing pipeline, so all lines end up on one stream
    //    (a child's stdout is null).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if gracevisor::is_systemd_service() {
        info!("run as a systemd service");
    } else {
        info!("not a systemd service");
    }

    let unix_path = unix_socket_path();
    let env = Environment::new();

    // 2. Listen runs in the master only; it also starts the self-test client
    //    there.
    let listen = {
        let env = env.clone();
        let unix_path = unix_path.clone();
        move || -> io::Result<Vec<Listener>> {
            let tcp = TcpListener::bind(TCP_ADDR)?;
            let _ = fs::remove_file(&unix_path);
            let unix = UnixListener::bind(&unix_path)?;
            env.spawn(test_client(env.clone(), unix_path));
            Ok(vec![Listener::Tcp(tcp), Listener::Unix(unix)])
        }
    };

    // 3. Dispatch on role: the master returns immediately with the
    //    supervisor loop running in `env`; a child serves and never returns.
    Graceful::new(listen, serve)
        .with_environment(env.clone())
        .run()
        .await?;

    // 4. Master parks here until the client cancels the environment. The
    //    socket path is only safe to remove once the supervisor is done.
    let outcome = env.wait().await;
    let _ = fs::remove_file(&unix_path);
    outcome?;
    info!("master done");
    Ok(())
}

/// Child-side accept loop over the restored listeners.
async fn serve(listeners: Vec<Listener>) {
    let counter = Arc::new(AtomicU64::new(0));
    for listener in listeners {
        if let Err(err) = accept_on(listener, Arc::clone(&counter)) {
            error!("cannot serve: {err}");
            std::process::exit(1);
        }
    }

    // Keep serving until the master asks this child to stop.
    let _ = gracevisor::wait_for_shutdown_signal().await;
    info!("child stopping");
}

fn accept_on(listener: Listener, counter: Arc<AtomicU64>) -> io::Result<()> {
    match listener {
        Listener::Tcp(ln) => {
            ln.set_nonblocking(true)?;
            let ln = tokio::net::TcpListener::from_std(ln)?;
            tokio::spawn(async move {
                while let Ok((conn, _)) = ln.accept().await {
                    tokio::spawn(answer(conn, Arc::clone(&counter)));
                }
            });
        }
        Listener::Unix(ln) => {
            ln.set_nonblocking(true)?;
            let ln = tokio::net::UnixListener::from_std(ln)?;
            tokio::spawn(async move {
                while let Ok((conn, _)) = ln.accept().await {
                    tokio::spawn(answer(conn, Arc::clone(&counter)));
                }
            });
        }
    }
    Ok(())
}

/// Answers `hello <n>`, slowing down after the first connection so a stale
/// child is observably slow.
async fn answer<S>(mut conn: S, counter: Arc<AtomicU64>)
where
    S: AsyncWrite + Unpin,
{
    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
    if n > 1 {
        tokio::time::sleep(Duration::from_secs(n)).await;
    }
    let _ = conn.write_all(format!("hello {n}").as_bytes()).await;
    let _ = conn.shutdown().await;
}

/// Master-side self test: five reload cycles over TCP, then the Unix socket.
async fn test_client(env: Environment, unix_path: PathBuf) -> Result<(), RuntimeError> {
    for round in 1..=5u32 {
        ping_tcp().await.map_err(RuntimeError::task)?;
        info!(round, "requesting restart");
        reload_self();
        // Let the replacement child take over the listeners.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    ping_unix(&unix_path).await.map_err(RuntimeError::task)?;

    env.cancel();
    Ok(())
}

/// Sends the reload signal. The client runs inside the master process, so
/// the master's own pid is the target.
fn reload_self() {
    unsafe {
        libc::kill(std::process::id() as libc::pid_t, libc::SIGHUP);
    }
}

async fn ping_tcp() -> anyhow::Result<()> {
    let conn = tokio::net::TcpStream::connect(TCP_ADDR).await?;
    expect_fresh_hello(conn).await
}

async fn ping_unix(path: &Path) -> anyhow::Result<()> {
    let conn = tokio::net::UnixStream::connect(path).await?;
    expect_fresh_hello(conn).await
}

/// Reads the full response and checks it came from a child that has not
/// answered anyone before.
async fn expect_fresh_hello<S>(mut conn: S) -> anyhow::Result<()>
where
    S: AsyncRead + Unpin,
{
    let start = Instant::now();
    let mut data = String::new();
    conn.read_to_string(&mut data).await?;
    anyhow::ensure!(data == "hello 1", "wrong response: {data:?}");
    anyhow::ensure!(
        start.elapsed() < Duration::from_secs(1),
        "response took too long; served by a stale child?"
    );
    info!(%data, "got data");
    Ok(())
}
