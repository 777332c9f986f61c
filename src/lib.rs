//! # gracevisor
//!
//! **Gracevisor** is a zero-downtime restart supervisor for long-running
//! network servers. A master process creates its listening sockets once,
//! hands them — as inherited descriptors — to a freshly spawned child, and
//! replaces that child on an operator reload signal (`SIGHUP`) without ever
//! closing the sockets. No external load balancer or proxy is needed to
//! hide the restart.
//!
//! ## Architecture
//! ```text
//!                    caller main()
//!                         │
//!                    Graceful::run ──── role marker? ────┐
//!                         │ (absent: master)             │ (present: child)
//!                         ▼                              ▼
//! ┌───────────────────────────────────────┐   restore_listeners(count)
//! │ Environment (task tracking + cancel)  │        │
//! │   └─► Supervisor loop                 │        ▼
//! │        ├─ listen() once               │   serve(listeners).await
//! │        ├─ export descriptors once     │        │
//! │        └─ loop:                       │   process::exit(0)
//! │            spawn child ──────────────────► re-exec'd self, marker set,
//! │            │    ├─ wait-for-exit task     descriptors at slots 3..
//! │            │    └─ stderr relay task
//! │            └─ select:
//! │                ├─ child exit  → surface outcome, stop
//! │                ├─ SIGHUP      → SIGTERM child, pause, respawn
//! │                └─ cancelled   → SIGTERM child, drain (bounded), stop
//! └───────────────────────────────────────┘
//! ```
//!
//! The same descriptor set is reused by every child generation; restarts are
//! strictly sequential, so at most one child exists at a time. During the
//! brief restart pause the bound listeners keep queueing connections.
//!
//! ## Example
//! ```no_run
//! use gracevisor::{Environment, Graceful, Listener};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gracevisor::RuntimeError> {
//!     let env = Environment::new();
//!
//!     let listen = || -> std::io::Result<Vec<Listener>> {
//!         let ln = std::net::TcpListener::bind("127.0.0.1:8080")?;
//!         Ok(vec![Listener::Tcp(ln)])
//!     };
//!     let serve = |listeners: Vec<Listener>| async move {
//!         for listener in listeners {
//!             // convert to tokio and accept until told to stop
//!             let _ = listener;
//!         }
//!         let _ = gracevisor::wait_for_shutdown_signal().await;
//!     };
//!
//!     Graceful::new(listen, serve)
//!         .with_environment(env.clone())
//!         .run()
//!         .await?;
//!
//!     // Master parks here; a child never reaches this line.
//!     env.wait().await
//! }
//! ```
//!
//! ## Socket activation
//! Processes launched by systemd can import their pre-bound sockets with
//! [`systemd_listeners`] inside the listen callback; the descriptors travel
//! the same slot-3 convention either way.
//!
//! ## Platform
//! Descriptor-slot inheritance and POSIX signals are the transport; this
//! crate targets Unix.

#[cfg(not(unix))]
compile_error!("gracevisor relies on descriptor inheritance and POSIX signals; unix only");

mod config;
mod core;
mod error;
mod graceful;
mod net;
mod role;

pub use config::Config;
pub use self::core::{wait_for_shutdown_signal, Environment, LogSink, TracingSink};
pub use error::{BoxError, ImportError, RuntimeError};
pub use graceful::{Graceful, ServeFuture};
pub use net::{is_systemd_service, listener_files, restore_listeners, systemd_listeners, Listener};
pub use role::Role;
