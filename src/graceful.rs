//! # The run entry point.
//!
//! [`Graceful`] is the single surface callers touch: supply a `listen`
//! callback (how to create the listening sockets) and a `serve` callback
//! (the long-running accept loop), then call [`Graceful::run`]. Both
//! callbacks are opaque business logic to the supervisor.
//!
//! In the master process, `run` hands the supervisor loop to the execution
//! environment and returns immediately — the caller typically parks in
//! [`Environment::wait`](crate::Environment::wait) afterwards. In a child
//! process, `run` restores the inherited listeners, invokes `serve`, and
//! exits the process when it returns. It never hands control back to the
//! caller on the child path.
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
//!         // accept on `listeners` until told to stop
//!         let _ = listeners;
//!     };
//!
//!     Graceful::new(listen, serve)
//!         .with_environment(env.clone())
//!         .run()
//!         .await?;
//!
//!     // Only the master gets here.
//!     env.wait().await
//! }
//! ```

use std::future::Future;
use std::io;
use std::process;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info, Instrument};

use crate::config::Config;
use crate::core::{Environment, LogSink, Supervisor, TracingSink};
use crate::error::RuntimeError;
use crate::net::{restore_listeners, Listener};
use crate::role::Role;

/// Future returned by the boxed serve callback.
pub type ServeFuture = BoxFuture<'static, ()>;

type ListenFn = Box<dyn FnOnce() -> io::Result<Vec<Listener>> + Send + 'static>;
type ServeFn = Box<dyn FnOnce(Vec<Listener>) -> ServeFuture + Send + 'static>;

/// A graceful-restart server: listener creation in the master, serving in
/// respawnable children.
pub struct Graceful {
    listen: ListenFn,
    serve: ServeFn,
    config: Config,
    env: Option<Environment>,
    sink: Arc<dyn LogSink>,
}

impl Graceful {
    /// Creates a server from the two caller callbacks.
    ///
    /// `listen` runs exactly once, in the master. `serve` runs exactly once
    /// per child process and is expected to accept connections until the
    /// process is told to stop.
    pub fn new<L, S, Fut>(listen: L, serve: S) -> Self
    where
        L: FnOnce() -> io::Result<Vec<Listener>> + Send + 'static,
        S: FnOnce(Vec<Listener>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            listen: Box::new(listen),
            serve: Box::new(move |listeners| Box::pin(serve(listeners))),
            config: Config::default(),
            env: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Uses the given environment instead of the process-wide default.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Routes relayed child output into the given sink instead of
    /// [`TracingSink`].
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the graceful-restart server.
    ///
    /// Returns immediately in the master process once the supervisor loop is
    /// handed off; never returns in a child process. The only error returned
    /// directly is a malformed role marker — everything the supervisor
    /// itself hits surfaces through the environment's
    /// [`wait`](Environment::wait).
    pub async fn run(self) -> Result<(), RuntimeError> {
        match Role::from_env()? {
            Role::Master => {
                let env = self
                    .env
                    .unwrap_or_else(|| Environment::global().clone());
                let token = env.cancellation();
                let supervisor = Supervisor::new(self.config, self.sink);
                env.spawn(supervisor.run(self.listen, token));
                Ok(())
            }
            Role::Child(count) => {
                let listeners = match restore_listeners(count) {
                    Ok(listeners) => listeners,
                    Err(err) => {
                        error!(label = err.as_label(), "restoring listeners failed: {err}");
                        process::exit(1);
                    }
                };

                let span = tracing::info_span!("child", pid = process::id());
                async {
                    info!("new child");
                    (self.serve)(listeners).await;
                }
                .instrument(span)
                .await;

                // A child never returns control to its caller.
                process::exit(0);
            }
        }
    }
}
