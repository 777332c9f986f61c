//! Runtime core: supervision and lifecycle.
//!
//! Internal modules:
//! - [`supervisor`]: the master state machine — spawn, watch, respawn, drain;
//! - [`child`]: one spawned generation and its descriptor inheritance;
//! - [`relay`]: line-buffered forwarding of child stderr into the logger;
//! - [`shutdown`]: OS signal handling for shutdown and reload;
//! - [`environment`]: background-task tracking and advisory cancellation.

mod child;
mod environment;
mod relay;
mod shutdown;
mod supervisor;

pub use environment::Environment;
pub use relay::{LogSink, TracingSink};
pub use shutdown::wait_for_shutdown_signal;

pub(crate) use supervisor::Supervisor;
