//! Listener plumbing: the listener type shared between master and child,
//! export to inheritable descriptors, and import from descriptor slots or
//! systemd socket activation.

mod export;
mod import;
mod listener;

pub use export::listener_files;
pub use import::{is_systemd_service, restore_listeners, systemd_listeners};
pub use listener::Listener;

pub(crate) use import::LISTEN_FDS_START;
