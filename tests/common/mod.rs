#![allow(dead_code)]

//! Shared helpers for the process-level integration tests.
//!
//! The tests drive real supervisor loops over scripted `/bin/sh` children
//! (via `Config::respawn_command`) and observe generations through an
//! injected [`LogSink`]: each scripted child announces itself on stderr, so
//! counting relayed lines counts spawns.

use std::ffi::OsString;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gracevisor::{Listener, LogSink};

/// Captures relayed child lines for assertions.
pub struct LineSink {
    lines: Mutex<Vec<String>>,
}

impl LineSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(Vec::new()),
        })
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    /// Polls until the sink has seen at least `n` lines.
    pub async fn wait_for(&self, n: usize, limit: Duration) {
        let start = Instant::now();
        while self.count() < n {
            assert!(
                start.elapsed() < limit,
                "expected {n} child lines within {limit:?}, saw {:?}",
                self.lines()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl LogSink for LineSink {
    async fn write_line(&self, line: &[u8]) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(line).into_owned());
        Ok(())
    }
}

/// Builds a `respawn_command` running `script` under `/bin/sh`.
///
/// A spawned child's environment is wiped down to the role marker, so
/// scripts must call external programs by absolute path.
pub fn sh_child(script: &str) -> Vec<OsString> {
    vec!["/bin/sh".into(), "-c".into(), script.into()]
}

/// Binds a throwaway localhost listener for the master to export.
pub fn loopback_listener() -> io::Result<Vec<Listener>> {
    let ln = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(vec![Listener::Tcp(ln)])
}
