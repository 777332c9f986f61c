//! # Log relay: child stderr into the parent's logger.
//!
//! A child's diagnostics arrive as a raw byte stream on its stderr pipe. The
//! relay copies that stream into a [`LogSink`], preserving line boundaries:
//! bytes are buffered until a newline, then the whole line is handed to the
//! sink as one write. When the stream ends, a residual partial line is
//! flushed once, without its missing terminator.
//!
//! A sink write failure ends the relay early — logging failures are not
//! supervisor failures and never propagate further than stopping the copy.
//!
//! Completion is observed by awaiting the task handle returned from
//! [`spawn`].

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Destination for relayed child output.
///
/// The default implementation is [`TracingSink`]; tests and embedders can
/// substitute their own. Implementations may be slow — the relay simply
/// applies backpressure to the pipe.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    /// Writes one complete line, without its trailing newline.
    ///
    /// Returning an error stops the relay for the rest of the child's
    /// lifetime; it is not reported anywhere else.
    async fn write_line(&self, line: &[u8]) -> io::Result<()>;
}

/// Forwards child output lines to [`tracing`] at info level.
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn write_line(&self, line: &[u8]) -> io::Result<()> {
        tracing::info!(target: "gracevisor::child", "{}", String::from_utf8_lossy(line));
        Ok(())
    }
}

/// Starts the relay task for one child generation.
///
/// Generic over the source so tests can drive it with in-memory streams;
/// production passes the child's stderr pipe.
pub(crate) fn spawn<R>(source: R, sink: Arc<dyn LogSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut source = BufReader::new(source);
        let mut line = Vec::with_capacity(4096);
        loop {
            line.clear();
            match source.read_until(b'\n', &mut line).await {
                Ok(0) => return,
                Ok(_) => {
                    if line.ends_with(b"\n") {
                        line.pop();
                    }
                    if sink.write_line(&line).await.is_err() {
                        return;
                    }
                }
                Err(_) => {
                    // Flush whatever was buffered before the stream broke.
                    if !line.is_empty() {
                        let _ = sink.write_line(&line).await;
                    }
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    struct VecSink {
        lines: Mutex<Vec<String>>,
        fail_after: Option<usize>,
    }

    impl VecSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                lines: Mutex::new(Vec::new()),
                fail_after: None,
            })
        }

        fn failing_after(n: usize) -> Arc<Self> {
            Arc::new(Self {
                lines: Mutex::new(Vec::new()),
                fail_after: Some(n),
            })
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSink for VecSink {
        async fn write_line(&self, line: &[u8]) -> io::Result<()> {
            let mut lines = self.lines.lock().unwrap();
            if let Some(n) = self.fail_after {
                if lines.len() >= n {
                    return Err(io::Error::other("sink closed"));
                }
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_two_lines_two_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let sink = VecSink::new();
        let relay = spawn(rx, sink.clone());

        tx.write_all(b"abc\ndef\n").await.unwrap();
        drop(tx);
        relay.await.unwrap();

        assert_eq!(sink.lines(), ["abc", "def"]);
    }

    #[tokio::test]
    async fn test_partial_line_flushed_on_eof() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let sink = VecSink::new();
        let relay = spawn(rx, sink.clone());

        tx.write_all(b"abc").await.unwrap();
        drop(tx);
        relay.await.unwrap();

        assert_eq!(sink.lines(), ["abc"]);
    }

    #[tokio::test]
    async fn test_line_reassembled_across_chunks() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let sink = VecSink::new();
        let relay = spawn(rx, sink.clone());

        tx.write_all(b"ab").await.unwrap();
        tx.flush().await.unwrap();
        tx.write_all(b"c\ntail").await.unwrap();
        drop(tx);
        relay.await.unwrap();

        assert_eq!(sink.lines(), ["abc", "tail"]);
    }

    #[tokio::test]
    async fn test_sink_failure_ends_relay() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let sink = VecSink::failing_after(1);
        let relay = spawn(rx, sink.clone());

        tx.write_all(b"one\ntwo\nthree\n").await.unwrap();
        drop(tx);
        relay.await.unwrap();

        assert_eq!(sink.lines(), ["one"]);
    }
}
