//! Status messages for the remote dashboard.
//!
//! Delivery is best effort. [`StatusSink::publish`] never blocks and never
//! fails; messages that cannot be delivered are dropped and counted.
//!
//! # Architecture
//!
//! ```text
//! DecisionPipeline ──publish──> bounded queue ──> worker thread
//!                                                   │ (current-thread runtime)
//!                                                   └─> TcpStream + LinesCodec ──> dashboard
//! ```

use chrono::{DateTime, Utc};
use futures::SinkExt;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Receives human-readable status text.
pub trait StatusSink: Send + Sync {
    fn publish(&self, message: &str);
}

impl<S: StatusSink + ?Sized> StatusSink for Arc<S> {
    fn publish(&self, message: &str) {
        (**self).publish(message);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&self, _message: &str) {}
}

/// One line on the wire.
#[derive(Debug, Serialize)]
struct StatusRecord<'a> {
    source: &'a str,
    message: &'a str,
    timestamp: DateTime<Utc>,
}

/// Ships status messages as newline-delimited JSON over TCP.
///
/// Connects lazily and reconnects after a failed write. A background thread
/// owns the connection; dropping the sink lets it drain and exit.
///
/// Once closing, the worker makes no further connection attempts after one
/// has failed, so shutdown against a dead endpoint costs at most one connect
/// timeout.
pub struct RemoteLogSink {
    tx: Option<mpsc::Sender<String>>,
    dropped: Arc<AtomicU64>,
    closing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteLogSink {
    /// Start the delivery worker for `address` (`host:port`).
    ///
    /// # Errors
    /// Returns an error if the worker's runtime or thread cannot be created.
    pub fn spawn(
        address: impl Into<String>,
        source: impl Into<String>,
        capacity: usize,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let closing = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            address: address.into(),
            source: source.into(),
            dropped: Arc::clone(&dropped),
            closing: Arc::clone(&closing),
        };
        let handle = std::thread::Builder::new()
            .name("facegate-remote-log".to_string())
            .spawn(move || runtime.block_on(worker.run(rx)))?;

        Ok(Self {
            tx: Some(tx),
            dropped,
            closing,
            worker: Some(handle),
        })
    }

    /// Messages dropped so far (queue full or endpoint unreachable).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting messages and wait for the queue to drain.
    ///
    /// Messages still queued when the endpoint turns out unreachable are
    /// dropped rather than retried.
    pub fn close(mut self) {
        self.closing.store(true, Ordering::Release);
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Remote log worker panicked");
            }
        }
    }
}

impl StatusSink for RemoteLogSink {
    fn publish(&self, message: &str) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(message.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Remote log queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Drop for RemoteLogSink {
    fn drop(&mut self) {
        // Closing the channel ends the worker once it has drained.
        self.closing.store(true, Ordering::Release);
        self.tx.take();
    }
}

impl std::fmt::Debug for RemoteLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLogSink")
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

struct Worker {
    address: String,
    source: String,
    dropped: Arc<AtomicU64>,
    closing: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<String>) {
        let mut connection: Option<FramedWrite<TcpStream, LinesCodec>> = None;
        let mut unreachable = false;

        while let Some(message) = rx.recv().await {
            let record = StatusRecord {
                source: &self.source,
                message: &message,
                timestamp: Utc::now(),
            };
            let line = match serde_json::to_string(&record) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Cannot encode status message: {}", e);
                    self.drop_one();
                    continue;
                }
            };

            if connection.is_none() && !(unreachable && self.is_closing()) {
                connection = self.connect().await;
                unreachable = connection.is_none();
            }
            let Some(framed) = connection.as_mut() else {
                self.drop_one();
                continue;
            };

            match tokio::time::timeout(SEND_TIMEOUT, framed.send(line)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Remote log write to {} failed: {}", self.address, e);
                    connection = None;
                    unreachable = true;
                    self.drop_one();
                }
                Err(_) => {
                    debug!("Remote log write to {} timed out", self.address);
                    connection = None;
                    unreachable = true;
                    self.drop_one();
                }
            }
        }

        debug!("Remote log worker stopped");
    }

    async fn connect(&self) -> Option<FramedWrite<TcpStream, LinesCodec>> {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                debug!("Connected to remote log {}", self.address);
                Some(FramedWrite::new(stream, LinesCodec::new()))
            }
            Ok(Err(e)) => {
                debug!("Remote log {} unreachable: {}", self.address, e);
                None
            }
            Err(_) => {
                debug!("Remote log connect to {} timed out", self.address);
                None
            }
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    fn drop_one(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::time::Instant;

    #[test]
    fn test_null_sink() {
        NullSink.publish("anything");
    }

    #[test]
    fn test_delivers_json_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let sink = RemoteLogSink::spawn(address, "FaceID", 8).unwrap();
        sink.publish("Access denied.");
        sink.publish("Welcome, bob! Access granted.");
        sink.close();

        listener.set_nonblocking(true).unwrap();
        let (stream, _) = listener.accept().unwrap();
        stream.set_nonblocking(false).unwrap();

        let lines: Vec<serde_json::Value> = BufReader::new(stream)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["source"], "FaceID");
        assert_eq!(lines[0]["message"], "Access denied.");
        assert_eq!(lines[1]["message"], "Welcome, bob! Access granted.");
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_unreachable_endpoint_never_blocks() {
        let address = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let sink = RemoteLogSink::spawn(address, "FaceID", 4).unwrap();
        let dropped = Arc::clone(&sink.dropped);
        let started = Instant::now();
        for i in 0..500 {
            sink.publish(&format!("message {i}"));
        }
        assert!(started.elapsed() < Duration::from_millis(500));

        sink.close();
        assert_eq!(dropped.load(Ordering::Relaxed), 500);
    }

    #[test]
    fn test_unreachable_endpoint_counts_drops() {
        let address = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let sink = RemoteLogSink::spawn(address, "FaceID", 4).unwrap();
        sink.publish("one");
        sink.publish("two");
        let dropped = Arc::clone(&sink.dropped);
        sink.close();

        assert_eq!(dropped.load(Ordering::Relaxed), 2);
    }

    /// A listener whose accept queue is full, so new connects stall.
    #[cfg(target_os = "linux")]
    fn stalled_listener() -> Option<(TcpListener, Vec<std::net::TcpStream>, String)> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut held = Vec::new();
        for _ in 0..4096 {
            match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
                Ok(stream) => held.push(stream),
                Err(_) => return Some((listener, held, addr.to_string())),
            }
        }
        None
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_close_against_stalled_endpoint_is_bounded() {
        let Some((_listener, _held, address)) = stalled_listener() else {
            return;
        };

        let sink = RemoteLogSink::spawn(address, "FaceID", 32).unwrap();
        for i in 0..32 {
            sink.publish(&format!("message {i}"));
        }
        let dropped = Arc::clone(&sink.dropped);

        let started = Instant::now();
        sink.close();
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "close took {:?}",
            started.elapsed()
        );
        assert_eq!(dropped.load(Ordering::Relaxed), 32);
    }
}
