//! TCP connection management with line-delimited I/O.
//!
//! Stratum v1 is newline-delimited JSON over TCP. This module wraps a
//! tokio TCP stream with buffered line reading and writing of complete
//! JSON-RPC envelopes. The [`Transport`] trait abstracts message I/O,
//! allowing channel-based mocks for deterministic testing.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::messages::Envelope;

/// Longest accepted line. Anything larger is a framing error and closes
/// the connection.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Message-level I/O for the Stratum protocol.
///
/// Abstracts reading and writing JSON-RPC envelopes so the I/O task can
/// run over TCP (production) or channels (tests).
#[async_trait]
pub trait Transport: Send {
    /// Read one complete envelope.
    ///
    /// Returns `None` on clean connection close (EOF). Lines that parse as
    /// JSON but fit neither envelope form are logged and skipped.
    async fn read_message(&mut self) -> Result<Option<Envelope>>;

    /// Write one envelope followed by a newline.
    async fn write_message(&mut self, msg: &Envelope) -> Result<()>;

    /// Shut down, half-closing the send side first. Best effort.
    async fn close(&mut self);
}

/// Buffered TCP connection for the Stratum protocol.
///
/// Splits the stream so reads and writes buffer independently; partial
/// inbound lines stay in the reader until the newline arrives, partial
/// outbound writes stay in the writer until the socket accepts them.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line_buf: String,
}

impl Connection {
    /// Wrap an established TCP stream.
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line_buf: String::with_capacity(4096),
        }
    }

    /// Open a connection to a pool.
    pub async fn connect(hostname: &str, port: u16) -> Result<Self> {
        debug!(host = %hostname, port, "connecting to pool");

        let stream = TcpStream::connect((hostname, port))
            .await
            .map_err(|err| Error::Transport(format!("connect {}:{}: {}", hostname, port, err)))?;

        debug!("connected");
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl Transport for Connection {
    async fn read_message(&mut self) -> Result<Option<Envelope>> {
        loop {
            // The buffer is cleared after a completed line, not before the
            // read: if this future is dropped mid-line (select), the bytes
            // already consumed stay buffered and the next call finishes
            // the line.
            let n = self.reader.read_line(&mut self.line_buf).await?;
            if n == 0 {
                // EOF, peer closed.
                return Ok(None);
            }
            if self.line_buf.len() > MAX_LINE_BYTES {
                return Err(Error::Framing(format!(
                    "line of {} bytes exceeds the {} byte cap",
                    self.line_buf.len(),
                    MAX_LINE_BYTES
                )));
            }

            // Two-stage parse: invalid JSON is fatal, JSON of an unexpected
            // shape is dropped and the connection continues.
            let parsed = {
                let line = self.line_buf.trim();
                if line.is_empty() {
                    None
                } else {
                    trace!(rx = %line, "received");
                    let value: Result<Value> = serde_json::from_str(line)
                        .map_err(|err| Error::Framing(format!("{}, line: {}", err, line)));
                    match value {
                        Err(err) => Some(Err(err)),
                        Ok(value) => match serde_json::from_value::<Envelope>(value) {
                            Ok(msg) => Some(Ok(msg)),
                            Err(err) => {
                                warn!(error = %err, line = %line, "dropping frame with unexpected shape");
                                None
                            }
                        },
                    }
                }
            };
            self.line_buf.clear();

            match parsed {
                Some(Ok(msg)) => return Ok(Some(msg)),
                Some(Err(err)) => return Err(err),
                None => continue,
            }
        }
    }

    async fn write_message(&mut self, msg: &Envelope) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        trace!(tx = %json, "sending");

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.writer.flush().await;
        // Half-close the send side; the read half closes when dropped.
        let _ = self.writer.shutdown().await;
    }
}

/// Channel-based transport for deterministic testing.
///
/// Backed by tokio mpsc channels rather than TCP, so it works with
/// `tokio::time::pause()` without triggering auto-advance on real I/O.
/// Create a pair with [`MockTransport::pair()`]; the transport is the
/// I/O task's side, the handle is the test's side.
#[cfg(test)]
pub(crate) struct MockTransport {
    rx: tokio::sync::mpsc::UnboundedReceiver<Envelope>,
    tx: tokio::sync::mpsc::UnboundedSender<Envelope>,
}

/// Test-side handle for a [`MockTransport`].
#[cfg(test)]
pub(crate) struct MockTransportHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Envelope>,
    rx: tokio::sync::mpsc::UnboundedReceiver<Envelope>,
}

#[cfg(test)]
impl MockTransport {
    /// Create a linked (transport, handle) pair.
    pub fn pair() -> (Self, MockTransportHandle) {
        let (client_tx, handle_rx) = tokio::sync::mpsc::unbounded_channel();
        let (handle_tx, client_rx) = tokio::sync::mpsc::unbounded_channel();

        let transport = MockTransport {
            rx: client_rx,
            tx: client_tx,
        };
        let handle = MockTransportHandle {
            tx: handle_tx,
            rx: handle_rx,
        };
        (transport, handle)
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn read_message(&mut self) -> Result<Option<Envelope>> {
        Ok(self.rx.recv().await)
    }

    async fn write_message(&mut self, msg: &Envelope) -> Result<()> {
        self.tx
            .send(msg.clone())
            .map_err(|_| Error::Transport("mock peer dropped".to_string()))
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
impl MockTransportHandle {
    /// Send a message to the I/O task.
    pub fn send(&self, msg: Envelope) {
        self.tx.send(msg).expect("transport dropped");
    }

    /// Drop the sending side, simulating a peer close.
    pub fn disconnect(&mut self) {
        let (tx, _) = tokio::sync::mpsc::unbounded_channel();
        self.tx = tx;
    }

    /// Receive a message the I/O task wrote.
    pub async fn recv(&mut self) -> Envelope {
        self.rx.recv().await.expect("transport dropped")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn echo_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(socket);
            while let Ok(Some(msg)) = conn.read_message().await {
                conn.write_message(&msg).await.unwrap();
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_message_roundtrip() {
        let addr = echo_server().await;

        let mut conn = Connection::connect("127.0.0.1", addr.port()).await.unwrap();

        let request = Envelope::request(1, "test.method", json!(["param1", "param2"]));
        conn.write_message(&request).await.unwrap();

        let response = conn.read_message().await.unwrap().unwrap();
        assert_eq!(response.id(), Some(1));
        assert_eq!(response.method(), Some("test.method"));
    }

    #[tokio::test]
    async fn test_multiple_objects_in_one_segment_arrive_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(
                    b"{\"id\":1,\"method\":\"a\",\"params\":[]}\n{\"id\":2,\"method\":\"b\",\"params\":[]}\n",
                )
                .await
                .unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream);

        let first = conn.read_message().await.unwrap().unwrap();
        assert_eq!(first.method(), Some("a"));
        let second = conn.read_message().await.unwrap().unwrap();
        assert_eq!(second.method(), Some("b"));

        // Server closed after writing; clean EOF.
        assert!(conn.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_framing_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"{oops\n").await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream);

        assert!(matches!(
            conn.read_message().await,
            Err(Error::Framing(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_line_is_a_framing_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = vec![b'x'; MAX_LINE_BYTES + 16];
            line.push(b'\n');
            socket.write_all(&line).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream);

        assert!(matches!(
            conn.read_message().await,
            Err(Error::Framing(_))
        ));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_dropped_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Valid JSON, but neither a request nor a response; then a
            // valid notification.
            socket
                .write_all(b"{\"surprise\":true}\n{\"id\":null,\"method\":\"mining.notify\",\"params\":[]}\n")
                .await
                .unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream);

        let msg = conn.read_message().await.unwrap().unwrap();
        assert_eq!(msg.method(), Some("mining.notify"));
    }
}
