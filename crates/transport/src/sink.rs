//! WebSocket receiver for frame envelopes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_websockets::ServerBuilder;

use framecast_common::error::{FramecastError, FramecastResult};

use crate::envelope::FrameEnvelope;

/// Largest accepted text message. Oversized frames are logged and
/// discarded without closing the connection.
pub const MAX_FRAME_BYTES: usize = 5 * 1024 * 1024;

/// Accepts WebSocket connections and yields the frame envelopes they
/// push.
///
/// The counterpart of [`FrameChannel`](crate::FrameChannel): it backs the
/// `framecast receive` command and the integration tests. Envelopes from
/// all connected senders are multiplexed into one queue; each sender has
/// a dedicated reader task, so a stalled sender never blocks the others.
/// Non-text frames and unparseable text are logged and skipped.
pub struct FrameSink {
    rx: mpsc::Receiver<FrameEnvelope>,
    client_count: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl FrameSink {
    /// Bind a TCP listener and start accepting senders.
    ///
    /// # Errors
    ///
    /// Returns `FramecastError::Io` if the address cannot be bound.
    pub async fn bind(addr: impl ToSocketAddrs) -> FramecastResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let client_count = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(256);

        let count = client_count.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((tcp_stream, addr)) => {
                        let ws_stream = match ServerBuilder::new().accept(tcp_stream).await {
                            Ok((_request, ws_stream)) => ws_stream,
                            Err(e) => {
                                tracing::warn!(%addr, error = %e, "WebSocket handshake failed");
                                continue;
                            }
                        };

                        count.fetch_add(1, Ordering::SeqCst);
                        tracing::info!(%addr, "Sender connected");

                        let tx = tx.clone();
                        let count = count.clone();
                        tokio::spawn(async move {
                            read_envelopes(ws_stream, addr, tx).await;
                            count.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept error");
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
        });

        Ok(Self {
            rx,
            client_count,
            accept_task,
            local_addr,
        })
    }

    /// Receive the next envelope from any connected sender.
    ///
    /// Waits until a sender delivers one; senders may come and go in the
    /// meantime.
    pub async fn recv(&mut self) -> FramecastResult<FrameEnvelope> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| FramecastError::transport("Receiver queue closed"))
    }

    /// Number of currently connected senders.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::SeqCst)
    }

    /// The local address the sink is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Per-sender reader: parse text messages into envelopes until the
/// connection ends.
async fn read_envelopes(
    mut ws_stream: tokio_websockets::WebSocketStream<tokio::net::TcpStream>,
    addr: SocketAddr,
    tx: mpsc::Sender<FrameEnvelope>,
) {
    loop {
        match ws_stream.next().await {
            Some(Ok(msg)) => {
                if msg.is_close() {
                    tracing::info!(%addr, "Sender closed the connection");
                    break;
                }

                let Some(text) = msg.as_text() else {
                    // One frame per text message; anything else is noise
                    continue;
                };

                if text.len() > MAX_FRAME_BYTES {
                    tracing::warn!(%addr, bytes = text.len(), "Frame too large, discarded");
                    continue;
                }

                match FrameEnvelope::from_json(text) {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            // Sink dropped
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(%addr, error = %e, "Failed to parse envelope");
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(%addr, error = %e, "Sender connection error");
                break;
            }
            None => {
                tracing::info!(%addr, "Sender disconnected");
                break;
            }
        }
    }
}
