//! Persistent WebSocket client channel.
//!
//! One `FrameChannel` owns one connection attempt for the life of the
//! process. All socket I/O happens on a dedicated task; callers interact
//! through a single-slot command queue and atomic state, so `send` never
//! blocks and never fails with an error, it only reports whether the
//! frame was handed off.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_websockets::{ClientBuilder, Message};

use crate::envelope::FrameEnvelope;

/// Lifecycle of the underlying connection.
///
/// Advanced by the channel's I/O task as the connection progresses;
/// [`FrameChannel::close`] pins it to `Closed`. Read through
/// [`FrameChannel::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Constructed or handshake in progress. Frames are dropped.
    Connecting = 0,
    /// Handshake complete, frames flow.
    Open = 1,
    /// Deliberately torn down, or the remote sent a close frame.
    Closed = 2,
    /// Handshake or socket failure. Terminal; there is no reconnection.
    Errored = 3,
}

struct SharedState(AtomicU8);

impl SharedState {
    fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::SeqCst) {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closed,
            _ => ConnectionState::Errored,
        }
    }
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

/// Snapshot of the channel's delivery counters.
///
/// `frames_sent + frames_dropped` equals the number of
/// [`FrameChannel::send`] calls made so far; every envelope is accounted
/// for exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Envelopes handed to the I/O task.
    pub frames_sent: u64,
    /// Envelopes refused: channel not open, buffer occupied, or
    /// serialization failed.
    pub frames_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug)]
enum Command {
    Frame(String),
    Close,
}

/// Best-effort frame publisher over a persistent WebSocket connection.
///
/// The channel is connected once and closed once; there is no
/// reconnection. After `Errored` or `Closed`, every `send` drops its
/// frame. Each dropped frame is counted and observable via
/// [`FrameChannel::stats`].
#[derive(Debug)]
pub struct FrameChannel {
    endpoint: String,
    state: Arc<SharedState>,
    counters: Arc<Counters>,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: Mutex<Option<mpsc::Receiver<Command>>>,
    io_task: Mutex<Option<JoinHandle<()>>>,
}

impl FrameChannel {
    /// Create a channel for the given `ws://` endpoint.
    ///
    /// The channel starts in [`ConnectionState::Connecting`] and does not
    /// touch the network until [`connect`](Self::connect) is called.
    pub fn new(endpoint: &str) -> Self {
        // Single slot: at most one frame waits on the I/O task
        let (cmd_tx, cmd_rx) = mpsc::channel(1);

        Self {
            endpoint: endpoint.to_string(),
            state: Arc::new(SharedState::new(ConnectionState::Connecting)),
            counters: Arc::new(Counters::default()),
            cmd_tx,
            cmd_rx: Mutex::new(Some(cmd_rx)),
            io_task: Mutex::new(None),
        }
    }

    /// Spawn the I/O task and begin the WebSocket handshake.
    ///
    /// Returns immediately; the handshake completes in the background and
    /// is reflected in [`state`](Self::state) as `Open` or `Errored`.
    /// Calling this more than once, or after `close`, is a logged no-op.
    pub async fn connect(&self) {
        if self.state.get() == ConnectionState::Closed {
            tracing::warn!(endpoint = %self.endpoint, "Connect on a closed channel ignored");
            return;
        }

        let Some(cmd_rx) = self.cmd_rx.lock().await.take() else {
            tracing::warn!(
                endpoint = %self.endpoint,
                "Already connected; reconnection is not supported"
            );
            return;
        };

        let endpoint = self.endpoint.clone();
        let state = self.state.clone();

        let handle = tokio::spawn(io_loop(endpoint, cmd_rx, state));
        *self.io_task.lock().await = Some(handle);
    }

    /// Hand one envelope to the I/O task, best-effort.
    ///
    /// Returns `true` once the envelope is queued for delivery; there is
    /// no receipt confirmation. Returns `false`, increments
    /// `frames_dropped`, and logs at debug when the connection is not
    /// open or the single outbound slot is still occupied by the
    /// previous frame. Never blocks.
    pub fn send(&self, envelope: &FrameEnvelope) -> bool {
        let state = self.state.get();
        if state != ConnectionState::Open {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(?state, "Frame dropped: channel not open");
            return false;
        }

        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(error = %e, "Frame dropped: serialization failed");
                return false;
            }
        };

        match self.cmd_tx.try_send(Command::Frame(json)) {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("Frame dropped: outbound slot occupied");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("Frame dropped: connection task ended");
                false
            }
        }
    }

    /// Tear the connection down.
    ///
    /// Sends a WebSocket close frame (when the connection is up), waits
    /// for the I/O task to finish, and leaves the channel in
    /// [`ConnectionState::Closed`]. Idempotent.
    pub async fn close(&self) {
        let handle = self.io_task.lock().await.take();

        // Ignored when the task already exited; the join below still
        // completes
        let _ = self.cmd_tx.send(Command::Close).await;

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Connection task join failed");
            }
        }

        self.state.set(ConnectionState::Closed);
        tracing::info!(endpoint = %self.endpoint, "Transport channel closed");
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Delivery counters so far.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            frames_sent: self.counters.sent.load(Ordering::SeqCst),
            frames_dropped: self.counters.dropped.load(Ordering::SeqCst),
        }
    }

    /// The endpoint this channel was created for.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for FrameChannel {
    fn drop(&mut self) {
        // Graceful path is close(); this only stops a leaked task
        if let Ok(mut guard) = self.io_task.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

/// Connection task: one handshake, then a select loop over outbound
/// commands and inbound socket traffic until either side ends it.
async fn io_loop(endpoint: String, mut cmd_rx: mpsc::Receiver<Command>, state: Arc<SharedState>) {
    let uri: http::Uri = match endpoint.parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "Invalid endpoint URI");
            state.set(ConnectionState::Errored);
            return;
        }
    };

    let (mut stream, _response) = match ClientBuilder::from_uri(uri).connect().await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "WebSocket handshake failed");
            state.set(ConnectionState::Errored);
            return;
        }
    };

    state.set(ConnectionState::Open);
    tracing::info!(endpoint = %endpoint, "Transport channel open");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Frame(json)) => {
                    if let Err(e) = stream.send(Message::text(json)).await {
                        tracing::warn!(error = %e, "Frame send failed");
                        state.set(ConnectionState::Errored);
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = stream.send(Message::close(None, "")).await;
                    state.set(ConnectionState::Closed);
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(msg)) => {
                    if msg.is_close() {
                        tracing::info!(endpoint = %endpoint, "Remote closed the connection");
                        state.set(ConnectionState::Closed);
                        break;
                    }
                    // One-way push: anything else from the remote is ignored
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Connection error");
                    state.set(ConnectionState::Errored);
                    break;
                }
                None => {
                    tracing::warn!(endpoint = %endpoint, "Remote dropped the connection");
                    state.set(ConnectionState::Errored);
                    break;
                }
            },
        }
    }
}
