//! Streaming session management.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use framecast_capture::{CaptureGate, FrameSource};
use framecast_common::error::{FramecastError, FramecastResult};
use framecast_transport::FrameChannel;

use crate::scheduler::{self, CycleCounters, SessionStats};

/// Configuration for a streaming session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Time between capture cycles.
    pub interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
        }
    }
}

/// State of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No capture loop is running. The transport may still be open.
    Idle,
    /// The capture loop is running.
    Streaming,
}

/// A streaming session that coordinates capture and transport.
///
/// Owns the Idle/Streaming state machine: the scheduler task and its
/// interval timer exist exactly while the session is `Streaming`. The
/// transport channel lives for the whole session regardless of state;
/// stopping the stream does not close it, [`shutdown`](Self::shutdown)
/// does.
pub struct StreamSession {
    config: StreamConfig,
    state: StreamState,
    channel: Arc<FrameChannel>,
    source: Option<Box<dyn FrameSource>>,
    gate: Box<dyn CaptureGate>,
    counters: Arc<CycleCounters>,
    cancel: Option<CancellationToken>,
    scheduler_task: Option<JoinHandle<Box<dyn FrameSource>>>,
}

impl StreamSession {
    /// Create a new session in the `Idle` state.
    ///
    /// `source` may be `None` when no capture device is available yet;
    /// `start` reports `DeviceNotReady` until one is attached.
    pub fn new(
        config: StreamConfig,
        channel: FrameChannel,
        source: Option<Box<dyn FrameSource>>,
        gate: Box<dyn CaptureGate>,
    ) -> Self {
        Self {
            config,
            state: StreamState::Idle,
            channel: Arc::new(channel),
            source,
            gate,
            counters: Arc::new(CycleCounters::default()),
            cancel: None,
            scheduler_task: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Start streaming.
    ///
    /// Checks the capture gate, then spawns the scheduler task. The first
    /// frame is captured one full interval after this returns. Calling
    /// `start` while already streaming is a no-op.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` when the gate refuses camera access;
    /// `DeviceNotReady` when no frame source is attached. Both leave the
    /// session `Idle` with no timer running.
    pub async fn start(&mut self) -> FramecastResult<()> {
        if self.state == StreamState::Streaming {
            tracing::debug!("Session already streaming");
            return Ok(());
        }

        // The gate is consulted on every start attempt
        if !self.gate.granted().await {
            return Err(FramecastError::permission_denied(
                "Camera access not granted",
            ));
        }

        let source = self.source.take().ok_or(FramecastError::DeviceNotReady)?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler::run(
            self.config.interval,
            source,
            self.channel.clone(),
            self.counters.clone(),
            cancel.clone(),
        ));

        self.cancel = Some(cancel);
        self.scheduler_task = Some(task);
        self.state = StreamState::Streaming;

        tracing::info!("Streaming started");
        Ok(())
    }

    /// Stop streaming.
    ///
    /// Cancels the schedule so no further tick fires, waits for the
    /// scheduler task to finish (a cycle already executing completes and
    /// may send one last frame), and recovers the source for the next
    /// `start`. No-op when `Idle`.
    pub async fn stop(&mut self) {
        if self.state != StreamState::Streaming {
            return;
        }

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        if let Some(task) = self.scheduler_task.take() {
            match task.await {
                Ok(source) => self.source = Some(source),
                Err(e) => tracing::warn!(error = %e, "Capture loop join failed"),
            }
        }

        self.state = StreamState::Idle;
        tracing::info!("Streaming stopped");
    }

    /// Capture counters so far. They survive stop/start cycles.
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    /// The transport channel, for readiness polling and delivery stats.
    pub fn channel(&self) -> &FrameChannel {
        &self.channel
    }

    /// Tear the session down: stop streaming if needed and close the
    /// transport channel. Consumes the session; teardown happens exactly
    /// once.
    pub async fn shutdown(mut self) {
        self.stop().await;
        self.channel.close().await;
        tracing::info!("Session shut down");
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        // Graceful path is shutdown(); this only stops a leaked loop
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.scheduler_task.take() {
            task.abort();
        }
    }
}
