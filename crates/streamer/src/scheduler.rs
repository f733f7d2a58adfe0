//! Fixed-interval capture loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use framecast_capture::FrameSource;
use framecast_transport::{FrameChannel, FrameEnvelope};

/// Counters shared between the capture loop and the session.
#[derive(Debug, Default)]
pub(crate) struct CycleCounters {
    pub cycles: AtomicU64,
    pub frames_captured: AtomicU64,
    pub cycles_skipped: AtomicU64,
}

impl CycleCounters {
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            cycles: self.cycles.load(Ordering::SeqCst),
            frames_captured: self.frames_captured.load(Ordering::SeqCst),
            cycles_skipped: self.cycles_skipped.load(Ordering::SeqCst),
        }
    }
}

/// Snapshot of a session's capture counters.
///
/// Together with [`ChannelStats`](framecast_transport::ChannelStats)
/// these account for every tick: `cycles = frames_captured +
/// cycles_skipped`, and every captured frame shows up in the channel as
/// either sent or dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Ticks that began a capture cycle.
    pub cycles: u64,
    /// Cycles that produced a frame.
    pub frames_captured: u64,
    /// Cycles abandoned because capture failed or the device was not
    /// ready.
    pub cycles_skipped: u64,
}

/// Capture-and-send loop.
///
/// The first tick fires one full interval after start; the cadence is
/// fixed from then on, with a slow cycle delaying (not bunching) the
/// following ticks. Cycles are strictly sequential. Runs until the token
/// is cancelled, then hands the source back for the next start.
pub(crate) async fn run(
    interval: Duration,
    mut source: Box<dyn FrameSource>,
    channel: Arc<FrameChannel>,
    counters: Arc<CycleCounters>,
    cancel: CancellationToken,
) -> Box<dyn FrameSource> {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        source = source.name(),
        interval_ms = interval.as_millis() as u64,
        "Capture loop started"
    );

    loop {
        tokio::select! {
            // Cancellation wins when a tick is already due
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Capture loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                run_cycle(source.as_mut(), &channel, &counters).await;
            }
        }
    }

    source
}

/// One tick: grab a frame, wrap it, hand it to the channel.
async fn run_cycle(
    source: &mut dyn FrameSource,
    channel: &FrameChannel,
    counters: &CycleCounters,
) {
    counters.cycles.fetch_add(1, Ordering::SeqCst);

    let sample = match source.grab().await {
        Ok(sample) => sample,
        Err(e) if e.is_device_not_ready() => {
            counters.cycles_skipped.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Cycle skipped: device not ready");
            return;
        }
        Err(e) => {
            counters.cycles_skipped.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(error = %e, "Cycle skipped: capture failed");
            return;
        }
    };

    counters.frames_captured.fetch_add(1, Ordering::SeqCst);

    let envelope = FrameEnvelope::new(&sample.data, sample.captured_at_ms);
    if !channel.send(&envelope) {
        // Dropped and counted by the channel; nothing is retried
        tracing::debug!("Frame not sent this cycle");
    }
}
