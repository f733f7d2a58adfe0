//! FrameCast Capture
//!
//! Camera frame sources for the streaming pipeline. A [`FrameSource`]
//! produces one encoded still image per call; the scheduler in
//! `framecast-streamer` pulls from it on a fixed interval. Backends:
//!
//! - **Test pattern:** synthetic moving gradient, always available
//! - **V4L2:** MJPEG stills from a `/dev/video*` device (feature `v4l2`)
//!
//! Device permission is modeled as a [`permissions::CaptureGate`] the
//! session consults before streaming may begin.

pub mod config;
pub mod pattern;
pub mod permissions;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use config::CaptureConfig;
pub use pattern::TestPatternSource;
pub use permissions::{CaptureGate, DeviceProbeGate, StaticGate};

#[cfg(feature = "v4l2")]
pub use v4l2::V4lSource;

use framecast_common::error::FramecastResult;

/// One still-image capture: encoded JPEG bytes plus the wall-clock time
/// the capture completed (epoch milliseconds). Immutable once produced;
/// ownership moves into the send path and is not retained.
#[derive(Debug, Clone)]
pub struct FrameSample {
    /// Encoded image payload.
    pub data: Vec<u8>,

    /// Wall-clock capture time in epoch milliseconds. Non-decreasing
    /// across samples from one source, but not strictly increasing:
    /// capture latency varies.
    pub captured_at_ms: i64,
}

impl FrameSample {
    /// Wrap freshly captured bytes, stamping them with the current
    /// wall-clock time.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Abstract interface for still-frame capture backends.
///
/// `grab` resolves with exactly one sample or an error; callers are
/// single-flight (the scheduler never issues a second `grab` before the
/// first resolves), so implementations do not need to support overlapping
/// calls. A source that is not yet initialized signals
/// [`FramecastError::DeviceNotReady`](framecast_common::FramecastError::DeviceNotReady)
/// rather than blocking indefinitely.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Capture exactly one frame.
    async fn grab(&mut self) -> FramecastResult<FrameSample>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}
