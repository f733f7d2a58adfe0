//! FrameCast Streamer
//!
//! Ties a [`FrameSource`](framecast_capture::FrameSource) to a
//! [`FrameChannel`](framecast_transport::FrameChannel) under explicit
//! start/stop control. A [`StreamSession`] owns the Idle/Streaming state
//! machine; while streaming, a scheduler task captures one frame per
//! fixed interval and pushes it best-effort. Capture failures skip the
//! cycle, transport refusals drop the frame; neither stops the stream.

pub mod scheduler;
pub mod session;

pub use scheduler::SessionStats;
pub use session::{StreamConfig, StreamSession, StreamState};
