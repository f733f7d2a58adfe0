//! FrameCast Transport
//!
//! WebSocket delivery of captured frames. The [`FrameChannel`] keeps one
//! persistent client connection alive for the life of the process and
//! pushes [`FrameEnvelope`] messages to it best-effort: a frame the
//! connection cannot take right now is dropped and counted, never queued
//! or retried. [`FrameSink`] is the matching receiver, used by the
//! `framecast receive` command and the integration tests.

pub mod channel;
pub mod envelope;
pub mod sink;

pub use channel::{ChannelStats, ConnectionState, FrameChannel};
pub use envelope::FrameEnvelope;
pub use sink::FrameSink;
