use std::time::Duration;

use framecast_capture::{CaptureConfig, FrameSource, StaticGate, TestPatternSource};
use framecast_common::error::FramecastError;
use framecast_streamer::{StreamConfig, StreamSession, StreamState};
use framecast_transport::{ConnectionState, FrameChannel, FrameSink};
use tokio::time::{sleep, timeout, Instant};

// Small frames keep the loopback tests quick
fn test_source() -> Box<dyn FrameSource> {
    let config = CaptureConfig::default().with_width(32).with_height(24);
    Box::new(TestPatternSource::new(config))
}

fn fast_config() -> StreamConfig {
    StreamConfig {
        interval: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn test_start_denied_by_gate() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");
    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(false)),
    );

    let result = session.start().await;

    assert!(matches!(
        result,
        Err(FramecastError::PermissionDenied { .. })
    ));
    assert_eq!(session.state(), StreamState::Idle);

    // No timer was started
    sleep(Duration::from_millis(250)).await;
    assert_eq!(session.stats().cycles, 0);
}

#[tokio::test]
async fn test_start_without_source() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");
    let mut session = StreamSession::new(fast_config(), channel, None, Box::new(StaticGate(true)));

    let result = session.start().await;

    assert!(matches!(result, Err(FramecastError::DeviceNotReady)));
    assert_eq!(session.state(), StreamState::Idle);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");
    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.stop().await;
    assert_eq!(session.state(), StreamState::Idle);

    session.stop().await;
    assert_eq!(session.state(), StreamState::Idle);
}

#[tokio::test]
async fn test_double_start_is_noop() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");
    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("first start failed");
    session.start().await.expect("second start failed");
    assert_eq!(session.state(), StreamState::Streaming);

    session.stop().await;
    assert_eq!(session.state(), StreamState::Idle);
}

#[tokio::test]
async fn test_streaming_delivers_envelopes() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.state(), ConnectionState::Open);

    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    let started = Instant::now();
    session.start().await.expect("start failed");

    // First frame arrives one full interval after start
    let first = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("first frame timed out")
        .expect("recv failed");
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(!first.payload().expect("decode failed").is_empty());

    let second = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("second frame timed out")
        .expect("recv failed");
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(second.timestamp >= first.timestamp);

    session.stop().await;

    let stats = session.stats();
    assert!(stats.frames_captured >= 2);
    assert_eq!(stats.cycles, stats.frames_captured + stats.cycles_skipped);

    session.shutdown().await;
}

#[tokio::test]
async fn test_stop_prevents_further_sends() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    let mut session = StreamSession::new(
        StreamConfig {
            interval: Duration::from_millis(200),
        },
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("start failed");

    let _first = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("first frame timed out")
        .expect("recv failed");

    // Stop mid-period: the next tick must never fire
    session.stop().await;
    let stats_at_stop = session.stats();

    let next = timeout(Duration::from_millis(500), sink.recv()).await;
    assert!(next.is_err());
    assert_eq!(session.stats(), stats_at_stop);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("start failed");
    let _first = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("first frame timed out")
        .expect("recv failed");

    session.stop().await;
    assert_eq!(session.state(), StreamState::Idle);

    // Drain anything captured before the stop
    for _ in 0..5 {
        if timeout(Duration::from_millis(250), sink.recv()).await.is_err() {
            break;
        }
    }

    // The source is recovered and reused
    session.start().await.expect("restart failed");
    assert_eq!(session.state(), StreamState::Streaming);

    let after_restart = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("no frame after restart")
        .expect("recv failed");
    assert!(!after_restart.frame.is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn test_frames_dropped_when_transport_never_opened() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");

    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("start failed");
    sleep(Duration::from_millis(350)).await;
    session.stop().await;

    let stats = session.stats();
    assert!(stats.frames_captured >= 2);

    // Capture keeps running; every envelope is dropped and counted
    let channel_stats = session.channel().stats();
    assert_eq!(channel_stats.frames_sent, 0);
    assert_eq!(channel_stats.frames_dropped, stats.frames_captured);
}

#[tokio::test]
async fn test_closed_transport_drops_but_streaming_continues() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("start failed");
    let _first = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("first frame timed out")
        .expect("recv failed");

    // Close the transport out from under the stream
    session.channel().close().await;
    assert_eq!(session.channel().state(), ConnectionState::Closed);

    let sent_at_close = session.channel().stats().frames_sent;
    let captured_at_close = session.stats().frames_captured;

    sleep(Duration::from_millis(350)).await;

    // Capture continues; every envelope since the close was dropped
    assert_eq!(session.state(), StreamState::Streaming);
    assert!(session.stats().frames_captured > captured_at_close);
    assert_eq!(session.channel().stats().frames_sent, sent_at_close);
    assert!(session.channel().stats().frames_dropped > 0);

    session.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_while_streaming_disconnects() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.client_count(), 1);

    let mut session = StreamSession::new(
        fast_config(),
        channel,
        Some(test_source()),
        Box::new(StaticGate(true)),
    );

    session.start().await.expect("start failed");
    let _first = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("first frame timed out")
        .expect("recv failed");

    session.shutdown().await;

    sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.client_count(), 0);
}
