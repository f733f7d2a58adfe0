//! Stream camera frames to a WebSocket endpoint.

use std::time::Duration;

use framecast_capture::{CaptureConfig, CaptureGate, FrameSource, StaticGate, TestPatternSource};
use framecast_common::config::AppConfig;
use framecast_streamer::{StreamConfig, StreamSession};
use framecast_transport::{ConnectionState, FrameChannel};

pub async fn run(
    config: AppConfig,
    endpoint: Option<String>,
    interval: Option<u64>,
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
    test_pattern: bool,
) -> anyhow::Result<()> {
    // CLI flags override the config file
    let endpoint = endpoint.unwrap_or(config.endpoint);
    let interval_ms = interval.unwrap_or(config.interval_ms);
    let device = device.unwrap_or(config.capture.device);
    let width = width.unwrap_or(config.capture.width);
    let height = height.unwrap_or(config.capture.height);
    let quality = quality.unwrap_or(config.capture.quality);

    let capture_config = CaptureConfig::default()
        .with_device(device.clone())
        .with_width(width)
        .with_height(height)
        .with_quality(quality);

    let (source, gate) = build_source(capture_config, test_pattern, &device)?;

    println!("Streaming to {endpoint}");
    println!("  Source: {}", source.name());
    println!("  Interval: {interval_ms} ms");
    println!("  Frame: {width}x{height} @ quality {quality}");
    println!();

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;

    // Give the handshake a moment before the first capture fires
    for _ in 0..20 {
        match channel.state() {
            ConnectionState::Connecting => tokio::time::sleep(Duration::from_millis(100)).await,
            _ => break,
        }
    }
    match channel.state() {
        ConnectionState::Open => println!("Connected."),
        ConnectionState::Errored => {
            println!("Connection failed; frames will be dropped (there is no reconnection).")
        }
        _ => println!("Still connecting; frames are dropped until the endpoint accepts."),
    }

    let stream_config = StreamConfig {
        interval: Duration::from_millis(interval_ms),
    };
    let mut session = StreamSession::new(stream_config, channel, Some(source), gate);

    session.start().await?;

    println!("Streaming. Press Ctrl+C to stop...");
    println!();

    tokio::signal::ctrl_c().await?;

    println!();
    session.stop().await;

    let stats = session.stats();
    let channel_stats = session.channel().stats();
    println!(
        "Cycles: {} (captured {}, skipped {})",
        stats.cycles, stats.frames_captured, stats.cycles_skipped
    );
    println!(
        "Frames sent: {} (dropped {})",
        channel_stats.frames_sent, channel_stats.frames_dropped
    );

    session.shutdown().await;
    Ok(())
}

/// Pick the frame source and the matching permission gate.
fn build_source(
    config: CaptureConfig,
    test_pattern: bool,
    device: &str,
) -> anyhow::Result<(Box<dyn FrameSource>, Box<dyn CaptureGate>)> {
    if test_pattern {
        return Ok((
            Box::new(TestPatternSource::new(config)),
            Box::new(StaticGate(true)),
        ));
    }

    #[cfg(feature = "v4l2")]
    {
        let source = framecast_capture::V4lSource::new(config)?;
        Ok((
            Box::new(source),
            Box::new(framecast_capture::DeviceProbeGate::new(device)),
        ))
    }

    #[cfg(not(feature = "v4l2"))]
    {
        let _ = (config, device);
        anyhow::bail!(
            "Camera capture requires the v4l2 feature (rebuild with --features v4l2), \
             or use --test-pattern"
        )
    }
}
