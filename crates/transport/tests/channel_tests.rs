use framecast_transport::{ConnectionState, FrameChannel, FrameEnvelope, FrameSink};
use tokio::time::{sleep, timeout, Duration};

#[tokio::test]
async fn test_send_before_open_drops_frame() {
    let channel = FrameChannel::new("ws://127.0.0.1:1");

    assert_eq!(channel.state(), ConnectionState::Connecting);

    let envelope = FrameEnvelope::new(b"jpeg bytes", 1000);
    assert!(!channel.send(&envelope));

    let stats = channel.stats();
    assert_eq!(stats.frames_sent, 0);
    assert_eq!(stats.frames_dropped, 1);
}

#[tokio::test]
async fn test_channel_delivers_to_sink() {
    let mut sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(channel.state(), ConnectionState::Open);
    assert_eq!(sink.client_count(), 1);

    let envelope = FrameEnvelope::new(b"\xff\xd8\xff\xd9", 1712345678901);
    assert!(channel.send(&envelope));

    let received = timeout(Duration::from_secs(5), sink.recv())
        .await
        .expect("recv timed out")
        .expect("recv failed");

    assert_eq!(received, envelope);
    assert_eq!(received.payload().expect("decode failed"), b"\xff\xd8\xff\xd9");
    assert_eq!(channel.stats().frames_sent, 1);

    channel.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    channel.close().await;
    assert_eq!(channel.state(), ConnectionState::Closed);

    channel.close().await;
    assert_eq!(channel.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_send_after_close_drops_frame() {
    let sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;
    channel.close().await;

    let envelope = FrameEnvelope::new(b"late frame", 2000);
    assert!(!channel.send(&envelope));
    assert_eq!(channel.stats().frames_dropped, 1);
}

#[tokio::test]
async fn test_handshake_failure_marks_channel_errored() {
    // Grab a port with no listener behind it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);

    let channel = FrameChannel::new(&format!("ws://{}", addr));
    channel.connect().await;
    sleep(Duration::from_millis(200)).await;

    assert_eq!(channel.state(), ConnectionState::Errored);

    let envelope = FrameEnvelope::new(b"never sent", 3000);
    assert!(!channel.send(&envelope));
}

#[tokio::test]
async fn test_second_connect_is_noop() {
    let sink = FrameSink::bind("127.0.0.1:0").await.expect("bind failed");
    let endpoint = format!("ws://{}", sink.local_addr());

    let channel = FrameChannel::new(&endpoint);
    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    channel.connect().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(channel.state(), ConnectionState::Open);
    assert_eq!(sink.client_count(), 1);

    channel.close().await;
}
