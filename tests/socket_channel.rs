mod support;

use bridges_game::domain::{KeyBindings, KeyId, KeySignals};
use bridges_game::interface_adapters::{
    ChannelError, ChannelSettings, ChannelStatus, ConnectionError, KeyListenerRegistry,
    SocketChannel,
};
use bridges_game::use_cases::Credentials;
use std::sync::Arc;
use std::time::Duration;
use support::{Ack, FakeServer, closed_port_url, eventually};

fn settings(server_url: &str, connect_timeout: Duration) -> ChannelSettings {
    ChannelSettings {
        server_url: server_url.to_string(),
        connect_timeout,
    }
}

async fn connected(server: &FakeServer) -> (SocketChannel, Arc<KeySignals>) {
    let signals = Arc::new(KeySignals::new(KeyBindings::default()));
    let registry = Arc::new(KeyListenerRegistry::new());
    registry.register(signals.clone());

    let channel = SocketChannel::connect(
        &settings(&server.base_url, Duration::from_secs(2)),
        registry,
    )
    .await
    .expect("expected handshake to complete");
    (channel, signals)
}

#[tokio::test]
async fn when_server_acknowledges_namespace_then_connect_returns_open_channel() {
    let server = FakeServer::start(Ack::Accept).await;

    let (channel, _signals) = connected(&server).await;

    assert_eq!(channel.status(), ChannelStatus::Connected);
    assert_eq!(channel.failure(), None);
    assert_eq!(server.received().first().map(String::as_str), Some("40"));
}

#[tokio::test]
async fn when_credentials_are_sent_then_server_sees_exact_payload_once() {
    let server = FakeServer::start(Ack::Accept).await;
    let (channel, _signals) = connected(&server).await;
    let credentials = Credentials::new(7, "alice", "k1");

    channel
        .send_credentials(&credentials)
        .await
        .expect("expected first handshake to be accepted");
    let second = channel.send_credentials(&credentials).await;

    assert_eq!(second, Err(ChannelError::CredentialsAlreadySent));
    assert!(server.wait_until(|s| !s.events("credentials").is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent = server.events("credentials");
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        serde_json::json!(r#"{"user":"alice","apikey":"k1","assignment":"7"}"#)
    );
}

#[tokio::test]
async fn when_server_sends_key_events_then_signals_follow_and_bad_messages_are_skipped() {
    let server = FakeServer::start(Ack::Accept).await;
    let (channel, signals) = connected(&server).await;

    server.send(r#"42["keydown",{"type":"keydown","key":"ArrowUp"}]"#);
    assert!(eventually(|| signals.is_held(&KeyId::UP)).await);

    server.send(r#"42["keyup","{\"type\":\"keyup\",\"key\":\"ArrowUp\"}"]"#);
    assert!(eventually(|| !signals.is_held(&KeyId::UP)).await);

    server.send("not a socket.io packet");
    server.send(r#"42["keydown",{"type":"keydown"}]"#);
    server.send(r#"42["keydown",{"type":"keydown","key":"Escape"}]"#);
    server.send(r#"42["keydown",{"type":"keyup","key":"d"}]"#);
    server.send(r#"42["keydown",{"type":"keydown","key":" "}]"#);
    assert!(eventually(|| signals.is_held(&KeyId::SPACE)).await);

    assert_eq!(channel.status(), ChannelStatus::Connected);
    assert!(!signals.is_held(&KeyId::UP));
    assert!(!signals.is_held(&KeyId::D));
}

#[tokio::test]
async fn when_listener_is_registered_after_connect_then_it_receives_events() {
    let server = FakeServer::start(Ack::Accept).await;
    let registry = Arc::new(KeyListenerRegistry::new());
    let channel = SocketChannel::connect(
        &settings(&server.base_url, Duration::from_secs(2)),
        registry,
    )
    .await
    .expect("expected handshake to complete");

    let late = Arc::new(KeySignals::new(KeyBindings::default()));
    let id = channel.register_listener(late.clone());
    server.send(r#"42["keydown",{"type":"keydown","key":"d"}]"#);
    assert!(eventually(|| late.is_held(&KeyId::D)).await);

    assert!(channel.unregister_listener(id));
    server.send(r#"42["keyup",{"type":"keyup","key":"d"}]"#);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(late.is_held(&KeyId::D));
}

#[tokio::test]
async fn when_server_pings_then_client_answers_with_pong() {
    let server = FakeServer::start(Ack::Accept).await;
    let (_channel, _signals) = connected(&server).await;

    server.send("2");

    assert!(server.wait_until(|s| s.received().iter().any(|p| p == "3")).await);
}

#[tokio::test]
async fn when_frames_are_sent_then_they_arrive_in_order() {
    let server = FakeServer::start(Ack::Accept).await;
    let (channel, _signals) = connected(&server).await;

    for frame in 0..5 {
        channel
            .send_frame(format!(r#"42["gamegrid:recv","frame-{frame}"]"#))
            .expect("expected frame to be queued");
    }

    assert!(server.wait_until(|s| s.events("gamegrid:recv").len() == 5).await);
    let frames: Vec<String> = server
        .events("gamegrid:recv")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert_eq!(
        frames,
        vec!["frame-0", "frame-1", "frame-2", "frame-3", "frame-4"]
    );
}

#[tokio::test]
async fn when_server_rejects_namespace_then_connect_fails_with_rejected() {
    let server = FakeServer::start(Ack::Reject).await;
    let registry = Arc::new(KeyListenerRegistry::new());

    let result =
        SocketChannel::connect(&settings(&server.base_url, Duration::from_secs(2)), registry).await;

    assert!(matches!(result, Err(ConnectionError::Rejected(_))));
}

#[tokio::test]
async fn when_server_never_acknowledges_then_connect_times_out() {
    let server = FakeServer::start(Ack::Silent).await;
    let registry = Arc::new(KeyListenerRegistry::new());

    let result = SocketChannel::connect(
        &settings(&server.base_url, Duration::from_millis(200)),
        registry,
    )
    .await;

    assert!(matches!(result, Err(ConnectionError::Timeout(_))));
}

#[tokio::test]
async fn when_nothing_listens_then_connect_fails_with_transport_error() {
    let url = closed_port_url().await;
    let registry = Arc::new(KeyListenerRegistry::new());

    let result = SocketChannel::connect(&settings(&url, Duration::from_secs(2)), registry).await;

    assert!(matches!(result, Err(ConnectionError::Transport(_))));
}

#[tokio::test]
async fn when_server_closes_socket_then_failure_is_reported_and_sends_fail() {
    let server = FakeServer::start(Ack::Accept).await;
    let (channel, _signals) = connected(&server).await;

    server.close_socket();

    assert!(eventually(|| channel.failure().is_some()).await);
    assert_eq!(
        channel.send_frame("42[\"gamegrid:recv\",\"late\"]".to_string()),
        Err(ChannelError::Closed)
    );
}

#[tokio::test]
async fn when_client_closes_then_status_reports_client_close() {
    let server = FakeServer::start(Ack::Accept).await;
    let (mut channel, _signals) = connected(&server).await;

    channel.close().await;

    assert_eq!(
        channel.status(),
        ChannelStatus::Closed("closed by client".to_string())
    );
    // A second close is a no-op.
    channel.close().await;
}
