//! Public API scenarios
//!
//! Drives sessions the way a console front end would: connect, compose from
//! presets, watch state and events. Most scenarios run against the simulated
//! peer; one talks to a loopback WebSocket server.

use futures::{SinkExt, StreamExt};
use netpulse::{
    Direction, Draft, FileStore, FrameKind, HeartbeatConfig, KeyValueStore, LogQuery, MemoryStore,
    NetPulse, PeerSettings, PresetBook, SendOutcome, SessionBuilder, SessionConfig, SessionEvent,
    SessionState, Settings, StressPlan, WsConnector,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;

fn quiet() -> Settings {
    Settings { peer: PeerSettings::quiet(), ..Settings::default() }
}

#[tokio::test(start_paused = true)]
async fn echo_roundtrip_through_the_simulated_peer() {
    let _ = tracing_subscriber::fmt::try_init();
    let session = NetPulse::builder()
        .config(SessionConfig::new("ws://mock/echo").with_heartbeat(HeartbeatConfig::disabled()))
        .settings(quiet())
        .seed(1)
        .spawn()
        .unwrap();

    session.connect().await.unwrap();
    let outcome = session
        .send(FrameKind::Json, r#"{"type":"MESSAGE","content":"hello","sender":"me"}"#)
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent(_)));

    sleep(Duration::from_millis(250)).await;
    let inbound = session.search(LogQuery::all().with_direction(Direction::Inbound)).await.unwrap();
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].kind, FrameKind::Json);
    assert_eq!(inbound[0].payload, "hello");
}

#[tokio::test(start_paused = true)]
async fn state_stream_follows_connect_and_disconnect() {
    let session = NetPulse::builder()
        .config(SessionConfig::new("ws://localhost:1/ws").simulated())
        .settings(quiet())
        .spawn()
        .unwrap();
    let mut states = Box::pin(session.state_changes());
    assert_eq!(states.next().await, Some(SessionState::Disconnected));

    session.connect().await.unwrap();
    assert_eq!(states.next().await, Some(SessionState::Connected));

    session.disconnect().await.unwrap();
    assert_eq!(states.next().await, Some(SessionState::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn presets_feed_the_composer() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut book = PresetBook::load(Arc::clone(&store));
    let subscribe = book.create("Subscribe", Draft::json(r#"{"type":"MESSAGE","content":"sub"}"#)).unwrap().clone();

    let session = NetPulse::builder()
        .config(SessionConfig::new("ws://mock/presets").with_heartbeat(HeartbeatConfig::disabled()))
        .settings(quiet())
        .store(store)
        .spawn()
        .unwrap();
    session.connect().await.unwrap();

    let draft = subscribe.draft();
    session.send(draft.kind, draft.payload).await.unwrap();
    let login = book.presets()[0].draft();
    session.send(login.kind, login.payload).await.unwrap();

    let outbound = session.search(LogQuery::all().with_kinds([FrameKind::Json])).await.unwrap();
    assert_eq!(outbound.len(), 2);
    assert_eq!(outbound[1].payload, r#"{"action":"LOGIN","uid":1001}"#);
}

#[tokio::test(start_paused = true)]
async fn stress_progress_is_observable() {
    let session = NetPulse::connect("ws://mock/stress").await.unwrap();
    let run = session
        .stress(StressPlan::new(Draft::text("load"), 4, Duration::from_millis(100)))
        .unwrap();

    sleep(Duration::from_millis(250)).await;
    let midway = run.progress();
    assert_eq!(midway.attempted, 2);
    assert_eq!(midway.percent(), 50);

    let done = run.finished().await;
    assert_eq!(done.delivered, 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_stress_plans_send_nothing() {
    let session = NetPulse::connect("ws://mock/stress").await.unwrap();
    assert!(session.stress(StressPlan::new(Draft::text("x"), 0, Duration::from_millis(10))).is_err());
    assert!(session.stress(StressPlan::new(Draft::text("  "), 3, Duration::from_millis(10))).is_err());
    assert!(session.stress(StressPlan::new(Draft::text("x"), 3, Duration::ZERO)).is_err());
}

#[tokio::test(start_paused = true)]
async fn config_changes_are_broadcast_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let session = NetPulse::builder().store(Arc::clone(&store)).spawn().unwrap();
    let mut events = Box::pin(session.events());

    let config = SessionConfig::new("ws://mock/saved").with_token("k3y");
    session.configure(config.clone()).await.unwrap();

    match events.next().await {
        Some(SessionEvent::ConfigChanged(changed)) => assert_eq!(changed, config),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(store.load("netpulse_config").unwrap().unwrap().contains("ws://mock/saved"));
}

/// Accepts one WebSocket client and echoes its text frames
async fn echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                if ws.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });
    port
}

#[tokio::test]
async fn live_endpoint_is_used_without_fallback() {
    let port = echo_server().await;
    let session = SessionBuilder::new()
        .config(
            SessionConfig::new(format!("ws://127.0.0.1:{port}/ws"))
                .with_heartbeat(HeartbeatConfig::disabled()),
        )
        .settings(quiet())
        .connector(WsConnector)
        .spawn()
        .unwrap();
    let mut events = Box::pin(session.events());

    session.connect().await.unwrap();
    let mut states = Box::pin(session.state_changes());
    let connected = timeout(Duration::from_secs(5), async {
        while let Some(state) = states.next().await {
            if state == SessionState::Connected {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(connected);

    let outcome = session.send(FrameKind::Json, r#"{"op":"hello"}"#).await.unwrap();
    assert!(outcome.is_sent());
    timeout(Duration::from_secs(5), async {
        while let Some(event) = events.next().await {
            if let SessionEvent::FrameAppended(frame) = event {
                if frame.direction == Direction::Inbound && frame.kind == FrameKind::Json {
                    assert_eq!(frame.payload, r#"{"op":"hello"}"#);
                    return;
                }
            }
        }
        panic!("event stream ended before the echo arrived");
    })
    .await
    .unwrap();

    let frames = session.frames().await.unwrap();
    assert!(frames.iter().any(|frame| frame.payload == "Connection established"));
    assert!(!frames.iter().any(|frame| frame.payload.contains("using simulated peer")));
    assert_eq!(session.state(), SessionState::Connected);
}
