//! End-to-end tests against a loopback WebSocket server.
//!
//! The server is a minimal axum app: on each upgrade it pushes one
//! `ANIMAL_ADDED` frame and then forwards every text frame it receives to
//! the test.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

use livestock_sync::adapters::websocket::WebSocketTransport;
use livestock_sync::config::{ClientConfig, RetryConfig};
use livestock_sync::{ConnectionState, DomainEvent, EventCallbacks, SyncClient};

const WAIT: Duration = Duration::from_secs(5);
const GREETING: &str = r#"{"type":"ANIMAL_ADDED","data":{"id":"A1","tag":"T-01"}}"#;

#[derive(Clone)]
struct ServerState {
    upgrades: Arc<AtomicUsize>,
    received: mpsc::UnboundedSender<String>,
    close_first: bool,
}

async fn events_ws(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(mut socket: WebSocket, state: ServerState) {
    let n = state.upgrades.fetch_add(1, Ordering::SeqCst);
    if state.close_first && n == 0 {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    if socket.send(Message::Text(GREETING.to_string())).await.is_err() {
        return;
    }
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Text(text) = message {
            let _ = state.received.send(text);
        }
    }
}

async fn spawn_server(close_first: bool) -> (SocketAddr, ServerState, mpsc::UnboundedReceiver<String>) {
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let state = ServerState {
        upgrades: Arc::new(AtomicUsize::new(0)),
        received: received_tx,
        close_first,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/events", get(events_ws))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, received_rx)
}

fn client_for(addr: SocketAddr) -> SyncClient {
    let config = ClientConfig {
        retry: RetryConfig {
            base_delay_ms: 50,
            max_attempts: 3,
        },
        ..ClientConfig::default()
    }
    .with_url(format!("ws://{addr}/events"));

    SyncClient::new(config, Arc::new(WebSocketTransport::new()))
}

fn added_channel() -> (EventCallbacks, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callbacks = EventCallbacks::named("loopback").on_entity_added(move |entity| {
        let _ = tx.send(entity.clone());
    });
    (callbacks, rx)
}

#[tokio::test]
async fn server_push_reaches_binding_and_client_send_reaches_server() {
    let (addr, _state, mut received) = spawn_server(false).await;
    let client = client_for(addr);
    let (callbacks, mut added) = added_channel();

    let binding = client.bind(callbacks).unwrap();

    let entity = timeout(WAIT, added.recv()).await.unwrap().unwrap();
    assert_eq!(entity, json!({"id": "A1", "tag": "T-01"}));
    assert_eq!(client.state(), ConnectionState::Connected);

    client
        .send(&DomainEvent::EntityDeleted("A1".into()))
        .unwrap();
    let frame = timeout(WAIT, received.recv()).await.unwrap().unwrap();
    let frame: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame, json!({"type": "ANIMAL_DELETED", "data": "A1"}));

    binding.teardown();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let (addr, state, _received) = spawn_server(true).await;
    let client = client_for(addr);
    let (callbacks, mut added) = added_channel();

    let _binding = client.bind(callbacks).unwrap();

    let entity = timeout(WAIT, added.recv()).await.unwrap().unwrap();
    assert_eq!(entity["id"], "A1");
    assert_eq!(state.upgrades.load(Ordering::SeqCst), 2);
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn unreachable_server_exhausts_retries() {
    // Bind and drop a listener to get a port with nothing behind it.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr);
    let mut states = client.watch_state();

    client.connect().unwrap();
    timeout(
        WAIT,
        states.wait_for(|s| *s == ConnectionState::Reconnecting(3)),
    )
    .await
    .unwrap()
    .unwrap();
    timeout(
        WAIT,
        states.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();
}
