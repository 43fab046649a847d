// Fake game server for integration tests: a Socket.IO-over-WebSocket endpoint
// and the assignment upload route, bound to an ephemeral port per test.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{
        Path, RawQuery, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{any, post},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// How the fake answers the client's namespace request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Accept,
    Reject,
    // Never answers; the client has to time out.
    Silent,
}

#[derive(Debug)]
pub enum Command {
    Send(String),
    Close,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub assignment: String,
    pub query: String,
    pub body: serde_json::Value,
}

struct FakeState {
    ack: Ack,
    upload_status: StatusCode,
    connections: Mutex<u32>,
    received: Mutex<Vec<String>>,
    uploads: Mutex<Vec<Upload>>,
    commands: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
}

pub struct FakeServer {
    pub base_url: String,
    state: Arc<FakeState>,
    commands: mpsc::UnboundedSender<Command>,
}

impl FakeServer {
    pub async fn start(ack: Ack) -> Self {
        Self::start_with_upload_status(ack, StatusCode::OK).await
    }

    pub async fn start_with_upload_status(ack: Ack, upload_status: StatusCode) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let state = Arc::new(FakeState {
            ack,
            upload_status,
            connections: Mutex::new(0),
            received: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            commands: Mutex::new(Some(commands_rx)),
        });

        let app = Router::new()
            .route("/socket.io/", any(ws_handler))
            .route("/assignments/{id}", post(upload_handler))
            .with_state(state.clone());

        // Bind to an ephemeral port to avoid collisions with local services.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral test port");
        let addr = listener.local_addr().expect("get local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            commands: commands_tx,
        }
    }

    pub fn send(&self, packet: &str) {
        self.commands
            .send(Command::Send(packet.to_string()))
            .expect("fake connection command channel");
    }

    pub fn close_socket(&self) {
        self.commands
            .send(Command::Close)
            .expect("fake connection command channel");
    }

    pub fn connections(&self) -> u32 {
        *self.state.connections.lock().expect("connections mutex")
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().expect("received mutex").clone()
    }

    /// Payloads (second array element) of every received event with this name.
    pub fn events(&self, name: &str) -> Vec<serde_json::Value> {
        self.received()
            .iter()
            .filter_map(|packet| packet.strip_prefix("42"))
            .filter_map(|args| serde_json::from_str::<Vec<serde_json::Value>>(args).ok())
            .filter(|args| args.len() >= 2 && args[0].as_str() == Some(name))
            .map(|mut args| args.swap_remove(1))
            .collect()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.uploads.lock().expect("uploads mutex").clone()
    }

    /// Polls until `check` holds or two seconds pass.
    pub async fn wait_until(&self, check: impl Fn(&FakeServer) -> bool) -> bool {
        for _ in 0..200 {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

/// Polls a condition outside of the fake server, two second budget.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);
    format!("http://{addr}")
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FakeState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn upload_handler(
    State(state): State<Arc<FakeState>>,
    Path(assignment): Path<String>,
    RawQuery(query): RawQuery,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    state.uploads.lock().expect("uploads mutex").push(Upload {
        assignment,
        query: query.unwrap_or_default(),
        body,
    });
    state.upload_status
}

impl FakeState {
    fn record(&self, packet: &str) {
        self.received
            .lock()
            .expect("received mutex")
            .push(packet.to_string());
    }
}

async fn serve_socket(mut socket: WebSocket, state: Arc<FakeState>) {
    *state.connections.lock().expect("connections mutex") += 1;

    let open = r#"0{"sid":"fake","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    if socket.send(Message::Text(open.into())).await.is_err() {
        return;
    }

    // Wait for the namespace request.
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                state.record(text.as_str());
                if text.as_str() == "40" {
                    break;
                }
            }
            Some(Ok(_)) => {}
            _ => return,
        }
    }

    match state.ack {
        Ack::Accept => {
            let ack = r#"40{"sid":"namespace"}"#;
            if socket.send(Message::Text(ack.into())).await.is_err() {
                return;
            }
        }
        Ack::Reject => {
            let _ = socket
                .send(Message::Text(r#"44{"message":"unauthorized"}"#.into()))
                .await;
            return;
        }
        Ack::Silent => {}
    }

    let mut commands = state.commands.lock().expect("commands mutex").take();
    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => state.record(text.as_str()),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            command = async {
                match commands.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => match command {
                Some(Command::Send(packet)) => {
                    if socket.send(Message::Text(packet.into())).await.is_err() {
                        break;
                    }
                }
                Some(Command::Close) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                None => commands = None,
            },
        }
    }
}
