// Socket channel to the game server: connect, wait for the namespace handshake,
// forward key events to listeners and push frames out.

use crate::interface_adapters::listeners::{KeyListener, KeyListenerRegistry, ListenerId};
use crate::interface_adapters::protocol::{
    self, EVENT_ANNOUNCEMENT, InboundPacket, NAMESPACE_CONNECT, ProtocolError, SOCKET_IO_PATH,
};
use crate::use_cases::Credentials;

use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

pub const OUTBOUND_CAPACITY: usize = 64;
// Upper bound for the close handshake before the transport task is aborted.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

const LOG_THROTTLE: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    // Base server URL (`http://host:port`); the Socket.IO path is appended.
    pub server_url: String,
    // Covers both the WebSocket upgrade and the namespace handshake.
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    InvalidUrl(String),
    Timeout(Duration),
    Transport(String),
    // The server answered the namespace request with a connect error.
    Rejected(String),
    ClosedBeforeOpen,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidUrl(msg) => write!(f, "invalid server url: {msg}"),
            ConnectionError::Timeout(after) => {
                write!(f, "connection not established within {after:?}")
            }
            ConnectionError::Transport(msg) => write!(f, "transport error: {msg}"),
            ConnectionError::Rejected(msg) => write!(f, "server rejected connection: {msg}"),
            ConnectionError::ClosedBeforeOpen => {
                write!(f, "connection closed before the handshake completed")
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    CredentialsAlreadySent,
    Closed,
    Encode(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::CredentialsAlreadySent => {
                write!(f, "credentials were already sent on this channel")
            }
            ChannelError::Closed => write!(f, "channel is closed"),
            ChannelError::Encode(msg) => write!(f, "message encode failed: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<ProtocolError> for ChannelError {
    fn from(err: ProtocolError) -> Self {
        ChannelError::Encode(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Closed(String),
}

/// Builds `ws://host:port/socket.io/?EIO=4&transport=websocket` from a base URL.
pub fn socket_url(server_url: &str) -> Result<Url, ConnectionError> {
    let mut url = Url::parse(server_url).map_err(|e| ConnectionError::InvalidUrl(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConnectionError::InvalidUrl(format!(
                "unsupported scheme {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ConnectionError::InvalidUrl(format!("cannot use scheme {scheme}")))?;
    url.set_path(SOCKET_IO_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

/// One connection to the game server. Methods take `&self`; the transport runs
/// on its own task and only talks to this handle through channels.
pub struct SocketChannel {
    outbound_tx: mpsc::Sender<String>,
    status_rx: watch::Receiver<ChannelStatus>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
    registry: Arc<KeyListenerRegistry>,
    credentials_sent: AtomicBool,
    last_queue_full_log: Mutex<Instant>,
}

impl SocketChannel {
    /// Opens the WebSocket and waits, bounded by `connect_timeout`, until the
    /// server acknowledges the namespace. Key events received from then on are
    /// dispatched to `registry`.
    pub async fn connect(
        settings: &ChannelSettings,
        registry: Arc<KeyListenerRegistry>,
    ) -> Result<Self, ConnectionError> {
        let url = socket_url(&settings.server_url)?;
        let deadline = tokio::time::Instant::now() + settings.connect_timeout;
        debug!(url = %url, "connecting to game server");

        let (ws, _response) = timeout_at(deadline, connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectionError::Timeout(settings.connect_timeout))?
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        let (ready_tx, ready_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(run_transport(
            ws,
            TransportCtx {
                outbound_rx,
                status_tx,
                ready_tx: Some(ready_tx),
                shutdown: shutdown.clone(),
                registry: registry.clone(),
                msgs_in: 0,
                bytes_in: 0,
                msgs_out: 0,
                bytes_out: 0,
                malformed: 0,
                last_malformed_log: throttle_start(),
            },
        ));

        // Dropping `channel` on any error below stops the transport task.
        let channel = Self {
            outbound_tx,
            status_rx,
            shutdown,
            task: Some(task),
            registry,
            credentials_sent: AtomicBool::new(false),
            last_queue_full_log: Mutex::new(throttle_start()),
        };

        match timeout_at(deadline, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(channel),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ConnectionError::ClosedBeforeOpen),
            Err(_) => Err(ConnectionError::Timeout(settings.connect_timeout)),
        }
    }

    /// Sends the handshake identity. Only the first call on a channel is accepted.
    pub async fn send_credentials(&self, credentials: &Credentials) -> Result<(), ChannelError> {
        let packet = protocol::encode_credentials(credentials)?;
        if self.credentials_sent.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::CredentialsAlreadySent);
        }

        self.outbound_tx
            .send(packet)
            .await
            .map_err(|_| ChannelError::Closed)?;
        info!(
            user = %credentials.username,
            assignment = credentials.session_id,
            "credentials sent"
        );
        Ok(())
    }

    /// Queues an already-encoded packet without waiting. A full queue drops the
    /// packet; delivery is at most once.
    pub fn send_frame(&self, packet: String) -> Result<(), ChannelError> {
        match self.outbound_tx.try_send(packet) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_packet)) => {
                let mut last = self
                    .last_queue_full_log
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if should_log(&mut last) {
                    warn!("outbound queue full; dropping frame");
                }
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_packet)) => Err(ChannelError::Closed),
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn KeyListener>) -> ListenerId {
        self.registry.register(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.registry.unregister(id)
    }

    pub fn listeners(&self) -> &Arc<KeyListenerRegistry> {
        &self.registry
    }

    pub fn status(&self) -> ChannelStatus {
        self.status_rx.borrow().clone()
    }

    /// Why the transport stopped, once it has.
    pub fn failure(&self) -> Option<String> {
        match &*self.status_rx.borrow() {
            ChannelStatus::Closed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Asks the transport to send a close frame and waits for it to finish.
    pub async fn close(&mut self) {
        self.shutdown.notify_one();
        let Some(mut task) = self.task.take() else {
            return;
        };
        if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
            warn!("transport did not stop in time; aborting");
            task.abort();
        }
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        // Stores a permit if the task is not waiting yet.
        self.shutdown.notify_one();
    }
}

struct TransportCtx {
    outbound_rx: mpsc::Receiver<String>,
    status_tx: watch::Sender<ChannelStatus>,
    // Taken by the first namespace acknowledgement or the first failure.
    ready_tx: Option<oneshot::Sender<Result<(), ConnectionError>>>,
    shutdown: Arc<Notify>,
    registry: Arc<KeyListenerRegistry>,
    msgs_in: u64,
    bytes_in: u64,
    msgs_out: u64,
    bytes_out: u64,
    malformed: u64,
    last_malformed_log: Instant,
}

impl TransportCtx {
    fn open(&mut self) {
        if let Some(ready) = self.ready_tx.take() {
            let _ = self.status_tx.send(ChannelStatus::Connected);
            let _ = ready.send(Ok(()));
            info!("connected to game server");
        }
    }

    fn fail_open(&mut self, err: ConnectionError) {
        if let Some(ready) = self.ready_tx.take() {
            let _ = ready.send(Err(err));
        }
    }

    fn malformed(&mut self, err: &ProtocolError, bytes: usize) {
        self.malformed += 1;
        if should_log(&mut self.last_malformed_log) {
            warn!(bytes, error = %err, total = self.malformed, "ignoring malformed message");
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect(String),
}

async fn run_transport(mut ws: WsStream, mut ctx: TransportCtx) {
    let shutdown = ctx.shutdown.clone();

    let reason = loop {
        let control = tokio::select! {
            _ = shutdown.notified() => {
                if let Err(e) = ws.close(None).await {
                    debug!(error = %e, "close handshake failed");
                }
                LoopControl::Disconnect("closed by client".to_string())
            }

            outbound = ctx.outbound_rx.recv() => match outbound {
                Some(packet) => send_text(&mut ws, &mut ctx, packet).await,
                None => LoopControl::Disconnect("channel handle dropped".to_string()),
            },

            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&mut ws, &mut ctx, text.as_str()).await
                }
                Some(Ok(Message::Binary(data))) => {
                    ctx.malformed(
                        &ProtocolError::UnknownPacket("binary".to_string()),
                        data.len(),
                    );
                    LoopControl::Continue
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|frame| format!("server closed the socket: {}", &*frame.reason))
                        .unwrap_or_else(|| "server closed the socket".to_string());
                    LoopControl::Disconnect(reason)
                }
                // Transport-level ping/pong is answered by the library.
                Some(Ok(_)) => LoopControl::Continue,
                Some(Err(e)) => LoopControl::Disconnect(format!("transport error: {e}")),
                None => LoopControl::Disconnect("socket closed".to_string()),
            },
        };

        if let LoopControl::Disconnect(reason) = control {
            break reason;
        }
    };

    // Senders observe `Closed` from here on.
    ctx.outbound_rx.close();
    ctx.fail_open(ConnectionError::ClosedBeforeOpen);
    info!(
        reason = %reason,
        msgs_in = ctx.msgs_in,
        bytes_in = ctx.bytes_in,
        msgs_out = ctx.msgs_out,
        bytes_out = ctx.bytes_out,
        malformed = ctx.malformed,
        "game server connection closed"
    );
    let _ = ctx.status_tx.send(ChannelStatus::Closed(reason));
}

async fn send_text(ws: &mut WsStream, ctx: &mut TransportCtx, packet: String) -> LoopControl {
    let bytes = packet.len();
    match ws.send(Message::text(packet)).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(e) => LoopControl::Disconnect(format!("send failed: {e}")),
    }
}

async fn handle_text(ws: &mut WsStream, ctx: &mut TransportCtx, text: &str) -> LoopControl {
    ctx.msgs_in += 1;
    ctx.bytes_in += text.len() as u64;

    let packet = match protocol::decode_packet(text) {
        Ok(packet) => packet,
        Err(e) => {
            ctx.malformed(&e, text.len());
            return LoopControl::Continue;
        }
    };

    match packet {
        InboundPacket::Open(open) => {
            debug!(sid = %open.sid, ping_interval = open.ping_interval, "engine session open");
            send_text(ws, ctx, NAMESPACE_CONNECT.to_string()).await
        }
        InboundPacket::Ping(body) => send_text(ws, ctx, protocol::encode_pong(&body)).await,
        InboundPacket::Connected => {
            ctx.open();
            LoopControl::Continue
        }
        InboundPacket::ConnectError(msg) => {
            ctx.fail_open(ConnectionError::Rejected(msg.clone()));
            LoopControl::Disconnect(format!("namespace rejected: {msg}"))
        }
        InboundPacket::Close | InboundPacket::Disconnected => {
            LoopControl::Disconnect("server ended the session".to_string())
        }
        InboundPacket::Event { name, payload } => {
            match protocol::key_event_kind(&name) {
                Some(kind) => match protocol::decode_key_event(kind, payload) {
                    Ok(event) => ctx.registry.dispatch(&event),
                    Err(e) => ctx.malformed(&e, text.len()),
                },
                None if name == EVENT_ANNOUNCEMENT => debug!(%payload, "server announcement"),
                None => trace!(event = %name, "ignoring event"),
            }
            LoopControl::Continue
        }
        InboundPacket::Pong | InboundPacket::Noop | InboundPacket::Ignored => LoopControl::Continue,
    }
}

fn throttle_start() -> Instant {
    let now = Instant::now();
    now.checked_sub(LOG_THROTTLE).unwrap_or(now)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_server_url_is_http_then_socket_url_uses_ws_and_socket_io_path() {
        let url = socket_url("http://127.0.0.1:3000").expect("expected valid url");

        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn when_server_url_has_path_and_query_then_they_are_replaced() {
        let url = socket_url("https://games.example.com/old?x=1").expect("expected valid url");

        assert_eq!(
            url.as_str(),
            "wss://games.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn when_server_url_is_not_http_then_it_is_rejected() {
        assert!(matches!(
            socket_url("ftp://example.com"),
            Err(ConnectionError::InvalidUrl(_))
        ));
        assert!(matches!(
            socket_url("not a url"),
            Err(ConnectionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn when_log_was_just_emitted_then_next_one_is_throttled() {
        let mut last = throttle_start();

        assert!(should_log(&mut last));
        assert!(!should_log(&mut last));
    }
}
