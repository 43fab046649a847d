// Wire protocol for the game server: Engine.IO v4 / Socket.IO text framing plus
// the JSON payloads carried inside it. The HTTP visualization document lives
// here too because it embeds the same grid payload.

use crate::domain::{BoardMetadata, GameGrid, KeyEvent, KeyEventKind};
use crate::use_cases::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const SOCKET_IO_PATH: &str = "/socket.io/";

pub const EVENT_CREDENTIALS: &str = "credentials";
pub const EVENT_KEYUP: &str = "keyup";
pub const EVENT_KEYDOWN: &str = "keydown";
pub const EVENT_GAMEGRID: &str = "gamegrid:recv";
pub const EVENT_ANNOUNCEMENT: &str = "announcement";

// Client request for the default namespace.
pub const NAMESPACE_CONNECT: &str = "40";
pub const PONG: &str = "3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Empty,
    UnknownPacket(String),
    MalformedEvent(String),
    MalformedKeyEvent(String),
    Encode(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Empty => write!(f, "empty packet"),
            ProtocolError::UnknownPacket(kind) => write!(f, "unknown packet type {kind}"),
            ProtocolError::MalformedEvent(msg) => write!(f, "malformed event: {msg}"),
            ProtocolError::MalformedKeyEvent(msg) => write!(f, "malformed key event: {msg}"),
            ProtocolError::Encode(msg) => write!(f, "encode failed: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Engine.IO open packet body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// A decoded inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPacket {
    // Transport-level session open; the namespace still has to be joined.
    Open(OpenPayload),
    // Transport close requested by the server.
    Close,
    // Heartbeat; the body must be echoed back in the pong.
    Ping(String),
    Pong,
    Noop,
    // Namespace joined. This is the "connected" moment of the handshake.
    Connected,
    Disconnected,
    ConnectError(String),
    Event { name: String, payload: Value },
    // Acknowledgements and binary attachments; nothing in this client uses them.
    Ignored,
}

pub fn decode_packet(text: &str) -> Result<InboundPacket, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let body = chars.as_str();

    match kind {
        '0' => {
            let open = serde_json::from_str::<OpenPayload>(body).unwrap_or_default();
            Ok(InboundPacket::Open(open))
        }
        '1' => Ok(InboundPacket::Close),
        '2' => Ok(InboundPacket::Ping(body.to_string())),
        '3' => Ok(InboundPacket::Pong),
        '6' => Ok(InboundPacket::Noop),
        '4' => decode_message(body),
        other => Err(ProtocolError::UnknownPacket(other.to_string())),
    }
}

fn decode_message(body: &str) -> Result<InboundPacket, ProtocolError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(InboundPacket::Connected),
        '1' => Ok(InboundPacket::Disconnected),
        '2' => decode_event(rest),
        '4' => Ok(InboundPacket::ConnectError(rest.to_string())),
        '3' | '5' | '6' => Ok(InboundPacket::Ignored),
        other => Err(ProtocolError::UnknownPacket(format!("4{other}"))),
    }
}

fn decode_event(rest: &str) -> Result<InboundPacket, ProtocolError> {
    // Skip an optional ack id in front of the argument array.
    let start = rest
        .find('[')
        .ok_or_else(|| ProtocolError::MalformedEvent("missing argument array".to_string()))?;
    if !rest[..start].bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::MalformedEvent(
            "non-default namespace".to_string(),
        ));
    }

    let args: Vec<Value> = serde_json::from_str(&rest[start..])
        .map_err(|e| ProtocolError::MalformedEvent(e.to_string()))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => {
            return Err(ProtocolError::MalformedEvent(
                "event name must be a string".to_string(),
            ));
        }
    };

    Ok(InboundPacket::Event {
        name,
        payload: args.next().unwrap_or(Value::Null),
    })
}

/// Encodes `42["name",payload]` for the default namespace.
pub fn encode_event<T>(name: &str, payload: &T) -> Result<String, ProtocolError>
where
    T: Serialize + ?Sized,
{
    let args = serde_json::to_string(&(name, payload))
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(format!("42{args}"))
}

pub fn encode_pong(ping_body: &str) -> String {
    format!("{PONG}{ping_body}")
}

/// Handshake body. Field order is part of the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsPayload<'a> {
    pub user: &'a str,
    pub apikey: &'a str,
    pub assignment: String,
}

impl<'a> From<&'a Credentials> for CredentialsPayload<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            user: &credentials.username,
            apikey: &credentials.api_key,
            assignment: credentials.session_id.to_string(),
        }
    }
}

/// The full `credentials` event. The server expects the payload as a JSON string.
pub fn encode_credentials(credentials: &Credentials) -> Result<String, ProtocolError> {
    let body = serde_json::to_string(&CredentialsPayload::from(credentials))
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    encode_event(EVENT_CREDENTIALS, &body)
}

#[derive(Debug, Clone, Deserialize)]
struct KeyEventDto {
    #[serde(rename = "type")]
    kind: String,
    key: String,
}

/// Maps a key event name to its kind; `None` for any other event.
pub fn key_event_kind(name: &str) -> Option<KeyEventKind> {
    match name {
        EVENT_KEYUP => Some(KeyEventKind::KeyUp),
        EVENT_KEYDOWN => Some(KeyEventKind::KeyDown),
        _ => None,
    }
}

/// Decodes a key event payload sent either as an object or as a JSON string.
pub fn decode_key_event(kind: KeyEventKind, payload: Value) -> Result<KeyEvent, ProtocolError> {
    let dto = match payload {
        Value::String(text) => serde_json::from_str::<KeyEventDto>(&text),
        other => serde_json::from_value::<KeyEventDto>(other),
    }
    .map_err(|e| ProtocolError::MalformedKeyEvent(e.to_string()))?;

    // The payload's own `type` must agree with the event it arrived on.
    if key_event_kind(&dto.kind) != Some(kind) {
        return Err(ProtocolError::MalformedKeyEvent(format!(
            "type {:?} does not match {kind:?} event",
            dto.kind
        )));
    }

    Ok(KeyEvent { kind, key: dto.key })
}

/// Row-major palette indices for every cell of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDto {
    pub encoding: &'static str,
    pub dimensions: [usize; 2],
    pub bg: Vec<u8>,
    pub fg: Vec<u8>,
    pub symbols: Vec<u8>,
}

impl From<&GameGrid> for GridDto {
    fn from(board: &GameGrid) -> Self {
        let cells = board.cells();
        Self {
            encoding: "RAW",
            dimensions: [board.height(), board.width()],
            bg: cells.iter().map(|cell| cell.bg.index()).collect(),
            fg: cells.iter().map(|cell| cell.fg.index()).collect(),
            symbols: cells.iter().map(|cell| cell.symbol.index()).collect(),
        }
    }
}

/// The per-frame `gamegrid:recv` event. Like the handshake, the grid travels as a
/// JSON string payload.
pub fn encode_frame(board: &GameGrid) -> Result<String, ProtocolError> {
    let grid = serde_json::to_string(&GridDto::from(board))
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    encode_event(EVENT_GAMEGRID, &grid)
}

/// Body of the one-time assignment upload made with the first frame.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationDocument<'a> {
    pub visual: &'static str,
    pub title: &'a str,
    pub description: &'a str,
    pub gamegrid: GridDto,
}

impl<'a> VisualizationDocument<'a> {
    pub fn new(metadata: &'a BoardMetadata, board: &GameGrid) -> Self {
        Self {
            visual: "GameGrid",
            title: metadata.title(),
            description: metadata.description(),
            gamegrid: GridDto::from(board),
        }
    }
}
