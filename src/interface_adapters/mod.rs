// Interface adapters: wire protocol, listener fan-out, the socket channel and
// the HTTP client for the assignment server.

pub mod clients;
pub mod listeners;
pub mod net;
pub mod protocol;

pub use listeners::{KeyListener, KeyListenerRegistry, ListenerId};
pub use net::{ChannelError, ChannelSettings, ChannelStatus, ConnectionError, SocketChannel};
pub use protocol::ProtocolError;
