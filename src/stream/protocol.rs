//! Device -> recorder message mapping
//!
//! The ESP32 pushes raw PCM as binary WebSocket messages. Message boundaries
//! carry no meaning, the payload is one continuous byte stream.

use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonBinaryKind {
    Text,
    /// Raw frame surfaced by tungstenite, never produced while reading
    Raw,
    /// Frame tungstenite refused to decode (bad UTF-8, oversized, protocol violation)
    Malformed,
}

/// One step of a connection's lifecycle, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent<'a> {
    Opened,
    Binary(&'a [u8]),
    NonBinary(NonBinaryKind),
    Closed,
}

/// Map a socket message to a session event
/// **Returns**: None for control frames (ping/pong) the session never sees
pub fn classify(msg: &Message) -> Option<StreamEvent<'_>> {
    match msg {
        Message::Binary(data) => Some(StreamEvent::Binary(&data[..])),
        Message::Text(_) => Some(StreamEvent::NonBinary(NonBinaryKind::Text)),
        Message::Frame(_) => Some(StreamEvent::NonBinary(NonBinaryKind::Raw)),
        Message::Close(_) => Some(StreamEvent::Closed),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

/// Whether a read error was caused by the frame itself rather than the socket
///
/// A malformed frame is counted like any other non-binary message. Socket
/// level failures (reset, IO, closed) mean the device is gone.
pub fn is_malformed_frame(err: &WsError) -> bool {
    match err {
        WsError::Utf8(_) | WsError::Capacity(_) | WsError::AttackAttempt => true,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => false,
        WsError::Protocol(_) => true,
        _ => false,
    }
}
