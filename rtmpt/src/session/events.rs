use bytes::Bytes;
use super::ReadyState;

/// Events raised by the transport so the protocol layer above it can react
#[derive(Clone, Debug, PartialEq)]
pub enum RtmptEvent {
    /// Raised on every ready state transition
    ReadyStateChanged(ReadyState),

    /// Protocol payload received from the server after the handshake completed
    DataReceived(Bytes),

    /// A connection level status notification
    Status(StatusEvent),
}

/// Connection status notifications.  A failed connection raises exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    /// The connection was disconnected after the handshake had completed
    ConnectClosed,

    /// The connection was disconnected before the handshake completed
    ConnectFailed,

    /// The tunneling endpoint rejected a request and the connection was torn down
    IoError,
}

impl StatusEvent {
    /// The `NetConnection` status code an RTMP application expects for this event, if any
    pub fn code(&self) -> Option<&'static str> {
        match *self {
            StatusEvent::ConnectClosed => Some("NetConnection.Connect.Closed"),
            StatusEvent::ConnectFailed => Some("NetConnection.Connect.Failed"),
            StatusEvent::IoError => None,
        }
    }

    pub fn level(&self) -> &'static str {
        match *self {
            StatusEvent::ConnectClosed => "status",
            StatusEvent::ConnectFailed | StatusEvent::IoError => "error",
        }
    }
}
