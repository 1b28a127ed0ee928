//! Request paths and constants of the RTMPT tunneling protocol.

use std::fmt;

/// Media type of every request and of every response the transport accepts
pub const CONTENT_TYPE: &str = "application/x-fcs";

/// The body sent with identify, open and poll requests
pub const EMPTY_POLL_BODY: &[u8] = &[0];

/// The kind of exchange a request performs against the tunneling endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// `/fcs/ident2`
    Identify,

    /// `/open/1`, answered with the connection identity
    Open,

    /// `/idle/{id}/{sequence}`.  Sequence 0 finalizes the open sequence, after that it is a
    /// poll for data the server wants to push.
    Idle { sequence: u64 },

    /// `/send/{id}/{sequence}`
    Send { sequence: u64 },

    /// `/close/{id}`
    Close,
}

impl RequestKind {
    /// Builds the request path, using `connection_id` for kinds that require one
    pub fn path(&self, connection_id: &str) -> String {
        RequestPath { kind: *self, connection_id }.to_string()
    }
}

struct RequestPath<'a> {
    kind: RequestKind,
    connection_id: &'a str,
}

impl<'a> fmt::Display for RequestPath<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            RequestKind::Identify => write!(f, "/fcs/ident2"),
            RequestKind::Open => write!(f, "/open/1"),
            RequestKind::Idle { sequence } => write!(f, "/idle/{}/{}", self.connection_id, sequence),
            RequestKind::Send { sequence } => write!(f, "/send/{}/{}", self.connection_id, sequence),
            RequestKind::Close => write!(f, "/close/{}", self.connection_id),
        }
    }
}

/// Checks a response's `Content-Type` value against the tunneling media type
pub fn is_tunnel_content_type(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(CONTENT_TYPE)
}
