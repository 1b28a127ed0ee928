use bytes::Bytes;
use std::time::Duration;
use crate::http_client::HttpResponse;
use crate::wire::RequestKind;

/// Identifies a single issued request.  Retries of the same payload get a new id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// An HTTP POST the transport wants performed
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub path: String,
    pub url: String,
    pub body: Bytes,

    /// If set, the request must be cancelled and reported as `RequestOutcome::TimedOut` once
    /// this much time passed without a response
    pub timeout: Option<Duration>,
}

/// How an issued request ended
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
    /// The server responded, regardless of status code
    Response(HttpResponse),

    /// The request could not be completed by the HTTP client
    TransportError(String),

    /// No response arrived within the request's timeout
    TimedOut,
}

pub(super) struct PendingRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub path: String,
    pub url: String,
    pub body: Bytes,
    pub timeout: Option<Duration>,

    /// Bytes of the body that were counted as queued output
    pub queued_len: usize,
}

impl PendingRequest {
    pub fn to_outbound(&self) -> OutboundRequest {
        OutboundRequest {
            id: self.id,
            kind: self.kind,
            path: self.path.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            timeout: self.timeout,
        }
    }
}
