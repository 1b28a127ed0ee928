use super::{OutboundRequest, RtmptEvent};

/// A single result that is returned when the session performs an action or reacts to the
/// outcome of a request
#[derive(Debug, PartialEq)]
pub enum RtmptSessionResult {
    /// An HTTP request that must be sent to the tunneling endpoint.  Its outcome must be
    /// reported back through `RtmptSession::handle_request_outcome()`.  The session never
    /// produces a new request while another one is still in flight, unless the connection is
    /// being closed (in which case the previous request should be cancelled).
    IssueRequest(OutboundRequest),

    /// An event the session is raising for the protocol layer above the transport
    RaisedEvent(RtmptEvent),
}
