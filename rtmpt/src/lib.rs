//! This crate provides an HTTP tunneled transport (RTMPT) for RTMP byte streams.
//!
//! RTMPT is used when a direct socket to an RTMP server's native port is not available, such
//! as from behind firewalls or proxies that only allow HTTP traffic.  Every read and write is
//! turned into a strictly sequential series of HTTP POST exchanges against the server's
//! tunneling endpoint, while the layer above sees the same send/receive contract it would get
//! from a raw socket.
//!
//! The crate is split into two layers:
//!
//! * [`session::RtmptSession`] is a sans-IO state machine.  It decides which HTTP request has
//! to be made next and how each response affects the handshake and the byte counters, but it
//! never performs any IO itself.
//! * [`socket::RtmptSocket`] drives a session with a real (or mocked) [`http_client::HttpClient`]
//! on a tokio runtime, arms request timeouts and runs the idle poller.

pub mod chunk;
pub mod config;
pub mod counters;
pub mod handshake;
pub mod http_client;
pub mod output_queue;
pub mod session;
pub mod socket;
pub mod wire;

pub use crate::chunk::Chunk;
pub use crate::config::{RtmptSocketConfig, SecurityLevel};
pub use crate::counters::{ByteCounters, ByteCountersSnapshot};
pub use crate::session::{
    OutboundRequest, ReadyState, RequestId, RequestKind, RequestOutcome, RtmptEvent,
    RtmptSession, RtmptSessionError, RtmptSessionResult, StatusEvent,
};
pub use crate::socket::RtmptSocket;
