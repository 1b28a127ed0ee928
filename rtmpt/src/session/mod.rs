//! The sans-IO core of the RTMPT transport.
//!
//! An `RtmptSession` reacts to calls from the protocol layer (connect, send, close), to the
//! outcomes of the HTTP requests it asked for, and to idle poll ticks.  In return it hands back
//! the next request that needs to be sent and any events that should be raised.  It does not
//! care how requests are performed, which makes every ordering and fault tolerance rule of the
//! tunnel testable without a network.

mod errors;
mod events;
mod handshake_state;
mod ready_state;
mod request;
mod result;


use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, trace, warn};
use crate::chunk::Chunk;
use crate::config::RtmptSocketConfig;
use crate::counters::ByteCounters;
use crate::handshake::{HandshakeGenerator, SimpleHandshake};
use crate::http_client::HttpResponse;
use crate::output_queue::OutputQueue;
use crate::wire::{is_tunnel_content_type, EMPTY_POLL_BODY};
use self::handshake_state::HandshakeStateMachine;
use self::request::PendingRequest;

pub use crate::wire::RequestKind;
pub use self::errors::RtmptSessionError;
pub use self::events::{RtmptEvent, StatusEvent};
pub use self::ready_state::ReadyState;
pub use self::request::{OutboundRequest, RequestId, RequestOutcome};
pub use self::result::RtmptSessionResult;

/// The client side state of a single tunneled RTMP connection.
///
/// Requests produced by the session are strictly sequential: a new request is only produced
/// once the outcome of the previous one has been handed back (the only exception being the
/// close request, which supersedes whatever is in flight).  Queued chunks are sent oldest
/// first, and a payload is sent at most once (a failed request is retried once, after that
/// its payload is dropped rather than requeued).
pub struct RtmptSession {
    config: RtmptSocketConfig,
    counters: Arc<ByteCounters>,
    handshake: Box<dyn HandshakeGenerator>,
    input: HandshakeStateMachine,
    output_queue: OutputQueue,
    outbound_chunk_size: usize,
    base_url: Option<String>,
    connection_id: Option<String>,
    is_connected: bool,
    is_closing: bool,
    is_requesting: bool,
    is_retrying_request: bool,

    /// Set once a terminal status event was raised for the current connection
    has_raised_status: bool,
    pending_request: Option<PendingRequest>,
    next_request_id: u64,
    sequence: u64,
    delay_hint: u8,
    last_response: Instant,
    pending_acknowledgement: Bytes,
    handshake_started_at: Option<SystemTime>,
    first_request_sent_at: Option<Instant>,
    buffered_events: Vec<RtmptEvent>,
}

impl RtmptSession {
    /// Creates a new session that performs the original (non-digest) RTMP handshake
    pub fn new(config: RtmptSocketConfig) -> RtmptSession {
        RtmptSession::with_handshake_generator(config, Box::new(SimpleHandshake::new()))
    }

    pub fn with_handshake_generator(config: RtmptSocketConfig, handshake: Box<dyn HandshakeGenerator>) -> RtmptSession {
        RtmptSession {
            output_queue: OutputQueue::new(config.max_pieces_per_batch),
            outbound_chunk_size: config.outbound_chunk_size.max(1),
            config,
            counters: Arc::new(ByteCounters::new()),
            handshake,
            input: HandshakeStateMachine::new(),
            base_url: None,
            connection_id: None,
            is_connected: false,
            is_closing: false,
            is_requesting: false,
            is_retrying_request: false,
            has_raised_status: false,
            pending_request: None,
            next_request_id: 0,
            sequence: 0,
            delay_hint: 1,
            last_response: Instant::now(),
            pending_acknowledgement: Bytes::new(),
            handshake_started_at: None,
            first_request_sent_at: None,
            buffered_events: Vec::new(),
        }
    }

    /// Starts opening a tunnel to the specified host.  The tunnel is opened by identifying,
    /// opening (which hands us the connection identity) and finalizing with an idle request,
    /// each request chained off the completion of the previous one.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<Vec<RtmptSessionResult>, RtmptSessionError> {
        if self.is_connected || self.is_closing || self.pending_request.is_some() {
            return Err(RtmptSessionError::AlreadyConnected);
        }

        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(RtmptSessionError::InvalidHost(host.to_string()));
        }

        // IPv6 literals must be bracketed to form a valid authority
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        self.base_url = Some(format!("{}://{}:{}", self.config.scheme(), host, port));
        self.connection_id = None;
        self.sequence = 0;
        self.delay_hint = 1;
        self.last_response = Instant::now();
        self.pending_acknowledgement = Bytes::new();
        self.is_retrying_request = false;
        self.has_raised_status = false;
        self.first_request_sent_at = None;
        self.input.clear_buffer();

        debug!(base_url = ?self.base_url, "Opening RTMPT tunnel");
        let request = self.issue_request(RequestKind::Identify, Bytes::from_static(EMPTY_POLL_BODY), 0);
        Ok(vec![RtmptSessionResult::IssueRequest(request)])
    }

    /// Queues a chunk to be sent to the server.
    ///
    /// Returns the amount of bytes accepted (zero if the tunnel is not open) and, if no
    /// request was in flight, the request carrying the oldest batch of queued data.
    pub fn send<C: Chunk + ?Sized>(&mut self, chunk: &C) -> (usize, Vec<RtmptSessionResult>) {
        if !self.is_connected || self.is_closing || self.connection_id.is_none() {
            return (0, Vec::new());
        }

        let accepted = self.output_queue.enqueue(chunk, self.outbound_chunk_size, &self.counters);
        trace!(bytes = accepted, batches = self.output_queue.len(), "Chunk queued");

        let mut results = Vec::new();
        if !self.is_requesting {
            if let Some(request) = self.next_request() {
                results.push(RtmptSessionResult::IssueRequest(request));
            }
        }

        (accepted, results)
    }

    /// Hands back the outcome of a request this session issued.  Outcomes for requests that
    /// are no longer in flight (e.g. superseded by a close) are ignored.
    pub fn handle_request_outcome(&mut self, request_id: RequestId, outcome: RequestOutcome) -> Vec<RtmptSessionResult> {
        let pending = match self.pending_request.take() {
            Some(pending) if pending.id == request_id => pending,
            other => {
                self.pending_request = other;
                debug!(request_id = request_id.0, "Ignoring outcome of a request that is no longer in flight");
                return Vec::new();
            }
        };

        self.counters.remove_queued(pending.queued_len);

        let response = match outcome {
            RequestOutcome::Response(response) => {
                trace!(path = %pending.path, status = response.status, bytes = response.body.len(), "Request completed");
                self.is_retrying_request = false;
                self.counters.add_bytes_out(pending.body.len());
                Some(response)
            }

            RequestOutcome::TransportError(description) => {
                if !self.is_retrying_request {
                    warn!(path = %pending.path, error = %description, "Request failed, retrying");
                    self.is_retrying_request = true;
                    self.counters.add_queued(pending.queued_len);
                    let request = self.reissue_request(pending);
                    return vec![RtmptSessionResult::IssueRequest(request)];
                }

                error!(path = %pending.path, error = %description, bytes = pending.body.len(), "Request failed again, dropping its payload");
                self.is_retrying_request = false;
                self.counters.add_bytes_dropped(pending.body.len());
                None
            }

            RequestOutcome::TimedOut => {
                warn!(path = %pending.path, bytes = pending.body.len(), "Dropping payload of timed out request");
                self.sequence += 1;
                self.is_retrying_request = false;
                self.counters.add_bytes_dropped(pending.body.len());
                None
            }
        };

        self.complete_request(pending, response)
    }

    /// Called periodically by the idle poller.  Polls the server for data if nothing is in
    /// flight and more time than the server's advised delay has passed since the last
    /// response.
    pub fn poll_tick(&mut self, now: Instant) -> Vec<RtmptSessionResult> {
        if !self.is_connected || self.is_closing || self.is_requesting || self.connection_id.is_none() {
            return Vec::new();
        }

        let delay = Duration::from_millis(u64::from(self.delay_hint) * 100);
        if now.saturating_duration_since(self.last_response) <= delay {
            return Vec::new();
        }

        self.sequence += 1;
        let kind = RequestKind::Idle { sequence: self.sequence };
        let request = self.issue_request(kind, Bytes::from_static(EMPTY_POLL_BODY), 0);
        vec![RtmptSessionResult::IssueRequest(request)]
    }

    /// Closes the tunnel.  When `is_disconnected` is set the connection is considered to have
    /// dropped, and a status event is raised (alongside the `Closed` ready state) once the
    /// close request completes.
    pub fn close(&mut self, is_disconnected: bool) -> Vec<RtmptSessionResult> {
        self.deinit_connection(is_disconnected)
    }

    /// Changes the size outbound chunks are split into.  Only affects chunks queued after
    /// the call.
    pub fn set_outbound_chunk_size(&mut self, size: usize) -> Result<(), RtmptSessionError> {
        if size == 0 {
            return Err(RtmptSessionError::InvalidChunkSize);
        }

        self.outbound_chunk_size = size;
        Ok(())
    }

    pub fn ready_state(&self) -> ReadyState {
        self.input.state()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// True while a request is in flight
    pub fn is_requesting(&self) -> bool {
        self.is_requesting
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The server's last advised poll delay, in tenths of a second
    pub fn delay_hint(&self) -> u8 {
        self.delay_hint
    }

    pub fn counters(&self) -> &Arc<ByteCounters> {
        &self.counters
    }

    pub fn outbound_chunk_size(&self) -> usize {
        self.outbound_chunk_size
    }

    /// Amount of batches waiting for a `/send` request
    pub fn queued_batch_count(&self) -> usize {
        self.output_queue.len()
    }

    /// When the handshake of the current connection was started
    pub fn handshake_started_at(&self) -> Option<SystemTime> {
        self.handshake_started_at
    }

    fn issue_request(&mut self, kind: RequestKind, body: Bytes, queued_len: usize) -> OutboundRequest {
        let path = kind.path(self.connection_id.as_deref().unwrap_or(""));
        let url = format!("{}{}", self.base_url.as_deref().unwrap_or(""), path);

        // Nothing before the first handshake packet has been answered is timed out, as the
        // initial negotiation with some servers can be slow
        let timeout = if self.sequence > 1 {
            Some(self.config.request_timeout)
        } else {
            None
        };

        self.next_request_id += 1;
        let pending = PendingRequest {
            id: RequestId(self.next_request_id),
            kind,
            path,
            url,
            body,
            timeout,
            queued_len,
        };

        if self.first_request_sent_at.is_none() {
            self.first_request_sent_at = Some(Instant::now());
        }

        trace!(request_id = pending.id.0, path = %pending.path, bytes = pending.body.len(), "Issuing request");
        let request = pending.to_outbound();
        self.is_requesting = true;
        self.pending_request = Some(pending);
        request
    }

    fn reissue_request(&mut self, mut pending: PendingRequest) -> OutboundRequest {
        self.next_request_id += 1;
        pending.id = RequestId(self.next_request_id);

        let request = pending.to_outbound();
        self.is_requesting = true;
        self.pending_request = Some(pending);
        request
    }

    fn issue_send(&mut self, payload: Bytes) -> OutboundRequest {
        self.sequence += 1;
        let kind = RequestKind::Send { sequence: self.sequence };
        let queued_len = payload.len();

        let acknowledgement = std::mem::take(&mut self.pending_acknowledgement);
        let body = if acknowledgement.is_empty() {
            payload
        } else {
            let mut buffer = BytesMut::with_capacity(acknowledgement.len() + payload.len());
            buffer.extend_from_slice(&acknowledgement);
            buffer.extend_from_slice(&payload);
            buffer.freeze()
        };

        self.issue_request(kind, body, queued_len)
    }

    /// Produces the request for the oldest queued batch (or a pending handshake
    /// acknowledgement), or marks the pipeline as idle if there is nothing to send
    fn next_request(&mut self) -> Option<OutboundRequest> {
        if !self.is_connected || self.is_closing {
            self.is_requesting = false;
            return None;
        }

        if let Some(payload) = self.output_queue.take_oldest_batch_concatenated() {
            return Some(self.issue_send(payload));
        }

        if !self.pending_acknowledgement.is_empty() {
            return Some(self.issue_send(Bytes::new()));
        }

        self.is_requesting = false;
        None
    }

    fn complete_request(&mut self, pending: PendingRequest, response: Option<HttpResponse>) -> Vec<RtmptSessionResult> {
        self.is_requesting = false;

        match pending.kind {
            RequestKind::Identify => {
                // Servers commonly answer ident2 with a 404, which is fine
                let request = self.issue_request(RequestKind::Open, Bytes::from_static(EMPTY_POLL_BODY), 0);
                vec![RtmptSessionResult::IssueRequest(request)]
            }

            RequestKind::Open => self.handle_open_response(response),
            RequestKind::Idle { sequence: 0 } => self.handle_open_finalized(),

            RequestKind::Send { sequence: 1 } => {
                if let Some(sent_at) = self.first_request_sent_at {
                    debug!(elapsed = ?sent_at.elapsed(), "First handshake round trip completed");
                }

                self.handle_tunnel_response(response)
            }

            RequestKind::Idle { .. } | RequestKind::Send { .. } => self.handle_tunnel_response(response),
            RequestKind::Close => self.finish_close(),
        }
    }

    fn handle_open_response(&mut self, response: Option<HttpResponse>) -> Vec<RtmptSessionResult> {
        let connection_id = response
            .filter(|response| response.status == 200)
            .map(|response| String::from_utf8_lossy(&response.body).trim().to_string())
            .filter(|id| !id.is_empty());

        match connection_id {
            None => {
                error!("Opening the tunnel did not provide a connection id");
                self.fail_connection()
            }

            Some(id) => {
                debug!(connection_id = %id, "Tunnel opened");
                self.connection_id = Some(id);
                let request = self.issue_request(RequestKind::Idle { sequence: 0 }, Bytes::from_static(EMPTY_POLL_BODY), 0);
                vec![RtmptSessionResult::IssueRequest(request)]
            }
        }
    }

    fn handle_open_finalized(&mut self) -> Vec<RtmptSessionResult> {
        self.is_connected = true;
        self.handshake_started_at = Some(SystemTime::now());

        let c0_and_c1 = match self.handshake.c0_and_c1() {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%error, "Failed to create the initial handshake packet");
                return self.fail_connection();
            }
        };

        self.counters.add_queued(c0_and_c1.len());

        let mut events = Vec::new();
        self.input.set_ready_state(ReadyState::VersionSent, &mut events);

        let mut results: Vec<RtmptSessionResult> = events.into_iter()
            .map(RtmptSessionResult::RaisedEvent)
            .collect();

        let request = self.issue_send(c0_and_c1);
        results.push(RtmptSessionResult::IssueRequest(request));
        results
    }

    /// Handles the response of a `/send` or `/idle` request, then moves the pipeline along
    fn handle_tunnel_response(&mut self, response: Option<HttpResponse>) -> Vec<RtmptSessionResult> {
        self.last_response = Instant::now();

        let mut results = Vec::new();
        if let Some(response) = response {
            if response.status != 200 {
                warn!(status = response.status, "Connection failed with status code");
                return self.fail_connection();
            }

            let has_tunnel_content = response.content_type()
                .map(is_tunnel_content_type)
                .unwrap_or(false);

            if !has_tunnel_content {
                debug!(content_type = ?response.content_type(), "Ignoring response with an unexpected content type");
            } else if !response.body.is_empty() {
                self.counters.add_bytes_in(response.body.len());
                self.delay_hint = response.body[0];

                match self.input.process(&response.body[1..], &mut *self.handshake) {
                    Ok(processed) => {
                        if let Some(acknowledgement) = processed.acknowledgement {
                            self.pending_acknowledgement = acknowledgement;
                        }

                        results.extend(processed.events.into_iter().map(RtmptSessionResult::RaisedEvent));
                    }

                    Err(error) => {
                        error!(%error, "Received an invalid handshake from the server");
                        results.extend(self.fail_connection());
                        return results;
                    }
                }
            }
        }

        if let Some(request) = self.next_request() {
            results.push(RtmptSessionResult::IssueRequest(request));
        }

        results
    }

    /// Tears the connection down after an unrecoverable failure
    fn fail_connection(&mut self) -> Vec<RtmptSessionResult> {
        let mut results = Vec::new();
        if !self.has_raised_status {
            self.has_raised_status = true;
            results.push(RtmptSessionResult::RaisedEvent(RtmptEvent::Status(StatusEvent::IoError)));
        }

        results.extend(self.deinit_connection(false));
        results
    }

    fn deinit_connection(&mut self, is_disconnected: bool) -> Vec<RtmptSessionResult> {
        if is_disconnected && !self.has_raised_status {
            self.has_raised_status = true;
            let status = if self.input.state() == ReadyState::HandshakeDone {
                StatusEvent::ConnectClosed
            } else {
                StatusEvent::ConnectFailed
            };

            self.buffered_events.push(RtmptEvent::Status(status));
        }

        if self.is_closing {
            return Vec::new();
        }

        self.abandon_pending_request();

        if self.connection_id.is_none() {
            return self.finish_close();
        }

        self.is_closing = true;
        let request = self.issue_request(RequestKind::Close, Bytes::new(), 0);
        vec![RtmptSessionResult::IssueRequest(request)]
    }

    fn abandon_pending_request(&mut self) {
        if let Some(pending) = self.pending_request.take() {
            debug!(path = %pending.path, bytes = pending.body.len(), "Abandoning in flight request");
            self.counters.remove_queued(pending.queued_len);
            self.counters.add_bytes_dropped(pending.body.len());
        }

        self.is_requesting = false;
        self.is_retrying_request = false;
    }

    fn finish_close(&mut self) -> Vec<RtmptSessionResult> {
        self.abandon_pending_request();
        self.is_connected = false;
        self.is_closing = false;
        self.connection_id = None;
        self.pending_acknowledgement = Bytes::new();
        self.input.clear_buffer();

        let discarded = self.output_queue.clear();
        if discarded > 0 {
            self.counters.remove_queued(discarded);
            self.counters.add_bytes_dropped(discarded);
        }

        let mut events = Vec::new();
        self.input.set_ready_state(ReadyState::Closed, &mut events);
        events.append(&mut self.buffered_events);

        events.into_iter()
            .map(RtmptSessionResult::RaisedEvent)
            .collect()
    }
}
