//! Drives an `RtmptSession` with an `HttpClient` on a tokio runtime.
//!
//! Every request the session issues is performed on its own task, and its outcome is fed back
//! into the session under a lock.  Since the session only ever has one request in flight,
//! tasks never race each other for the pipeline; the only concurrency left is between a
//! completing request, the idle poller and calls from the layer above.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use crate::chunk::Chunk;
use crate::config::RtmptSocketConfig;
use crate::counters::{ByteCounters, ByteCountersSnapshot};
use crate::http_client::{HttpClient, ReqwestHttpClient, ReqwestHttpError};
use crate::session::{
    OutboundRequest, ReadyState, RequestId, RequestOutcome, RtmptEvent, RtmptSession,
    RtmptSessionError, RtmptSessionResult,
};
use crate::wire::CONTENT_TYPE;


/// An RTMPT connection that behaves like a socket to the protocol layer above it.
///
/// Events (ready state changes, received data and status notifications) are delivered over
/// the receiver returned when the socket is created.  Methods that may issue requests
/// (`connect`, `send` and `close`) must be called from within a tokio runtime.
pub struct RtmptSocket<H: HttpClient> {
    inner: Arc<Inner<H>>,
}

struct Inner<H> {
    http: H,
    user_agent: String,
    poll_interval: Duration,
    counters: Arc<ByteCounters>,
    event_sender: UnboundedSender<RtmptEvent>,
    state: Mutex<State>,
}

struct State {
    session: RtmptSession,
    request_task: Option<(RequestId, JoinHandle<()>)>,
    poller: Option<JoinHandle<()>>,
}

impl<H: HttpClient> RtmptSocket<H> {
    pub fn new(config: RtmptSocketConfig, http: H) -> (RtmptSocket<H>, UnboundedReceiver<RtmptEvent>) {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let user_agent = config.user_agent.clone();
        let poll_interval = config.poll_interval;
        let session = RtmptSession::new(config);

        let inner = Inner {
            http,
            user_agent,
            poll_interval,
            counters: session.counters().clone(),
            event_sender,
            state: Mutex::new(State {
                session,
                request_task: None,
                poller: None,
            }),
        };

        let socket = RtmptSocket { inner: Arc::new(inner) };
        (socket, event_receiver)
    }

    /// Starts opening a tunnel to the host.  Progress is reported through
    /// `RtmptEvent::ReadyStateChanged` events.
    pub fn connect(&self, host: &str, port: u16) -> Result<(), RtmptSessionError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let results = state.session.connect(host, port)?;

        if state.poller.is_none() {
            state.poller = Some(self.inner.start_poller());
        }

        self.inner.handle_results(state, results);
        Ok(())
    }

    /// Queues a chunk for sending, returning how many bytes were accepted.  Nothing is
    /// accepted unless the tunnel is open.
    pub fn send<C: Chunk + ?Sized>(&self, chunk: &C) -> usize {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let (accepted, results) = state.session.send(chunk);
        self.inner.handle_results(state, results);
        accepted
    }

    /// Closes the tunnel.  Pass `true` when the connection should be reported as dropped,
    /// which raises `ConnectClosed` or `ConnectFailed` once closed.
    pub fn close(&self, is_disconnected: bool) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let results = state.session.close(is_disconnected);
        self.inner.handle_results(state, results);
    }

    pub fn set_outbound_chunk_size(&self, size: usize) -> Result<(), RtmptSessionError> {
        self.inner.state.lock().session.set_outbound_chunk_size(size)
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().session.ready_state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().session.is_connected()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.state.lock().session.connection_id().map(|id| id.to_string())
    }

    pub fn handshake_started_at(&self) -> Option<SystemTime> {
        self.inner.state.lock().session.handshake_started_at()
    }

    /// Live byte counters.  These can be read without going through the socket's lock.
    pub fn counters(&self) -> Arc<ByteCounters> {
        self.inner.counters.clone()
    }

    pub fn counters_snapshot(&self) -> ByteCountersSnapshot {
        self.inner.counters.snapshot()
    }
}

impl RtmptSocket<ReqwestHttpClient> {
    /// Creates a socket that performs its requests with `reqwest`
    pub fn with_reqwest(config: RtmptSocketConfig)
        -> Result<(RtmptSocket<ReqwestHttpClient>, UnboundedReceiver<RtmptEvent>), ReqwestHttpError>
    {
        let http = ReqwestHttpClient::new()?;
        Ok(RtmptSocket::new(config, http))
    }
}

impl<H: HttpClient> Inner<H> {
    fn handle_results(self: &Arc<Self>, state: &mut State, results: Vec<RtmptSessionResult>) {
        for result in results {
            match result {
                RtmptSessionResult::IssueRequest(request) => {
                    let id = request.id;
                    let task = self.spawn_request(request);

                    // A newer request always supersedes the one we knew about
                    if let Some((_, previous)) = state.request_task.replace((id, task)) {
                        previous.abort();
                    }
                }

                RtmptSessionResult::RaisedEvent(event) => {
                    if event == RtmptEvent::ReadyStateChanged(ReadyState::Closed) {
                        stop_tasks(state);
                    }

                    trace!(?event, "Raising event");
                    if self.event_sender.send(event).is_err() {
                        debug!("Event receiver dropped, event discarded");
                    }
                }
            }
        }
    }

    fn spawn_request(self: &Arc<Self>, request: OutboundRequest) -> JoinHandle<()> {
        let inner = Arc::downgrade(self);
        let http = self.http.clone();
        let user_agent = self.user_agent.clone();

        tokio::spawn(async move {
            let outcome = execute(&http, &user_agent, &request).await;
            if let Some(inner) = inner.upgrade() {
                inner.complete_request(request.id, outcome);
            }
        })
    }

    fn complete_request(self: &Arc<Self>, id: RequestId, outcome: RequestOutcome) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let results = state.session.handle_request_outcome(id, outcome);
        self.handle_results(state, results);
    }

    fn start_poller(self: &Arc<Self>) -> JoinHandle<()> {
        let inner = Arc::downgrade(self);
        let period = self.poll_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let inner = match inner.upgrade() {
                    Some(inner) => inner,
                    None => break,
                };

                let mut guard = inner.state.lock();
                let state = &mut *guard;
                let results = state.session.poll_tick(Instant::now());
                inner.handle_results(state, results);
            }
        })
    }
}

impl<H> Drop for Inner<H> {
    fn drop(&mut self) {
        stop_tasks(self.state.get_mut());
    }
}

fn stop_tasks(state: &mut State) {
    if let Some((_, task)) = state.request_task.take() {
        task.abort();
    }

    if let Some(poller) = state.poller.take() {
        poller.abort();
    }
}

/// Performs a single request, arming its timeout if it has one
async fn execute<H: HttpClient>(http: &H, user_agent: &str, request: &OutboundRequest) -> RequestOutcome {
    let headers = [("Content-Type", CONTENT_TYPE), ("User-Agent", user_agent)];
    let response = http.post(&request.url, &headers, request.body.clone());

    let result = match request.timeout {
        None => response.await,
        Some(timeout) => match tokio::time::timeout(timeout, response).await {
            Ok(result) => result,
            Err(_) => return RequestOutcome::TimedOut,
        },
    };

    match result {
        Ok(response) => RequestOutcome::Response(response),
        Err(error) => RequestOutcome::TransportError(error.to_string()),
    }
}
