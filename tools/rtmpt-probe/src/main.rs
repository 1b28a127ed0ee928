use rml_rtmpt::{ReadyState, RtmptEvent, RtmptSocket, RtmptSocketConfig, SecurityLevel};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 80;
const WAIT_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args: Vec<String> = env::args().collect();
    args.drain(0..1); // remove the executable

    let use_tls = args.iter().any(|arg| arg == "--tls");
    args.retain(|arg| arg != "--tls");

    if args.is_empty() {
        println!("No host provided.  Usage:");
        println!("rtmpt-probe <host> [port] [--tls]");
        return;
    }

    let port = match args.get(1) {
        None => if use_tls { 443 } else { DEFAULT_PORT },
        Some(port) => match port.parse() {
            Ok(port) => port,
            Err(_) => {
                println!("'{}' is not a valid port", port);
                return;
            }
        },
    };

    let mut config = RtmptSocketConfig::new();
    if use_tls {
        config.security_level = SecurityLevel::Tls;
    }

    let (socket, mut events) = match RtmptSocket::with_reqwest(config) {
        Ok(created) => created,
        Err(error) => {
            error!(%error, "Failed to create the HTTP client");
            return;
        }
    };

    if let Err(error) = socket.connect(&args[0], port) {
        error!(%error, "Connection request rejected");
        return;
    }

    info!(host = %args[0], port, tls = use_tls, "Opening tunnel");
    if !wait_for_state(&mut events, ReadyState::HandshakeDone).await {
        warn!("Handshake did not complete");
        if socket.ready_state() != ReadyState::Closed {
            socket.close(true);
            wait_for_state(&mut events, ReadyState::Closed).await;
        }

        return;
    }

    let counters = socket.counters_snapshot();
    info!(
        connection_id = ?socket.connection_id(),
        bytes_in = counters.total_bytes_in,
        bytes_out = counters.total_bytes_out,
        bytes_dropped = counters.total_bytes_dropped,
        "Handshake completed"
    );

    socket.close(false);
    wait_for_state(&mut events, ReadyState::Closed).await;
}

/// Logs events until the expected ready state is reached.  Returns false if the tunnel
/// closed first or nothing happened in time.
async fn wait_for_state(events: &mut UnboundedReceiver<RtmptEvent>, expected: ReadyState) -> bool {
    loop {
        let event = match tokio::time::timeout(WAIT_TIMEOUT, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => return false,
            Err(_) => {
                warn!(?expected, "Timed out waiting for ready state");
                return false;
            }
        };

        match event {
            RtmptEvent::ReadyStateChanged(state) => {
                info!(?state, "Ready state changed");
                if state == expected {
                    return true;
                }

                if state == ReadyState::Closed {
                    return false;
                }
            }

            RtmptEvent::DataReceived(data) => info!(bytes = data.len(), "Data received"),

            RtmptEvent::Status(status) => {
                warn!(code = ?status.code(), level = status.level(), "Connection status");
            }
        }
    }
}
