use std::io;
use thiserror::Error;

/// Errors that can occur while building handshake packets
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The first byte of the peer's handshake did not carry the supported RTMP version
    #[error("First byte of the handshake did not start with a 3 (received {0})")]
    BadVersionId(u8),

    /// Not enough of the peer's handshake was provided to build a response
    #[error("Expected at least {expected} handshake bytes but only {actual} were available")]
    NotEnoughData { expected: usize, actual: usize },

    #[error("An IO error occurred while writing handshake bytes: {0}")]
    Io(#[from] io::Error),
}
