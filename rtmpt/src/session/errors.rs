use thiserror::Error;

/// Errors returned when a session operation is called with invalid input or in an invalid state
#[derive(Debug, Error)]
pub enum RtmptSessionError {
    /// Encountered if a connection is requested while the session is already connected, or
    /// while a previous connection attempt is still opening the tunnel
    #[error("A connection request was attempted while this session is already connected or connecting")]
    AlreadyConnected,

    #[error("'{0}' is not a valid host for a tunneling endpoint")]
    InvalidHost(String),

    #[error("The outbound chunk size must be greater than zero")]
    InvalidChunkSize,
}
