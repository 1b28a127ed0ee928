use std::time::Duration;

/// Determines which URL scheme is used to reach the tunneling endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Plain `http://`
    None,

    /// `https://`, with TLS handled by the HTTP client
    Tls,
}

/// Configuration options that govern how an RTMPT socket should operate
#[derive(Clone, Debug)]
pub struct RtmptSocketConfig {
    pub security_level: SecurityLevel,

    /// How long a request may stay in flight before its payload is dropped.  The requests that
    /// open the connection and carry the first handshake packet are never timed out.
    pub request_timeout: Duration,

    /// How often the idle poller checks if the server should be polled for data
    pub poll_interval: Duration,

    /// The maximum amount of pieces a single `/send` request will carry
    pub max_pieces_per_batch: usize,

    /// Maximum size of each piece outbound chunks are split into
    pub outbound_chunk_size: usize,

    pub user_agent: String,
}

impl RtmptSocketConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> RtmptSocketConfig {
        RtmptSocketConfig {
            security_level: SecurityLevel::None,
            request_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
            max_pieces_per_batch: 30,
            outbound_chunk_size: 128,
            user_agent: "Shockwave Flash".to_string(),
        }
    }

    pub(crate) fn scheme(&self) -> &'static str {
        match self.security_level {
            SecurityLevel::None => "http",
            SecurityLevel::Tls => "https",
        }
    }
}

impl Default for RtmptSocketConfig {
    fn default() -> Self {
        RtmptSocketConfig::new()
    }
}
