//! The HTTP client seam of the transport.
//!
//! Connection pooling, TLS and the actual wire IO belong to the HTTP client.  The transport
//! only needs to POST a body and read back the status, headers and body of the response.

mod reqwest_client;

pub use self::reqwest_client::{ReqwestHttpClient, ReqwestHttpError};

use bytes::Bytes;
use futures::future::BoxFuture;

/// A minimal async HTTP client for POST requests
pub trait HttpClient: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + 'static;

    /// Sends a POST request.  The returned future must be `'static` so it can be spawned, and
    /// dropping it must cancel the request.
    fn post(&self, url: &str, headers: &[(&str, &str)], body: Bytes)
        -> BoxFuture<'static, Result<HttpResponse, Self::Error>>;
}

/// A minimal HTTP response
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,

    /// Response headers, with lowercase names
    pub headers: Vec<(String, String)>,

    pub body: Bytes,
}

impl HttpResponse {
    /// Looks up a response header by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/x-fcs".to_string())],
            body: Bytes::new(),
        };

        assert_eq!(response.header("Content-Type"), Some("application/x-fcs"));
        assert_eq!(response.content_type(), Some("application/x-fcs"));
        assert_eq!(response.header("server"), None);
    }
}
