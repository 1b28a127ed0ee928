use super::{HttpClient, HttpResponse};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

#[derive(Debug, thiserror::Error)]
#[error("HTTP request failed: {0}")]
pub struct ReqwestHttpError(#[from] reqwest::Error);

/// A [`reqwest`] backed [`HttpClient`].  One instance (and therefore one connection pool) is
/// used for every request a socket makes.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<ReqwestHttpClient, ReqwestHttpError> {
        let inner = reqwest::Client::builder().build()?;
        Ok(ReqwestHttpClient { inner })
    }

    /// Wraps an already configured client (proxies, custom TLS roots, etc..)
    pub fn from_client(inner: reqwest::Client) -> ReqwestHttpClient {
        ReqwestHttpClient { inner }
    }
}

impl HttpClient for ReqwestHttpClient {
    type Error = ReqwestHttpError;

    fn post(&self, url: &str, headers: &[(&str, &str)], body: Bytes)
        -> BoxFuture<'static, Result<HttpResponse, Self::Error>>
    {
        let mut builder = self.inner.post(url);
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }

        let builder = builder.body(body);

        async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_lowercase(), value.to_string()))
                })
                .collect();

            let body = response.bytes().await?;

            Ok(HttpResponse { status, headers, body })
        }
        .boxed()
    }
}
