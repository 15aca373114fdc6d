use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use tracing::debug;

use super::ByteSource;
use crate::config::FetchOptions;
use crate::error::{Error, Result};

/// Streaming HTTP body for a remote archive
///
/// Dropping the source releases the underlying connection, so abandoning a
/// stream early is just a matter of letting it go out of scope.
pub struct NetworkByteSource {
    response: Response,
    status: u16,
    declared_len: Option<u64>,
}

impl NetworkByteSource {
    /// Start a GET for `url` and wait for the response headers
    ///
    /// Non-2xx responses fail with [`Error::Fetch`] carrying the status and
    /// reason phrase; transport failures carry no status.
    pub async fn open(client: &Client, url: &str, options: &FetchOptions) -> Result<Self> {
        debug!(url, "starting fetch");

        let mut request = client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(ref token) = options.bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| Error::Fetch {
            status: None,
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                status: Some(status.as_u16()),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        // Get the declared size from Content-Length
        let declared_len = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        debug!(url, status = status.as_u16(), ?declared_len, "response received");

        Ok(Self {
            response: resp,
            status: status.as_u16(),
            declared_len,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }
}

#[async_trait]
impl ByteSource for NetworkByteSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response.chunk().await.map_err(|e| Error::Fetch {
            status: None,
            reason: e.to_string(),
        })
    }

    fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }
}
