//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Timeouts are the client's responsibility: configure them on the
//! [`reqwest::Client`] passed to [`ReqwestHttpSend::new`]. A timed out request
//! surfaces as an `Unexpected` error, which sessions propagate unchanged.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqstore_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};
use std::time::Duration;

/// Timeout used by [`ReqwestHttpSend::with_timeout`] when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new ReqwestHttpSend whose client enforces `timeout` on every request.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| Error::config_invalid("failed to build reqwest client").with_source(e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let method = req.method().clone();
        let uri = req.uri().clone();

        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| {
                Error::unexpected(format!("failed to send {method} request to {uri}"))
                    .with_source(e)
            })?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        debug!("{method} {uri} returned {} ({} bytes)", parts.status, bs.len());
        Ok(http::Response::from_parts(parts, bs))
    }
}
