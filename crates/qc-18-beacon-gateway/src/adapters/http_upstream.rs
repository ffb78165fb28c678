//! reqwest-backed client for the internal RPC gateway.

use crate::domain::config::UpstreamConfig;
use crate::domain::error::GatewayError;
use crate::ports::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::HeaderMap;
use tracing::debug;

/// Forwards requests over HTTP. Only connection establishment is bounded;
/// requests themselves run until the upstream answers.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(Self::with_client(client, &config.url))
    }

    /// Share a client (and its connection pool) with other adapters.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

/// Client headers minus those that describe the inbound connection or a
/// body that may have been rewritten.
pub(crate) fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in [HOST, CONTENT_LENGTH, CONNECTION, TRANSFER_ENCODING] {
        out.remove(name);
    }
    out
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, request.path_and_query);
        debug!(method = %request.method, url = %url, "Forwarding to upstream");

        let response = self
            .client
            .request(request.method, &url)
            .headers(outbound_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
