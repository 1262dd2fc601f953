//! Request forwarding to the remote instance
//!
//! Builds the outbound request from the inbound one with hop-by-hop headers
//! stripped, and rebuilds the inbound response without the transfer-level
//! headers the local server will set itself.

use std::sync::Arc;

use axum::body::Body;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::Response;
use axum::http::StatusCode;
use tracing::debug;

use crate::config::AppConfig;
use crate::remote::map_transport_error;
use crate::LoraBridgeError;
use crate::Result;

/// Request headers not forwarded to the remote.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "upgrade",
];

/// Response headers dropped when relaying the remote's reply.
const STRIPPED_RESPONSE_HEADERS: &[&str] =
    &["transfer-encoding", "content-encoding", "content-length"];

pub struct ProxyForwarder {
    config: Arc<AppConfig>,
    http: reqwest::Client,
}

impl ProxyForwarder {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, http })
    }

    /// Forward a request to `remote_url + path_and_query` and relay the
    /// response.
    pub async fn forward(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response<Body>> {
        if !self.config.is_configured() {
            return Err(LoraBridgeError::RemoteNotConfigured);
        }
        let url = format!("{}{}", self.config.remote.url, path_and_query);
        debug!("Proxying {method} {path_and_query}");

        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| LoraBridgeError::Custom(format!("Invalid method: {method}")))?;
        let mut request = self.http.request(method, &url);
        for (name, value) in headers {
            if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
                request = request.header(name.as_str(), value.as_bytes());
            }
        }
        if !body.is_empty() {
            request = request.body(body.to_vec());
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.remote.timeout_secs))?;

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut builder = Response::builder().status(status);
        for (name, value) in response.headers() {
            if !STRIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
                builder = builder.header(name.as_str(), value.as_bytes());
            }
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(e, self.config.remote.timeout_secs))?;

        builder
            .body(Body::from(bytes))
            .map_err(|e| LoraBridgeError::Custom(e.to_string()))
    }
}
