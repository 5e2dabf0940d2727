//! Serialized upstream client.
//!
//! Owns the access gate in front of the engine socket and exposes one
//! operation per forwarded method. All three share a single exchange
//! routine:
//!
//! 1. build the engine request (outside the gate)
//! 2. acquire the gate, then dispatch send-and-record as its own task
//! 3. release the gate when that task finishes
//! 4. normalize the response (outside the gate)
//!
//! The gate is a plain mutual-exclusion lock, so at most one engine call
//! is ever in flight. A dispatched call owns the gate and runs to
//! completion or failure even if the caller that started it goes away.
//! There are no retries and no timeouts beyond the transport's own: a hung
//! engine call holds the gate until it resolves.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HOST};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::instrument::WithSubscriber;
use tracing::{Instrument, info, warn};

use crate::endpoint::UpstreamAddress;
use crate::error::ProxyError;
use crate::transport::{EngineRequest, EngineTransport, UnixSocketTransport};

/// The closed set of methods the proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineMethod {
    Get,
    Post,
    Delete,
}

impl EngineMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    fn to_http(self) -> hyper::Method {
        match self {
            Self::Get => hyper::Method::GET,
            Self::Post => hyper::Method::POST,
            Self::Delete => hyper::Method::DELETE,
        }
    }
}

impl fmt::Display for EngineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!(
                "unsupported method {other:?}, expected GET, POST or DELETE"
            )),
        }
    }
}

/// Raw engine response as read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// A successfully forwarded engine response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The decoded JSON body.
    Content(Value),
    /// The engine answered with an empty body.
    NoContent,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Normalize into a payload or a typed failure.
    ///
    /// 4xx/5xx fail with [`ProxyError::Upstream`] whatever the body. An
    /// empty body is [`Payload::NoContent`] and is never parsed.
    pub fn into_payload(self) -> Result<Payload, ProxyError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            return Err(ProxyError::Upstream {
                status: self.status,
                body: self.body,
            });
        }
        if self.body.is_empty() {
            return Ok(Payload::NoContent);
        }
        serde_json::from_slice(&self.body)
            .map(Payload::Content)
            .map_err(|source| ProxyError::MalformedResponse {
                status: self.status,
                source,
            })
    }
}

/// Forwards requests to the engine, one at a time.
pub struct UpstreamClient {
    transport: Arc<dyn EngineTransport>,
    gate: Arc<Mutex<()>>,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            transport,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// A client speaking HTTP/1.1 over the engine's Unix socket.
    pub fn unix() -> Self {
        Self::new(Arc::new(UnixSocketTransport::new()))
    }

    pub async fn forward_get(&self, address: &UpstreamAddress) -> Result<Payload, ProxyError> {
        self.exchange(EngineMethod::Get, address, None).await
    }

    pub async fn forward_post(
        &self,
        address: &UpstreamAddress,
        body: Option<Bytes>,
    ) -> Result<Payload, ProxyError> {
        self.exchange(EngineMethod::Post, address, body).await
    }

    pub async fn forward_delete(&self, address: &UpstreamAddress) -> Result<Payload, ProxyError> {
        self.exchange(EngineMethod::Delete, address, None).await
    }

    /// Dispatch to the operation matching `method`.
    pub async fn forward(
        &self,
        method: EngineMethod,
        address: &UpstreamAddress,
        body: Option<Bytes>,
    ) -> Result<Payload, ProxyError> {
        match method {
            EngineMethod::Get => self.forward_get(address).await,
            EngineMethod::Post => self.forward_post(address, body).await,
            EngineMethod::Delete => self.forward_delete(address).await,
        }
    }

    async fn exchange(
        &self,
        method: EngineMethod,
        address: &UpstreamAddress,
        body: Option<Bytes>,
    ) -> Result<Payload, ProxyError> {
        let request = build_request(method, address, body)?;

        let held = Arc::clone(&self.gate).lock_owned().await;
        let transport = Arc::clone(&self.transport);
        let target = address.clone();

        // Dropping the caller only detaches this task; the gate stays held
        // until the engine has answered or the transport has failed.
        let dispatched = tokio::spawn(
            async move {
                let result = transport.send(target.socket_path(), request).await;
                drop(held);
                record(method, &target, &result);
                result
            }
            .in_current_span()
            .with_current_subscriber(),
        );

        let result = dispatched.await.map_err(|e| {
            ProxyError::Transport(format!("engine call for {address} did not finish: {e}"))
        })?;

        result?.into_payload()
    }
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient").finish_non_exhaustive()
    }
}

fn record(
    method: EngineMethod,
    address: &UpstreamAddress,
    result: &Result<UpstreamResponse, ProxyError>,
) {
    match result {
        Ok(resp) => info!(
            method = %method,
            address = %address,
            status = resp.status.as_u16(),
            "engine exchange complete"
        ),
        Err(e) => warn!(
            method = %method,
            address = %address,
            error = %e,
            "engine exchange failed"
        ),
    }
}

fn build_request(
    method: EngineMethod,
    address: &UpstreamAddress,
    body: Option<Bytes>,
) -> Result<EngineRequest, ProxyError> {
    let mut builder = hyper::Request::builder()
        .method(method.to_http())
        .uri(address.path_and_query())
        .header(HOST, "localhost");

    if body.is_some() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }

    builder
        .body(Full::new(body.unwrap_or_default()))
        .map_err(|e| ProxyError::Transport(format!("cannot form request for {address}: {e}")))
}
