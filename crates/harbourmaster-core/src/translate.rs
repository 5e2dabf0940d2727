//! Request translation: inbound HTTP request → upstream target.
//!
//! The caller names the engine path in the `url` query parameter, e.g.
//! `GET /docker-engine/?url=/containers/json%3Fall%3D1`. Query-string
//! decoding is the only decoding applied; the suffix is otherwise passed
//! to the engine verbatim. The engine is the authority on whether the
//! path exists.

use std::sync::Arc;

use hyper::body::Bytes;
use serde::Deserialize;
use tracing::info;

use crate::endpoint::{SocketEndpoint, UpstreamAddress};
use crate::error::ProxyError;
use crate::upstream::EngineMethod;

/// Name of the query parameter carrying the engine suffix.
pub const TARGET_PARAM: &str = "url";

/// Query string of an inbound forwarding request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TargetQuery {
    pub url: Option<String>,
}

/// Engine path-and-query requested by the caller. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSuffix(String);

impl TargetSuffix {
    pub fn new(raw: impl Into<String>) -> Result<Self, ProxyError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ProxyError::MissingParameter(TARGET_PARAM));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated request ready to be addressed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: EngineMethod,
    pub suffix: TargetSuffix,
    /// Only ever set for POST, and only when the inbound body is non-empty.
    pub body: Option<Bytes>,
}

/// Turns inbound requests into upstream addresses on a fixed endpoint.
#[derive(Debug, Clone)]
pub struct Translator {
    endpoint: Arc<SocketEndpoint>,
}

impl Translator {
    pub fn new(endpoint: Arc<SocketEndpoint>) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Arc<SocketEndpoint> {
        &self.endpoint
    }

    /// Validate an inbound request.
    ///
    /// `query` is `None` when the inbound query string could not be parsed
    /// at all; that is reported the same way as an absent parameter.
    pub fn translate(
        &self,
        method: EngineMethod,
        query: Option<TargetQuery>,
        body: Bytes,
    ) -> Result<UpstreamRequest, ProxyError> {
        let raw = query
            .and_then(|q| q.url)
            .ok_or(ProxyError::MissingParameter(TARGET_PARAM))?;
        let suffix = TargetSuffix::new(raw)?;
        let body = (method == EngineMethod::Post && !body.is_empty()).then_some(body);
        Ok(UpstreamRequest {
            method,
            suffix,
            body,
        })
    }

    /// Compose the full upstream address and record it before dispatch.
    pub fn compose(&self, request: &UpstreamRequest) -> UpstreamAddress {
        let address = self.endpoint.address(&request.suffix);
        info!(method = %request.method, address = %address, "forwarding to engine");
        address
    }
}
