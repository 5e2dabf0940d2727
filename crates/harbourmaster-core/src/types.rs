//! JSON bodies the proxy produces itself.
//!
//! Engine payloads are relayed as opaque [`serde_json::Value`]s and have
//! no types here.

use serde::{Deserialize, Serialize};

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `"upstream_error"`.
    pub error: String,
    pub message: String,
    /// HTTP status of this response.
    pub status: u16,
}

/// Proxy health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
    /// Percent-encoded engine socket the proxy forwards to.
    pub engine: String,
}
