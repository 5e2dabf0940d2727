//! The engine's socket endpoint and the addresses composed against it.
//!
//! Addresses follow the `http+unix` convention used by HTTP client
//! libraries that speak to Unix sockets: the socket path is
//! percent-encoded into the authority position and the caller's suffix
//! follows verbatim.
//!
//! ```text
//! /var/run/engine.sock + /version  ⇒  http+unix://%2Fvar%2Frun%2Fengine.sock/version
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::translate::TargetSuffix;

/// Scheme prefix of every composed address.
pub const UNIX_SCHEME: &str = "http+unix://";

/// The engine's control socket, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    path: PathBuf,
    encoded: String,
}

impl SocketEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let encoded = urlencoding::encode(&path.to_string_lossy()).into_owned();
        Self { path, encoded }
    }

    /// Filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The socket path in its percent-encoded form.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Compose the address of `suffix` on this endpoint.
    pub fn address(self: &Arc<Self>, suffix: &TargetSuffix) -> UpstreamAddress {
        UpstreamAddress {
            endpoint: Arc::clone(self),
            suffix: suffix.as_str().to_string(),
        }
    }
}

/// A fully composed upstream address: endpoint plus caller suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamAddress {
    endpoint: Arc<SocketEndpoint>,
    suffix: String,
}

impl UpstreamAddress {
    /// Socket the exchange connects to.
    pub fn socket_path(&self) -> &Path {
        self.endpoint.path()
    }

    /// The request target sent on the wire, exactly as the caller supplied it.
    pub fn path_and_query(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for UpstreamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{UNIX_SCHEME}{}{}", self.endpoint.encoded(), self.suffix)
    }
}
