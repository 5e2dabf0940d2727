#![deny(unsafe_code)]

//! Harbourmaster core: relays HTTP requests to a container engine's
//! Unix-socket administrative API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  HTTP   ┌────────────┐        ┌────────────────┐  Unix socket  ┌────────┐
//! │ Browser  │────────▶│ Translator │───────▶│ UpstreamClient │──────────────▶│ Engine │
//! │  client  │◀────────│  (axum)    │◀───────│  (gate held)   │◀──────────────│        │
//! └──────────┘  JSON   └────────────┘        └────────────────┘  HTTP/1.1     └────────┘
//! ```
//!
//! Every inbound request funnels through a single access gate, so at most
//! one engine exchange is in flight at any instant.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future for the object-safe
/// [`EngineTransport`](transport::EngineTransport) seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Engine socket endpoint and composed `http+unix` addresses.
pub mod endpoint;
/// Error taxonomy and its HTTP mapping.
pub mod error;
/// Process lifecycle: bind, serve, shut down.
pub mod proxy;
/// Inbound HTTP routes.
pub mod server;
/// Inbound request → upstream target translation.
pub mod translate;
/// HTTP/1.1 over a Unix domain socket.
pub mod transport;
/// JSON bodies produced by the proxy itself.
pub mod types;
/// Serialized upstream client and response normalization.
pub mod upstream;

pub use endpoint::{SocketEndpoint, UpstreamAddress};
pub use error::ProxyError;
pub use proxy::{Proxy, ProxyRunError};
pub use translate::{TargetSuffix, Translator, UpstreamRequest};
pub use transport::{EngineRequest, EngineTransport, UnixSocketTransport};
pub use upstream::{EngineMethod, Payload, UpstreamClient, UpstreamResponse};
