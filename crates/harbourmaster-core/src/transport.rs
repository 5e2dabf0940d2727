//! Engine transport: HTTP/1.1 over a Unix domain socket.
//!
//! [`EngineTransport`] is the seam between the serialized client and the
//! wire. [`UnixSocketTransport`] opens one connection per exchange with
//! `hyper`'s low-level HTTP/1 client and reads the whole response body.

use std::path::Path;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

use crate::BoxFuture;
use crate::error::ProxyError;
use crate::upstream::UpstreamResponse;

/// A fully formed request ready to be written to the engine.
pub type EngineRequest = hyper::Request<Full<Bytes>>;

/// Performs one request/response exchange with the engine.
pub trait EngineTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        socket: &'a Path,
        request: EngineRequest,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ProxyError>>;
}

/// HTTP/1.1 over the engine's Unix domain socket.
#[derive(Debug, Default, Clone)]
pub struct UnixSocketTransport;

impl UnixSocketTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(
        &self,
        socket: &Path,
        request: EngineRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        if !socket.exists() {
            return Err(ProxyError::Transport(format!(
                "engine socket not found at {}",
                socket.display()
            )));
        }

        let stream = UnixStream::connect(socket).await.map_err(|e| {
            ProxyError::Transport(format!(
                "failed to connect to engine socket at {}: {e}",
                socket.display()
            ))
        })?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Full<Bytes>>(io)
            .await
            .map_err(|e| ProxyError::Transport(format!("HTTP handshake failed: {e}")))?;

        // Drive the connection in the background
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!(error = %e, "engine connection error");
            }
        });

        debug!(method = %request.method(), uri = %request.uri(), "engine request");

        let resp = sender
            .send_request(request)
            .await
            .map_err(|e| ProxyError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ProxyError::Transport(format!("failed to read response body: {e}")))?
            .to_bytes();

        Ok(UpstreamResponse { status, body })
    }
}

impl EngineTransport for UnixSocketTransport {
    fn send<'a>(
        &'a self,
        socket: &'a Path,
        request: EngineRequest,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ProxyError>> {
        Box::pin(self.exchange(socket, request))
    }
}
