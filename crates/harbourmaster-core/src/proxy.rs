//! Proxy process lifecycle: startup, serving, and shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use harbourmaster_config::AppConfig;

use crate::endpoint::SocketEndpoint;
use crate::server::{self, ProxyState};
use crate::translate::Translator;
use crate::transport::{EngineTransport, UnixSocketTransport};
use crate::upstream::UpstreamClient;

/// The Harbourmaster proxy.
///
/// Resolves the engine endpoint and creates the access gate once, at
/// construction. Both live until the proxy is dropped.
pub struct Proxy {
    config: AppConfig,
    state: Arc<ProxyState>,
    shutdown_tx: watch::Sender<bool>,
}

impl Proxy {
    /// Create a proxy forwarding over the configured engine socket.
    pub fn new(config: AppConfig) -> Self {
        Self::with_transport(config, Arc::new(UnixSocketTransport::new()))
    }

    /// Create a proxy with a custom engine transport.
    pub fn with_transport(config: AppConfig, transport: Arc<dyn EngineTransport>) -> Self {
        let endpoint = Arc::new(SocketEndpoint::new(&config.engine.socket_path));
        let state = Arc::new(ProxyState {
            translator: Translator::new(endpoint),
            client: UpstreamClient::new(transport),
        });
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind the configured TCP listener.
    pub async fn bind(&self) -> Result<TcpListener, ProxyRunError> {
        let addr = self.config.server.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ProxyRunError::Bind { addr, source })
    }

    /// Serve on `listener` until [`shutdown`](Self::shutdown) is called or
    /// Ctrl-C is received.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ProxyRunError> {
        let local = listener.local_addr()?;
        info!(
            addr = %local,
            engine = %self.state.translator.endpoint().path().display(),
            version = %crate::build_info::version_string(),
            "Harbourmaster proxy listening"
        );

        let app = server::router(Arc::clone(&self.state)).layer(TraceLayer::new_for_http());
        let shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = stop_requested(shutdown_rx) => {
                        info!("Shutdown requested, stopping proxy");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Ctrl-C received, initiating graceful shutdown");
                        shutdown_tx.send_replace(true);
                    }
                }
            })
            .await?;

        info!("Proxy stopped");
        Ok(())
    }

    /// Bind and serve.
    pub async fn run(&self) -> Result<(), ProxyRunError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Request a graceful shutdown. Takes effect even if serving has not
    /// started yet.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Shared state handed to the router.
    pub fn state(&self) -> Arc<ProxyState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn stop_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Errors from running the proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyRunError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
