//! In-process engine transport that records calls and overlap.
//!
//! [`SpyTransport`] implements [`EngineTransport`] without touching a
//! socket. It answers every exchange with one canned response, optionally
//! after a delay, and counts calls that were outstanding simultaneously.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use harbourmaster_core::{BoxFuture, EngineRequest, EngineTransport, ProxyError, UpstreamResponse};
use hyper::StatusCode;
use hyper::body::Bytes;

/// A recording, overlap-detecting stand-in for the engine socket.
#[derive(Debug)]
pub struct SpyTransport {
    status: StatusCode,
    body: Bytes,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    targets: Mutex<Vec<String>>,
}

impl SpyTransport {
    /// Answer every exchange with `status` and `body`.
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: Bytes::from(body.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Hold each exchange open for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of exchanges started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of exchanges outstanding at the same instant.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Request targets in the order they were sent.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl EngineTransport for SpyTransport {
    fn send<'a>(
        &'a self,
        _socket: &'a Path,
        request: EngineRequest,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ProxyError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Ok(mut targets) = self.targets.lock() {
                targets.push(request.uri().to_string());
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(UpstreamResponse::new(self.status, self.body.clone()))
        })
    }
}
