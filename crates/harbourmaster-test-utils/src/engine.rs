//! Stub container engine on a real Unix domain socket.
//!
//! [`StubEngine`] serves canned responses with axum on a `UnixListener`
//! inside a temporary directory. It records every request it receives
//! and tracks how many were being handled at the same time.
//!
//! Like a real engine daemon, the stub finishes a request it has started
//! even when the caller hangs up: each request's work runs in its own task.
//!
//! ```ignore
//! let engine = StubEngine::builder()
//!     .route("GET", "/containers/json", 200, r#"[{"Id":"abc"}]"#)
//!     .start()
//!     .await;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// A request as the stub engine saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Reply {
    status: StatusCode,
    body: String,
}

#[derive(Default)]
struct Shared {
    routes: HashMap<(String, String), Reply>,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Builder for a [`StubEngine`].
#[derive(Default)]
pub struct StubEngineBuilder {
    routes: HashMap<(String, String), Reply>,
    delay: Duration,
}

impl StubEngineBuilder {
    /// Answer `method path_and_query` with `status` and `body`.
    ///
    /// Lookup tries the exact path-and-query first, then the bare path.
    pub fn route(mut self, method: &str, path_and_query: &str, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.routes.insert(
            (method.to_ascii_uppercase(), path_and_query.to_string()),
            Reply {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Hold every request for `delay` before answering.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Bind the socket and start serving.
    pub async fn start(self) -> StubEngine {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket_path).expect("failed to bind stub engine socket");

        let shared = Arc::new(Shared {
            routes: self.routes,
            delay: self.delay,
            ..Shared::default()
        });

        let app = axum::Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&shared));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        StubEngine {
            socket_path,
            shared,
            task,
            _temp_dir: temp_dir,
        }
    }
}

/// A running stub engine. Stops serving when dropped.
pub struct StubEngine {
    socket_path: PathBuf,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl StubEngine {
    pub fn builder() -> StubEngineBuilder {
        StubEngineBuilder::default()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Highest number of requests that were being handled at once.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for StubEngine {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response {
    let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    shared.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(RecordedRequest {
            method: method.to_string(),
            path_and_query: path_and_query.clone(),
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: body.to_vec(),
        });
    }

    let work = tokio::spawn(async move {
        if !shared.delay.is_zero() {
            tokio::time::sleep(shared.delay).await;
        }

        let method = method.to_string();
        let reply = shared
            .routes
            .get(&(method.clone(), path_and_query))
            .or_else(|| shared.routes.get(&(method, uri.path().to_string())))
            .cloned();

        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    });

    match work.await.unwrap_or_default() {
        Some(Reply { status, body }) if body.is_empty() => status.into_response(),
        Some(Reply { status, body }) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "message": "page not found" })),
        )
            .into_response(),
    }
}
