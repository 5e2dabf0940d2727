//! Inbound HTTP surface — axum router in front of the forwarding core.
//!
//! | Route                    | Methods            | Purpose                 |
//! |--------------------------|--------------------|-------------------------|
//! | `/`                      | GET                | liveness greeting       |
//! | `/health`                | GET                | build and engine info   |
//! | `/docker-engine/?url=…`  | GET, POST, DELETE  | forward to the engine   |
//!
//! `HEAD` on the engine route is refused with 405 rather than being
//! answered by the GET handler, so it never takes the gate.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use hyper::body::Bytes;

use crate::endpoint::UNIX_SCHEME;
use crate::error::ProxyError;
use crate::translate::{TargetQuery, Translator};
use crate::types::HealthResponse;
use crate::upstream::{EngineMethod, Payload, UpstreamClient};

/// Path of the forwarding endpoint.
pub const ENGINE_ROUTE: &str = "/docker-engine/";

/// Shared state accessible to all route handlers.
#[derive(Debug)]
pub struct ProxyState {
    pub translator: Translator,
    pub client: UpstreamClient,
}

/// Build the axum router with all routes.
pub fn router(state: Arc<ProxyState>) -> axum::Router {
    let forward = get(handle_get)
        .head(refuse_head)
        .post(handle_post)
        .delete(handle_delete);
    axum::Router::new()
        .route("/", get(handle_hello))
        .route("/health", get(handle_health))
        .route(ENGINE_ROUTE, forward.clone())
        .route(ENGINE_ROUTE.trim_end_matches('/'), forward)
        .with_state(state)
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        match self {
            Payload::Content(value) => (StatusCode::OK, Json(value)).into_response(),
            Payload::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_hello() -> &'static str {
    "Hello"
}

async fn handle_health(State(state): State<Arc<ProxyState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        build_profile: crate::build_info::BUILD_PROFILE.to_string(),
        engine: format!("{UNIX_SCHEME}{}", state.translator.endpoint().encoded()),
    })
}

async fn refuse_head() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, POST, DELETE")],
    )
}

async fn handle_get(
    State(state): State<Arc<ProxyState>>,
    query: Result<Query<TargetQuery>, QueryRejection>,
) -> Result<Payload, ProxyError> {
    forward(&state, EngineMethod::Get, query, Bytes::new()).await
}

async fn handle_post(
    State(state): State<Arc<ProxyState>>,
    query: Result<Query<TargetQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Payload, ProxyError> {
    forward(&state, EngineMethod::Post, query, body).await
}

async fn handle_delete(
    State(state): State<Arc<ProxyState>>,
    query: Result<Query<TargetQuery>, QueryRejection>,
) -> Result<Payload, ProxyError> {
    forward(&state, EngineMethod::Delete, query, Bytes::new()).await
}

async fn forward(
    state: &ProxyState,
    method: EngineMethod,
    query: Result<Query<TargetQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Payload, ProxyError> {
    let query = query.ok().map(|Query(q)| q);
    let request = state.translator.translate(method, query, body)?;
    let address = state.translator.compose(&request);
    state
        .client
        .forward(request.method, &address, request.body)
        .await
}
