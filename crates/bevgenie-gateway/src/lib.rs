//! BevGenie gateway: the HTTP surface over `bevgenie_core`.
//!
//! `main` wires real stores and the OpenRouter client; tests build the same
//! router over scripted models.

pub mod handlers;
mod session_cookie;
mod sse;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use bevgenie_core::{
    GenieConfig, LanguageModel, PresentationGenerator, SessionStore, SledKnowledgeBase,
    StreamOrchestrator,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

pub use session_cookie::SESSION_COOKIE;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<StreamOrchestrator>,
    pub sessions: Arc<dyn SessionStore>,
    pub knowledge: Arc<SledKnowledgeBase>,
    pub presentations: Arc<PresentationGenerator>,
}

impl AppState {
    pub fn new(
        config: Arc<GenieConfig>,
        model: Arc<dyn LanguageModel>,
        sessions: Arc<dyn SessionStore>,
        knowledge: Arc<SledKnowledgeBase>,
    ) -> Self {
        let orchestrator = Arc::new(StreamOrchestrator::new(
            config,
            Arc::clone(&model),
            Arc::clone(&sessions),
            knowledge.clone(),
        ));
        Self {
            orchestrator,
            sessions,
            knowledge,
            presentations: Arc::new(PresentationGenerator::new(model)),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat/stream", post(handlers::chat::chat_stream))
        .route("/api/generate-page", post(handlers::page::generate_page))
        .route(
            "/api/generate-presentation",
            post(handlers::presentation::generate_presentation),
        )
        .route("/api/session/reset", post(handlers::session::reset_session))
        .route("/api/knowledge/documents", post(handlers::knowledge::add_document))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
        .layer(cors)
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        target: "bevgenie::gateway",
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}
