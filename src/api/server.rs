use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::handlers;
use crate::utils::inference::{AiClient, HttpInferenceBackend, InferenceBackend, InferenceConfig};
use crate::utils::sentence_cache::SentenceCache;

/// Largest accepted request body (uploads included).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Everything a handler needs. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub ai: AiClient,
    pub sentence_cache: Arc<SentenceCache>,
    pub model_name: String,
}

impl AppState {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let backend = HttpInferenceBackend::new(config)?;
        Ok(Self::with_backend(
            Arc::new(backend),
            config.max_tokens,
            config.model_name.clone(),
        ))
    }

    pub fn with_backend(
        backend: Arc<dyn InferenceBackend>,
        max_tokens: u32,
        model_name: String,
    ) -> Self {
        Self {
            ai: AiClient::new(backend, max_tokens),
            sentence_cache: Arc::new(SentenceCache::new()),
            model_name,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/generate-summary", post(handlers::generate_summary))
        .route("/api/explain-sentence", post(handlers::explain_sentence))
        .route("/api/upload-document", post(handlers::upload_document))
        .route("/api/chat", post(handlers::chat))
        .route("/api/cache-status", get(handlers::cache_status))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Report viewer listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
