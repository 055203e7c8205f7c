use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::tools::chat_tool::{ChatParams, ChatResponse, ChatTool};
use crate::tools::explain_tool::{ExplainParams, ExplainResponse, ExplainTool};
use crate::tools::summary_tool::{SummaryParams, SummaryResponse, SummaryTool};
use crate::tools::upload_tool::{UploadResponse, UploadTool, UploadedFile};

/// Keys shown by the cache status endpoint.
const CACHE_SAMPLE_SIZE: usize = 5;

static INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub cached_sentences: usize,
    pub cache_keys: Vec<String>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn generate_summary(
    State(state): State<AppState>,
    payload: Result<Json<SummaryParams>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Json(params) = payload?;
    let tool = SummaryTool::new(state.ai.clone());
    Ok(Json(tool.execute(params).await?))
}

pub async fn explain_sentence(
    State(state): State<AppState>,
    payload: Result<Json<ExplainParams>, JsonRejection>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let Json(params) = payload?;
    let tool = ExplainTool::new(state.ai.clone(), state.sentence_cache.clone());
    Ok(Json(tool.execute(params).await?))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatParams>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(params) = payload?;
    let tool = ChatTool::new(state.ai.clone(), state.model_name.as_str());
    Ok(Json(tool.execute(params).await?))
}

pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        file = Some(UploadedFile { filename, bytes });
        break;
    }

    let tool = UploadTool::new(state.ai.clone());
    Ok(Json(tool.execute(file).await?))
}

pub async fn cache_status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(CacheStatus {
        cached_sentences: state.sentence_cache.len(),
        cache_keys: state.sentence_cache.sample_keys(CACHE_SAMPLE_SIZE),
    })
}
