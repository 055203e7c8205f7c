use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::ToolError;
use crate::utils::content_guard::safe_truncate_utf8;
use crate::utils::inference::AiClient;
use crate::utils::sentence_cache::SentenceCache;

pub const EXPLANATION_FALLBACK: &str = "Error generating AI explanation";

const DEFAULT_CONTEXT: &str = "Medical Document";

#[derive(Debug, Deserialize)]
pub struct ExplainParams {
    #[serde(default)]
    pub sentence: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExplainResponse {
    pub explanation: Value,
    #[serde(skip_serializing_if = "is_false")]
    pub fallback: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub struct ExplainTool {
    client: AiClient,
    cache: Arc<SentenceCache>,
}

impl ExplainTool {
    pub fn new(client: AiClient, cache: Arc<SentenceCache>) -> Self {
        Self { client, cache }
    }

    pub async fn execute(&self, params: ExplainParams) -> Result<ExplainResponse, ToolError> {
        if params.sentence.is_empty() {
            return Err(ToolError::Validation("No sentence provided".to_string()));
        }

        let sentence = params.sentence.trim().to_string();
        let preview = safe_truncate_utf8(&sentence, 80, "...");

        if let Some(cached) = self.cache.get(&sentence) {
            debug!("Serving cached explanation for \"{}\"", preview);
            return Ok(ExplainResponse {
                explanation: cached.0,
                fallback: false,
            });
        }

        // Only an absent (or null) context falls back; an empty string is sent as is
        let context = params
            .context
            .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());

        info!("Explaining sentence \"{}\"", preview);

        match self.client.explain(&sentence, &context).await {
            Ok(prediction) => {
                self.cache.insert(sentence, prediction.clone());
                Ok(ExplainResponse {
                    explanation: prediction.0,
                    fallback: false,
                })
            }
            Err(e) => {
                error!("Error in AI explanation: {}", e);
                Ok(ExplainResponse {
                    explanation: Value::String(EXPLANATION_FALLBACK.to_string()),
                    fallback: true,
                })
            }
        }
    }
}
