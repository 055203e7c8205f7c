use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::ToolError;
use crate::utils::inference::AiClient;

/// Placeholder summary returned when the model could not be reached.
pub const SUMMARY_FALLBACK: &str = "Error generating AI summary - using fallback analysis";

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default, rename = "documentText")]
    pub document_text: String,
}

/// Same shape whether the model answered or not; `fallback` tells them apart.
#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryResponse {
    pub summary: Value,
    pub fallback: bool,
}

pub struct SummaryTool {
    client: AiClient,
}

impl SummaryTool {
    pub fn new(client: AiClient) -> Self {
        Self { client }
    }

    pub async fn execute(&self, params: SummaryParams) -> Result<SummaryResponse, ToolError> {
        if params.document_text.is_empty() {
            return Err(ToolError::Validation("No document text provided".to_string()));
        }

        info!(
            "Generating summary for {} character report",
            params.document_text.chars().count()
        );

        match self.client.summarize(&params.document_text).await {
            Ok(prediction) => Ok(SummaryResponse {
                summary: prediction.0,
                fallback: false,
            }),
            Err(e) => {
                error!("Error in AI summary: {}", e);
                Ok(SummaryResponse {
                    summary: Value::String(SUMMARY_FALLBACK.to_string()),
                    fallback: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::inference::testing::FakeBackend;
    use crate::prompts::SUMMARY_INSTRUCTION;
    use serde_json::json;

    fn params(text: &str) -> SummaryParams {
        SummaryParams {
            document_text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn passes_model_answer_through() {
        let fake = FakeBackend::answering(json!(["- Normal chest"]));
        let tool = SummaryTool::new(AiClient::new(fake.clone(), 1000));

        let response = tool.execute(params("FINDINGS: normal")).await.unwrap();
        assert_eq!(
            response,
            SummaryResponse {
                summary: json!(["- Normal chest"]),
                fallback: false,
            }
        );
        let request = fake.last_request().unwrap();
        assert!(request.user_prompt.starts_with(SUMMARY_INSTRUCTION));
        assert!(request.user_prompt.ends_with("FINDINGS: normal"));
    }

    #[tokio::test]
    async fn transport_failure_yields_flagged_fallback() {
        let tool = SummaryTool::new(AiClient::new(FakeBackend::failing(), 1000));

        let response = tool.execute(params("report")).await.unwrap();
        assert!(response.fallback);
        assert_eq!(response.summary, json!(SUMMARY_FALLBACK));
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_model_call() {
        let fake = FakeBackend::answering(json!("unused"));
        let tool = SummaryTool::new(AiClient::new(fake.clone(), 1000));

        let err = tool.execute(params("")).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert_eq!(fake.call_count(), 0);
    }
}
