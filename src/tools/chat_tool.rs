use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

use super::ToolError;
use crate::utils::inference::AiClient;

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
    /// Earlier turns. Items are only used to enrich the prompt, so anything
    /// unrecognized is skipped instead of failing the request.
    #[serde(default)]
    pub chat_history: Vec<Value>,
}

/// Older clients send the report text as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatContext {
    Document(DocumentContext),
    Plain(String),
}

#[derive(Debug, Deserialize)]
pub struct DocumentContext {
    #[serde(default)]
    pub document_text: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Renders one history item as a prompt line: strings as-is, objects as
/// `role: content` (or `role: text`). Returns `None` for anything else.
fn render_turn(turn: &Value) -> Option<String> {
    match turn {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => {
            let content = fields
                .get("content")
                .or_else(|| fields.get("text"))
                .and_then(Value::as_str)?;
            match fields.get("role").and_then(Value::as_str) {
                Some(role) if !role.is_empty() => Some(format!("{}: {}", role, content)),
                _ => Some(content.to_string()),
            }
        }
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: Value,
    pub context_used: bool,
    pub has_text_context: bool,
    pub has_image_context: bool,
    pub model_used: String,
    pub processing_time_ms: u64,
}

pub struct ChatTool {
    client: AiClient,
    model_name: String,
}

impl ChatTool {
    pub fn new(client: AiClient, model_name: impl Into<String>) -> Self {
        Self {
            client,
            model_name: model_name.into(),
        }
    }

    pub async fn execute(&self, params: ChatParams) -> Result<ChatResponse, ToolError> {
        if params.message.is_empty() {
            return Err(ToolError::Validation("No message provided".to_string()));
        }

        let (document_text, image) = match params.context {
            Some(ChatContext::Document(ctx)) => (
                ctx.document_text.unwrap_or_default(),
                ctx.image_data.filter(|data| !data.is_empty()),
            ),
            Some(ChatContext::Plain(text)) => (text, None),
            None => (String::new(), None),
        };
        let image = image.map(|data| strip_data_url(&data).to_string());

        let history = params
            .chat_history
            .iter()
            .filter_map(|turn| {
                let line = render_turn(turn);
                if line.is_none() {
                    debug!("Skipping unrecognized chat history item: {}", turn);
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "Chat request (text context: {}, image context: {}, history turns: {})",
            !document_text.is_empty(),
            image.is_some(),
            params.chat_history.len()
        );

        let started = Instant::now();
        let answer = self
            .client
            .chat(&params.message, &document_text, image.as_deref(), &history)
            .await?;

        Ok(ChatResponse {
            response: answer.0,
            context_used: !document_text.is_empty() || image.is_some(),
            has_text_context: !document_text.is_empty(),
            has_image_context: image.is_some(),
            model_used: self.model_name.clone(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Drops a `data:<mime>;base64,` prefix so the model receives bare base64.
fn strip_data_url(data: &str) -> &str {
    match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, payload)| payload).unwrap_or(data),
        None => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::inference::testing::FakeBackend;
    use serde_json::json;

    fn parse(body: Value) -> ChatParams {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn structured_context_with_image() {
        let fake = FakeBackend::answering(json!("It looks normal."));
        let tool = ChatTool::new(AiClient::new(fake.clone(), 1000), "medgemma");

        let response = tool
            .execute(parse(json!({
                "message": "Is this normal?",
                "context": {
                    "document_text": "FINDINGS: clear lungs",
                    "image_data": "data:image/png;base64,iVBORw0",
                    "has_image": true
                },
                "chat_history": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            })))
            .await
            .unwrap();

        assert_eq!(response.response, json!("It looks normal."));
        assert!(response.context_used);
        assert!(response.has_text_context);
        assert!(response.has_image_context);
        assert_eq!(response.model_used, "medgemma");

        let request = fake.last_request().unwrap();
        assert_eq!(request.user_prompt, "is this normal?");
        assert_eq!(request.image, "iVBORw0");
        assert!(request
            .system_instruction
            .ends_with("user: hi\nassistant: hello"));
    }

    #[tokio::test]
    async fn plain_string_context() {
        let fake = FakeBackend::answering(json!("answer"));
        let tool = ChatTool::new(AiClient::new(fake.clone(), 1000), "m");

        let response = tool
            .execute(parse(json!({"message": "why?", "context": "IMPRESSION: ok"})))
            .await
            .unwrap();

        assert!(response.has_text_context);
        assert!(!response.has_image_context);
        assert!(fake.last_request().unwrap().image.is_empty());
    }

    #[tokio::test]
    async fn no_context_at_all() {
        let tool = ChatTool::new(AiClient::new(FakeBackend::answering(json!("a")), 1000), "m");
        let response = tool.execute(parse(json!({"message": "hello"}))).await.unwrap();
        assert!(!response.context_used);
        assert!(!response.has_text_context);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let tool = ChatTool::new(AiClient::new(FakeBackend::answering(json!("a")), 1000), "m");
        let err = tool.execute(parse(json!({"message": ""}))).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let tool = ChatTool::new(AiClient::new(FakeBackend::failing(), 1000), "m");
        let err = tool.execute(parse(json!({"message": "hi"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
    }

    #[test]
    fn history_accepts_plain_strings() {
        let params = parse(json!({"message": "m", "chat_history": ["earlier question"]}));
        assert_eq!(render_turn(&params.chat_history[0]).as_deref(), Some("earlier question"));
    }

    #[tokio::test]
    async fn malformed_history_items_are_skipped() {
        let fake = FakeBackend::answering(json!("fine"));
        let tool = ChatTool::new(AiClient::new(fake.clone(), 1000), "m");

        let params = parse(json!({
            "message": "hi",
            "chat_history": [
                {"role": "user", "message": "earlier"},
                {"role": "user", "content": null},
                "plain line",
                {"role": "assistant", "text": "from text"},
                {"content": "no role"},
                42,
                null
            ]
        }));
        let response = tool.execute(params).await.unwrap();

        assert_eq!(response.response, json!("fine"));
        let request = fake.last_request().unwrap();
        assert!(request
            .system_instruction
            .ends_with("Conversation so far:\nplain line\nassistant: from text\nno role"));
        assert!(!request.system_instruction.contains("earlier"));
    }

    #[tokio::test]
    async fn history_of_only_unusable_items_adds_nothing() {
        let fake = FakeBackend::answering(json!("fine"));
        let tool = ChatTool::new(AiClient::new(fake.clone(), 1000), "m");

        tool.execute(parse(json!({"message": "hi", "chat_history": [{"role": "user"}]})))
            .await
            .unwrap();
        assert!(!fake
            .last_request()
            .unwrap()
            .system_instruction
            .contains("Conversation so far"));
    }

    #[test]
    fn strips_only_data_url_prefix() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }
}
