use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use crate::prompts;

/// Answer used when the endpoint reply has no `predictions` member.
pub const NO_ANSWER: &str = "No answer";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference endpoint is not configured")]
    NotConfigured,

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: HTTP status {status}")]
    Api { status: u16 },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Connection settings for the remote model.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub endpoint: Option<url::Url>,
    pub token: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub model_name: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout: Duration::from_secs(120),
            max_tokens: 1000,
            model_name: "medgemma".to_string(),
        }
    }
}

/// One prompt sent to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceRequest {
    pub user_prompt: String,
    pub system_instruction: String,
    /// Base64 image payload, empty when the prompt is text-only.
    pub image: String,
    pub max_tokens: u32,
}

/// Whatever the model answered, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prediction(pub Value);

impl Prediction {
    /// Flattens the answer to plain text: strings as-is, arrays of strings
    /// joined by newlines, anything else as compact JSON.
    pub fn into_text(self) -> String {
        match self.0 {
            Value::String(s) => s,
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

/// Transport to the model. Implemented over HTTP in production and by fakes in tests.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn invoke(&self, request: &InferenceRequest) -> Result<Prediction, InferenceError>;
}

#[derive(Debug, Serialize)]
struct InvocationBody<'a> {
    inputs: InvocationInputs<'a>,
}

#[derive(Debug, Serialize)]
struct InvocationInputs<'a> {
    user_prompt: [&'a str; 1],
    system_instruction: [&'a str; 1],
    image: [&'a str; 1],
    max_tokens: [u32; 1],
}

#[derive(Debug, Deserialize)]
struct InvocationReply {
    predictions: Option<Value>,
}

/// Posts prompts to a model-serving `/invocations` style endpoint.
pub struct HttpInferenceBackend {
    client: Client,
    endpoint: Option<url::Url>,
    token: Option<String>,
}

impl HttpInferenceBackend {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceBackend {
    async fn invoke(&self, request: &InferenceRequest) -> Result<Prediction, InferenceError> {
        let endpoint = self.endpoint.as_ref().ok_or(InferenceError::NotConfigured)?;

        let body = InvocationBody {
            inputs: InvocationInputs {
                user_prompt: [request.user_prompt.as_str()],
                system_instruction: [request.system_instruction.as_str()],
                image: [request.image.as_str()],
                max_tokens: [request.max_tokens],
            },
        };

        debug!(
            "Sending inference request to {} (prompt: {} chars, image: {} bytes)",
            endpoint,
            request.user_prompt.len(),
            request.image.len()
        );

        let mut builder = self
            .client
            .post(endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .json(&body);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("Inference endpoint answered with {}", status);

        if !status.is_success() {
            error!("Inference API error: Status {}", status);
            return Err(InferenceError::Api {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let reply = serde_json::from_str::<InvocationReply>(&text)?;

        Ok(Prediction(
            reply
                .predictions
                .unwrap_or_else(|| Value::String(NO_ANSWER.to_string())),
        ))
    }
}

/// Builds the prompts for each report interaction and hands them to a backend.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn InferenceBackend>,
    max_tokens: u32,
}

impl AiClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, max_tokens: u32) -> Self {
        Self {
            backend,
            max_tokens,
        }
    }

    /// Short bullet-point summary of a whole report.
    pub async fn summarize(&self, report_text: &str) -> Result<Prediction, InferenceError> {
        let request = InferenceRequest {
            user_prompt: prompts::summary_prompt(report_text),
            max_tokens: self.max_tokens,
            ..Default::default()
        };
        self.backend.invoke(&request).await
    }

    /// Plain-language explanation of one sentence, with the report as context.
    pub async fn explain(
        &self,
        sentence: &str,
        report_text: &str,
    ) -> Result<Prediction, InferenceError> {
        let request = InferenceRequest {
            user_prompt: prompts::explanation_prompt(sentence),
            system_instruction: prompts::explanation_system_prompt(report_text),
            max_tokens: self.max_tokens,
            ..Default::default()
        };
        self.backend.invoke(&request).await
    }

    /// One chat turn. Any earlier turns must already be folded into `history`.
    pub async fn chat(
        &self,
        message: &str,
        report_text: &str,
        image: Option<&str>,
        history: &str,
    ) -> Result<Prediction, InferenceError> {
        let request = InferenceRequest {
            user_prompt: message.to_lowercase(),
            system_instruction: prompts::chat_system_prompt(report_text, history),
            image: image.unwrap_or_default().to_string(),
            max_tokens: self.max_tokens,
        };
        self.backend.invoke(&request).await
    }

    /// Generates a DESCRIPTION / DIAGNOSIS report for a base64-encoded image.
    pub async fn describe_image(&self, image_base64: &str) -> Result<Prediction, InferenceError> {
        let request = InferenceRequest {
            user_prompt: prompts::IMAGE_REPORT_PROMPT.to_string(),
            system_instruction: prompts::IMAGE_REPORT_SYSTEM_PROMPT.to_string(),
            image: image_base64.to_string(),
            max_tokens: self.max_tokens,
        };
        self.backend.invoke(&request).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_endpoint(router: Router) -> url::Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        url::Url::parse(&format!("http://{}/invocations", addr)).unwrap()
    }

    fn backend_for(endpoint: url::Url, token: Option<&str>) -> HttpInferenceBackend {
        HttpInferenceBackend::new(&InferenceConfig {
            endpoint: Some(endpoint),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_wrapped_inputs_and_returns_predictions() {
        let router = Router::new().route(
            "/invocations",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({ "predictions": [body, auth] }))
            }),
        );
        let endpoint = spawn_endpoint(router).await;
        let backend = backend_for(endpoint, Some("secret"));

        let request = InferenceRequest {
            user_prompt: "hello".to_string(),
            system_instruction: "be brief".to_string(),
            image: String::new(),
            max_tokens: 42,
        };
        let Prediction(answer) = backend.invoke(&request).await.unwrap();

        let echoed = &answer[0];
        assert_eq!(echoed["inputs"]["user_prompt"], json!(["hello"]));
        assert_eq!(echoed["inputs"]["system_instruction"], json!(["be brief"]));
        assert_eq!(echoed["inputs"]["image"], json!([""]));
        assert_eq!(echoed["inputs"]["max_tokens"], json!([42]));
        assert_eq!(answer[1], json!("Bearer secret"));
    }

    #[tokio::test]
    async fn missing_predictions_becomes_no_answer() {
        let router = Router::new().route(
            "/invocations",
            post(|| async { Json(json!({ "other": 1 })) }),
        );
        let backend = backend_for(spawn_endpoint(router).await, None);

        let answer = backend.invoke(&InferenceRequest::default()).await.unwrap();
        assert_eq!(answer, Prediction(json!(NO_ANSWER)));
    }

    #[tokio::test]
    async fn error_status_is_an_api_error() {
        let router = Router::new().route(
            "/invocations",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let backend = backend_for(spawn_endpoint(router).await, None);

        let err = backend.invoke(&InferenceRequest::default()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Api { status: 502 }), "got: {err}");
    }

    #[tokio::test]
    async fn non_json_reply_is_a_decode_error() {
        let router = Router::new().route("/invocations", post(|| async { "plain text" }));
        let backend = backend_for(spawn_endpoint(router).await, None);

        let err = backend.invoke(&InferenceRequest::default()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)), "got: {err}");
    }

    #[tokio::test]
    async fn unconfigured_endpoint_fails_without_network() {
        let backend = HttpInferenceBackend::new(&InferenceConfig::default()).unwrap();
        let err = backend.invoke(&InferenceRequest::default()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NotConfigured));
    }

    #[test]
    fn prediction_text_flattening() {
        assert_eq!(Prediction(json!("a")).into_text(), "a");
        assert_eq!(Prediction(json!(["a", "b"])).into_text(), "a\nb");
        assert_eq!(Prediction(json!({"k": 1})).into_text(), "{\"k\":1}");
    }

    #[tokio::test]
    async fn chat_lowercases_message_and_forwards_image() {
        let fake = FakeBackend::answering(json!("ok"));
        let client = AiClient::new(fake.clone(), 1000);

        client
            .chat("What Is An EFFUSION?", "REPORT BODY", Some("aW1n"), "")
            .await
            .unwrap();

        let request = fake.last_request().unwrap();
        assert_eq!(request.user_prompt, "what is an effusion?");
        assert_eq!(request.image, "aW1n");
        assert!(request.system_instruction.contains("REPORT BODY"));
        assert_eq!(request.max_tokens, 1000);
    }

    #[tokio::test]
    async fn explain_puts_report_in_system_prompt() {
        let fake = FakeBackend::answering(json!("means fluid"));
        let client = AiClient::new(fake.clone(), 300);

        let answer = client.explain("Small Effusion.", "full report").await.unwrap();
        assert_eq!(answer, Prediction(json!("means fluid")));

        let request = fake.last_request().unwrap();
        assert!(request.user_prompt.contains("'small effusion.'"));
        assert!(request.system_instruction.ends_with("full report"));
        assert!(request.image.is_empty());
    }
}
