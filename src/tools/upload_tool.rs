use base64::Engine;
use serde::Serialize;
use tracing::info;

use super::ToolError;
use crate::utils::content_guard::{decode_text_upload, file_extension, secure_filename, DocumentKind};
use crate::utils::inference::AiClient;
use crate::utils::markdown::convert_report_to_markdown;
use crate::utils::pdf::extract_report_text;

/// A file as received from the multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    /// Raw report text, used for later model calls.
    pub content: String,
    /// Display rendering of `content`.
    pub markdown: String,
    pub file_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub message: &'static str,
}

pub struct UploadTool {
    client: AiClient,
}

impl UploadTool {
    pub fn new(client: AiClient) -> Self {
        Self { client }
    }

    /// `file` is `None` when the form had no `file` field.
    pub async fn execute(&self, file: Option<UploadedFile>) -> Result<UploadResponse, ToolError> {
        let file = file.ok_or_else(|| ToolError::Validation("No file provided".to_string()))?;

        if file.filename.is_empty() {
            return Err(ToolError::Validation("No file selected".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(ToolError::Validation("Uploaded file is empty".to_string()));
        }

        let filename = secure_filename(&file.filename);
        let kind = DocumentKind::classify(&filename, &file.bytes);

        info!(
            "Processing upload \"{}\" ({} bytes, kind: {:?})",
            filename,
            file.bytes.len(),
            kind
        );

        let mut image_url = None;
        let content = match kind {
            DocumentKind::Pdf => extract_report_text(file.bytes).await?,
            DocumentKind::Image => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
                let report = self.client.describe_image(&encoded).await?.into_text();
                image_url = Some(format!(
                    "data:image/{};base64,{}",
                    file_extension(&filename),
                    encoded
                ));
                report
            }
            DocumentKind::Text => decode_text_upload(&file.bytes),
        };

        let markdown = convert_report_to_markdown(&content);

        Ok(UploadResponse {
            filename,
            content,
            markdown,
            file_type: kind.file_type(),
            image_url,
            message: "File processed successfully",
        })
    }
}
