pub mod chat_tool;
pub mod explain_tool;
pub mod summary_tool;
pub mod upload_tool;

use thiserror::Error;

use crate::utils::inference::InferenceError;
use crate::utils::pdf::ExtractionError;

/// Failure of a single report interaction.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The caller sent something unusable; reported back verbatim.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Transport(#[from] InferenceError),
}
