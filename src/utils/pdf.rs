// PDF text extraction for uploaded reports.
// pdf-extract is synchronous and can panic on malformed input, so it runs on a
// blocking worker and a panic is reported like any other parse failure.

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("PDF parser worker stopped unexpectedly: {0}")]
    WorkerPanicked(String),
}

/// Extracts text from a PDF stored fully in memory.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(text.trim().to_string())
}

/// Runs [`extract_text_from_pdf_mem`] on the blocking pool.
pub async fn extract_report_text(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    debug!("Extracting text from {} byte PDF", bytes.len());
    tokio::task::spawn_blocking(move || extract_text_from_pdf_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::WorkerPanicked(e.to_string()))?
}

/// True when the upload starts with the `%PDF-` header.
pub fn has_pdf_signature(head: &[u8]) -> bool {
    head.starts_with(b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_signature() {
        assert!(has_pdf_signature(b"%PDF-1.7\n"));
        assert!(!has_pdf_signature(b"hello"));
        assert!(!has_pdf_signature(b"%PD"));
    }

    #[tokio::test]
    async fn garbage_bytes_are_an_extraction_error() {
        let result = extract_report_text(b"definitely not a pdf".to_vec()).await;
        assert!(result.is_err());
    }
}
