use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::utils::pdf::has_pdf_signature;

/// Image extensions that are sent to the model instead of being read as text.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "dcm"];

/// How an uploaded file is turned into report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
}

impl DocumentKind {
    /// Classifies an upload by its (sanitized) filename extension.
    /// A `%PDF-` signature marks a file as PDF even without the extension.
    pub fn classify(filename: &str, head: &[u8]) -> Self {
        let extension = file_extension(filename);
        if extension == "pdf" || has_pdf_signature(head) {
            DocumentKind::Pdf
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            DocumentKind::Image
        } else {
            DocumentKind::Text
        }
    }

    /// Value of `file_type` in upload responses: text for PDFs and plain files.
    pub fn file_type(self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf | DocumentKind::Text => "text",
        }
    }
}

/// Lowercased text after the last dot, or empty if there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Windows device names that cannot be used as a file stem.
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduces a client-supplied filename to a safe ASCII basename.
///
/// The name is NFKD-normalized so accented letters keep their base letter,
/// then non-ASCII is dropped. Path separators become spaces, whitespace runs
/// become a single underscore, anything outside `[A-Za-z0-9_.-]` is dropped
/// and leading/trailing dots and underscores are removed. A reserved device
/// stem such as `CON` gets a leading underscore. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
    {
        return format!("_{}", trimmed);
    }

    trimmed.to_string()
}

/// Decodes an uploaded text file to UTF-8.
///
/// BOM first, then strict UTF-8, then a chardetng guess. Falls back to lossy
/// UTF-8 so a text upload is never rejected for its encoding.
pub fn decode_text_upload(bytes: &[u8]) -> String {
    if let Some((enc, offset)) = encoding_rs::Encoding::for_bom(bytes) {
        let (cow, _had_errors) = enc.decode_without_bom_handling(&bytes[offset..]);
        return cow.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    let (cow, _used, had_errors) = enc.decode(bytes);
    if !had_errors {
        return cow.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Safely truncates a UTF-8 string without breaking character boundaries.
/// If `s` length exceeds `max`, returns a string cut at a valid char boundary and appends `suffix`.
pub fn safe_truncate_utf8(s: &str, max: usize, suffix: &str) -> String {
    if s.len() <= max {
        return s.to_string();
    }

    let suffix_len = suffix.len();
    if max <= suffix_len {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        return s[..end].to_string();
    }

    let mut end = max - suffix_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut result = String::with_capacity(end + suffix_len);
    result.push_str(&s[..end]);
    result.push_str(suffix);
    result
}
