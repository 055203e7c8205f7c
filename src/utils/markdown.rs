// Line-oriented conversion of loosely structured report text into markdown.
// Formatting is cosmetic: any internal failure hands back the input untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Labels at or beyond this many characters are read as prose, not headers.
const MAX_LABEL_CHARS: usize = 30;

/// Bullet markers recognised at the start of a line. `â€¢` is a UTF-8 bullet
/// that was decoded as Windows-1252 somewhere upstream.
const BULLET_MARKERS: &[&str] = &["â€¢", "•", "-"];

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("pattern compilation failed: {0}")]
    Pattern(String),
}

struct Patterns {
    section_header: Regex,
    numbered_item: Regex,
    blank_run: Regex,
}

static PATTERNS: Lazy<Result<Patterns, String>> = Lazy::new(|| {
    let compile = |pattern: &str| Regex::new(pattern).map_err(|e| e.to_string());
    Ok(Patterns {
        section_header: compile(r"^[A-Z\s]+:")?,
        numbered_item: compile(r"^\d+\.")?,
        blank_run: compile(r"\n\s*\n\s*\n")?,
    })
});

/// Converts report text to markdown.
///
/// Never fails: if formatting cannot be performed the original text is
/// returned as-is.
pub fn convert_report_to_markdown(text: &str) -> String {
    match try_convert(text) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!("Error converting report to markdown: {}", e);
            text.to_string()
        }
    }
}

fn try_convert(text: &str) -> Result<String, FormatError> {
    let patterns = PATTERNS
        .as_ref()
        .map_err(|e| FormatError::Pattern(e.clone()))?;

    let mut lines: Vec<String> = Vec::new();

    for raw in text.trim().split('\n') {
        let line = raw.trim();

        if line.is_empty() {
            lines.push(String::new());
            continue;
        }

        if let Some((label, content)) = section_header(patterns, line) {
            lines.push(format!("## {}", label));
            if !content.is_empty() {
                lines.push(content.to_string());
            }
            lines.push(String::new());
        } else if patterns.numbered_item.is_match(line) {
            lines.push(format!("**{}**", line));
            lines.push(String::new());
        } else if let Some(rest) = strip_bullet(line) {
            lines.push(format!("- {}", rest.trim()));
        } else {
            lines.push(line.to_string());
        }
    }

    let joined = lines.join("\n");
    let collapsed = patterns.blank_run.replace_all(&joined, "\n\n");
    Ok(collapsed.trim().to_string())
}

/// Splits an ALL-CAPS `LABEL: content` line at its first colon.
fn section_header<'a>(patterns: &Patterns, line: &'a str) -> Option<(&'a str, &'a str)> {
    if !patterns.section_header.is_match(line) {
        return None;
    }
    let (label, content) = line.split_once(':')?;
    if label.chars().count() >= MAX_LABEL_CHARS {
        return None;
    }
    Some((label.trim(), content.trim()))
}

fn strip_bullet(line: &str) -> Option<&str> {
    BULLET_MARKERS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}
