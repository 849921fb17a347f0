//! Normalize stage (spec §4.9 step 2): HTML is stripped and collapsed,
//! plain text has its newlines folded, JSON is parsed and re-emitted
//! compactly. Unsupported content types skip to `skipped`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IngestError, IngestResult};

/// Bound on HTML normalization input, "to prevent pathological regex cost".
const MAX_HTML_BYTES: usize = 10 * 1024 * 1024;

/// What the normalize stage produced.
pub enum Normalized {
    Text(String),
    /// Content type isn't one this stage knows how to normalize.
    Skipped { content_type: String },
}

static SCRIPT_OR_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1>").expect("valid regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize fetched bytes given their content type.
///
/// # Errors
///
/// Returns [`IngestError::ContentTooLarge`] if HTML input exceeds the
/// 10 MiB normalization bound. Malformed JSON does not error here — spec
/// §4.9 only defines the happy path for JSON; callers treat a parse
/// failure the same as an unsupported content type.
pub fn normalize(bytes: &[u8], content_type: &str) -> IngestResult<Normalized> {
    let base = content_type.split(';').next().unwrap_or(content_type).trim();
    match base {
        "text/html" | "application/xhtml+xml" => normalize_html(bytes),
        "text/plain" => Ok(Normalized::Text(normalize_text(bytes))),
        "application/json" => Ok(normalize_json(bytes).unwrap_or_else(|| Normalized::Skipped {
            content_type: base.to_string(),
        })),
        other => Ok(Normalized::Skipped { content_type: other.to_string() }),
    }
}

fn normalize_html(bytes: &[u8]) -> IngestResult<Normalized> {
    if bytes.len() > MAX_HTML_BYTES {
        return Err(IngestError::ContentTooLarge);
    }
    let text = String::from_utf8_lossy(bytes);
    let without_script_style = SCRIPT_OR_STYLE.replace_all(&text, "");
    let without_tags = TAGS.replace_all(&without_script_style, " ");
    let decoded = decode_entities(&without_tags);
    let collapsed = WHITESPACE.replace_all(decoded.trim(), " ").to_string();
    Ok(Normalized::Text(collapsed))
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

fn normalize_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace("\r\n", "\n").replace('\r', "\n")
}

fn normalize_json(bytes: &[u8]) -> Option<Normalized> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    serde_json::to_string(&value).ok().map(Normalized::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_strips_script_and_collapses_tags() {
        let html = b"<html><body>Hi</body></html>";
        match normalize(html, "text/html").unwrap() {
            Normalized::Text(t) => assert_eq!(t, "Hi"),
            Normalized::Skipped { .. } => panic!("expected text"),
        }
    }

    #[test]
    fn html_removes_script_blocks_entirely() {
        let html = b"<p>A</p><script>alert(1)</script><p>B</p>";
        match normalize(html, "text/html").unwrap() {
            Normalized::Text(t) => assert_eq!(t, "A B"),
            Normalized::Skipped { .. } => panic!("expected text"),
        }
    }

    #[test]
    fn text_folds_crlf_newlines() {
        let normalized = normalize_text(b"a\r\nb\rc\n");
        assert_eq!(normalized, "a\nb\nc\n");
    }

    #[test]
    fn json_is_reemitted_compactly() {
        match normalize(b"{\n  \"a\": 1\n}", "application/json").unwrap() {
            Normalized::Text(t) => assert_eq!(t, "{\"a\":1}"),
            Normalized::Skipped { .. } => panic!("expected text"),
        }
    }

    #[test]
    fn unsupported_content_type_is_skipped() {
        match normalize(b"\x89PNG", "image/png").unwrap() {
            Normalized::Skipped { content_type } => assert_eq!(content_type, "image/png"),
            Normalized::Text(_) => panic!("expected skip"),
        }
    }

    #[test]
    fn oversized_html_is_rejected() {
        let huge = vec![b'a'; MAX_HTML_BYTES + 1];
        assert!(matches!(normalize(&huge, "text/html"), Err(IngestError::ContentTooLarge)));
    }
}
