//! Extract stage (spec §4.9 step 3): computes the metadata carried into
//! the container record.

use cyb_buckets::ContainerMetadata;
use cyb_core::Timestamp;

/// The extract stage's output: a populated [`ContainerMetadata`] plus the
/// moment extraction happened (spec §4.9: "extracted_at").
pub struct Extracted {
    pub metadata: ContainerMetadata,
    pub extracted_at: Timestamp,
}

/// Compute size/word/line/char counts over normalized text.
#[must_use]
pub fn extract(text: &str, source_url: Option<String>) -> Extracted {
    let metadata = ContainerMetadata {
        source_url,
        size: text.len(),
        word_count: text.split_whitespace().count(),
        line_count: text.lines().count(),
        char_count: text.chars().count(),
    };
    Extracted {
        metadata,
        extracted_at: Timestamp::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_lines_and_chars() {
        let extracted = extract("Hi there\nfriend", None);
        assert_eq!(extracted.metadata.word_count, 3);
        assert_eq!(extracted.metadata.line_count, 2);
        assert_eq!(extracted.metadata.char_count, 15);
        assert_eq!(extracted.metadata.size, 15);
    }

    #[test]
    fn carries_source_url_through() {
        let extracted = extract("x", Some("http://example.com".to_string()));
        assert_eq!(extracted.metadata.source_url.as_deref(), Some("http://example.com"));
    }
}
