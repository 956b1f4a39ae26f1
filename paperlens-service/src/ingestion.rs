//! Document ingestion.
//!
//! This module turns an uploaded file into the inputs of the analysis pipeline:
//! - A content fingerprint used as the cache key
//! - Plain text and page count extracted from the PDF
//! - Word and citation counts derived from that text

pub mod hash;
pub mod pdf;
pub mod stats;

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ExtractionError;

pub use hash::fingerprint;
pub use pdf::PdfiumExtractor;
pub use stats::{count_citations, count_words};

/// Plain text pulled out of an uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
}

/// Trait for PDF text extraction backends.
///
/// Extraction is CPU-bound and synchronous; callers go through
/// [`extract_text`] so it runs on the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, content: &[u8]) -> Result<ExtractedText, ExtractionError>;
}

/// Run `extractor` over `content` on tokio's blocking thread pool.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    content: Bytes,
) -> Result<ExtractedText, ExtractionError> {
    tokio::task::spawn_blocking(move || extractor.extract(&content))
        .await
        .map_err(ExtractionError::Join)?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperExtractor;

    impl TextExtractor for UpperExtractor {
        fn extract(&self, content: &[u8]) -> Result<ExtractedText, ExtractionError> {
            let text = String::from_utf8_lossy(content).to_uppercase();
            Ok(ExtractedText {
                text,
                page_count: 1,
            })
        }
    }

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract(&self, _content: &[u8]) -> Result<ExtractedText, ExtractionError> {
            panic!("extractor blew up");
        }
    }

    #[tokio::test]
    async fn test_extract_text_runs_extractor() {
        let extracted = extract_text(Arc::new(UpperExtractor), Bytes::from_static(b"paper"))
            .await
            .unwrap();
        assert_eq!(extracted.text, "PAPER");
        assert_eq!(extracted.page_count, 1);
    }

    #[tokio::test]
    async fn test_extract_text_panic_becomes_error() {
        let err = extract_text(Arc::new(PanickingExtractor), Bytes::from_static(b"paper"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Join(_)));
    }
}
