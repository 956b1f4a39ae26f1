//! PDF text extraction backed by PDFium.

use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::ExtractionError;

use super::{ExtractedText, TextExtractor};

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ExtractionError::LibraryUnavailable {
            message: format!("{:?}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Extracts the text layer of every page with PDFium
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumExtractor;

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, content: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let pdfium = create_pdfium()?;

        let document =
            pdfium
                .load_pdf_from_byte_slice(content, None)
                .map_err(|e| ExtractionError::Load {
                    message: format!("{:?}", e),
                })?;

        let page_count = document.pages().len() as u32;
        let mut page_texts = Vec::with_capacity(page_count as usize);

        for (page_index, page) in document.pages().iter().enumerate() {
            let page_num = page_index as u32 + 1;
            let text = page.text().map_err(|e| ExtractionError::Page {
                page: page_num,
                message: format!("{:?}", e),
            })?;
            page_texts.push(text.all());
        }

        let text = page_texts.join("\n\n");

        debug!(
            pages = page_count,
            bytes = content.len(),
            chars = text.len(),
            "PDF text extracted"
        );

        Ok(ExtractedText { text, page_count })
    }
}
