use super::types::{ExtractionStrategy, PageText};
use super::ExtractionError;

/// Generic text-layer extraction with the pdf-extract crate.
/// Handles digital PDFs with embedded text; pure Rust, no native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractStrategy;

impl ExtractionStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        Ok(page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i + 1,
                text,
            })
            .collect())
    }
}
