use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Prefix of the line that opens every page block in extracted text.
pub const PAGE_MARKER_PREFIX: &str = "--- Page ";

/// Text of one PDF page, 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Successful outcome of the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Page blocks joined with explicit `--- Page N ---` markers.
    pub text: String,
    /// Name of the strategy that produced `text`.
    pub strategy: String,
    pub page_count: usize,
}

/// One way of turning PDF bytes into page text.
///
/// Strategies are tried in order by the orchestrator; an `Err` or an
/// all-blank result moves on to the next one.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

/// PDF page rasterizer feeding the OCR strategy.
pub trait PdfPageRenderer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render a 0-based page to PNG bytes.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Image → text engine (vision model over HTTP in production).
pub trait VisionOcrEngine: Send + Sync {
    fn extract_text_from_image(&self, png_bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Render the page marker line for a 1-based page.
pub fn page_marker(page_number: usize) -> String {
    format!("{PAGE_MARKER_PREFIX}{page_number} ---")
}

/// Parse a marker line back into its page number.
pub fn parse_page_marker(line: &str) -> Option<usize> {
    line.trim()
        .strip_prefix(PAGE_MARKER_PREFIX)?
        .strip_suffix(" ---")?
        .trim()
        .parse()
        .ok()
}

/// Join pages into one text, each preceded by its marker line.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| format!("{}\n{}", page_marker(p.page_number), p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trip() {
        assert_eq!(page_marker(3), "--- Page 3 ---");
        assert_eq!(parse_page_marker("--- Page 3 ---"), Some(3));
        assert_eq!(parse_page_marker("  --- Page 12 ---  "), Some(12));
        assert_eq!(parse_page_marker("--- Page x ---"), None);
        assert_eq!(parse_page_marker("Page 3"), None);
    }

    #[test]
    fn join_prefixes_every_page() {
        let pages = vec![
            PageText { page_number: 1, text: "Summary".into() },
            PageText { page_number: 2, text: "Details".into() },
        ];
        assert_eq!(
            join_pages(&pages),
            "--- Page 1 ---\nSummary\n\n--- Page 2 ---\nDetails"
        );
    }
}
