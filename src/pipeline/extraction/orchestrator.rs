use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use super::notes::{ProcessingNotes, StrategyOutcome};
use super::ocr::{OllamaVisionOcr, VisionOcrStrategy};
use super::pdf::PdfExtractStrategy;
use super::pdfium::{PdfiumRenderer, PdfiumTextStrategy};
use super::sanitize::{is_blank, sanitize_extracted_text};
use super::types::{join_pages, ExtractedDocument, ExtractionStrategy, PageText};
use super::ExtractionError;
use crate::config::PipelineSettings;

/// Runs the ordered fallback chain of text extraction strategies.
/// Uses trait objects for every strategy, enabling dependency injection.
pub struct TextExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl TextExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Production chain: PDFium layout text, pdf-extract, vision OCR.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ExtractionError> {
        let library_dir = settings.pdfium_library_dir.clone();
        let ocr_engine = OllamaVisionOcr::new(
            &settings.ollama_url,
            &settings.ocr_model,
            settings.ocr_timeout(),
        )?;

        Ok(Self::new(vec![
            Box::new(PdfiumTextStrategy::new(library_dir.clone())),
            Box::new(PdfExtractStrategy),
            Box::new(VisionOcrStrategy::new(
                Box::new(PdfiumRenderer::new(library_dir)),
                Box::new(ocr_engine),
                settings.render_dpi,
            )),
        ]))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order until one yields non-blank text.
    ///
    /// Every attempt is recorded in `notes`, whatever its outcome. A strategy
    /// that errors or panics is logged and the next one is tried.
    pub fn extract(
        &self,
        pdf_bytes: &[u8],
        notes: &mut ProcessingNotes,
    ) -> Result<ExtractedDocument, ExtractionError> {
        for strategy in &self.strategies {
            let name = strategy.name();
            tracing::debug!(strategy = name, "Trying extraction strategy");

            let pages = match run_guarded(strategy.as_ref(), pdf_bytes) {
                Ok(pages) => pages,
                Err(e) => {
                    tracing::warn!(strategy = name, error = %e, "Extraction strategy failed");
                    notes.record_strategy(name, &StrategyOutcome::Failed(e.to_string()));
                    continue;
                }
            };

            let pages: Vec<PageText> = pages
                .into_iter()
                .map(|p| PageText {
                    page_number: p.page_number,
                    text: sanitize_extracted_text(&p.text),
                })
                .collect();

            if pages.iter().all(|p| is_blank(&p.text)) {
                tracing::debug!(strategy = name, "Extraction strategy produced no text");
                notes.record_strategy(name, &StrategyOutcome::Empty);
                continue;
            }

            let text = join_pages(&pages);
            notes.record_strategy(
                name,
                &StrategyOutcome::Succeeded {
                    pages: pages.len(),
                    chars: text.chars().count(),
                },
            );
            tracing::info!(
                strategy = name,
                pages = pages.len(),
                chars = text.len(),
                failed_before = notes.failure_count(),
                "Text extraction complete"
            );
            return Ok(ExtractedDocument {
                text,
                strategy: name.to_string(),
                page_count: pages.len(),
            });
        }

        Err(ExtractionError::NoTextExtracted {
            attempts: self.strategies.len(),
        })
    }

    /// Read a stored payload and run the chain over it.
    pub fn extract_file(
        &self,
        path: &Path,
        notes: &mut ProcessingNotes,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = std::fs::read(path)?;
        self.extract(&bytes, notes)
    }
}

/// Run one strategy, turning a panic inside a PDF library into an error.
fn run_guarded(
    strategy: &dyn ExtractionStrategy,
    pdf_bytes: &[u8],
) -> Result<Vec<PageText>, ExtractionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| strategy.extract_pages(pdf_bytes))) {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(ExtractionError::PdfParsing(format!("strategy panicked: {reason}")))
        }
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use super::*;

    /// Strategy that returns fixed pages or a fixed error.
    pub struct MockStrategy {
        pub name: &'static str,
        pub result: Result<Vec<String>, String>,
    }

    impl MockStrategy {
        pub fn ok(name: &'static str, pages: &[&str]) -> Self {
            Self {
                name,
                result: Ok(pages.iter().map(|p| p.to_string()).collect()),
            }
        }

        pub fn failing(name: &'static str, reason: &str) -> Self {
            Self {
                name,
                result: Err(reason.to_string()),
            }
        }
    }

    impl ExtractionStrategy for MockStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
            match &self.result {
                Ok(pages) => Ok(pages
                    .iter()
                    .enumerate()
                    .map(|(i, text)| PageText {
                        page_number: i + 1,
                        text: text.clone(),
                    })
                    .collect()),
                Err(reason) => Err(ExtractionError::PdfParsing(reason.clone())),
            }
        }
    }

    /// Chain that yields the given pages from the second strategy.
    pub fn extractor_yielding(pages: &[&str]) -> TextExtractor {
        TextExtractor::new(vec![
            Box::new(MockStrategy::failing("pdfium", "library missing")),
            Box::new(MockStrategy::ok("pdf-extract", pages)),
        ])
    }

    /// Chain where every strategy fails.
    pub fn extractor_failing() -> TextExtractor {
        TextExtractor::new(vec![
            Box::new(MockStrategy::failing("pdfium", "library missing")),
            Box::new(MockStrategy::failing("pdf-extract", "xref table broken")),
            Box::new(MockStrategy::failing("vision-ocr", "connection refused")),
        ])
    }
}
