//! Vision OCR fallback for image-only PDFs.
//!
//! Each page is rasterized with a [`PdfPageRenderer`] and transcribed by a
//! [`VisionOcrEngine`]. The production engine is a local Ollama vision model.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{ExtractionStrategy, PageText, PdfPageRenderer, VisionOcrEngine};
use super::ExtractionError;

const TRANSCRIBE_SYSTEM_PROMPT: &str = "\
You are a laboratory report transcriber. Reproduce ALL visible text from the \
page image exactly as printed. Keep one table row per line and separate \
sections with a blank line. Do not summarize, interpret or add commentary.";

const TRANSCRIBE_USER_PROMPT: &str = "Transcribe the text of this genetic test report page.";

/// Ollama HTTP client for vision-model transcription.
pub struct OllamaVisionOcr {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl OllamaVisionOcr {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::OcrProcessing(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    images: Vec<String>,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl VisionOcrEngine for OllamaVisionOcr {
    fn extract_text_from_image(&self, png_bytes: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!(
            "vision_ocr_extract",
            model = %self.model,
            image_size = png_bytes.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: TRANSCRIBE_USER_PROMPT,
            system: TRANSCRIBE_SYSTEM_PROMPT,
            images: vec![base64::engine::general_purpose::STANDARD.encode(png_bytes)],
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::OcrConnection(self.base_url.clone())
            } else if e.is_timeout() {
                ExtractionError::OcrProcessing(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                ExtractionError::OcrProcessing(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OcrProcessing(format!(
                "Ollama returned {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::OcrProcessing(format!("invalid response: {e}")))?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = parsed.response.len(),
            "Vision OCR page transcribed"
        );
        Ok(parsed.response)
    }
}

/// Third strategy in the chain: render every page and OCR it.
pub struct VisionOcrStrategy {
    renderer: Box<dyn PdfPageRenderer>,
    engine: Box<dyn VisionOcrEngine>,
    dpi: u32,
}

impl VisionOcrStrategy {
    pub fn new(renderer: Box<dyn PdfPageRenderer>, engine: Box<dyn VisionOcrEngine>, dpi: u32) -> Self {
        Self { renderer, engine, dpi }
    }
}

impl ExtractionStrategy for VisionOcrStrategy {
    fn name(&self) -> &'static str {
        "vision-ocr"
    }

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let page_count = self.renderer.page_count(pdf_bytes)?;
        let mut pages = Vec::with_capacity(page_count);

        for index in 0..page_count {
            let png = self.renderer.render_page(pdf_bytes, index, self.dpi)?;
            let text = self.engine.extract_text_from_image(&png)?;
            tracing::debug!(page = index + 1, chars = text.len(), "OCR page done");
            pages.push(PageText {
                page_number: index + 1,
                text,
            });
        }
        Ok(pages)
    }
}
