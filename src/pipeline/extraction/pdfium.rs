//! PDF access via Google PDFium.
//!
//! Two roles: the layout-aware text strategy that heads the fallback chain,
//! and the page rasterizer that feeds vision OCR.
//!
//! Both types are stateless (`Send + Sync`). Each operation binds a fresh
//! `Pdfium` instance because the upstream type is `!Send`. The OS caches
//! `dlopen` calls, so repeat loads are near-free.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{ExtractionStrategy, PageText, PdfPageRenderer};
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. Explicit directory from settings (`PDFIUM_DYNAMIC_LIB_PATH`)
/// 2. Alongside the running executable, then `<exe_dir>/pdfium/lib`
/// 3. System library search paths
fn load_pdfium(library_dir: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    if let Some(dir) = library_dir {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        debug!(path = ?lib_path, "Loading PDFium from configured directory");
        let bindings = Pdfium::bind_to_library(&lib_path).map_err(|e| {
            ExtractionError::PdfiumUnavailable(format!("failed to load {lib_path:?}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let candidates = [exe_dir.to_path_buf(), exe_dir.join("pdfium").join("lib")];
            for dir in &candidates {
                let lib_path =
                    Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium from candidate directory");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfiumUnavailable(format!(
            "not found; set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, detecting encrypted PDFs.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(format!("PDFium could not load document: {e}"))
    }
}

/// Layout-aware text extraction: PDFium reads text objects in visual order,
/// keeping table rows and multi-column results on their own lines.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextStrategy {
    library_dir: Option<PathBuf>,
}

impl PdfiumTextStrategy {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

impl ExtractionStrategy for PdfiumTextStrategy {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let pdfium = load_pdfium(self.library_dir.as_deref())?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ExtractionError::PdfParsing(format!("page {}: {e}", index + 1)))?
                .all();
            pages.push(PageText {
                page_number: index + 1,
                text,
            });
        }
        Ok(pages)
    }
}

/// Renders PDF pages to PNG images using Google PDFium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
///
/// Returns (width_px, height_px), both clamped to [1, MAX_DIMENSION_PX].
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium(self.library_dir.as_deref())?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let pdfium = load_pdfium(self.library_dir.as_deref())?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();
        let index = u16::try_from(page_index).map_err(|_| ExtractionError::PdfRendering {
            page: page_index,
            reason: format!("page index {page_index} exceeds u16 maximum"),
        })?;
        let page = pages.get(index).map_err(|_| ExtractionError::PdfRendering {
            page: page_index,
            reason: format!("out of range (document has {} pages)", pages.len()),
        })?;

        let (target_w, target_h) =
            compute_render_dimensions(page.width().value, page.height().value, dpi);
        if target_w == MAX_DIMENSION_PX || target_h == MAX_DIMENSION_PX {
            warn!(page = page_index, target_w, target_h, "Page dimensions capped");
        }

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ExtractionError::PdfRendering {
                page: page_index,
                reason: e.to_string(),
            })?;

        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
        let png_bytes = cursor.into_inner();

        debug!(
            page = page_index,
            width = target_w,
            height = target_h,
            png_size = png_bytes.len(),
            "Rendered PDF page to PNG"
        );
        Ok(png_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_at_200dpi() {
        // US Letter = 612 x 792 points
        let (w, h) = compute_render_dimensions(612.0, 792.0, 200);
        assert!(w > 1650 && w < 1750, "Letter width at 200dpi: got {w}");
        assert!(h > 2150 && h < 2250, "Letter height at 200dpi: got {h}");
    }

    #[test]
    fn dimension_guard_preserves_aspect_ratio() {
        let (w, h) = compute_render_dimensions(5000.0, 10000.0, 200);
        assert!(w <= MAX_DIMENSION_PX && h <= MAX_DIMENSION_PX);
        let ratio = h as f32 / w as f32;
        assert!((ratio - 2.0).abs() < 0.15, "Aspect ratio should be ~2:1, got {ratio}");
    }

    #[test]
    fn zero_points_clamped_to_1() {
        let (w, h) = compute_render_dimensions(0.0, 0.0, 200);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn strategy_name_is_stable() {
        assert_eq!(PdfiumTextStrategy::default().name(), "pdfium");
    }

    #[test]
    fn missing_library_dir_is_an_error_not_a_panic() {
        let strategy = PdfiumTextStrategy::new(Some(PathBuf::from("/nonexistent/pdfium")));
        let err = strategy.extract_pages(b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, ExtractionError::PdfiumUnavailable(_)));
    }
}
