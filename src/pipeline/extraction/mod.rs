pub mod types;
pub mod notes;
pub mod sanitize;
pub mod pdfium;
pub mod pdf;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use notes::*;
pub use sanitize::*;
pub use pdfium::*;
pub use pdf::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDFium library unavailable: {0}")]
    PdfiumUnavailable(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Cannot connect to OCR service at {0}")]
    OcrConnection(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("No text could be extracted ({attempts} strategies tried)")]
    NoTextExtracted { attempts: usize },
}
