use std::path::Path;

use super::ImportError;
use crate::config::MAX_UPLOAD_BYTES;

/// Every PDF starts with `%PDF`.
pub const PDF_MAGIC: [u8; 4] = [0x25, 0x50, 0x44, 0x46];

/// Extension check on the client-supplied name. Case-insensitive.
pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// True when the payload starts with the PDF header.
pub fn is_pdf_payload(payload: &[u8]) -> bool {
    payload.starts_with(&PDF_MAGIC)
}

/// Reject anything that is not a plausibly valid lab report PDF.
///
/// Checks run cheapest first: extension, emptiness, size limit, magic bytes.
pub fn validate_payload(filename: &str, payload: &[u8]) -> Result<(), ImportError> {
    if !has_pdf_extension(filename) {
        return Err(ImportError::UnsupportedFormat(filename.to_string()));
    }
    if payload.is_empty() {
        return Err(ImportError::EmptyPayload);
    }
    let size = payload.len() as u64;
    if size > MAX_UPLOAD_BYTES {
        return Err(ImportError::FileTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: MAX_UPLOAD_BYTES / (1024 * 1024),
        });
    }
    if !is_pdf_payload(payload) {
        return Err(ImportError::NotAPdf);
    }
    Ok(())
}

/// Sanitize a filename: strip path components, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.pdf");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0') && !c.is_control())
        .take(255)
        .collect();

    if clean.is_empty() {
        "report.pdf".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n";

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_pdf_extension("results.pdf"));
        assert!(has_pdf_extension("RESULTS.PDF"));
        assert!(!has_pdf_extension("results.pdf.exe"));
        assert!(!has_pdf_extension("results"));
    }

    #[test]
    fn valid_pdf_passes() {
        assert!(validate_payload("lab.pdf", MINIMAL_PDF).is_ok());
    }

    #[test]
    fn wrong_extension_rejected() {
        assert!(matches!(
            validate_payload("lab.docx", MINIMAL_PDF),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            validate_payload("lab.pdf", &[]),
            Err(ImportError::EmptyPayload)
        ));
    }

    #[test]
    fn renamed_png_rejected_by_magic_bytes() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert!(matches!(
            validate_payload("lab.pdf", &png),
            Err(ImportError::NotAPdf)
        ));
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut big = MINIMAL_PDF.to_vec();
        big.resize(MAX_UPLOAD_BYTES as usize + 1, b' ');
        match validate_payload("lab.pdf", &big) {
            Err(ImportError::FileTooLarge { max_mb, .. }) => assert_eq!(max_mb, 10),
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn payload_at_limit_accepted() {
        let mut exact = MINIMAL_PDF.to_vec();
        exact.resize(MAX_UPLOAD_BYTES as usize, b' ');
        assert!(validate_payload("lab.pdf", &exact).is_ok());
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitize_filename(""), "report.pdf");
    }

    #[test]
    fn sanitize_preserves_normal_names() {
        assert_eq!(sanitize_filename("Genome Report 2024.pdf"), "Genome Report 2024.pdf");
    }
}
