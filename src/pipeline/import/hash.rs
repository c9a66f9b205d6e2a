use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};

use super::ImportError;

/// SHA-256 of a payload, base64 encoded.
pub fn compute_content_hash(payload: &[u8]) -> String {
    let hash = Sha256::digest(payload);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Same as [`compute_content_hash`], reading the payload from disk.
pub fn compute_file_hash(path: &Path) -> Result<String, ImportError> {
    let content = std::fs::read(path)?;
    Ok(compute_content_hash(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        let a = compute_content_hash(b"%PDF-1.4 genotype report");
        let b = compute_content_hash(b"%PDF-1.4 genotype report");
        assert_eq!(a, b);
        // 32 bytes -> 44 base64 chars
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(
            compute_content_hash(b"%PDF-1.4 report A"),
            compute_content_hash(b"%PDF-1.4 report B")
        );
    }

    #[test]
    fn file_hash_matches_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7 body").unwrap();
        assert_eq!(
            compute_file_hash(&path).unwrap(),
            compute_content_hash(b"%PDF-1.7 body")
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = compute_file_hash(Path::new("/nonexistent/report.pdf"));
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
