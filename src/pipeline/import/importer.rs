use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::format::{sanitize_filename, validate_payload};
use super::hash::compute_content_hash;
use super::ImportError;
use crate::db::repository;
use crate::models::enums::UploadStatus;
use crate::models::UploadArtifact;

/// What the upload entrypoint hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub upload_id: Uuid,
    pub kit_id: Uuid,
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub content_hash: String,
    pub status: UploadStatus,
    /// Earlier artifact of this kit with identical bytes. Re-uploads are
    /// accepted; this is informational only.
    pub duplicate_of: Option<Uuid>,
}

/// Accept a lab report PDF for a kit and record it as an UPLOADED artifact.
///
/// The payload is written to `<upload_dir>/<artifact-id>.pdf` before the row
/// is inserted; a failed insert removes the file again.
pub fn upload_report(
    conn: &Connection,
    upload_dir: &Path,
    kit_id: &Uuid,
    filename: &str,
    payload: &[u8],
) -> Result<UploadReceipt, ImportError> {
    let original_filename = sanitize_filename(filename);
    tracing::info!(kit_id = %kit_id, file = %original_filename, "Starting report upload");

    validate_payload(&original_filename, payload)?;

    let order = repository::get_order_for_kit(conn, kit_id)?
        .ok_or(ImportError::KitNotFound(*kit_id))?;
    if !order.status.permits_result_upload() {
        return Err(ImportError::OrderNotAccepting {
            order_id: order.id,
            status: order.status,
        });
    }

    let content_hash = compute_content_hash(payload);
    let duplicate_of = repository::find_upload_by_hash(conn, kit_id, &content_hash)?;
    if let Some(existing) = duplicate_of {
        tracing::info!(
            kit_id = %kit_id,
            duplicate_of = %existing,
            "Identical report already uploaded for this kit"
        );
    }

    let upload_id = Uuid::new_v4();
    let payload_path = store_payload(upload_dir, &upload_id, payload)?;

    let upload = UploadArtifact {
        id: upload_id,
        kit_id: *kit_id,
        payload_path: payload_path.to_string_lossy().to_string(),
        original_filename: original_filename.clone(),
        file_size_bytes: payload.len() as u64,
        content_hash: content_hash.clone(),
        status: UploadStatus::Uploaded,
        extracted_text: None,
        extraction_strategy: None,
        confidence_score: 0.0,
        result_count: 0,
        processing_notes: String::new(),
        uploaded_at: Utc::now(),
        processing_started_at: None,
        processing_completed_at: None,
    };
    if let Err(e) = repository::insert_upload(conn, &upload) {
        if let Err(cleanup) = std::fs::remove_file(&payload_path) {
            tracing::warn!(path = %payload_path.display(), error = %cleanup, "Failed to remove orphaned payload");
        }
        return Err(e.into());
    }

    tracing::info!(
        upload_id = %upload_id,
        kit_id = %kit_id,
        size = payload.len(),
        "Report uploaded"
    );

    Ok(UploadReceipt {
        upload_id,
        kit_id: *kit_id,
        original_filename,
        file_size_bytes: upload.file_size_bytes,
        content_hash,
        status: upload.status,
        duplicate_of,
    })
}

/// Read a PDF from disk and pass it through [`upload_report`].
pub fn upload_report_file(
    conn: &Connection,
    upload_dir: &Path,
    kit_id: &Uuid,
    source_path: &Path,
) -> Result<UploadReceipt, ImportError> {
    let filename = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.pdf");
    let payload = std::fs::read(source_path)?;
    upload_report(conn, upload_dir, kit_id, filename, &payload)
}

fn store_payload(upload_dir: &Path, upload_id: &Uuid, payload: &[u8]) -> Result<PathBuf, ImportError> {
    std::fs::create_dir_all(upload_dir)?;
    let target = upload_dir.join(format!("{upload_id}.pdf"));
    std::fs::write(&target, payload)?;
    tracing::debug!(upload_id = %upload_id, path = %target.display(), "Payload stored");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::order_with_kit;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::OrderStatus;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj << >> endobj\n%%EOF\n";

    #[test]
    fn upload_stores_payload_and_row() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);

        let receipt = upload_report(&conn, dir.path(), &kit_id, "lab.pdf", PDF).unwrap();
        assert_eq!(receipt.status, UploadStatus::Uploaded);
        assert!(receipt.duplicate_of.is_none());

        let stored = dir.path().join(format!("{}.pdf", receipt.upload_id));
        assert_eq!(std::fs::read(&stored).unwrap(), PDF);

        let upload = repository::get_upload(&conn, &receipt.upload_id).unwrap().unwrap();
        assert_eq!(upload.file_size_bytes, PDF.len() as u64);
        assert_eq!(upload.content_hash, compute_content_hash(PDF));
        assert_eq!(upload.original_filename, "lab.pdf");
    }

    #[test]
    fn order_before_sample_received_rejected() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::KitShipped);

        let err = upload_report(&conn, dir.path(), &kit_id, "lab.pdf", PDF).unwrap_err();
        assert!(matches!(
            err,
            ImportError::OrderNotAccepting { status: OrderStatus::KitShipped, .. }
        ));
        assert!(repository::list_uploads_for_kit(&conn, &kit_id).unwrap().is_empty());
    }

    #[test]
    fn results_generated_order_accepts_reupload() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::ResultsGenerated);

        let first = upload_report(&conn, dir.path(), &kit_id, "lab.pdf", PDF).unwrap();
        let second = upload_report(&conn, dir.path(), &kit_id, "lab.pdf", PDF).unwrap();
        assert_ne!(first.upload_id, second.upload_id);
        assert_eq!(second.duplicate_of, Some(first.upload_id));
    }

    #[test]
    fn unknown_kit_rejected() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = upload_report(&conn, dir.path(), &Uuid::new_v4(), "lab.pdf", PDF).unwrap_err();
        assert!(matches!(err, ImportError::KitNotFound(_)));
    }

    #[test]
    fn invalid_payload_writes_nothing() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);

        assert!(upload_report(&conn, dir.path(), &kit_id, "lab.txt", PDF).is_err());
        assert!(upload_report(&conn, dir.path(), &kit_id, "lab.pdf", b"hello").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn upload_from_file_uses_source_name() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::Processing);
        let source = dir.path().join("GenomeReport.pdf");
        std::fs::write(&source, PDF).unwrap();

        let receipt = upload_report_file(&conn, &dir.path().join("uploads"), &kit_id, &source).unwrap();
        assert_eq!(receipt.original_filename, "GenomeReport.pdf");
    }
}
