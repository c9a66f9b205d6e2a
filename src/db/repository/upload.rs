use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{is_constraint_violation, parse_uuid, DatabaseError};
use crate::models::enums::UploadStatus;
use crate::models::UploadArtifact;

const UPLOAD_COLUMNS: &str = "id, kit_id, payload_path, original_filename, file_size_bytes,
     content_hash, status, extracted_text, extraction_strategy, confidence_score,
     result_count, processing_notes, uploaded_at, processing_started_at,
     processing_completed_at";

/// Outcome of trying to move an artifact into PROCESSING.
#[derive(Debug, Clone, PartialEq)]
pub enum RunClaim {
    Claimed,
    /// Another artifact of the same kit is already being processed.
    KitBusy,
    /// The artifact's current status does not allow a new run.
    NotClaimable(UploadStatus),
}

pub fn insert_upload(conn: &Connection, upload: &UploadArtifact) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO upload_artifacts ({UPLOAD_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
        params![
            upload.id.to_string(),
            upload.kit_id.to_string(),
            upload.payload_path,
            upload.original_filename,
            upload.file_size_bytes as i64,
            upload.content_hash,
            upload.status.as_str(),
            upload.extracted_text,
            upload.extraction_strategy,
            upload.confidence_score,
            upload.result_count,
            upload.processing_notes,
            upload.uploaded_at,
            upload.processing_started_at,
            upload.processing_completed_at,
        ],
    )?;
    Ok(())
}

pub fn get_upload(conn: &Connection, id: &Uuid) -> Result<Option<UploadArtifact>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {UPLOAD_COLUMNS} FROM upload_artifacts WHERE id = ?1"),
            params![id.to_string()],
            upload_row_from_rusqlite,
        )
        .optional()?;
    row.map(upload_from_row).transpose()
}

pub fn list_uploads_for_kit(
    conn: &Connection,
    kit_id: &Uuid,
) -> Result<Vec<UploadArtifact>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {UPLOAD_COLUMNS} FROM upload_artifacts WHERE kit_id = ?1 ORDER BY uploaded_at ASC"
    ))?;
    let rows = stmt.query_map(params![kit_id.to_string()], upload_row_from_rusqlite)?;

    let mut uploads = Vec::new();
    for row in rows {
        uploads.push(upload_from_row(row?)?);
    }
    Ok(uploads)
}

/// Earlier artifact of the same kit with identical content, if any.
pub fn find_upload_by_hash(
    conn: &Connection,
    kit_id: &Uuid,
    content_hash: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM upload_artifacts WHERE kit_id = ?1 AND content_hash = ?2
             ORDER BY uploaded_at ASC LIMIT 1",
            params![kit_id.to_string(), content_hash],
            |row| row.get(0),
        )
        .optional()?;
    id.as_deref().map(parse_uuid).transpose()
}

/// Move an artifact into PROCESSING and stamp the start time.
///
/// The partial unique index on (kit_id) WHERE status = 'processing' makes this
/// the per-kit in-flight marker: a second claim for the same kit fails with a
/// constraint violation, reported as [`RunClaim::KitBusy`].
pub fn claim_upload_run(
    conn: &Connection,
    id: &Uuid,
    started_at: DateTime<Utc>,
) -> Result<RunClaim, DatabaseError> {
    let status = current_status(conn, id)?;
    if !status.can_start_run() {
        return Ok(RunClaim::NotClaimable(status));
    }

    let result = conn.execute(
        "UPDATE upload_artifacts
         SET status = 'processing', processing_started_at = ?1, processing_completed_at = NULL
         WHERE id = ?2 AND status IN ('uploaded', 'completed', 'failed')",
        params![started_at, id.to_string()],
    );

    match result {
        Ok(1) => Ok(RunClaim::Claimed),
        // Status changed between the read and the update.
        Ok(_) => Ok(RunClaim::NotClaimable(current_status(conn, id)?)),
        Err(e) if is_constraint_violation(&e) => Ok(RunClaim::KitBusy),
        Err(e) => Err(e.into()),
    }
}

pub fn record_extracted_text(
    conn: &Connection,
    id: &Uuid,
    text: &str,
    strategy: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE upload_artifacts SET extracted_text = ?1, extraction_strategy = ?2 WHERE id = ?3",
        params![text, strategy, id.to_string()],
    )?;
    Ok(())
}

/// Append lines to the artifact's processing notes. Notes are never rewritten.
pub fn append_processing_notes(
    conn: &Connection,
    id: &Uuid,
    notes: &str,
) -> Result<(), DatabaseError> {
    if notes.is_empty() {
        return Ok(());
    }
    conn.execute(
        "UPDATE upload_artifacts SET processing_notes = processing_notes || ?1 WHERE id = ?2",
        params![notes, id.to_string()],
    )?;
    Ok(())
}

pub fn complete_upload(
    conn: &Connection,
    id: &Uuid,
    result_count: u32,
    confidence_score: f64,
    completed_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    finish_upload(conn, id, UploadStatus::Completed, Some((result_count, confidence_score)), completed_at)
}

pub fn fail_upload(
    conn: &Connection,
    id: &Uuid,
    completed_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    finish_upload(conn, id, UploadStatus::Failed, None, completed_at)
}

fn finish_upload(
    conn: &Connection,
    id: &Uuid,
    status: UploadStatus,
    stats: Option<(u32, f64)>,
    completed_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = match stats {
        Some((result_count, confidence_score)) => conn.execute(
            "UPDATE upload_artifacts
             SET status = ?1, result_count = ?2, confidence_score = ?3, processing_completed_at = ?4
             WHERE id = ?5",
            params![status.as_str(), result_count, confidence_score, completed_at, id.to_string()],
        )?,
        None => conn.execute(
            "UPDATE upload_artifacts SET status = ?1, processing_completed_at = ?2 WHERE id = ?3",
            params![status.as_str(), completed_at, id.to_string()],
        )?,
    };
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "UploadArtifact".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn current_status(conn: &Connection, id: &Uuid) -> Result<UploadStatus, DatabaseError> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM upload_artifacts WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match status {
        Some(s) => UploadStatus::from_str(&s),
        None => Err(DatabaseError::NotFound {
            entity_type: "UploadArtifact".into(),
            id: id.to_string(),
        }),
    }
}

// Internal row type for UploadArtifact mapping
struct UploadRow {
    id: String,
    kit_id: String,
    payload_path: String,
    original_filename: String,
    file_size_bytes: i64,
    content_hash: String,
    status: String,
    extracted_text: Option<String>,
    extraction_strategy: Option<String>,
    confidence_score: f64,
    result_count: i64,
    processing_notes: String,
    uploaded_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    processing_completed_at: Option<DateTime<Utc>>,
}

fn upload_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<UploadRow, rusqlite::Error> {
    Ok(UploadRow {
        id: row.get(0)?,
        kit_id: row.get(1)?,
        payload_path: row.get(2)?,
        original_filename: row.get(3)?,
        file_size_bytes: row.get(4)?,
        content_hash: row.get(5)?,
        status: row.get(6)?,
        extracted_text: row.get(7)?,
        extraction_strategy: row.get(8)?,
        confidence_score: row.get(9)?,
        result_count: row.get(10)?,
        processing_notes: row.get(11)?,
        uploaded_at: row.get(12)?,
        processing_started_at: row.get(13)?,
        processing_completed_at: row.get(14)?,
    })
}

fn upload_from_row(row: UploadRow) -> Result<UploadArtifact, DatabaseError> {
    Ok(UploadArtifact {
        id: parse_uuid(&row.id)?,
        kit_id: parse_uuid(&row.kit_id)?,
        payload_path: row.payload_path,
        original_filename: row.original_filename,
        file_size_bytes: row.file_size_bytes.max(0) as u64,
        content_hash: row.content_hash,
        status: UploadStatus::from_str(&row.status)?,
        extracted_text: row.extracted_text,
        extraction_strategy: row.extraction_strategy,
        confidence_score: row.confidence_score,
        result_count: row.result_count.max(0) as u32,
        processing_notes: row.processing_notes,
        uploaded_at: row.uploaded_at,
        processing_started_at: row.processing_started_at,
        processing_completed_at: row.processing_completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::{order_with_kit, upload_for_kit};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::OrderStatus;

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        let loaded = get_upload(&conn, &upload.id).unwrap().unwrap();
        assert_eq!(loaded.kit_id, kit_id);
        assert_eq!(loaded.status, UploadStatus::Uploaded);
        assert_eq!(loaded.file_size_bytes, 2048);
        assert!(loaded.extracted_text.is_none());
        assert!(loaded.processing_started_at.is_none());
    }

    #[test]
    fn claim_moves_to_processing() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        let claim = claim_upload_run(&conn, &upload.id, Utc::now()).unwrap();
        assert_eq!(claim, RunClaim::Claimed);

        let loaded = get_upload(&conn, &upload.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Processing);
        assert!(loaded.processing_started_at.is_some());
    }

    #[test]
    fn second_claim_on_same_kit_is_busy() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let first = upload_for_kit(&conn, kit_id);
        let second = upload_for_kit(&conn, kit_id);

        assert_eq!(claim_upload_run(&conn, &first.id, Utc::now()).unwrap(), RunClaim::Claimed);
        assert_eq!(claim_upload_run(&conn, &second.id, Utc::now()).unwrap(), RunClaim::KitBusy);

        // The busy artifact is left untouched
        let loaded = get_upload(&conn, &second.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Uploaded);
    }

    #[test]
    fn processing_artifact_cannot_be_claimed_twice() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        claim_upload_run(&conn, &upload.id, Utc::now()).unwrap();
        let claim = claim_upload_run(&conn, &upload.id, Utc::now()).unwrap();
        assert_eq!(claim, RunClaim::NotClaimable(UploadStatus::Processing));
    }

    #[test]
    fn completed_artifact_can_be_rerun() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        claim_upload_run(&conn, &upload.id, Utc::now()).unwrap();
        complete_upload(&conn, &upload.id, 3, 72.5, Utc::now()).unwrap();

        let loaded = get_upload(&conn, &upload.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Completed);
        assert_eq!(loaded.result_count, 3);
        assert!((loaded.confidence_score - 72.5).abs() < f64::EPSILON);
        assert!(loaded.processing_completed_at.is_some());

        assert_eq!(claim_upload_run(&conn, &upload.id, Utc::now()).unwrap(), RunClaim::Claimed);
    }

    #[test]
    fn notes_are_appended() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        append_processing_notes(&conn, &upload.id, "first\n").unwrap();
        append_processing_notes(&conn, &upload.id, "").unwrap();
        append_processing_notes(&conn, &upload.id, "second\n").unwrap();

        let loaded = get_upload(&conn, &upload.id).unwrap().unwrap();
        assert_eq!(loaded.processing_notes, "first\nsecond\n");
    }

    #[test]
    fn fail_keeps_existing_counts() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);

        fail_upload(&conn, &upload.id, Utc::now()).unwrap();
        let loaded = get_upload(&conn, &upload.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Failed);
        assert_eq!(loaded.result_count, 0);
    }

    #[test]
    fn claim_unknown_artifact_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = claim_upload_run(&conn, &Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
