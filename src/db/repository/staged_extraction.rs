use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{from_json_column, parse_optional_uuid, parse_uuid, to_json_column, DatabaseError};
use crate::models::enums::ResultCategory;
use crate::models::StagedExtraction;

const STAGED_COLUMNS: &str = "id, upload_id, trait_name, category, subcategory, result_value,
     confidence_label, risk_score, genetic_markers, methodology, recommendation,
     extraction_confidence, page_number, start_offset, end_offset, context_snippet,
     consolidated, consolidation_note, canonical_result_id, created_at";

/// What a re-pair displaced to keep the staged ↔ canonical link one-to-one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairOutcome {
    /// Result the staged row pointed at before, if it was a different one.
    pub previous_result: Option<Uuid>,
    /// Another staged row that pointed at the target result and was unlinked.
    pub displaced_staged: Option<Uuid>,
}

pub fn insert_staged(conn: &Connection, staged: &StagedExtraction) -> Result<(), DatabaseError> {
    let markers = to_json_column("genetic_markers", &staged.genetic_markers)?;
    conn.execute(
        &format!("INSERT INTO staged_extractions ({STAGED_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"),
        params![
            staged.id.to_string(),
            staged.upload_id.to_string(),
            staged.trait_name,
            staged.category.as_str(),
            staged.subcategory,
            staged.result_value,
            staged.confidence_label,
            staged.risk_score,
            markers,
            staged.methodology,
            staged.recommendation,
            staged.extraction_confidence,
            staged.page_number,
            staged.start_offset as i64,
            staged.end_offset as i64,
            staged.context_snippet,
            staged.consolidated as i32,
            staged.consolidation_note,
            staged.canonical_result_id.map(|id| id.to_string()),
            staged.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_staged(conn: &Connection, id: &Uuid) -> Result<Option<StagedExtraction>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {STAGED_COLUMNS} FROM staged_extractions WHERE id = ?1"),
            params![id.to_string()],
            staged_row_from_rusqlite,
        )
        .optional()?;
    row.map(staged_from_row).transpose()
}

/// All staged rows of an upload in document order.
pub fn list_staged_for_upload(
    conn: &Connection,
    upload_id: &Uuid,
) -> Result<Vec<StagedExtraction>, DatabaseError> {
    query_staged(
        conn,
        &format!(
            "SELECT {STAGED_COLUMNS} FROM staged_extractions
             WHERE upload_id = ?1 ORDER BY start_offset ASC, created_at ASC"
        ),
        upload_id,
    )
}

pub fn count_staged_for_upload(conn: &Connection, upload_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM staged_extractions WHERE upload_id = ?1",
        params![upload_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// The staged row currently linked to a canonical result, if any.
pub fn find_staged_linked_to(
    conn: &Connection,
    result_id: &Uuid,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM staged_extractions WHERE canonical_result_id = ?1",
            params![result_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    id.as_deref().map(parse_uuid).transpose()
}

/// Link a staged row to a canonical result, keeping the pairing one-to-one.
///
/// Order matters: the staged row is detached from its old result, then any
/// other staged row holding the target result is detached, and only then is
/// the new link written. The partial unique index on `canonical_result_id`
/// rejects any write that would skip one of these steps.
pub fn repair_staged_link(
    conn: &Connection,
    staged_id: &Uuid,
    result_id: &Uuid,
) -> Result<RepairOutcome, DatabaseError> {
    let mut outcome = RepairOutcome::default();

    let current: Option<Option<String>> = conn
        .query_row(
            "SELECT canonical_result_id FROM staged_extractions WHERE id = ?1",
            params![staged_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let current = match current {
        Some(link) => parse_optional_uuid(link)?,
        None => {
            return Err(DatabaseError::NotFound {
                entity_type: "StagedExtraction".into(),
                id: staged_id.to_string(),
            })
        }
    };

    if current == Some(*result_id) {
        return Ok(outcome);
    }

    if let Some(previous) = current {
        set_staged_link(conn, staged_id, None)?;
        outcome.previous_result = Some(previous);
    }

    if let Some(holder) = find_staged_linked_to(conn, result_id)? {
        set_staged_link(conn, &holder, None)?;
        outcome.displaced_staged = Some(holder);
    }

    set_staged_link(conn, staged_id, Some(result_id))?;
    Ok(outcome)
}

fn set_staged_link(
    conn: &Connection,
    staged_id: &Uuid,
    result_id: Option<&Uuid>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE staged_extractions SET canonical_result_id = ?1 WHERE id = ?2",
        params![result_id.map(|id| id.to_string()), staged_id.to_string()],
    )?;
    Ok(())
}

pub fn mark_consolidated(
    conn: &Connection,
    staged_id: &Uuid,
    note: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE staged_extractions SET consolidated = 1, consolidation_note = ?1 WHERE id = ?2",
        params![note, staged_id.to_string()],
    )?;
    Ok(())
}

fn query_staged(
    conn: &Connection,
    sql: &str,
    upload_id: &Uuid,
) -> Result<Vec<StagedExtraction>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![upload_id.to_string()], staged_row_from_rusqlite)?;

    let mut staged = Vec::new();
    for row in rows {
        staged.push(staged_from_row(row?)?);
    }
    Ok(staged)
}

// Internal row type for StagedExtraction mapping
struct StagedRow {
    id: String,
    upload_id: String,
    trait_name: String,
    category: String,
    subcategory: Option<String>,
    result_value: String,
    confidence_label: String,
    risk_score: Option<f64>,
    genetic_markers: String,
    methodology: Option<String>,
    recommendation: Option<String>,
    extraction_confidence: f64,
    page_number: u32,
    start_offset: i64,
    end_offset: i64,
    context_snippet: String,
    consolidated: i32,
    consolidation_note: Option<String>,
    canonical_result_id: Option<String>,
    created_at: DateTime<Utc>,
}

fn staged_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<StagedRow, rusqlite::Error> {
    Ok(StagedRow {
        id: row.get(0)?,
        upload_id: row.get(1)?,
        trait_name: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        result_value: row.get(5)?,
        confidence_label: row.get(6)?,
        risk_score: row.get(7)?,
        genetic_markers: row.get(8)?,
        methodology: row.get(9)?,
        recommendation: row.get(10)?,
        extraction_confidence: row.get(11)?,
        page_number: row.get(12)?,
        start_offset: row.get(13)?,
        end_offset: row.get(14)?,
        context_snippet: row.get(15)?,
        consolidated: row.get(16)?,
        consolidation_note: row.get(17)?,
        canonical_result_id: row.get(18)?,
        created_at: row.get(19)?,
    })
}

fn staged_from_row(row: StagedRow) -> Result<StagedExtraction, DatabaseError> {
    Ok(StagedExtraction {
        id: parse_uuid(&row.id)?,
        upload_id: parse_uuid(&row.upload_id)?,
        trait_name: row.trait_name,
        category: ResultCategory::from_label(&row.category),
        subcategory: row.subcategory,
        result_value: row.result_value,
        confidence_label: row.confidence_label,
        risk_score: row.risk_score,
        genetic_markers: from_json_column("genetic_markers", &row.genetic_markers)?,
        methodology: row.methodology,
        recommendation: row.recommendation,
        extraction_confidence: row.extraction_confidence,
        page_number: row.page_number,
        start_offset: row.start_offset.max(0) as usize,
        end_offset: row.end_offset.max(0) as usize,
        context_snippet: row.context_snippet,
        consolidated: row.consolidated != 0,
        consolidation_note: row.consolidation_note,
        canonical_result_id: parse_optional_uuid(row.canonical_result_id)?,
        created_at: row.created_at,
    })
}
