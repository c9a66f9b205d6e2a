use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::insert_staged;
use crate::db::DatabaseError;
use crate::models::StagedExtraction;
use crate::pipeline::patterns::ExtractedTuple;
use crate::pipeline::scoring::score_tuple;

/// Build the immutable staged record for one tuple.
pub fn staged_from_tuple(upload_id: Uuid, tuple: &ExtractedTuple) -> StagedExtraction {
    StagedExtraction {
        id: Uuid::new_v4(),
        upload_id,
        trait_name: tuple.trait_name.clone(),
        category: tuple.category,
        subcategory: Some(tuple.subcategory.clone()),
        result_value: tuple.result_value.clone().unwrap_or_default(),
        confidence_label: tuple.confidence_label.clone().unwrap_or_default(),
        risk_score: tuple.risk_score,
        genetic_markers: tuple.genetic_markers.clone(),
        methodology: tuple.methodology.clone(),
        recommendation: tuple.recommendation.clone(),
        extraction_confidence: score_tuple(tuple),
        page_number: tuple.page_number,
        start_offset: tuple.start_offset,
        end_offset: tuple.end_offset,
        context_snippet: tuple.context_snippet.clone(),
        consolidated: false,
        consolidation_note: None,
        canonical_result_id: None,
        created_at: Utc::now(),
    }
}

/// Persist every tuple of one run as staged rows.
///
/// Commits in its own transaction, before consolidation starts, so staged
/// provenance survives a consolidation rollback. Rows are never deduplicated
/// against earlier runs.
pub fn stage_tuples(
    conn: &Connection,
    upload_id: &Uuid,
    tuples: &[ExtractedTuple],
) -> Result<Vec<StagedExtraction>, DatabaseError> {
    if tuples.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.unchecked_transaction()?;
    let mut staged = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let row = staged_from_tuple(*upload_id, tuple);
        insert_staged(&tx, &row)?;
        staged.push(row);
    }
    tx.commit()?;

    tracing::info!(upload_id = %upload_id, staged = staged.len(), "Tuples staged");
    Ok(staged)
}
