//! Staged rows → canonical results.
//!
//! Each staged row either creates the canonical result for its
//! (kit, category, trait) key or overwrites the existing one in place. The
//! staged↔canonical link is re-paired so it stays one-to-one.
//!
//! Runs inside the caller's transaction. Per-row normalization failures are
//! skipped; database errors propagate and abort the whole run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{
    find_result_by_key, insert_result, mark_consolidated, repair_staged_link, update_result,
};
use crate::db::DatabaseError;
use crate::models::enums::{ConfidenceLevel, ResultCategory};
use crate::models::{CanonicalResult, StagedExtraction, AUTOMATED_REVIEWER};

/// Trait name used when a staged row has none.
pub const UNKNOWN_TRAIT: &str = "Unknown Trait";

/// A staged row that cannot become a canonical result.
#[derive(Debug, Error, PartialEq)]
pub enum TupleExtractionError {
    #[error("risk score {0} is outside 0-100")]
    MalformedRiskScore(f64),
}

/// Mutable fields of a canonical result, normalized from a staged row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTuple {
    pub category: ResultCategory,
    pub trait_name: String,
    pub confidence: ConfidenceLevel,
    pub risk_score: Option<f64>,
}

pub fn normalize_staged(staged: &StagedExtraction) -> Result<NormalizedTuple, TupleExtractionError> {
    let risk_score = match staged.risk_score {
        Some(score) if !score.is_finite() || !(0.0..=100.0).contains(&score) => {
            return Err(TupleExtractionError::MalformedRiskScore(score));
        }
        other => other,
    };

    let trait_name = staged.trait_name.trim();
    Ok(NormalizedTuple {
        category: staged.category,
        trait_name: if trait_name.is_empty() {
            UNKNOWN_TRAIT.to_string()
        } else {
            trait_name.to_string()
        },
        confidence: ConfidenceLevel::normalize(&staged.confidence_label),
        risk_score,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationOutcome {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Canonical results touched by this run, in staged order.
    pub result_ids: Vec<Uuid>,
}

impl ConsolidationOutcome {
    pub fn consolidated(&self) -> usize {
        self.created + self.updated
    }

    /// Distinct canonical results this run produced. A trait matched in
    /// several sections is created once and then updated, but counts once.
    pub fn distinct_results(&self) -> usize {
        self.result_ids.iter().collect::<HashSet<_>>().len()
    }
}

/// Merge staged rows into the kit's canonical results.
pub fn consolidate(
    conn: &Connection,
    kit_id: &Uuid,
    staged_rows: &[StagedExtraction],
    analyzed_at: DateTime<Utc>,
) -> Result<ConsolidationOutcome, DatabaseError> {
    let mut outcome = ConsolidationOutcome::default();

    for staged in staged_rows {
        let normalized = match normalize_staged(staged) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    staged_id = %staged.id,
                    trait_name = %staged.trait_name,
                    error = %e,
                    "Staged tuple skipped"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        let existing =
            find_result_by_key(conn, kit_id, normalized.category, &normalized.trait_name)?;
        let (result_id, note) = match existing {
            Some(mut result) => {
                apply_staged(&mut result, staged, &normalized, analyzed_at);
                update_result(conn, &result)?;
                outcome.updated += 1;
                (result.id, format!("updated canonical result {}", result.id))
            }
            None => {
                let mut result = CanonicalResult {
                    id: Uuid::new_v4(),
                    kit_id: *kit_id,
                    category: normalized.category,
                    subcategory: None,
                    trait_name: normalized.trait_name.clone(),
                    result_value: String::new(),
                    confidence_level: normalized.confidence,
                    risk_score: None,
                    genetic_markers: Vec::new(),
                    methodology: None,
                    recommendations: None,
                    reviewed_by: AUTOMATED_REVIEWER.into(),
                    analyzed_at,
                };
                apply_staged(&mut result, staged, &normalized, analyzed_at);
                insert_result(conn, &result)?;
                outcome.created += 1;
                (result.id, format!("created canonical result {}", result.id))
            }
        };

        let repair = repair_staged_link(conn, &staged.id, &result_id)?;
        if let Some(displaced) = repair.displaced_staged {
            tracing::debug!(
                result_id = %result_id,
                displaced_staged = %displaced,
                "Canonical result re-paired to newer staged row"
            );
        }
        mark_consolidated(conn, &staged.id, &note)?;
        outcome.result_ids.push(result_id);
    }

    tracing::info!(
        kit_id = %kit_id,
        created = outcome.created,
        updated = outcome.updated,
        skipped = outcome.skipped,
        "Consolidation complete"
    );
    Ok(outcome)
}

fn apply_staged(
    result: &mut CanonicalResult,
    staged: &StagedExtraction,
    normalized: &NormalizedTuple,
    analyzed_at: DateTime<Utc>,
) {
    result.subcategory = staged.subcategory.clone();
    result.result_value = staged.result_value.clone();
    result.confidence_level = normalized.confidence;
    result.risk_score = normalized.risk_score;
    result.genetic_markers = staged.genetic_markers.clone();
    result.methodology = staged.methodology.clone();
    result.recommendations = staged.recommendation.clone();
    result.reviewed_by = AUTOMATED_REVIEWER.into();
    result.analyzed_at = analyzed_at;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{
        check_link_invariants, count_results_for_kit, get_staged, list_results_for_kit,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::OrderStatus;

    fn setup() -> (Connection, Uuid, Uuid) {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let upload = upload_for_kit(&conn, kit_id);
        (conn, kit_id, upload.id)
    }

    #[test]
    fn first_consolidation_creates_and_links() {
        let (conn, kit_id, upload_id) = setup();
        let staged = staged_for_upload(&conn, upload_id, "Type 2 Diabetes");

        let outcome = consolidate(&conn, &kit_id, &[staged.clone()], Utc::now()).unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 0);

        let results = list_results_for_kit(&conn, &kit_id).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].risk_score, Some(35.0));
        assert_eq!(results[0].confidence_level, ConfidenceLevel::High);
        assert_eq!(results[0].reviewed_by, AUTOMATED_REVIEWER);

        let stored = get_staged(&conn, &staged.id).unwrap().unwrap();
        assert!(stored.consolidated);
        assert_eq!(stored.canonical_result_id, Some(results[0].id));
        assert!(stored.consolidation_note.unwrap().starts_with("created"));
    }

    #[test]
    fn second_run_updates_in_place_and_moves_link() {
        let (conn, kit_id, upload_id) = setup();
        let first = staged_for_upload(&conn, upload_id, "Type 2 Diabetes");
        consolidate(&conn, &kit_id, &[first.clone()], Utc::now()).unwrap();

        let mut second = staged_for_upload(&conn, upload_id, "Type 2 Diabetes");
        second.risk_score = Some(40.0);

        let outcome = consolidate(&conn, &kit_id, &[second.clone()], Utc::now()).unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(count_results_for_kit(&conn, &kit_id).unwrap(), 1);

        let results = list_results_for_kit(&conn, &kit_id).unwrap();
        assert_eq!(results[0].risk_score, Some(40.0));

        let old = get_staged(&conn, &first.id).unwrap().unwrap();
        let new = get_staged(&conn, &second.id).unwrap().unwrap();
        assert_eq!(old.canonical_result_id, None);
        assert_eq!(new.canonical_result_id, Some(results[0].id));
        assert!(check_link_invariants(&conn).unwrap().is_empty());
    }

    #[test]
    fn malformed_risk_is_skipped_others_continue() {
        let (conn, kit_id, upload_id) = setup();
        let mut bad = staged_for_upload(&conn, upload_id, "Celiac Disease");
        bad.risk_score = Some(f64::NAN);
        let good = staged_for_upload(&conn, upload_id, "Atrial Fibrillation");

        let outcome = consolidate(&conn, &kit_id, &[bad.clone(), good], Utc::now()).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.created, 1);
        assert!(!get_staged(&conn, &bad.id).unwrap().unwrap().consolidated);
    }

    #[test]
    fn unknown_label_and_blank_trait_normalize() {
        let (conn, _, upload_id) = setup();
        let mut staged = staged_for_upload(&conn, upload_id, "  ");
        staged.confidence_label = String::new();
        staged.category = ResultCategory::General;

        let n = normalize_staged(&staged).unwrap();
        assert_eq!(n.trait_name, UNKNOWN_TRAIT);
        assert_eq!(n.confidence, ConfidenceLevel::Medium);
        assert_eq!(n.category, ResultCategory::General);
    }

    #[test]
    fn out_of_range_risk_rejected() {
        let (conn, _, upload_id) = setup();
        let mut staged = staged_for_upload(&conn, upload_id, "Eye Color");
        staged.risk_score = Some(140.0);
        assert_eq!(
            normalize_staged(&staged),
            Err(TupleExtractionError::MalformedRiskScore(140.0))
        );
        staged.risk_score = None;
        assert_eq!(normalize_staged(&staged).unwrap().risk_score, None);
    }

    #[test]
    fn same_trait_twice_in_one_run_keeps_one_link() {
        let (conn, kit_id, upload_id) = setup();
        let a = staged_for_upload(&conn, upload_id, "Warfarin Sensitivity");
        let b = staged_for_upload(&conn, upload_id, "Warfarin Sensitivity");

        let outcome = consolidate(&conn, &kit_id, &[a.clone(), b.clone()], Utc::now()).unwrap();
        assert_eq!((outcome.created, outcome.updated), (1, 1));
        assert_eq!(outcome.consolidated(), 2);
        assert_eq!(outcome.distinct_results(), 1);
        assert_eq!(count_results_for_kit(&conn, &kit_id).unwrap(), 1);
        assert_eq!(get_staged(&conn, &a.id).unwrap().unwrap().canonical_result_id, None);
        assert!(check_link_invariants(&conn).unwrap().is_empty());
    }
}
