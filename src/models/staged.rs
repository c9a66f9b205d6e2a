use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ResultCategory;

/// A raw trait match harvested from one upload, kept for provenance.
///
/// Rows are written once by the staging store. After consolidation only
/// `canonical_result_id` may change (the 1:1 re-pair in the consolidator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedExtraction {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub trait_name: String,
    pub category: ResultCategory,
    pub subcategory: Option<String>,
    pub result_value: String,
    /// Raw label as found in the text: HIGH / MEDIUM / LOW or empty when unknown.
    pub confidence_label: String,
    pub risk_score: Option<f64>,
    pub genetic_markers: Vec<String>,
    pub methodology: Option<String>,
    pub recommendation: Option<String>,
    /// Heuristic 0-100 reliability of this single match.
    pub extraction_confidence: f64,
    pub page_number: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    pub context_snippet: String,
    pub consolidated: bool,
    pub consolidation_note: Option<String>,
    pub canonical_result_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
