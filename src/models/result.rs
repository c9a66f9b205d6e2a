use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConfidenceLevel, ResultCategory};

/// Source label stamped on results produced by automatic extraction.
pub const AUTOMATED_REVIEWER: &str = "automated_pdf_extraction";

/// The single authoritative record for one trait on one kit.
/// Unique on (kit_id, category, trait_name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub id: Uuid,
    pub kit_id: Uuid,
    pub category: ResultCategory,
    pub subcategory: Option<String>,
    pub trait_name: String,
    pub result_value: String,
    pub confidence_level: ConfidenceLevel,
    pub risk_score: Option<f64>,
    pub genetic_markers: Vec<String>,
    pub methodology: Option<String>,
    pub recommendations: Option<String>,
    pub reviewed_by: String,
    pub analyzed_at: DateTime<Utc>,
}
