use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::UploadStatus;

/// One submitted lab report PDF and the bookkeeping of its pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadArtifact {
    pub id: Uuid,
    pub kit_id: Uuid,
    pub payload_path: String,
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub content_hash: String,
    pub status: UploadStatus,
    pub extracted_text: Option<String>,
    /// Name of the text extraction strategy that produced `extracted_text`.
    pub extraction_strategy: Option<String>,
    pub confidence_score: f64,
    pub result_count: u32,
    pub processing_notes: String,
    pub uploaded_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
}
