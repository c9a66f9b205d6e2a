use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConfidenceLevel, ReportStatus, ReportType, ResultCategory};

/// One row of a report's key findings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFinding {
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub value: String,
    pub confidence: ConfidenceLevel,
    pub risk_score: Option<f64>,
    pub category: ResultCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub kit_id: Uuid,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub summary: String,
    pub key_findings: Vec<KeyFinding>,
    pub recommendations: String,
    pub quality_score: Option<f64>,
    /// Incremented each time the report is rebuilt in place.
    pub version: u32,
    pub pdf_url: Option<String>,
    pub json_url: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_finding_serializes_trait_field() {
        let finding = KeyFinding {
            trait_name: "Lactose Intolerance".into(),
            value: "likely intolerant".into(),
            confidence: ConfidenceLevel::High,
            risk_score: None,
            category: ResultCategory::Traits,
        };
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"trait\":\"Lactose Intolerance\""));
        assert!(json.contains("\"confidence\":\"High\""));

        let back: KeyFinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, finding);
    }
}
