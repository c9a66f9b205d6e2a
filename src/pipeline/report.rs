use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{find_report, insert_report, list_results_for_kit, update_report};
use crate::db::DatabaseError;
use crate::models::enums::{ReportStatus, ReportType};
use crate::models::{CanonicalResult, KeyFinding, Report};

/// Placeholder quality score stamped on every automatically built report.
pub const DEFAULT_QUALITY_SCORE: f64 = 85.0;

/// Findings quoted in the summary before it is cut with an ellipsis.
const SUMMARY_FINDINGS: usize = 3;

pub const DEFAULT_RECOMMENDATIONS: &str =
    "Discuss these results with a healthcare provider or genetic counselor before making health decisions.";

/// Results sorted the way they are presented: category, then trait name.
fn presentation_order(results: &[CanonicalResult]) -> Vec<&CanonicalResult> {
    let mut ordered: Vec<&CanonicalResult> = results.iter().collect();
    ordered.sort_by(|a, b| {
        a.category
            .as_str()
            .cmp(b.category.as_str())
            .then_with(|| a.trait_name.cmp(&b.trait_name))
    });
    ordered
}

pub fn compose_summary(results: &[CanonicalResult]) -> String {
    let ordered = presentation_order(results);
    let fragments: Vec<String> = ordered
        .iter()
        .take(SUMMARY_FINDINGS)
        .map(|r| format!("{}: {}", r.trait_name, r.result_value))
        .collect();
    let ellipsis = if ordered.len() > SUMMARY_FINDINGS { "..." } else { "" };

    format!(
        "Analysis of {} genetic traits completed. Key findings: {}{}",
        results.len(),
        fragments.join("; "),
        ellipsis
    )
}

pub fn compose_key_findings(results: &[CanonicalResult]) -> Vec<KeyFinding> {
    presentation_order(results)
        .into_iter()
        .map(|r| KeyFinding {
            trait_name: r.trait_name.clone(),
            value: r.result_value.clone(),
            confidence: r.confidence_level,
            risk_score: r.risk_score,
            category: r.category,
        })
        .collect()
}

pub fn compose_recommendations(results: &[CanonicalResult]) -> String {
    let lines: Vec<String> = presentation_order(results)
        .into_iter()
        .filter_map(|r| {
            let text = r.recommendations.as_deref()?.trim();
            (!text.is_empty()).then(|| format!("{}: {}", r.trait_name, text))
        })
        .collect();

    if lines.is_empty() {
        DEFAULT_RECOMMENDATIONS.to_string()
    } else {
        lines.join("\n")
    }
}

/// Build or refresh the kit's comprehensive report from all its results.
///
/// Returns `None`, writing nothing, when the kit has no canonical results.
pub fn build_comprehensive_report(
    conn: &Connection,
    kit_id: &Uuid,
    generated_at: DateTime<Utc>,
) -> Result<Option<Report>, DatabaseError> {
    let results = list_results_for_kit(conn, kit_id)?;
    if results.is_empty() {
        tracing::info!(kit_id = %kit_id, "No canonical results, report not built");
        return Ok(None);
    }

    let summary = compose_summary(&results);
    let key_findings = compose_key_findings(&results);
    let recommendations = compose_recommendations(&results);

    let report = match find_report(conn, kit_id, ReportType::Comprehensive)? {
        Some(mut report) => {
            report.status = ReportStatus::Ready;
            report.summary = summary;
            report.key_findings = key_findings;
            report.recommendations = recommendations;
            report.quality_score = Some(DEFAULT_QUALITY_SCORE);
            report.version += 1;
            report.generated_at = generated_at;
            update_report(conn, &report)?;
            report
        }
        None => {
            let report = Report {
                id: Uuid::new_v4(),
                kit_id: *kit_id,
                report_type: ReportType::Comprehensive,
                status: ReportStatus::Ready,
                summary,
                key_findings,
                recommendations,
                quality_score: Some(DEFAULT_QUALITY_SCORE),
                version: 1,
                pdf_url: None,
                json_url: None,
                generated_at,
                validated_at: None,
            };
            insert_report(conn, &report)?;
            report
        }
    };

    tracing::info!(
        kit_id = %kit_id,
        report_id = %report.id,
        version = report.version,
        findings = report.key_findings.len(),
        "Comprehensive report built"
    );
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::list_reports_for_kit;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{ConfidenceLevel, OrderStatus, ResultCategory};
    use crate::models::AUTOMATED_REVIEWER;

    fn result(trait_name: &str, category: ResultCategory, value: &str, rec: Option<&str>) -> CanonicalResult {
        CanonicalResult {
            id: Uuid::new_v4(),
            kit_id: Uuid::new_v4(),
            category,
            subcategory: None,
            trait_name: trait_name.into(),
            result_value: value.into(),
            confidence_level: ConfidenceLevel::Medium,
            risk_score: None,
            genetic_markers: vec![],
            methodology: None,
            recommendations: rec.map(String::from),
            reviewed_by: AUTOMATED_REVIEWER.into(),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn summary_lists_up_to_three_findings() {
        let results = vec![
            result("Type 2 Diabetes", ResultCategory::HealthRisk, "increased risk", None),
            result("Eye Color", ResultCategory::Traits, "brown", None),
        ];
        assert_eq!(
            compose_summary(&results),
            "Analysis of 2 genetic traits completed. Key findings: Type 2 Diabetes: increased risk; Eye Color: brown"
        );
    }

    #[test]
    fn summary_ellipsis_after_three() {
        let results = vec![
            result("Celiac Disease", ResultCategory::HealthRisk, "typical risk", None),
            result("Atrial Fibrillation", ResultCategory::HealthRisk, "typical risk", None),
            result("Eye Color", ResultCategory::Traits, "brown", None),
            result("Cystic Fibrosis", ResultCategory::CarrierStatus, "Not a carrier", None),
        ];
        let summary = compose_summary(&results);
        assert!(summary.starts_with("Analysis of 4 genetic traits completed."));
        assert!(summary.ends_with("..."));
        assert_eq!(summary.matches("; ").count(), 2);
        assert!(!summary.contains("Eye Color"));
    }

    #[test]
    fn findings_ordered_by_category_then_trait() {
        let results = vec![
            result("Eye Color", ResultCategory::Traits, "brown", None),
            result("Type 2 Diabetes", ResultCategory::HealthRisk, "increased risk", None),
            result("Celiac Disease", ResultCategory::HealthRisk, "typical risk", None),
        ];
        let names: Vec<String> = compose_key_findings(&results)
            .into_iter()
            .map(|f| f.trait_name)
            .collect();
        assert_eq!(names, vec!["Celiac Disease", "Type 2 Diabetes", "Eye Color"]);
    }

    #[test]
    fn recommendations_joined_or_default() {
        let with = vec![
            result("Type 2 Diabetes", ResultCategory::HealthRisk, "increased risk", Some("Screen glucose yearly.")),
            result("Eye Color", ResultCategory::Traits, "brown", Some("  ")),
        ];
        assert_eq!(compose_recommendations(&with), "Type 2 Diabetes: Screen glucose yearly.");

        let without = vec![result("Eye Color", ResultCategory::Traits, "brown", None)];
        assert_eq!(compose_recommendations(&without), DEFAULT_RECOMMENDATIONS);
    }

    #[test]
    fn no_results_no_report() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        assert!(build_comprehensive_report(&conn, &kit_id, Utc::now()).unwrap().is_none());
        assert!(list_reports_for_kit(&conn, &kit_id).unwrap().is_empty());
    }

    #[test]
    fn rebuild_updates_single_report_and_bumps_version() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        result_for_kit(&conn, kit_id, "Type 2 Diabetes");

        let first = build_comprehensive_report(&conn, &kit_id, Utc::now()).unwrap().unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.status, ReportStatus::Ready);
        assert_eq!(first.quality_score, Some(DEFAULT_QUALITY_SCORE));

        result_for_kit(&conn, kit_id, "Celiac Disease");
        let second = build_comprehensive_report(&conn, &kit_id, Utc::now()).unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, 2);
        assert_eq!(second.key_findings.len(), 2);

        let stored = list_reports_for_kit(&conn, &kit_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].summary.starts_with("Analysis of 2 genetic traits completed."));
    }
}
