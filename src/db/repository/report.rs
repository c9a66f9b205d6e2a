use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{from_json_column, parse_uuid, to_json_column, DatabaseError};
use crate::models::enums::{ReportStatus, ReportType};
use crate::models::Report;

const REPORT_COLUMNS: &str = "id, kit_id, report_type, status, summary, key_findings,
     recommendations, quality_score, version, pdf_url, json_url, generated_at, validated_at";

pub fn insert_report(conn: &Connection, report: &Report) -> Result<(), DatabaseError> {
    let findings = to_json_column("key_findings", &report.key_findings)?;
    conn.execute(
        &format!("INSERT INTO reports ({REPORT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
        params![
            report.id.to_string(),
            report.kit_id.to_string(),
            report.report_type.as_str(),
            report.status.as_str(),
            report.summary,
            findings,
            report.recommendations,
            report.quality_score,
            report.version,
            report.pdf_url,
            report.json_url,
            report.generated_at,
            report.validated_at,
        ],
    )?;
    Ok(())
}

/// Persist a rebuilt report over its existing row, keyed by id.
pub fn update_report(conn: &Connection, report: &Report) -> Result<(), DatabaseError> {
    let findings = to_json_column("key_findings", &report.key_findings)?;
    let updated = conn.execute(
        "UPDATE reports SET
            status = ?1, summary = ?2, key_findings = ?3, recommendations = ?4,
            quality_score = ?5, version = ?6, pdf_url = ?7, json_url = ?8,
            generated_at = ?9, validated_at = ?10
         WHERE id = ?11",
        params![
            report.status.as_str(),
            report.summary,
            findings,
            report.recommendations,
            report.quality_score,
            report.version,
            report.pdf_url,
            report.json_url,
            report.generated_at,
            report.validated_at,
            report.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Report".into(),
            id: report.id.to_string(),
        });
    }
    Ok(())
}

pub fn find_report(
    conn: &Connection,
    kit_id: &Uuid,
    report_type: ReportType,
) -> Result<Option<Report>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE kit_id = ?1 AND report_type = ?2"),
            params![kit_id.to_string(), report_type.as_str()],
            report_row_from_rusqlite,
        )
        .optional()?;
    row.map(report_from_row).transpose()
}

pub fn list_reports_for_kit(conn: &Connection, kit_id: &Uuid) -> Result<Vec<Report>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE kit_id = ?1 ORDER BY generated_at DESC"
    ))?;
    let rows = stmt.query_map(params![kit_id.to_string()], report_row_from_rusqlite)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

// Internal row type for Report mapping
struct ReportRow {
    id: String,
    kit_id: String,
    report_type: String,
    status: String,
    summary: String,
    key_findings: String,
    recommendations: String,
    quality_score: Option<f64>,
    version: u32,
    pdf_url: Option<String>,
    json_url: Option<String>,
    generated_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

fn report_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ReportRow, rusqlite::Error> {
    Ok(ReportRow {
        id: row.get(0)?,
        kit_id: row.get(1)?,
        report_type: row.get(2)?,
        status: row.get(3)?,
        summary: row.get(4)?,
        key_findings: row.get(5)?,
        recommendations: row.get(6)?,
        quality_score: row.get(7)?,
        version: row.get(8)?,
        pdf_url: row.get(9)?,
        json_url: row.get(10)?,
        generated_at: row.get(11)?,
        validated_at: row.get(12)?,
    })
}

fn report_from_row(row: ReportRow) -> Result<Report, DatabaseError> {
    Ok(Report {
        id: parse_uuid(&row.id)?,
        kit_id: parse_uuid(&row.kit_id)?,
        report_type: ReportType::from_str(&row.report_type)?,
        status: ReportStatus::from_str(&row.status)?,
        summary: row.summary,
        key_findings: from_json_column("key_findings", &row.key_findings)?,
        recommendations: row.recommendations,
        quality_score: row.quality_score,
        version: row.version,
        pdf_url: row.pdf_url,
        json_url: row.json_url,
        generated_at: row.generated_at,
        validated_at: row.validated_at,
    })
}
