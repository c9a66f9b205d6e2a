use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{from_json_column, parse_uuid, to_json_column, DatabaseError};
use crate::models::enums::{ConfidenceLevel, ResultCategory};
use crate::models::CanonicalResult;

const RESULT_COLUMNS: &str = "id, kit_id, category, subcategory, trait_name, result_value,
     confidence_level, risk_score, genetic_markers, methodology, recommendations,
     reviewed_by, analyzed_at";

pub fn insert_result(conn: &Connection, result: &CanonicalResult) -> Result<(), DatabaseError> {
    let markers = to_json_column("genetic_markers", &result.genetic_markers)?;
    conn.execute(
        &format!("INSERT INTO canonical_results ({RESULT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
        params![
            result.id.to_string(),
            result.kit_id.to_string(),
            result.category.as_str(),
            result.subcategory,
            result.trait_name,
            result.result_value,
            result.confidence_level.as_str(),
            result.risk_score,
            markers,
            result.methodology,
            result.recommendations,
            result.reviewed_by,
            result.analyzed_at,
        ],
    )?;
    Ok(())
}

/// Overwrite the mutable fields of an existing result. The (kit, category,
/// trait) key and the id never change.
pub fn update_result(conn: &Connection, result: &CanonicalResult) -> Result<(), DatabaseError> {
    let markers = to_json_column("genetic_markers", &result.genetic_markers)?;
    let updated = conn.execute(
        "UPDATE canonical_results SET
            subcategory = ?1, result_value = ?2, confidence_level = ?3, risk_score = ?4,
            genetic_markers = ?5, methodology = ?6, recommendations = ?7,
            reviewed_by = ?8, analyzed_at = ?9
         WHERE id = ?10",
        params![
            result.subcategory,
            result.result_value,
            result.confidence_level.as_str(),
            result.risk_score,
            markers,
            result.methodology,
            result.recommendations,
            result.reviewed_by,
            result.analyzed_at,
            result.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "CanonicalResult".into(),
            id: result.id.to_string(),
        });
    }
    Ok(())
}

pub fn get_result(conn: &Connection, id: &Uuid) -> Result<Option<CanonicalResult>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RESULT_COLUMNS} FROM canonical_results WHERE id = ?1"),
            params![id.to_string()],
            result_row_from_rusqlite,
        )
        .optional()?;
    row.map(result_from_row).transpose()
}

/// Look up a result by its consolidation key.
pub fn find_result_by_key(
    conn: &Connection,
    kit_id: &Uuid,
    category: ResultCategory,
    trait_name: &str,
) -> Result<Option<CanonicalResult>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {RESULT_COLUMNS} FROM canonical_results
                 WHERE kit_id = ?1 AND category = ?2 AND trait_name = ?3"
            ),
            params![kit_id.to_string(), category.as_str(), trait_name],
            result_row_from_rusqlite,
        )
        .optional()?;
    row.map(result_from_row).transpose()
}

/// All results of a kit, newest first.
pub fn list_results_for_kit(
    conn: &Connection,
    kit_id: &Uuid,
) -> Result<Vec<CanonicalResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM canonical_results
         WHERE kit_id = ?1 ORDER BY analyzed_at DESC, trait_name ASC"
    ))?;
    let rows = stmt.query_map(params![kit_id.to_string()], result_row_from_rusqlite)?;
    collect_results(rows)
}

pub fn list_results_for_kit_category(
    conn: &Connection,
    kit_id: &Uuid,
    category: ResultCategory,
) -> Result<Vec<CanonicalResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM canonical_results
         WHERE kit_id = ?1 AND category = ?2 ORDER BY analyzed_at DESC, trait_name ASC"
    ))?;
    let rows = stmt.query_map(
        params![kit_id.to_string(), category.as_str()],
        result_row_from_rusqlite,
    )?;
    collect_results(rows)
}

pub fn count_results_for_kit(conn: &Connection, kit_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM canonical_results WHERE kit_id = ?1",
        params![kit_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn collect_results(
    rows: impl Iterator<Item = Result<ResultRow, rusqlite::Error>>,
) -> Result<Vec<CanonicalResult>, DatabaseError> {
    let mut results = Vec::new();
    for row in rows {
        results.push(result_from_row(row?)?);
    }
    Ok(results)
}

// Internal row type for CanonicalResult mapping
struct ResultRow {
    id: String,
    kit_id: String,
    category: String,
    subcategory: Option<String>,
    trait_name: String,
    result_value: String,
    confidence_level: String,
    risk_score: Option<f64>,
    genetic_markers: String,
    methodology: Option<String>,
    recommendations: Option<String>,
    reviewed_by: String,
    analyzed_at: DateTime<Utc>,
}

fn result_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ResultRow, rusqlite::Error> {
    Ok(ResultRow {
        id: row.get(0)?,
        kit_id: row.get(1)?,
        category: row.get(2)?,
        subcategory: row.get(3)?,
        trait_name: row.get(4)?,
        result_value: row.get(5)?,
        confidence_level: row.get(6)?,
        risk_score: row.get(7)?,
        genetic_markers: row.get(8)?,
        methodology: row.get(9)?,
        recommendations: row.get(10)?,
        reviewed_by: row.get(11)?,
        analyzed_at: row.get(12)?,
    })
}

fn result_from_row(row: ResultRow) -> Result<CanonicalResult, DatabaseError> {
    Ok(CanonicalResult {
        id: parse_uuid(&row.id)?,
        kit_id: parse_uuid(&row.kit_id)?,
        category: ResultCategory::from_str(&row.category)?,
        subcategory: row.subcategory,
        trait_name: row.trait_name,
        result_value: row.result_value,
        confidence_level: ConfidenceLevel::from_str(&row.confidence_level)?,
        risk_score: row.risk_score,
        genetic_markers: from_json_column("genetic_markers", &row.genetic_markers)?,
        methodology: row.methodology,
        recommendations: row.recommendations,
        reviewed_by: row.reviewed_by,
        analyzed_at: row.analyzed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::OrderStatus;

    #[test]
    fn find_by_key_matches_exact_trait() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let created = result_for_kit(&conn, kit_id, "Type 2 Diabetes Risk");

        let found = find_result_by_key(&conn, &kit_id, ResultCategory::HealthRisk, "Type 2 Diabetes Risk")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.confidence_level, ConfidenceLevel::High);
        assert_eq!(found.genetic_markers, vec!["rs7903146"]);

        assert!(find_result_by_key(&conn, &kit_id, ResultCategory::Traits, "Type 2 Diabetes Risk")
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let first = result_for_kit(&conn, kit_id, "Celiac Disease");

        let duplicate = CanonicalResult {
            id: Uuid::new_v4(),
            ..first
        };
        assert!(insert_result(&conn, &duplicate).is_err());
        assert_eq!(count_results_for_kit(&conn, &kit_id).unwrap(), 1);
    }

    #[test]
    fn update_overwrites_values_in_place() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let mut result = result_for_kit(&conn, kit_id, "Celiac Disease");

        result.result_value = "typical risk".into();
        result.confidence_level = ConfidenceLevel::Low;
        result.risk_score = None;
        result.genetic_markers = vec!["HLA-DQ2".into(), "HLA-DQ8".into()];
        update_result(&conn, &result).unwrap();

        let loaded = get_result(&conn, &result.id).unwrap().unwrap();
        assert_eq!(loaded.result_value, "typical risk");
        assert_eq!(loaded.confidence_level, ConfidenceLevel::Low);
        assert!(loaded.risk_score.is_none());
        assert_eq!(loaded.genetic_markers.len(), 2);
    }

    #[test]
    fn update_missing_result_is_not_found() {
        let conn = open_memory_database().unwrap();
        let (_, kit_id) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let mut ghost = result_for_kit(&conn, kit_id, "Celiac Disease");
        ghost.id = Uuid::new_v4();
        assert!(matches!(
            update_result(&conn, &ghost),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn category_listing_filters_by_kit_and_category() {
        let conn = open_memory_database().unwrap();
        let (_, kit_a) = order_with_kit(&conn, OrderStatus::SampleReceived);
        let (_, kit_b) = order_with_kit(&conn, OrderStatus::SampleReceived);
        result_for_kit(&conn, kit_a, "Celiac Disease");
        result_for_kit(&conn, kit_a, "Type 2 Diabetes Risk");
        result_for_kit(&conn, kit_b, "Celiac Disease");

        assert_eq!(list_results_for_kit(&conn, &kit_a).unwrap().len(), 2);
        assert_eq!(
            list_results_for_kit_category(&conn, &kit_a, ResultCategory::HealthRisk)
                .unwrap()
                .len(),
            2
        );
        assert!(list_results_for_kit_category(&conn, &kit_a, ResultCategory::Ancestry)
            .unwrap()
            .is_empty());
    }
}
