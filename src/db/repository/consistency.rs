use chrono::Utc;
use rusqlite::Connection;

use crate::db::DatabaseError;

/// A single consistency issue detected by the checker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyIssue {
    pub category: String,
    pub severity: String,
    pub description: String,
    pub entity_id: Option<String>,
}

/// Result of a consistency check across the results tables.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub uploads_checked: i64,
    pub results_checked: i64,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run a full consistency check across the database.
///
/// Detects:
/// - Upload artifacts left in `processing` by an interrupted run
/// - Staged ↔ canonical link drift (see [`check_link_invariants`])
/// - Staged rows linked to a canonical result that belongs to another kit
/// - Kits with canonical results but no comprehensive report
/// - Orders that still sit before `results_generated` although results exist
pub fn check_consistency(conn: &Connection) -> Result<ConsistencyReport, DatabaseError> {
    let mut issues = Vec::new();

    // 1. Artifacts stuck mid-run
    let stuck: Vec<String> = collect_ids(
        conn,
        "SELECT id FROM upload_artifacts WHERE status = 'processing'",
    )?;
    for id in stuck {
        issues.push(ConsistencyIssue {
            category: "stuck_processing".into(),
            severity: "high".into(),
            description: "Upload artifact stuck in 'processing' state".into(),
            entity_id: Some(id),
        });
    }

    // 2. One-to-one link and uniqueness key
    issues.extend(check_link_invariants(conn)?);

    // 3. Links that cross kit boundaries
    let cross_kit: Vec<String> = collect_ids(
        conn,
        "SELECT s.id FROM staged_extractions s
         JOIN upload_artifacts u ON u.id = s.upload_id
         JOIN canonical_results c ON c.id = s.canonical_result_id
         WHERE c.kit_id != u.kit_id",
    )?;
    for id in cross_kit {
        issues.push(ConsistencyIssue {
            category: "cross_kit_link".into(),
            severity: "high".into(),
            description: "Staged extraction linked to a result of another kit".into(),
            entity_id: Some(id),
        });
    }

    // 4. Results without a report
    let unreported: Vec<String> = collect_ids(
        conn,
        "SELECT DISTINCT c.kit_id FROM canonical_results c
         WHERE NOT EXISTS (
             SELECT 1 FROM reports r
             WHERE r.kit_id = c.kit_id AND r.report_type = 'comprehensive'
         )",
    )?;
    for kit_id in unreported {
        issues.push(ConsistencyIssue {
            category: "missing_report".into(),
            severity: "medium".into(),
            description: "Kit has canonical results but no comprehensive report".into(),
            entity_id: Some(kit_id),
        });
    }

    // 5. Orders lagging behind their results
    let lagging: Vec<String> = collect_ids(
        conn,
        "SELECT DISTINCT o.id FROM orders o
         JOIN kits k ON k.order_id = o.id
         JOIN canonical_results c ON c.kit_id = k.id
         WHERE o.status IN ('pending', 'kit_shipped', 'sample_received', 'processing')",
    )?;
    for order_id in lagging {
        issues.push(ConsistencyIssue {
            category: "order_lagging".into(),
            severity: "low".into(),
            description: "Order has results but was never advanced to results_generated".into(),
            entity_id: Some(order_id),
        });
    }

    let uploads_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM upload_artifacts", [], |row| row.get(0))?;
    let results_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM canonical_results", [], |row| row.get(0))?;

    Ok(ConsistencyReport {
        issues,
        uploads_checked,
        results_checked,
    })
}

/// Verify the staged ↔ canonical pairing is one-to-one and that no two
/// canonical results share a (kit, category, trait) key.
pub fn check_link_invariants(conn: &Connection) -> Result<Vec<ConsistencyIssue>, DatabaseError> {
    let mut issues = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT canonical_result_id, COUNT(*) FROM staged_extractions
         WHERE canonical_result_id IS NOT NULL
         GROUP BY canonical_result_id HAVING COUNT(*) > 1",
    )?;
    let shared = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    for (result_id, links) in shared {
        issues.push(ConsistencyIssue {
            category: "shared_link".into(),
            severity: "high".into(),
            description: format!("Canonical result linked from {links} staged extractions"),
            entity_id: Some(result_id),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT kit_id, category, trait_name, COUNT(*) FROM canonical_results
         GROUP BY kit_id, category, trait_name HAVING COUNT(*) > 1",
    )?;
    let duplicates = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    for (kit_id, category, trait_name, count) in duplicates {
        issues.push(ConsistencyIssue {
            category: "duplicate_result".into(),
            severity: "high".into(),
            description: format!("{count} canonical results for {category}/{trait_name}"),
            entity_id: Some(kit_id),
        });
    }

    Ok(issues)
}

/// Auto-repair consistency issues that can be safely fixed.
///
/// Currently repairs stuck `processing` artifacts by failing them, which
/// frees the kit for a new run. Returns the number of issues repaired.
pub fn repair_consistency(conn: &Connection) -> Result<usize, DatabaseError> {
    let stuck_fixed = conn.execute(
        "UPDATE upload_artifacts
         SET status = 'failed',
             processing_completed_at = ?1,
             processing_notes = processing_notes || 'run interrupted; reset by consistency repair\n'
         WHERE status = 'processing'",
        rusqlite::params![Utc::now()],
    )?;
    if stuck_fixed > 0 {
        tracing::info!(count = stuck_fixed, "Repaired stuck upload artifacts -> Failed");
    }
    Ok(stuck_fixed)
}

fn collect_ids(conn: &Connection, sql: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
