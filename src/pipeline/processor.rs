//! Report processing orchestrator.
//!
//! Drives one run over an uploaded artifact:
//! claim → extract → patterns → scoring → staging → (consolidate → report →
//! order advance, in one transaction) → complete → notify.
//!
//! Every engine sits behind a trait object so the orchestrator is testable
//! with mock strategies and notifiers.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::db::repository::{
    self, append_processing_notes, claim_upload_run, complete_upload, fail_upload,
    record_extracted_text, RunClaim,
};
use crate::db::DatabaseError;
use crate::models::enums::UploadStatus;
use crate::models::{Order, Report, StagedExtraction, UploadArtifact};
use crate::pipeline::consolidation::{consolidate, ConsolidationOutcome};
use crate::pipeline::extraction::{ExtractionError, ProcessingNotes, TextExtractor};
use crate::pipeline::lifecycle::advance_order;
use crate::pipeline::notify::{LogNotifier, Notifier};
use crate::pipeline::patterns::TraitPatternEngine;
use crate::pipeline::report::build_comprehensive_report;
use crate::pipeline::scoring::score_document;
use crate::pipeline::staging::stage_tuples;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Upload artifact not found: {0}")]
    UploadNotFound(Uuid),

    #[error("Upload {upload_id} cannot start a run from status {status}")]
    NotClaimable { upload_id: Uuid, status: UploadStatus },

    #[error("Kit {0} already has a run in progress")]
    KitBusy(Uuid),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Staging failed: {0}")]
    Staging(DatabaseError),

    #[error("Consolidation failed: {0}")]
    Consolidation(DatabaseError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Summary of one successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub upload_id: Uuid,
    pub kit_id: Uuid,
    pub status: UploadStatus,
    pub extraction_strategy: String,
    pub page_count: usize,
    pub tuples_found: usize,
    pub results_created: usize,
    pub results_updated: usize,
    pub tuples_skipped: usize,
    pub result_count: u32,
    pub confidence_score: f64,
    pub report_id: Option<Uuid>,
    pub report_version: Option<u32>,
    pub order_advanced: bool,
}

/// What the consolidation transaction committed.
struct CommittedRun {
    consolidation: ConsolidationOutcome,
    report: Option<Report>,
    order: Option<Order>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct PipelineOrchestrator {
    extractor: TextExtractor,
    engine: TraitPatternEngine,
    notifier: Arc<dyn Notifier>,
}

impl PipelineOrchestrator {
    pub fn new(extractor: TextExtractor, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            extractor,
            engine: TraitPatternEngine::new(),
            notifier,
        }
    }

    /// Production wiring: full extraction chain and the logging notifier.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ExtractionError> {
        let extractor = TextExtractor::from_settings(settings)?;
        tracing::debug!(strategies = ?extractor.strategy_names(), "Extraction chain ready");
        Ok(Self::new(extractor, Arc::new(LogNotifier)))
    }

    /// Run the pipeline over one uploaded artifact.
    ///
    /// Refused runs (busy kit, wrong status) leave the artifact untouched.
    /// Once claimed, every failure ends with the artifact FAILED and the error
    /// appended to its notes.
    pub fn process_upload(
        &self,
        conn: &Connection,
        upload_id: &Uuid,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let upload = repository::get_upload(conn, upload_id)?
            .ok_or(ProcessingError::UploadNotFound(*upload_id))?;

        match claim_upload_run(conn, upload_id, Utc::now())? {
            RunClaim::Claimed => {}
            RunClaim::KitBusy => {
                tracing::warn!(upload_id = %upload_id, kit_id = %upload.kit_id, "Kit busy, run refused");
                return Err(ProcessingError::KitBusy(upload.kit_id));
            }
            RunClaim::NotClaimable(status) => {
                return Err(ProcessingError::NotClaimable {
                    upload_id: *upload_id,
                    status,
                });
            }
        }

        let _span = tracing::info_span!(
            "process_upload",
            upload_id = %upload_id,
            kit_id = %upload.kit_id,
        )
        .entered();
        let start = std::time::Instant::now();

        let mut notes = ProcessingNotes::new();
        match self.run_claimed(conn, &upload, &mut notes) {
            Ok((outcome, committed)) => {
                append_processing_notes(conn, upload_id, &notes.to_text())?;
                complete_upload(
                    conn,
                    upload_id,
                    outcome.result_count,
                    outcome.confidence_score,
                    Utc::now(),
                )?;
                tracing::info!(
                    results = outcome.result_count,
                    confidence = outcome.confidence_score,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "Upload processed"
                );
                self.notify(committed.order.as_ref(), committed.report.as_ref());
                Ok(outcome)
            }
            Err(e) => {
                notes.push(format!("[pipeline] run failed: {e}"));
                record_failure(conn, upload_id, &notes);
                tracing::warn!(error = %e, "Upload processing failed");
                Err(e)
            }
        }
    }

    fn run_claimed(
        &self,
        conn: &Connection,
        upload: &UploadArtifact,
        notes: &mut ProcessingNotes,
    ) -> Result<(ProcessingOutcome, CommittedRun), ProcessingError> {
        let document = self
            .extractor
            .extract_file(Path::new(&upload.payload_path), notes)?;
        record_extracted_text(conn, &upload.id, &document.text, &document.strategy)?;

        let tuples = self.engine.extract(&document.text);
        notes.push(format!("[patterns] {} trait matches", tuples.len()));

        let staged =
            stage_tuples(conn, &upload.id, &tuples).map_err(ProcessingError::Staging)?;
        let scores: Vec<f64> = staged.iter().map(|s| s.extraction_confidence).collect();
        let confidence_score = score_document(&scores, document.text.chars().count());

        let committed = commit_consolidation(conn, &upload.kit_id, &staged, Utc::now())
            .map_err(ProcessingError::Consolidation)?;
        let consolidation = &committed.consolidation;
        notes.push(format!(
            "[consolidation] created {}, updated {}, skipped {}",
            consolidation.created, consolidation.updated, consolidation.skipped
        ));

        let outcome = ProcessingOutcome {
            upload_id: upload.id,
            kit_id: upload.kit_id,
            status: UploadStatus::Completed,
            extraction_strategy: document.strategy,
            page_count: document.page_count,
            tuples_found: tuples.len(),
            results_created: consolidation.created,
            results_updated: consolidation.updated,
            tuples_skipped: consolidation.skipped,
            result_count: u32::try_from(consolidation.distinct_results()).unwrap_or(u32::MAX),
            confidence_score,
            report_id: committed.report.as_ref().map(|r| r.id),
            report_version: committed.report.as_ref().map(|r| r.version),
            order_advanced: committed.order.is_some(),
        };
        Ok((outcome, committed))
    }

    fn notify(&self, order: Option<&Order>, report: Option<&Report>) {
        let (Some(order), Some(report)) = (order, report) else {
            return;
        };
        if let Err(e) = self.notifier.results_ready(order, report) {
            tracing::warn!(order_id = %order.id, error = %e, "Notification failed");
        }
    }
}

/// Consolidation, report build and order advance as one atomic unit.
/// Any error drops the transaction, rolling every write back.
fn commit_consolidation(
    conn: &Connection,
    kit_id: &Uuid,
    staged: &[StagedExtraction],
    now: DateTime<Utc>,
) -> Result<CommittedRun, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let consolidation = consolidate(&tx, kit_id, staged, now)?;
    let report = if consolidation.consolidated() > 0 {
        build_comprehensive_report(&tx, kit_id, now)?
    } else {
        None
    };
    let order = advance_order(&tx, kit_id, consolidation.distinct_results(), report.as_ref(), now)?;

    tx.commit()?;
    Ok(CommittedRun {
        consolidation,
        report,
        order,
    })
}

/// Mark the artifact FAILED with the run's notes. Errors here are logged so
/// they never mask the failure that got us here.
fn record_failure(conn: &Connection, upload_id: &Uuid, notes: &ProcessingNotes) {
    if let Err(e) = append_processing_notes(conn, upload_id, &notes.to_text()) {
        tracing::error!(upload_id = %upload_id, error = %e, "Could not append failure notes");
    }
    if let Err(e) = fail_upload(conn, upload_id, Utc::now()) {
        tracing::error!(upload_id = %upload_id, error = %e, "Could not mark upload failed");
    }
}
