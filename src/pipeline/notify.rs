//! Results-ready notification seam.
//!
//! Delivery (email, push) belongs to another subsystem. The pipeline only
//! calls a [`Notifier`] after a successful run and never lets its failure
//! change the artifact's status.

use thiserror::Error;

use crate::models::{Order, Report};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync {
    fn results_ready(&self, order: &Order, report: &Report) -> Result<(), NotificationError>;
}

/// Default notifier: writes a structured log event and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn results_ready(&self, order: &Order, report: &Report) -> Result<(), NotificationError> {
        tracing::info!(
            order_id = %order.id,
            report_id = %report.id,
            report_version = report.version,
            findings = report.key_findings.len(),
            "Results ready"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;

    /// Records every (order, report) pair it is called with.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub calls: Mutex<Vec<(Uuid, Uuid)>>,
    }

    impl Notifier for RecordingNotifier {
        fn results_ready(&self, order: &Order, report: &Report) -> Result<(), NotificationError> {
            self.calls.lock().unwrap().push((order.id, report.id));
            Ok(())
        }
    }

    pub struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn results_ready(&self, _order: &Order, _report: &Report) -> Result<(), NotificationError> {
            Err(NotificationError::Delivery("smtp unreachable".into()))
        }
    }
}
