pub mod import;
pub mod extraction;
pub mod patterns;
pub mod scoring;
pub mod staging;
pub mod consolidation; // Staged rows → canonical results (1:1 link re-pair)
pub mod report;
pub mod lifecycle;
pub mod notify;
pub mod processor; // Report processing orchestrator
