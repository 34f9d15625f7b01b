//! trialscope-ingestion: Clinical-trial retrieval and classification pipeline.
//!
//! - Registry search per condition (ClinicalTrials.gov v2)
//! - Field extraction into flat `TrialRow`s
//! - Aggregation across conditions with per-condition failure isolation
//! - PK / PD study-type classification
//! - Dataset views and CSV export

pub mod classify;
pub mod export;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod sources;

pub use models::{StudyFilter, TrialDataset, TrialRow};
