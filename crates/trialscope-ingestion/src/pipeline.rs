//! Fetch → extract → aggregate → classify.
//!
//! Orchestrates one dataset build:
//!   1. Fetch each condition in caller order, one request at a time
//!   2. Report failed conditions through a `FetchNotifier`
//!   3. Concatenate successful rows (no dedup, no reordering)
//!   4. Overwrite each row's study type with its PK / PD label
//!
//! The pipeline never fails as a whole: a failed condition contributes
//! zero rows and the remaining conditions are still fetched.

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::classify::apply_classification;
use crate::models::{TrialDataset, TrialRow};
use crate::sources::{ConditionFetch, ConditionSource};

// ── Failure notification ──────────────────────────────────────────────────────

/// Surfaces per-condition failures to the user.
pub trait FetchNotifier: Send + Sync {
    fn condition_failed(&self, fetch: &ConditionFetch);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl FetchNotifier for TracingNotifier {
    fn condition_failed(&self, fetch: &ConditionFetch) {
        if let Some(msg) = fetch.failure_message() {
            warn!(condition = %fetch.condition, "{msg}");
        }
    }
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub dataset: TrialDataset,
    /// Failure messages, one per failed condition, in request order.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn failed_conditions(&self) -> usize { self.errors.len() }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Rows and failure messages gathered across all conditions.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub rows: Vec<TrialRow>,
    /// One message per failed condition, in request order.
    pub errors: Vec<String>,
}

/// Fetch every condition sequentially and concatenate the rows.
///
/// Rows keep per-condition and per-record order. Failed conditions are
/// passed to `notifier`, recorded in `errors`, and contribute nothing.
pub async fn fetch_all<S>(
    source: &S,
    conditions: &[String],
    notifier: &dyn FetchNotifier,
) -> Aggregate
where
    S: ConditionSource + ?Sized,
{
    let mut combined = Aggregate::default();
    for condition in conditions {
        let fetch = source.fetch_condition(condition).await;
        if let Some(msg) = fetch.failure_message() {
            notifier.condition_failed(&fetch);
            combined.errors.push(msg);
        }
        combined.rows.extend(fetch.into_rows());
    }
    combined
}

/// Build a classified dataset for `conditions`.
#[instrument(skip(source, notifier))]
pub async fn run_pipeline<S>(
    source: &S,
    conditions: &[String],
    notifier: &dyn FetchNotifier,
) -> PipelineResult
where
    S: ConditionSource + ?Sized,
{
    let run_id = Uuid::new_v4();
    let t0 = std::time::Instant::now();
    info!(run_id = %run_id, n_conditions = conditions.len(), "Starting trial fetch");

    let Aggregate { mut rows, errors } = fetch_all(source, conditions, notifier).await;
    apply_classification(&mut rows);
    let dataset = TrialDataset::new(conditions.to_vec(), rows);

    let duration_ms = t0.elapsed().as_millis() as u64;
    info!(
        run_id = %run_id,
        rows = dataset.len(),
        pk = dataset.pk_count(),
        pd = dataset.pd_count(),
        failed = errors.len(),
        duration_ms,
        "Trial fetch complete"
    );

    PipelineResult { run_id, dataset, errors, duration_ms }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
