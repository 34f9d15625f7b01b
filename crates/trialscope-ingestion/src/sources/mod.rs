//! Trial registry source clients.

pub mod clinicaltrials;

use async_trait::async_trait;
use crate::models::TrialRow;

/// Result of fetching one condition. Failures are values, not errors:
/// a failed condition yields zero rows and the batch carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200 with the extracted rows (possibly none).
    Success(Vec<TrialRow>),
    /// Any non-200 status, with the response body text.
    HttpFailure { status: u16, body: String },
    /// The request did not complete within the client timeout.
    TimedOut,
    /// Connection, sandbox or other transport error.
    Transport { message: String },
    /// A 200 response whose body was not JSON.
    Decode { message: String },
}

/// One condition paired with what fetching it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionFetch {
    pub condition: String,
    pub outcome: FetchOutcome,
}

impl ConditionFetch {
    pub fn new(condition: impl Into<String>, outcome: FetchOutcome) -> Self {
        Self { condition: condition.into(), outcome }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success(_))
    }

    /// Rows fetched for this condition; empty on failure.
    pub fn rows(&self) -> &[TrialRow] {
        match &self.outcome {
            FetchOutcome::Success(rows) => rows,
            _ => &[],
        }
    }

    pub fn into_rows(self) -> Vec<TrialRow> {
        match self.outcome {
            FetchOutcome::Success(rows) => rows,
            _ => Vec::new(),
        }
    }

    /// User-facing failure message, or `None` on success.
    pub fn failure_message(&self) -> Option<String> {
        let c = &self.condition;
        match &self.outcome {
            FetchOutcome::Success(_) => None,
            FetchOutcome::HttpFailure { status, body } => Some(format!(
                "Failed to fetch data for '{c}'. Status code: {status} - {body}"
            )),
            FetchOutcome::TimedOut => Some(format!(
                "Failed to fetch data for '{c}'. Request timed out"
            )),
            FetchOutcome::Transport { message } => Some(format!(
                "Failed to fetch data for '{c}'. {message}"
            )),
            FetchOutcome::Decode { message } => Some(format!(
                "Failed to fetch data for '{c}'. Invalid response body: {message}"
            )),
        }
    }
}

/// Common interface for registry clients: one request per condition.
#[async_trait]
pub trait ConditionSource: Send + Sync {
    async fn fetch_condition(&self, condition: &str) -> ConditionFetch;
}
