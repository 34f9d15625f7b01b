//! Audit entries for dataset queries.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAuditEntry {
    pub id: Uuid,
    pub user: Option<String>,
    pub model: String,
    pub backend: String,
    pub context_rows: usize,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// SHA-256 of the answer text; the answer itself is not retained.
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl QueryAuditEntry {
    pub fn new(
        user: Option<String>,
        model: String,
        backend: String,
        context_rows: usize,
        prompt_tokens: u32,
        completion_tokens: u32,
        output: &str,
        latency_ms: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(output.as_bytes());
        let output_hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4(),
            user,
            model,
            backend,
            context_rows,
            prompt_tokens,
            completion_tokens,
            output_hash,
            latency_ms,
            called_at: Utc::now(),
        }
    }

    /// Emit the entry on the `trialscope::audit` tracing target.
    pub fn record(&self) {
        tracing::info!(
            target: "trialscope::audit",
            id = %self.id,
            user = self.user.as_deref().unwrap_or("-"),
            model = %self.model,
            backend = %self.backend,
            context_rows = self.context_rows,
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            output_hash = %self.output_hash,
            latency_ms = self.latency_ms,
            "Dataset query answered"
        );
    }
}
