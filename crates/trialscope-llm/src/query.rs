//! Free-text questions answered against a fetched dataset.

use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;
use trialscope_ingestion::models::COLUMNS;
use trialscope_ingestion::TrialDataset;

use crate::audit::QueryAuditEntry;
use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

const ANSWER_RULES: &str = "\
1. Always show answer in tabular format if possible.
2. Response should not be blank.
3. Response should always be related to clinical trials.
4. Format the response in table.";

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// Rows of the dataset included in the prompt.
    pub max_context_rows: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { temperature: 0.5, max_new_tokens: 512, max_context_rows: 50 }
    }
}

pub struct DatasetQueryService {
    backend: Arc<dyn LlmBackend>,
    options: QueryOptions,
}

impl DatasetQueryService {
    pub fn new(backend: Arc<dyn LlmBackend>, options: QueryOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &Arc<dyn LlmBackend> { &self.backend }

    /// Answer `question` about `dataset`.
    pub async fn answer(&self, question: &str, dataset: &TrialDataset) -> Result<String, LlmError> {
        self.answer_for(None, question, dataset).await
    }

    /// Same as `answer`, attributing the audit entry to `user`.
    #[instrument(skip(self, dataset), fields(model = self.backend.model_id(), rows = dataset.len()))]
    pub async fn answer_for(
        &self,
        user: Option<&str>,
        question: &str,
        dataset: &TrialDataset,
    ) -> Result<String, LlmError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(LlmError::EmptyQuery);
        }

        let context_rows = dataset.len().min(self.options.max_context_rows);
        let request = LlmRequest {
            messages: build_messages(question, dataset, self.options.max_context_rows),
            max_tokens: Some(self.options.max_new_tokens),
            temperature: Some(self.options.temperature),
        };

        let t0 = Instant::now();
        let response = self.backend.complete(request).await?;
        let latency_ms = t0.elapsed().as_millis() as u64;

        QueryAuditEntry::new(
            user.map(String::from),
            response.model.clone(),
            self.backend.backend_name().to_string(),
            context_rows,
            response.prompt_tokens,
            response.completion_tokens,
            &response.content,
            latency_ms,
        )
        .record();

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(answer.to_string())
    }
}

/// System message with rules and dataset context, then the question.
pub fn build_messages(question: &str, dataset: &TrialDataset, max_rows: usize) -> Vec<Message> {
    let system = format!("{ANSWER_RULES}\n\n{}", dataset_context(dataset, max_rows));
    vec![
        Message::system(system),
        Message::user(format!("Reply this question {question}")),
    ]
}

/// Pipe-delimited rendering of the first `max_rows` rows.
pub fn dataset_context(dataset: &TrialDataset, max_rows: usize) -> String {
    let mut out = format!(
        "Clinical trials fetched for {} ({} rows, PK: {}, PD: {}).\n",
        dataset.conditions.join(", "),
        dataset.len(),
        dataset.pk_count(),
        dataset.pd_count(),
    );
    out.push_str(&COLUMNS.join(" | "));
    out.push('\n');
    for row in dataset.rows.iter().take(max_rows) {
        out.push_str(&row.values().join(" | "));
        out.push('\n');
    }
    if dataset.len() > max_rows {
        out.push_str(&format!("(showing first {} of {} rows)\n", max_rows, dataset.len()));
    }
    out
}
