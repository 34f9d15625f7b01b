//! ClinicalTrials.gov v2 API client.
//!
//! API docs: https://clinicaltrials.gov/data-api/api
//! Endpoint: https://clinicaltrials.gov/api/v2/studies
//!
//! One GET per condition with `pageSize=100`. Only the first page is read;
//! `nextPageToken` is ignored, so conditions with more than 100 matching
//! studies are truncated.

use async_trait::async_trait;
use reqwest::StatusCode;
use trialscope_common::sandbox::SandboxClient as Client;
use trialscope_common::TrialscopeError;
use tracing::{debug, instrument, warn};

use crate::extract::extract;
use super::{ConditionFetch, ConditionSource, FetchOutcome};

pub const CT_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Studies requested per condition.
pub const PAGE_SIZE: usize = 100;

pub struct ClinicalTrialsClient {
    client: Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    /// Client for the public endpoint.
    pub fn new() -> Result<Self, TrialscopeError> {
        Self::with_base_url(CT_API_URL)
    }

    /// Client for an alternative search endpoint (mirror, proxy, test server).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TrialscopeError> {
        let base_url = base_url.into();
        let mut client = Client::new()?;
        client.allow_url_host(&base_url);
        Ok(Self { client, base_url })
    }

    /// Client reusing a preconfigured sandbox (timeouts, allowlist).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    async fn search_studies(&self, condition: &str) -> FetchOutcome {
        let request = match self.client.get(&self.base_url) {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Transport { message: e.to_string() },
        };

        let page_size = PAGE_SIZE.to_string();
        let resp = match request
            .query(&[("pageSize", page_size.as_str()), ("query.term", condition)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return transport_outcome(e),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return FetchOutcome::HttpFailure { status: status.as_u16(), body };
        }

        let json = match resp.json::<serde_json::Value>().await {
            Ok(json) => json,
            Err(e) if e.is_timeout() => return FetchOutcome::TimedOut,
            Err(e) => return FetchOutcome::Decode { message: e.to_string() },
        };

        let rows = json["studies"]
            .as_array()
            .map(|studies| studies.iter().map(extract).collect())
            .unwrap_or_default();
        FetchOutcome::Success(rows)
    }
}

fn transport_outcome(e: reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::TimedOut
    } else {
        FetchOutcome::Transport { message: e.to_string() }
    }
}

#[async_trait]
impl ConditionSource for ClinicalTrialsClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_condition(&self, condition: &str) -> ConditionFetch {
        let outcome = self.search_studies(condition).await;
        match &outcome {
            FetchOutcome::Success(rows) => {
                debug!(n = rows.len(), "ClinicalTrials.gov studies retrieved");
            }
            other => warn!(outcome = ?other, "ClinicalTrials.gov fetch failed"),
        }
        ConditionFetch::new(condition, outcome)
    }
}
