use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::TrialscopeError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP client that only allows requests to approved domains.
///
/// Every outbound call made by Trialscope (registry fetches, query-answering
/// backends) goes through this client, so the set of reachable hosts is
/// visible in one place.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default allowlist and a 30 s timeout.
    pub fn new() -> Result<Self, TrialscopeError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a new SandboxClient whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TrialscopeError> {
        let domains = [
            "clinicaltrials.gov",      // ClinicalTrials.gov v2 API
            "huggingface.co",          // HuggingFace Inference API
            "api.openai.com",          // OpenAI-compatible LLMs
            "localhost",               // Ollama / local mocks
            "127.0.0.1",               // Localhost alt
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TrialscopeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of `url`, if it has one. Used for user-configured endpoints.
    pub fn allow_url_host(&mut self, url: &str) {
        if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
            self.allowlist.insert(host);
        }
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match or a subdomain of an allowed domain
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Exposes the inner `reqwest::Client` builder for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, TrialscopeError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    /// Exposes the inner `reqwest::Client` builder for POST requests.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, TrialscopeError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), TrialscopeError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            tracing::warn!(url, "Blocked request outside the allowlist");
            Err(TrialscopeError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )))
        }
    }
}
