//! trialscope-llm: Free-text questions over a fetched trial dataset.
//!
//! - `backend`: `LlmBackend` trait and HTTP backends
//! - `query`: prompt assembly and the dataset query service
//! - `audit`: per-call audit entries

pub mod audit;
pub mod backend;
pub mod query;
