//! trialscope-common: Shared error type and HTTP client used across all Trialscope crates.

pub mod error;
pub mod sandbox;

pub use error::{Result, TrialscopeError};
pub use sandbox::SandboxClient;
