//! trialscope-security: User credentials.
//!
//! - `CredentialStore`: verify / register against a users table
//! - Password schemes: legacy unsalted SHA-256 and salted Argon2

pub mod error;
pub mod password;
pub mod store;

pub use error::SecurityError;
pub use password::PasswordScheme;
pub use store::{CredentialStore, SqlCredentialStore};
