use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Credential storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, SecurityError>;
