//! Credential store backed by a SQL `users` table.
//!
//! Uses `sqlx::AnyPool`, so the same code serves MySQL deployments and
//! SQLite files for local use. Queries use `?` placeholders, which both
//! drivers accept.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::password::{verify_password, PasswordScheme};

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    username VARCHAR(255) NOT NULL PRIMARY KEY,
    password VARCHAR(255) NOT NULL
)";

/// Keyed lookup of users and their hashed secrets.
///
/// `Ok(false)` means "rejected" (wrong secret, unknown user, duplicate
/// username). `Err` means the store itself could not be reached.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn verify(&self, username: &str, secret: &str) -> Result<bool>;
    async fn register(&self, username: &str, secret: &str) -> Result<bool>;
}

pub struct SqlCredentialStore {
    pool: AnyPool,
    scheme: PasswordScheme,
}

impl SqlCredentialStore {
    /// Connect to `database_url` and create the users table if missing.
    pub async fn connect(database_url: &str, scheme: PasswordScheme) -> Result<Self> {
        install_default_drivers();
        let pool = pool_options(database_url).connect(database_url).await?;
        let store = Self { pool, scheme };
        store.migrate().await?;
        info!(scheme = scheme.as_str(), "Credential store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;
        Ok(())
    }

    pub fn scheme(&self) -> PasswordScheme { self.scheme }

    async fn stored_hash(&self, username: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(hash,)| hash))
    }

    /// Replace a legacy hash with one in the configured scheme.
    async fn upgrade_hash(&self, username: &str, secret: &str) -> Result<()> {
        let hash = self.scheme.hash(secret)?;
        sqlx::query("UPDATE users SET password = ? WHERE username = ?")
            .bind(hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        info!(username, scheme = self.scheme.as_str(), "Password hash upgraded");
        Ok(())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn pool_options(database_url: &str) -> AnyPoolOptions {
    let options = AnyPoolOptions::new().acquire_timeout(Duration::from_secs(10));
    if is_memory_url(database_url) {
        // Each in-memory SQLite connection is its own database; the single
        // connection must never be closed or recycled
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options.max_connections(5)
    }
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    #[instrument(skip(self, secret))]
    async fn verify(&self, username: &str, secret: &str) -> Result<bool> {
        let Some(stored) = self.stored_hash(username).await? else {
            debug!("Unknown username");
            return Ok(false);
        };
        if !verify_password(&stored, secret) {
            return Ok(false);
        }
        if PasswordScheme::of_stored(&stored) != self.scheme && self.scheme == PasswordScheme::Argon2 {
            // Login already succeeded; a failed upgrade only leaves the old hash
            if let Err(e) = self.upgrade_hash(username, secret).await {
                warn!("Could not upgrade password hash: {e}");
            }
        }
        Ok(true)
    }

    #[instrument(skip(self, secret))]
    async fn register(&self, username: &str, secret: &str) -> Result<bool> {
        if username.trim().is_empty() || secret.is_empty() {
            return Ok(false);
        }
        if self.stored_hash(username).await?.is_some() {
            debug!("Username already registered");
            return Ok(false);
        }

        let hash = self.scheme.hash(secret)?;
        let inserted = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(hash)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => {
                info!("User registered");
                Ok(true)
            }
            // Lost a race with a concurrent registration of the same name
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_pool_keeps_its_only_connection() {
        let opts = pool_options("sqlite::memory:");
        assert_eq!(opts.get_max_connections(), 1);
        assert_eq!(opts.get_min_connections(), 1);
        assert_eq!(opts.get_idle_timeout(), None);
        assert_eq!(opts.get_max_lifetime(), None);
    }

    #[test]
    fn test_file_and_server_pools_recycle_normally() {
        let opts = pool_options("sqlite://users.db?mode=rwc");
        assert_eq!(opts.get_max_connections(), 5);
        assert!(opts.get_idle_timeout().is_some());
        assert!(opts.get_max_lifetime().is_some());
        assert!(!is_memory_url("mysql://root@localhost/trialscope"));
        assert!(is_memory_url("sqlite://file:users?mode=memory&cache=shared"));
    }
}
