//! # Database
//!
//! Connection abstraction over the credential-bearing database.
//!
//! Each invocation opens one short-lived session and closes it before
//! returning. Nothing is pooled across invocations.

use crate::error::Result;
use crate::secret::DbCredentials;
use async_trait::async_trait;

pub mod postgres;

pub use postgres::PostgresConnector;

/// Opens sessions with a given set of credentials
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(&self, credentials: &DbCredentials) -> Result<Box<dyn DatabaseSession>>;
}

/// An open, auto-committing database session
#[async_trait]
pub trait DatabaseSession: Send {
    /// Delete expired or revoked refresh tokens, returning the number removed
    async fn purge_refresh_tokens(&mut self) -> Result<u64>;

    /// Change the password of a login role
    async fn set_password(&mut self, username: &str, password: &str) -> Result<()>;

    /// Round-trip a trivial query
    async fn ping(&mut self) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Close `session` and hand back the outcome of the work done on it.
///
/// The session is closed whatever the outcome. A close error is only logged:
/// statements run auto-committed, so work that succeeded stays applied even
/// when the connection does not shut down cleanly.
pub async fn finish_session<T>(session: Box<dyn DatabaseSession>, outcome: Result<T>) -> Result<T> {
    if let Err(close_error) = session.close().await {
        tracing::warn!(error = %close_error, "Failed to close database session");
    }
    outcome
}
