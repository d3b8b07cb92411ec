//! # Errors
//!
//! Error type shared by the janitor and the rotation steps.

use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration is absent; raised before any remote call
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("secret {secret_id} has no version matching {selector}")]
    SecretNotFound { secret_id: String, selector: String },

    #[error("secret store request failed: {0}")]
    SecretStore(String),

    #[error("secret payload is not valid JSON: {0}")]
    InvalidSecret(#[from] serde_json::Error),

    #[error("secret is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("database connection timed out after {}s", .0.as_secs())]
    ConnectTimeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
