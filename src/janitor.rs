//! # Refresh Token Janitor
//!
//! Deletes refresh tokens that are expired or revoked. Credentials come from
//! the AWSCURRENT version of the secret named by `DB_SECRET_ARN`.

use crate::config::FunctionConfig;
use crate::database::{finish_session, DatabaseConnector};
use crate::error::{Error, Result};
use crate::response::HandlerResponse;
use crate::secret::{DbCredentials, SecretStore, VersionSelector};
use serde_json::json;
use tracing::{error, info, Instrument};

/// Run one cleanup. Never fails: every error becomes a 500 response.
pub async fn purge_expired_tokens(
    config: &FunctionConfig,
    store: &dyn SecretStore,
    database: &dyn DatabaseConnector,
) -> HandlerResponse {
    info!("Starting cleanup of expired refresh tokens");

    let Some(secret_arn) = config.db_secret_arn.as_deref() else {
        error!("DB_SECRET_ARN is not configured");
        return HandlerResponse::server_error("DB_SECRET_ARN missing");
    };

    let span = tracing::info_span!("janitor.purge", secret.id = secret_arn);
    match purge(secret_arn, store, database).instrument(span).await {
        Ok(deleted_count) => {
            info!(deleted_count, "Cleanup succeeded");
            HandlerResponse::ok(
                json!({
                    "message": "Cleanup successful",
                    "deleted_count": deleted_count
                })
                .to_string(),
            )
        }
        Err(e) => {
            error!(error = %e, "Cleanup failed");
            HandlerResponse::server_error(json!({ "error": e.to_string() }).to_string())
        }
    }
}

async fn purge(
    secret_arn: &str,
    store: &dyn SecretStore,
    database: &dyn DatabaseConnector,
) -> Result<u64> {
    let selector = VersionSelector::current();
    let record = store
        .get_secret_value(secret_arn, &selector)
        .await?
        .required(secret_arn, &selector)?
        .record()?;
    let credentials = DbCredentials::try_from(&record)?;

    let mut session = database.connect(&credentials).await?;
    let outcome = session.purge_refresh_tokens().await;
    finish_session(session, outcome).await
}

/// Reject configuration the janitor cannot run with
pub fn validate_config(config: &FunctionConfig) -> Result<()> {
    if config.db_secret_arn.is_none() {
        return Err(Error::MissingConfig("DB_SECRET_ARN"));
    }
    Ok(())
}
