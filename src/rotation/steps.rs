//! # Rotation Steps
//!
//! One function per rotation step. Each reads what it needs from the secret
//! store, performs its single change, and records progress in the execution
//! log. Errors propagate to `RotationHandler::handle`.

use super::{
    generate_password, ExecutionLog, LogStatus, RotationHandler, RotationRequest, RotationStep,
};
use crate::constants::{STAGE_CURRENT, STAGE_PENDING};
use crate::database::finish_session;
use crate::error::{Error, Result};
use crate::secret::{DbCredentials, PutOutcome, SecretRecord, VersionLookup, VersionSelector};
use serde_json::{json, Map};
use zeroize::Zeroizing;

/// Stage a freshly generated password as AWSPENDING under the request token
pub(crate) async fn create_secret(
    handler: &RotationHandler,
    request: &RotationRequest,
    log: &mut ExecutionLog,
) -> Result<()> {
    let step = RotationStep::CreateSecret;
    let store = handler.store.as_ref();

    let staged = store
        .get_secret_value(&request.secret_id, &VersionSelector::version(&request.token))
        .await?;
    if let VersionLookup::Found(_) = staged {
        log.warning(step, "Version already exists for this token; keeping staged password");
        return Ok(());
    }

    let base = match store
        .get_secret_value(&request.secret_id, &VersionSelector::current())
        .await?
    {
        VersionLookup::Found(current) => current.record()?,
        VersionLookup::NotFound => {
            log.warning(
                step,
                "Could not retrieve AWSCURRENT; starting from the bootstrap record",
            );
            handler.settings.bootstrap.clone()
        }
    };

    let pending = base.with_password(generate_password(handler.settings.password_length));
    let secret_string = Zeroizing::new(pending.to_secret_string()?);

    let outcome = store
        .put_secret_value(
            &request.secret_id,
            &request.token,
            &secret_string,
            &[STAGE_PENDING],
        )
        .await?;

    match outcome {
        PutOutcome::Created => {
            log.success(step, "Pending version created with preserved connection fields");
        }
        PutOutcome::AlreadyExists => log.warning(step, "Version already exists"),
    }

    Ok(())
}

/// Apply the pending password to the database using the current credentials
pub(crate) async fn set_secret(
    handler: &RotationHandler,
    request: &RotationRequest,
    log: &mut ExecutionLog,
) -> Result<()> {
    let step = RotationStep::SetSecret;
    let store = handler.store.as_ref();

    let pending = read_pending(handler, request).await?;
    let new_password = Zeroizing::new(
        pending
            .password
            .clone()
            .ok_or(Error::MissingField("password"))?,
    );

    let current = match store
        .get_secret_value(&request.secret_id, &VersionSelector::current())
        .await?
    {
        VersionLookup::Found(current) => {
            if pending_password_active(handler, &pending).await {
                log.warning(step, "Pending password is already active in the database");
                return Ok(());
            }
            current.record()?
        }
        VersionLookup::NotFound => {
            log.warning(
                step,
                "AWSCURRENT not found; connecting with the pending credentials instead",
            );
            pending.clone()
        }
    };

    let mut extra = Map::new();
    extra.insert("host".to_string(), json!(current.host));
    extra.insert("port".to_string(), json!(current.port));
    log.record(LogStatus::Info, Some(step), "Connecting to database", extra);

    let credentials = DbCredentials::try_from(&current)?;
    let mut session = handler.database.connect(&credentials).await?;
    let outcome = session
        .set_password(&credentials.username, &new_password)
        .await;
    finish_session(session, outcome).await?;

    log.success(step, "Database password updated");
    Ok(())
}

/// Check the pending credentials can log in
///
/// With connection testing disabled this only records success.
pub(crate) async fn test_secret(
    handler: &RotationHandler,
    request: &RotationRequest,
    log: &mut ExecutionLog,
) -> Result<()> {
    let step = RotationStep::TestSecret;

    if !handler.settings.test_pending_connection {
        log.success(step, "Connection test succeeded (connection check disabled)");
        return Ok(());
    }

    let pending = read_pending(handler, request).await?;
    let credentials = DbCredentials::try_from(&pending)?;

    let mut session = handler.database.connect(&credentials).await?;
    let outcome = session.ping().await;
    finish_session(session, outcome).await?;

    log.success(step, "Connection test with pending credentials succeeded");
    Ok(())
}

/// Promote the token's version to AWSCURRENT
pub(crate) async fn finish_secret(
    handler: &RotationHandler,
    request: &RotationRequest,
    log: &mut ExecutionLog,
) -> Result<()> {
    let step = RotationStep::FinishSecret;
    let store = handler.store.as_ref();

    let current_version = match store
        .get_secret_value(&request.secret_id, &VersionSelector::current())
        .await?
    {
        VersionLookup::Found(current) => Some(current.version_id),
        VersionLookup::NotFound => None,
    };

    if current_version.as_deref() == Some(request.token.as_str()) {
        log.info(Some(step), "Version is already AWSCURRENT");
        return Ok(());
    }

    // The store requires a detach target; with no current version the token stands in
    let remove_from = current_version.as_deref().unwrap_or(&request.token);

    store
        .update_secret_version_stage(
            &request.secret_id,
            STAGE_CURRENT,
            Some(request.token.as_str()),
            Some(remove_from),
        )
        .await?;

    store
        .update_secret_version_stage(
            &request.secret_id,
            STAGE_PENDING,
            None,
            Some(request.token.as_str()),
        )
        .await?;

    log.success(step, "Rotation finished: AWSCURRENT updated");
    Ok(())
}

/// Whether the pending credentials already log in, as after a retried step
/// whose password change committed
async fn pending_password_active(handler: &RotationHandler, pending: &SecretRecord) -> bool {
    let Ok(credentials) = DbCredentials::try_from(pending) else {
        return false;
    };

    match handler.database.connect(&credentials).await {
        Ok(session) => finish_session(session, Ok(())).await.is_ok(),
        Err(e) => {
            tracing::debug!(error = %e, "Pending credentials not accepted yet");
            false
        }
    }
}

async fn read_pending(
    handler: &RotationHandler,
    request: &RotationRequest,
) -> Result<SecretRecord> {
    let selector = VersionSelector::version(&request.token);
    handler
        .store
        .get_secret_value(&request.secret_id, &selector)
        .await?
        .required(&request.secret_id, &selector)?
        .record()
}
