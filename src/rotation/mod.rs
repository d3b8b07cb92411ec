//! # Secret Rotation
//!
//! Four-step rotation driven by the Secrets Manager rotation scheduler:
//!
//! 1. `createSecret` - stage a new password as AWSPENDING
//! 2. `setSecret` - apply the pending password to the database
//! 3. `testSecret` - check the pending credentials work
//! 4. `finishSecret` - promote the pending version to AWSCURRENT
//!
//! Each invocation runs exactly one step. Steps are safe to re-run with the
//! same client request token.

use crate::config::FunctionConfig;
use crate::database::DatabaseConnector;
use crate::error::Error;
use crate::response::HandlerResponse;
use crate::secret::{SecretRecord, SecretStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Instrument;

pub mod log;
pub mod password;
pub mod steps;

pub use log::{ExecutionLog, LogEntry, LogStatus};
pub use password::generate_password;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RotationStep::CreateSecret => "createSecret",
            RotationStep::SetSecret => "setSecret",
            RotationStep::TestSecret => "testSecret",
            RotationStep::FinishSecret => "finishSecret",
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createSecret" => Ok(RotationStep::CreateSecret),
            "setSecret" => Ok(RotationStep::SetSecret),
            "testSecret" => Ok(RotationStep::TestSecret),
            "finishSecret" => Ok(RotationStep::FinishSecret),
            other => Err(Error::InvalidEvent(format!("unknown Step '{other}'"))),
        }
    }
}

/// Raw invocation payload from the rotation scheduler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RotationEvent {
    pub secret_id: Option<String>,
    pub client_request_token: Option<String>,
    pub step: Option<String>,
}

/// Validated rotation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRequest {
    pub secret_id: String,
    pub token: String,
    pub step: RotationStep,
}

impl TryFrom<RotationEvent> for RotationRequest {
    type Error = Error;

    fn try_from(event: RotationEvent) -> Result<Self, Self::Error> {
        let missing = |field: &str| Error::InvalidEvent(format!("missing {field}"));

        Ok(Self {
            secret_id: event.secret_id.ok_or_else(|| missing("SecretId"))?,
            token: event
                .client_request_token
                .ok_or_else(|| missing("ClientRequestToken"))?,
            step: event.step.ok_or_else(|| missing("Step"))?.parse()?,
        })
    }
}

impl RotationRequest {
    /// Parse an arbitrary JSON event
    pub fn from_event(event: Value) -> Result<Self, Error> {
        let event: RotationEvent = serde_json::from_value(event)
            .map_err(|e| Error::InvalidEvent(format!("malformed event: {e}")))?;
        Self::try_from(event)
    }
}

/// Rotation-specific settings
#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub password_length: usize,
    pub test_pending_connection: bool,
    pub bootstrap: SecretRecord,
}

impl From<&FunctionConfig> for RotationSettings {
    fn from(config: &FunctionConfig) -> Self {
        Self {
            password_length: crate::constants::PASSWORD_LENGTH,
            test_pending_connection: config.test_pending_connection,
            bootstrap: config.bootstrap.clone(),
        }
    }
}

/// Dispatches rotation events to the step functions
#[derive(Clone)]
pub struct RotationHandler {
    pub(crate) store: Arc<dyn SecretStore>,
    pub(crate) database: Arc<dyn DatabaseConnector>,
    pub(crate) settings: RotationSettings,
}

impl fmt::Debug for RotationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationHandler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RotationHandler {
    pub fn new(
        store: Arc<dyn SecretStore>,
        database: Arc<dyn DatabaseConnector>,
        settings: RotationSettings,
    ) -> Self {
        Self {
            store,
            database,
            settings,
        }
    }

    /// Handle one invocation. Never fails: every error becomes a response.
    pub async fn handle(&self, event: Value) -> HandlerResponse {
        let mut log = ExecutionLog::new();
        let mut extra = Map::new();
        extra.insert("event".to_string(), event.clone());
        log.record(LogStatus::Info, None, "Rotation invocation started", extra);

        let request = match RotationRequest::from_event(event) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Rejecting rotation event");
                return HandlerResponse::bad_request(e.to_string());
            }
        };

        let span = tracing::info_span!(
            "rotation.step",
            secret.id = request.secret_id,
            step = request.step.as_str()
        );
        match self.run_step(&request, &mut log).instrument(span).await {
            Ok(()) => HandlerResponse::ok(log.into_value()),
            Err(e) => {
                log.error(Some(request.step), e.to_string());
                HandlerResponse::failed(log.into_value(), e.to_string())
            }
        }
    }

    async fn run_step(
        &self,
        request: &RotationRequest,
        log: &mut ExecutionLog,
    ) -> Result<(), Error> {
        match request.step {
            RotationStep::CreateSecret => steps::create_secret(self, request, log).await,
            RotationStep::SetSecret => steps::set_secret(self, request, log).await,
            RotationStep::TestSecret => steps::test_secret(self, request, log).await,
            RotationStep::FinishSecret => steps::finish_secret(self, request, log).await,
        }
    }
}
