//! # AWS Secrets Manager Store
//!
//! `SecretStore` implementation over the official AWS SDK.
//!
//! An endpoint override (`SECRETS_MANAGER_ENDPOINT`) routes requests to
//! LocalStack or a VPC endpoint instead of the public regional endpoint.

use super::{PutOutcome, SecretStore, SecretVersion, VersionLookup, VersionSelector};
use crate::config::FunctionConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// AWS Secrets Manager store
pub struct AwsSecretStore {
    client: SecretsManagerClient,
    region: String,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretStore {
    /// Create a client from function configuration
    pub async fn from_config(config: &FunctionConfig) -> Self {
        let sdk_config =
            create_sdk_config(&config.region, config.secrets_manager_endpoint.as_deref()).await;

        Self {
            client: SecretsManagerClient::new(&sdk_config),
            region: config.region.clone(),
        }
    }
}

/// Create AWS SDK config using the default credential chain
///
/// The Lambda execution role supplies credentials through the environment.
pub async fn create_sdk_config(region: &str, endpoint: Option<&str>) -> SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint) = endpoint {
        log_endpoint_override(endpoint);
        builder = builder.endpoint_url(endpoint);
    }

    builder.load().await
}

fn log_endpoint_override(endpoint: &str) {
    let looks_local = endpoint.starts_with("http://localhost")
        || endpoint.starts_with("http://127.0.0.1")
        || endpoint.contains("host.docker.internal")
        || endpoint.contains("localstack");

    if looks_local {
        info!(endpoint, "Using local Secrets Manager endpoint");
    } else if endpoint.starts_with("http://") {
        warn!(
            endpoint,
            "Secrets Manager endpoint override is not TLS; secret values travel in clear text"
        );
    } else {
        info!(endpoint, "Using Secrets Manager endpoint override");
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<VersionLookup> {
        let span = tracing::debug_span!(
            "aws.secret.get",
            secret.id = secret_id,
            selector = %selector,
            region = self.region
        );
        let start = Instant::now();

        async move {
            let request = self.client.get_secret_value().secret_id(secret_id);
            let request = match selector {
                VersionSelector::Stage(stage) => request.version_stage(stage),
                VersionSelector::VersionId(id) => request.version_id(id),
            };

            match request.send().await {
                Ok(response) => {
                    let secret_string = response
                        .secret_string()
                        .map(ToString::to_string)
                        .or_else(|| {
                            response
                                .secret_binary()
                                .map(|blob| String::from_utf8_lossy(blob.as_ref()).to_string())
                        })
                        .ok_or_else(|| {
                            Error::SecretStore(format!(
                                "secret {secret_id} ({selector}) has no string or binary value"
                            ))
                        })?;
                    let version_id = response.version_id().unwrap_or_default().to_string();

                    debug!(
                        version_id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Secret version found"
                    );
                    Ok(VersionLookup::Found(SecretVersion {
                        version_id,
                        secret_string,
                    }))
                }
                Err(e) => {
                    let service_error = e.into_service_error();
                    if service_error.is_resource_not_found_exception() {
                        debug!(
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Secret version not found"
                        );
                        Ok(VersionLookup::NotFound)
                    } else {
                        Err(Error::SecretStore(format!(
                            "GetSecretValue for {secret_id} ({selector}) failed: {}",
                            DisplayErrorContext(&service_error)
                        )))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        stages: &[&str],
    ) -> Result<PutOutcome> {
        let span = tracing::info_span!(
            "aws.secret.put",
            secret.id = secret_id,
            version_id = client_request_token,
            region = self.region
        );

        async move {
            let mut request = self
                .client
                .put_secret_value()
                .secret_id(secret_id)
                .client_request_token(client_request_token)
                .secret_string(secret_string);
            for stage in stages {
                request = request.version_stages(*stage);
            }

            match request.send().await {
                Ok(_) => {
                    info!(stages = ?stages, "Stored new secret version");
                    Ok(PutOutcome::Created)
                }
                Err(e) => {
                    let service_error = e.into_service_error();
                    if service_error.is_resource_exists_exception() {
                        Ok(PutOutcome::AlreadyExists)
                    } else {
                        Err(Error::SecretStore(format!(
                            "PutSecretValue for {secret_id} failed: {}",
                            DisplayErrorContext(&service_error)
                        )))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: &str,
        move_to: Option<&str>,
        remove_from: Option<&str>,
    ) -> Result<()> {
        info!(
            secret.id = secret_id,
            stage,
            move_to = move_to.unwrap_or("-"),
            remove_from = remove_from.unwrap_or("-"),
            "Updating secret version stage"
        );

        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage)
            .set_move_to_version_id(move_to.map(ToString::to_string))
            .set_remove_from_version_id(remove_from.map(ToString::to_string))
            .send()
            .await
            .map_err(|e| {
                Error::SecretStore(format!(
                    "UpdateSecretVersionStage {stage} for {secret_id} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}
