//! # Rotation Handler
//!
//! Secrets Manager rotation function. One invocation per rotation step.

use anyhow::Result;
use credential_lambdas::database::PostgresConnector;
use credential_lambdas::rotation::{RotationHandler, RotationSettings};
use credential_lambdas::secret::AwsSecretStore;
use credential_lambdas::{telemetry, FunctionConfig};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = FunctionConfig::from_env();
    telemetry::init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        test_pending_connection = config.test_pending_connection,
        "Starting rotation handler"
    );

    let handler = Arc::new(RotationHandler::new(
        Arc::new(AwsSecretStore::from_config(&config).await),
        Arc::new(PostgresConnector::new(config.db_connect_timeout())),
        RotationSettings::from(&config),
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move {
            let response = handler.handle(event.payload).await;
            serde_json::to_value(response).map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime error: {e}"))
}
