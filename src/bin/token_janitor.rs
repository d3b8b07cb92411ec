//! # Token Janitor
//!
//! Scheduled function that deletes expired and revoked refresh tokens.

use anyhow::Result;
use credential_lambdas::database::PostgresConnector;
use credential_lambdas::janitor::{purge_expired_tokens, validate_config};
use credential_lambdas::secret::AwsSecretStore;
use credential_lambdas::{telemetry, FunctionConfig};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(FunctionConfig::from_env());
    telemetry::init_tracing(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting token janitor");
    if let Err(e) = validate_config(&config) {
        // Reported per invocation; the function still starts
        warn!(error = %e, "Janitor configuration is incomplete");
    }

    let store = Arc::new(AwsSecretStore::from_config(&config).await);
    let database = Arc::new(PostgresConnector::new(config.db_connect_timeout()));

    lambda_runtime::run(service_fn(move |_event: LambdaEvent<Value>| {
        let config = Arc::clone(&config);
        let store = Arc::clone(&store);
        let database = Arc::clone(&database);
        async move {
            let response = purge_expired_tokens(&config, store.as_ref(), database.as_ref()).await;
            serde_json::to_value(response).map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime error: {e}"))
}
