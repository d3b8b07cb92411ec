//! # Function Configuration
//!
//! Settings loaded from environment variables. Both functions read the same
//! configuration; each uses the subset it needs.

use crate::constants::{env, DEFAULT_DB_CONNECT_TIMEOUT_SECS, DEFAULT_REGION};
use crate::secret::SecretRecord;
use serde_json::Map;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FunctionConfig {
    /// Secret holding the janitor's database credentials
    pub db_secret_arn: Option<String>,
    /// Endpoint override for the secret store (LocalStack, VPC endpoints)
    pub secrets_manager_endpoint: Option<String>,
    pub region: String,
    pub db_connect_timeout_secs: u64,
    /// Open a real connection with the pending credentials in `testSecret`
    pub test_pending_connection: bool,
    /// Base record for `createSecret` when no AWSCURRENT version exists
    pub bootstrap: SecretRecord,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            db_secret_arn: None,
            secrets_manager_endpoint: None,
            region: DEFAULT_REGION.to_string(),
            db_connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            test_pending_connection: true,
            bootstrap: SecretRecord::default(),
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl FunctionConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Unset and empty are the same thing for every variable here
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bootstrap = SecretRecord {
            host: get(env::DB_HOST),
            dbname: get(env::DB_NAME),
            username: get(env::DB_USERNAME),
            password: None,
            port: get(env::DB_PORT).and_then(|v| v.parse().ok()),
            extra: Map::new(),
        };

        Self {
            db_secret_arn: get(env::DB_SECRET_ARN),
            secrets_manager_endpoint: get(env::SECRETS_MANAGER_ENDPOINT),
            region: get(env::AWS_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            db_connect_timeout_secs: get(env::DB_CONNECT_TIMEOUT_SECS)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
            test_pending_connection: get(env::ROTATION_TEST_CONNECTION)
                .map_or(true, |v| parse_bool(&v)),
            bootstrap,
            log_level: get(env::LOG_LEVEL).unwrap_or_else(|| "INFO".to_string()),
            log_format: get(env::LOG_FORMAT).unwrap_or_else(|| "json".to_string()),
        }
    }

    /// Get database connect timeout duration
    pub fn db_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_secs)
    }
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
