//! # Constants
//!
//! Shared constants used by both functions.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Stage label for the authoritative secret version
pub const STAGE_CURRENT: &str = "AWSCURRENT";

/// Stage label for the version staged by an in-flight rotation
pub const STAGE_PENDING: &str = "AWSPENDING";

/// Stage label the store attaches to the version that lost AWSCURRENT
pub const STAGE_PREVIOUS: &str = "AWSPREVIOUS";

/// Default region for the secret store client
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default database connect timeout (seconds)
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default PostgreSQL port when a secret omits it
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Length of generated database passwords
pub const PASSWORD_LENGTH: usize = 32;

/// Characters never used in generated passwords.
/// Each one breaks either SQL string literals or connection URIs.
pub const PASSWORD_EXCLUDED_CHARS: &str = "\"'@/\\ ";

/// Bulk delete run by the token janitor
pub const PURGE_REFRESH_TOKENS_SQL: &str =
    "DELETE FROM public.refresh_tokens WHERE expires_at < NOW() OR revoked_at IS NOT NULL";

/// Builds the password-change statement server-side so both identifier and
/// literal are quoted by PostgreSQL itself
pub const FORMAT_ALTER_ROLE_SQL: &str =
    "SELECT format('ALTER ROLE %I WITH PASSWORD %L', $1::text, $2::text)";

/// Environment variable names
pub mod env {
    pub const DB_SECRET_ARN: &str = "DB_SECRET_ARN";
    pub const SECRETS_MANAGER_ENDPOINT: &str = "SECRETS_MANAGER_ENDPOINT";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const DB_CONNECT_TIMEOUT_SECS: &str = "DB_CONNECT_TIMEOUT_SECS";
    pub const ROTATION_TEST_CONNECTION: &str = "ROTATION_TEST_CONNECTION";
    pub const DB_HOST: &str = "DB_HOST";
    pub const DB_PORT: &str = "DB_PORT";
    pub const DB_NAME: &str = "DB_NAME";
    pub const DB_USERNAME: &str = "DB_USERNAME";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
