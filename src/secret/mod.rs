//! # Secret Store
//!
//! Secret payload types and the store abstraction consumed by both functions.
//!
//! The store is versioned: each version has an id (the rotation's client
//! request token) and a set of stage labels. A label is attached to at most
//! one version at a time.

use crate::constants::{DEFAULT_DB_PORT, STAGE_CURRENT, STAGE_PENDING};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod aws;

pub use aws::AwsSecretStore;

/// Database secret payload
///
/// Connection fields are optional so partially populated secrets (for example
/// a record bootstrapped without an AWSCURRENT version) still round-trip.
/// Unknown fields are kept in `extra` and written back unchanged. The
/// password is wiped when the record is dropped.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretRecord {
    /// Parse a secret string
    pub fn from_secret_string(secret_string: &str) -> Result<Self> {
        Ok(serde_json::from_str(secret_string)?)
    }

    /// Serialize back to the secret string stored in the secret store
    pub fn to_secret_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy of this record carrying a different password
    #[must_use]
    pub fn with_password(&self, password: String) -> Self {
        let mut record = self.clone();
        record.clear_password();
        record.password = Some(password);
        record
    }

    /// Overwrite the password's memory and unset it
    pub fn clear_password(&mut self) {
        self.password.zeroize();
    }
}

impl Drop for SecretRecord {
    fn drop(&mut self) {
        self.clear_password();
    }
}

/// Accepts `5432` and `"5432"`; anything else is rejected
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("port out of range: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid port '{s}': {e}"))),
        Some(other) => Err(D::Error::custom(format!("invalid port: {other}"))),
    }
}

/// Everything needed to open a database connection
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&SecretRecord> for DbCredentials {
    type Error = Error;

    fn try_from(record: &SecretRecord) -> Result<Self> {
        fn required(value: Option<&String>, field: &'static str) -> Result<String> {
            value.cloned().ok_or(Error::MissingField(field))
        }

        Ok(Self {
            host: required(record.host.as_ref(), "host")?,
            port: record.port.unwrap_or(DEFAULT_DB_PORT),
            dbname: required(record.dbname.as_ref(), "dbname")?,
            username: required(record.username.as_ref(), "username")?,
            password: required(record.password.as_ref(), "password")?,
        })
    }
}

/// Which version of a secret to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// Version holding a stage label
    Stage(String),
    /// Version with a specific id
    VersionId(String),
}

impl VersionSelector {
    pub fn current() -> Self {
        Self::Stage(STAGE_CURRENT.to_string())
    }

    pub fn pending() -> Self {
        Self::Stage(STAGE_PENDING.to_string())
    }

    pub fn version(id: impl Into<String>) -> Self {
        Self::VersionId(id.into())
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage) => write!(f, "stage {stage}"),
            Self::VersionId(id) => write!(f, "version {id}"),
        }
    }
}

/// A single stored version
#[derive(Clone, PartialEq, Eq)]
pub struct SecretVersion {
    pub version_id: String,
    pub secret_string: String,
}

impl fmt::Debug for SecretVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVersion")
            .field("version_id", &self.version_id)
            .finish_non_exhaustive()
    }
}

impl SecretVersion {
    pub fn record(&self) -> Result<SecretRecord> {
        SecretRecord::from_secret_string(&self.secret_string)
    }
}

/// Result of a version lookup. Absence is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionLookup {
    Found(SecretVersion),
    NotFound,
}

impl VersionLookup {
    /// Convert absence into `Error::SecretNotFound`
    pub fn required(self, secret_id: &str, selector: &VersionSelector) -> Result<SecretVersion> {
        match self {
            Self::Found(version) => Ok(version),
            Self::NotFound => Err(Error::SecretNotFound {
                secret_id: secret_id.to_string(),
                selector: selector.to_string(),
            }),
        }
    }
}

/// Outcome of writing a new version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// A version with this client request token already exists
    AlreadyExists,
}

/// Versioned secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read one version of a secret
    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<VersionLookup>;

    /// Write a new version identified by `client_request_token` and attach `stages` to it
    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        stages: &[&str],
    ) -> Result<PutOutcome>;

    /// Move `stage` onto `move_to` and/or detach it from `remove_from`
    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: &str,
        move_to: Option<&str>,
        remove_from: Option<&str>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_preserves_unknown_fields() {
        let raw = json!({
            "engine": "postgres",
            "host": "db.internal",
            "dbname": "auth",
            "username": "app",
            "password": "old",
            "port": 5432,
            "dbClusterIdentifier": "auth-cluster"
        })
        .to_string();

        let record = SecretRecord::from_secret_string(&raw).unwrap();
        let rotated = record.with_password("new".to_string());
        let written: Value = serde_json::from_str(&rotated.to_secret_string().unwrap()).unwrap();

        assert_eq!(written["password"], "new");
        assert_eq!(written["engine"], "postgres");
        assert_eq!(written["dbClusterIdentifier"], "auth-cluster");
        assert_eq!(written["host"], "db.internal");
        assert_eq!(written["port"], 5432);
    }

    #[test]
    fn test_port_accepts_string() {
        let record = SecretRecord::from_secret_string(r#"{"port": "6543"}"#).unwrap();
        assert_eq!(record.port, Some(6543));

        assert!(SecretRecord::from_secret_string(r#"{"port": "not-a-port"}"#).is_err());
        assert!(SecretRecord::from_secret_string(r#"{"port": 70000}"#).is_err());
    }

    #[test]
    fn test_empty_record_serializes_to_empty_object() {
        assert_eq!(SecretRecord::default().to_secret_string().unwrap(), "{}");
    }

    #[test]
    fn test_credentials_require_connection_fields() {
        let record = SecretRecord {
            host: Some("db.internal".to_string()),
            dbname: Some("auth".to_string()),
            username: Some("app".to_string()),
            password: None,
            port: None,
            extra: Map::new(),
        };

        match DbCredentials::try_from(&record) {
            Err(Error::MissingField(field)) => assert_eq!(field, "password"),
            other => panic!("Expected MissingField(password), got {other:?}"),
        }

        let creds = DbCredentials::try_from(&record.with_password("pw".to_string())).unwrap();
        assert_eq!(creds.port, 5432);
        assert_eq!(creds.username, "app");
    }

    #[test]
    fn test_clear_password_keeps_connection_fields() {
        let mut record =
            SecretRecord::from_secret_string(r#"{"host": "db.internal", "password": "pw"}"#)
                .unwrap();

        record.clear_password();

        assert!(record.password.is_none());
        assert_eq!(record.host.as_deref(), Some("db.internal"));
        assert_eq!(record.to_secret_string().unwrap(), r#"{"host":"db.internal"}"#);
    }

    #[test]
    fn test_debug_output_hides_passwords() {
        let record = SecretRecord::default().with_password("hunter2-secret".to_string());
        assert!(!format!("{record:?}").contains("hunter2-secret"));

        let creds = DbCredentials {
            host: "h".to_string(),
            port: 5432,
            dbname: "d".to_string(),
            username: "u".to_string(),
            password: "hunter2-secret".to_string(),
        };
        assert!(!format!("{creds:?}").contains("hunter2-secret"));
    }

    #[test]
    fn test_not_found_lookup_becomes_error_when_required() {
        let selector = VersionSelector::version("token-1");
        let err = VersionLookup::NotFound
            .required("db-secret", &selector)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "secret db-secret has no version matching version token-1"
        );
    }
}
