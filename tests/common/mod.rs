//! Shared fakes for the integration tests.
//!
//! `InMemorySecretStore` follows Secrets Manager's staging rules: a stage label
//! is attached to at most one version, and moving AWSCURRENT leaves
//! AWSPREVIOUS on the version it came from. `FakeDatabase` keeps login roles
//! and refresh-token rows in memory.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use credential_lambdas::constants::{STAGE_CURRENT, STAGE_PREVIOUS};
use credential_lambdas::database::{DatabaseConnector, DatabaseSession};
use credential_lambdas::secret::{
    DbCredentials, PutOutcome, SecretStore, SecretVersion, VersionLookup, VersionSelector,
};
use credential_lambdas::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SECRET_ID: &str = "arn:aws:secretsmanager:us-east-1:000000000000:secret:auth-db";

#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub version_id: String,
    pub secret_string: String,
    pub stages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    versions: Mutex<HashMap<String, Vec<StoredVersion>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    stage_updates: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a version directly, bypassing the counters
    pub fn seed(&self, secret_id: &str, version_id: &str, secret_string: &str, stages: &[&str]) {
        let mut versions = self.versions.lock().unwrap();
        let entries = versions.entry(secret_id.to_string()).or_default();
        for stage in stages {
            for v in entries.iter_mut() {
                v.stages.retain(|s| s != stage);
            }
        }
        entries.push(StoredVersion {
            version_id: version_id.to_string(),
            secret_string: secret_string.to_string(),
            stages: stages.iter().map(ToString::to_string).collect(),
        });
    }

    pub fn versions(&self, secret_id: &str) -> Vec<StoredVersion> {
        self.versions
            .lock()
            .unwrap()
            .get(secret_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn version(&self, secret_id: &str, version_id: &str) -> Option<StoredVersion> {
        self.versions(secret_id)
            .into_iter()
            .find(|v| v.version_id == version_id)
    }

    pub fn version_with_stage(&self, secret_id: &str, stage: &str) -> Option<StoredVersion> {
        self.versions(secret_id)
            .into_iter()
            .find(|v| v.stages.iter().any(|s| s == stage))
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// put + stage update calls
    pub fn mutations(&self) -> usize {
        self.writes.load(Ordering::SeqCst) + self.stage_updates.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.reads() + self.mutations()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<VersionLookup> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let found = self.versions(secret_id).into_iter().find(|v| match selector {
            VersionSelector::Stage(stage) => v.stages.iter().any(|s| s == stage),
            VersionSelector::VersionId(id) => &v.version_id == id,
        });

        Ok(match found {
            Some(v) => VersionLookup::Found(SecretVersion {
                version_id: v.version_id,
                secret_string: v.secret_string,
            }),
            None => VersionLookup::NotFound,
        })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        stages: &[&str],
    ) -> Result<PutOutcome> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.version(secret_id, client_request_token).is_some() {
            return Ok(PutOutcome::AlreadyExists);
        }
        self.seed(secret_id, client_request_token, secret_string, stages);
        Ok(PutOutcome::Created)
    }

    async fn update_secret_version_stage(
        &self,
        secret_id: &str,
        stage: &str,
        move_to: Option<&str>,
        remove_from: Option<&str>,
    ) -> Result<()> {
        self.stage_updates.fetch_add(1, Ordering::SeqCst);

        let mut versions = self.versions.lock().unwrap();
        let entries = versions
            .get_mut(secret_id)
            .ok_or_else(|| Error::SecretStore(format!("secret {secret_id} does not exist")))?;

        if let Some(target) = move_to {
            if !entries.iter().any(|v| v.version_id == target) {
                return Err(Error::SecretStore(format!("version {target} does not exist")));
            }
        }

        let mut detached_from = None;
        if let Some(source) = remove_from {
            for v in entries.iter_mut().filter(|v| v.version_id == source) {
                let before = v.stages.len();
                v.stages.retain(|s| s != stage);
                if v.stages.len() != before {
                    detached_from = Some(v.version_id.clone());
                }
            }
        }

        if let Some(target) = move_to {
            for v in entries.iter_mut() {
                if v.version_id == target {
                    if !v.stages.iter().any(|s| s == stage) {
                        v.stages.push(stage.to_string());
                    }
                } else {
                    v.stages.retain(|s| s != stage);
                }
            }

            if stage == STAGE_CURRENT {
                if let Some(previous) = detached_from.filter(|id| id != target) {
                    for v in entries.iter_mut() {
                        v.stages.retain(|s| s != STAGE_PREVIOUS);
                        if v.version_id == previous {
                            v.stages.push(STAGE_PREVIOUS.to_string());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TokenRow {
    pub id: u32,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl TokenRow {
    pub fn expired(id: u32) -> Self {
        Self {
            id,
            expires_at: Utc::now() - Duration::hours(1),
            revoked_at: None,
        }
    }

    pub fn revoked(id: u32) -> Self {
        Self {
            id,
            expires_at: Utc::now() + Duration::days(7),
            revoked_at: Some(Utc::now() - Duration::minutes(5)),
        }
    }

    pub fn valid(id: u32) -> Self {
        Self {
            id,
            expires_at: Utc::now() + Duration::days(7),
            revoked_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct DatabaseState {
    /// `None` accepts any password (trust authentication)
    roles: HashMap<String, Option<String>>,
    tokens: Vec<TokenRow>,
    connects: usize,
    open_sessions: usize,
    fail_purge: bool,
    fail_close: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(self, username: &str, password: Option<&str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(username.to_string(), password.map(ToString::to_string));
        self
    }

    pub fn with_tokens(self, rows: Vec<TokenRow>) -> Self {
        self.state.lock().unwrap().tokens.extend(rows);
        self
    }

    pub fn failing_purge(self) -> Self {
        self.state.lock().unwrap().fail_purge = true;
        self
    }

    /// Sessions still shut down but report an error from `close`
    pub fn failing_close(self) -> Self {
        self.state.lock().unwrap().fail_close = true;
        self
    }

    pub fn set_role_password(&self, username: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(username.to_string(), Some(password.to_string()));
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .roles
            .get(username)
            .cloned()
            .flatten()
    }

    pub fn token_ids(&self) -> Vec<u32> {
        self.state.lock().unwrap().tokens.iter().map(|t| t.id).collect()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }
}

#[async_trait]
impl DatabaseConnector for FakeDatabase {
    async fn connect(&self, credentials: &DbCredentials) -> Result<Box<dyn DatabaseSession>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;

        match state.roles.get(&credentials.username) {
            Some(None) => {}
            Some(Some(expected)) if *expected == credentials.password => {}
            _ => {
                return Err(Error::Database(sqlx::Error::Protocol(format!(
                    "password authentication failed for user \"{}\"",
                    credentials.username
                ))))
            }
        }

        state.open_sessions += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<DatabaseState>>,
}

#[async_trait]
impl DatabaseSession for FakeSession {
    async fn purge_refresh_tokens(&mut self) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_purge {
            return Err(Error::Database(sqlx::Error::Protocol(
                "relation \"public.refresh_tokens\" does not exist".to_string(),
            )));
        }

        let now = Utc::now();
        let before = state.tokens.len();
        state
            .tokens
            .retain(|t| !(t.expires_at < now || t.revoked_at.is_some()));
        Ok((before - state.tokens.len()) as u64)
    }

    async fn set_password(&mut self, username: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.roles.get_mut(username) {
            Some(slot) => {
                *slot = Some(password.to_string());
                Ok(())
            }
            None => Err(Error::Database(sqlx::Error::Protocol(format!(
                "role \"{username}\" does not exist"
            )))),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.open_sessions -= 1;
        if state.fail_close {
            return Err(Error::Database(sqlx::Error::Protocol(
                "connection reset while sending Terminate".to_string(),
            )));
        }
        Ok(())
    }
}
