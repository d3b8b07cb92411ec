//! # PostgreSQL Sessions
//!
//! `DatabaseConnector` over a single `sqlx` connection per invocation.

use super::{DatabaseConnector, DatabaseSession};
use crate::constants::{FORMAT_ALTER_ROLE_SQL, PURGE_REFRESH_TOKENS_SQL};
use crate::error::{Error, Result};
use crate::secret::DbCredentials;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Opens PostgreSQL connections with a bounded connect timeout
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    connect_timeout: Duration,
}

impl PostgresConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl DatabaseConnector for PostgresConnector {
    async fn connect(&self, credentials: &DbCredentials) -> Result<Box<dyn DatabaseSession>> {
        let options = PgConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .database(&credentials.dbname)
            .username(&credentials.username)
            .password(&credentials.password)
            .application_name("db-credential-lambdas");

        debug!(
            host = credentials.host,
            port = credentials.port,
            dbname = credentials.dbname,
            "Opening database connection"
        );

        let connection = tokio::time::timeout(self.connect_timeout, options.connect())
            .await
            .map_err(|_elapsed| Error::ConnectTimeout(self.connect_timeout))??;

        Ok(Box::new(PostgresSession { connection }))
    }
}

/// One open connection. Statements run outside any transaction, so each one
/// commits on its own.
pub struct PostgresSession {
    connection: PgConnection,
}

impl std::fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseSession for PostgresSession {
    async fn purge_refresh_tokens(&mut self) -> Result<u64> {
        let result = sqlx::query(PURGE_REFRESH_TOKENS_SQL)
            .execute(&mut self.connection)
            .await?;

        Ok(result.rows_affected())
    }

    async fn set_password(&mut self, username: &str, password: &str) -> Result<()> {
        // ALTER ROLE takes no bind parameters, so PostgreSQL quotes both
        // values itself and the resulting statement is executed verbatim.
        let statement: Zeroizing<String> = sqlx::query_scalar(FORMAT_ALTER_ROLE_SQL)
            .bind(username)
            .bind(password)
            .fetch_one(&mut self.connection)
            .await
            .map(Zeroizing::new)?;

        sqlx::Executor::execute(&mut self.connection, statement.as_str()).await?;

        info!(username, "Database role password changed");
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(self.connection.ping().await?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(self.connection.close().await?)
    }
}
