//! Database Credential Lambdas
//!
//! Two independent serverless functions supporting the credential lifecycle of
//! a PostgreSQL-backed system:
//!
//! - [`janitor`] deletes expired and revoked refresh tokens
//! - [`rotation`] rotates the database password stored in Secrets Manager
//!
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod janitor;
pub mod response;
pub mod rotation;
pub mod secret;
pub mod telemetry;

pub use config::FunctionConfig;
pub use error::{Error, Result};
pub use response::HandlerResponse;
