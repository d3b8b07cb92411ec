//! # Execution Log
//!
//! Ordered record of what one rotation invocation did. The log is returned to
//! the caller as the response body; it is never persisted.

use super::RotationStep;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub status: LogStatus,
    pub message: String,
    pub step: Option<RotationStep>,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accumulator threaded through the step functions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and mirror it to tracing
    pub fn record(
        &mut self,
        status: LogStatus,
        step: Option<RotationStep>,
        message: impl Into<String>,
        extra: Map<String, Value>,
    ) {
        let message = message.into();
        let step_name = step.map_or("-", RotationStep::as_str);

        match status {
            LogStatus::Info | LogStatus::Success => {
                tracing::info!(step = step_name, status = ?status, "{message}");
            }
            LogStatus::Warning => tracing::warn!(step = step_name, "{message}"),
            LogStatus::Error => tracing::error!(step = step_name, "{message}"),
        }

        self.entries.push(LogEntry {
            status,
            message,
            step,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            extra,
        });
    }

    pub fn info(&mut self, step: Option<RotationStep>, message: impl Into<String>) {
        self.record(LogStatus::Info, step, message, Map::new());
    }

    pub fn success(&mut self, step: RotationStep, message: impl Into<String>) {
        self.record(LogStatus::Success, Some(step), message, Map::new());
    }

    pub fn warning(&mut self, step: RotationStep, message: impl Into<String>) {
        self.record(LogStatus::Warning, Some(step), message, Map::new());
    }

    pub fn error(&mut self, step: Option<RotationStep>, message: impl Into<String>) {
        self.record(LogStatus::Error, step, message, Map::new());
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self.entries).unwrap_or(Value::Null)
    }
}
