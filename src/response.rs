//! # Handler Responses
//!
//! Both functions answer every invocation with `{statusCode, body, error?}`.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerResponse {
    pub fn ok(body: impl Into<Value>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
            error: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: Value::String(message.into()),
            error: None,
        }
    }

    /// 500 carrying the partial body gathered before the failure
    pub fn failed(body: impl Into<Value>, error: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
            error: Some(error.into()),
        }
    }

    /// 500 whose body is the whole explanation
    pub fn server_error(body: impl Into<Value>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
