//! gcts::testing
//!
//! Shared fixtures for the domain-layer tests: a builder for the
//! structured error payload the service attaches to failed requests.

use serde_json::{json, Value};

/// Builds gCTS error payloads the way the service shapes them: an
/// `errorLog` array, a mirrored `log` array, and a top-level `exception`
/// field set by the last exception entry.
#[derive(Default)]
pub(crate) struct LogBuilder {
    error_log: Vec<Value>,
    log: Vec<Value>,
    exception: Option<String>,
}

impl LogBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append an error-severity log entry.
    pub(crate) fn error(mut self, message: &str) -> Self {
        let entry = json!({
            "severity": "Error",
            "message": message,
            "protocol": [{"type": "Paragraph", "protocol": [message]}],
        });
        self.error_log.push(entry.clone());
        self.log.push(entry);
        self
    }

    /// Append an exception entry and set the top-level `exception` field.
    pub(crate) fn exception(mut self, message: &str, code: &str) -> Self {
        let entry = json!({
            "type": "Exception",
            "message": message,
            "code": code,
        });
        self.error_log.push(entry);
        self.exception = Some(message.to_string());
        self
    }

    pub(crate) fn build(self) -> Value {
        let mut payload = json!({
            "errorLog": self.error_log,
            "log": self.log,
        });
        if let Some(exception) = self.exception {
            payload["exception"] = Value::String(exception);
        }
        payload
    }
}
