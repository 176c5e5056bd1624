//! gcts::errors
//!
//! Error taxonomy and the classification pipeline that turns opaque HTTP
//! failures into typed, actionable errors.
//!
//! # Design
//!
//! Classification is a pure function of the failed response: parse the
//! body, scan the structured error log and the `exception` field for the
//! known message patterns, and pick a [`GctsRequestKind`]. Bodies that
//! are not JSON objects pass through unchanged as [`GctsError::Http`] so
//! nothing is lost when the service (or a proxy in front of it) answers
//! with plain text.
//!
//! Classification happens at the point a failure is first observed;
//! callers of the repository and facade layers only ever see the typed
//! variants.

use serde_json::Value;
use thiserror::Error;

use crate::rest::HttpError;

/// Sub-kind of a classified gCTS request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GctsRequestKind {
    /// Any classified failure without a more specific pattern.
    Generic,
    /// The service reported no relation between system and repository.
    RepoNotExists,
    /// The service reported the repository as already existing.
    RepoAlreadyExists,
}

/// A classified gCTS failure, carrying the structured error payload.
///
/// Renders as `gCTS exception: <message>` for both display and debug,
/// where `<message>` is taken from the last `Exception`-typed entry of
/// the payload's `errorLog`, falling back to the top-level `exception`
/// field.
#[derive(Clone, PartialEq)]
pub struct GctsRequestError {
    kind: GctsRequestKind,
    messages: Value,
}

impl GctsRequestError {
    pub fn new(kind: GctsRequestKind, messages: Value) -> Self {
        Self { kind, messages }
    }

    pub fn kind(&self) -> GctsRequestKind {
        self.kind
    }

    /// The structured error payload exactly as the service sent it.
    pub fn messages(&self) -> &Value {
        &self.messages
    }

    /// The human-readable message extracted from the payload.
    pub fn message(&self) -> &str {
        last_exception_entry(&self.messages)
            .or_else(|| self.messages.get("exception").and_then(Value::as_str))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for GctsRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gCTS exception: {}", self.message())
    }
}

// Debug matches Display: the payload dump is available via messages(),
// the rendered form is what belongs in logs and assertions.
impl std::fmt::Debug for GctsRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gCTS exception: {}", self.message())
    }
}

impl std::error::Error for GctsRequestError {}

/// Any failure surfaced by this crate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GctsError {
    /// Transport failure whose body could not be interpreted as a gCTS
    /// payload; passed through unclassified.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Classified gCTS request failure.
    #[error("{0}")]
    Request(GctsRequestError),

    /// Local precondition violation or malformed response envelope;
    /// raised before any network call where the violation is local.
    #[error("{0}")]
    Validation(String),
}

impl GctsError {
    pub fn validation(message: impl Into<String>) -> Self {
        GctsError::Validation(message.into())
    }

    /// A response envelope lacked a required key.
    pub fn missing_key(key: &str) -> Self {
        GctsError::Validation(format!("gCTS response does not contain '{key}'"))
    }

    pub fn is_repo_already_exists(&self) -> bool {
        matches!(
            self,
            GctsError::Request(e) if e.kind() == GctsRequestKind::RepoAlreadyExists
        )
    }

    pub fn is_repo_not_exists(&self) -> bool {
        matches!(
            self,
            GctsError::Request(e) if e.kind() == GctsRequestKind::RepoNotExists
        )
    }
}

/// Classify a failed HTTP exchange.
///
/// Pure function of the status and parsed body: unparseable bodies pass
/// through, otherwise the payload's message texts decide the kind.
pub fn exception_from_http_error(error: HttpError) -> GctsError {
    let messages: Value = match serde_json::from_str(&error.text) {
        Ok(value @ Value::Object(_)) => value,
        _ => return GctsError::Http(error),
    };

    let kind = if any_message_contains(&messages, "Repository already exists") {
        GctsRequestKind::RepoAlreadyExists
    } else if any_message_contains(&messages, "No relation between system and repository") {
        GctsRequestKind::RepoNotExists
    } else {
        GctsRequestKind::Generic
    };

    GctsError::Request(GctsRequestError::new(kind, messages))
}

/// Message of the last `Exception`-typed entry in the payload's error log.
fn last_exception_entry(messages: &Value) -> Option<&str> {
    messages
        .get("errorLog")?
        .as_array()?
        .iter()
        .rev()
        .find(|entry| entry.get("type").and_then(Value::as_str) == Some("Exception"))?
        .get("message")?
        .as_str()
}

/// Whether any message text in the payload contains `needle`.
///
/// Scans both log arrays and the top-level `exception` field; the
/// patterns the service emits can land in any of them.
fn any_message_contains(messages: &Value, needle: &str) -> bool {
    let log_contains = |key: &str| {
        messages
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries.iter().any(|entry| {
                    entry
                        .get("message")
                        .and_then(Value::as_str)
                        .is_some_and(|message| message.contains(needle))
                })
            })
    };

    log_contains("errorLog")
        || log_contains("log")
        || messages
            .get("exception")
            .and_then(Value::as_str)
            .is_some_and(|message| message.contains(needle))
}
