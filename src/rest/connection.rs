//! rest::connection
//!
//! Transport contract shared by every gCTS operation.
//!
//! # Design
//!
//! The domain layer never talks HTTP directly; it builds a [`Request`]
//! and hands it to a [`Connection`]. Implementations must return
//! [`HttpError`] for every non-2xx status so the error-classification
//! pipeline can inspect the failure body. The trait is async because all
//! implementations involve network I/O.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// HTTP methods used by the gCTS protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single request against the service base path.
///
/// `path` is relative to the connection's base URL. Query parameters keep
/// their insertion order so tests can assert recorded requests wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub accept: Option<&'static str>,
}

impl Request {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            accept: None,
        }
    }

    /// Plain GET without an Accept header.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// GET accepting `application/json`.
    pub fn get_json(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path).accepting_json()
    }

    /// POST without a body.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// POST with a JSON body, accepting `application/json`.
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::Post, path).accepting_json();
        request.body = Some(body);
        request
    }

    /// Plain DELETE.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// DELETE accepting `application/json`.
    pub fn delete_json(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path).accepting_json()
    }

    /// Attach query parameters, replacing any previous set.
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    fn accepting_json(mut self) -> Self {
        self.accept = Some("application/json");
        self
    }
}

/// A completed 2xx response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response from a JSON value (handy in tests).
    pub fn with_json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// An empty 200.
    pub fn ok() -> Self {
        Self::new(200, "")
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Parse the body as a freeform JSON value. An empty body parses as
    /// an empty object, matching the service's empty-success responses.
    pub fn json_value(&self) -> Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.body)
    }
}

/// A non-2xx response, surfaced by every [`Connection`] implementation.
///
/// Carries the status and raw body text so the classification pipeline
/// can inspect the failure, and so timeout diagnostics can quote it.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("HTTP request failed: {status}\n{text}")]
pub struct HttpError {
    pub status: u16,
    pub text: String,
}

impl HttpError {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }
}

/// The transport every gCTS operation runs through.
///
/// # Contract
///
/// `execute` returns `Ok` for 2xx responses and `Err(HttpError)` for
/// everything else; connection-level failures are reported as status 0
/// with the underlying message as text. Implementations must be
/// `Send + Sync` so one connection can back many repositories.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<Response, HttpError>;
}
