//! rest::http
//!
//! reqwest-backed [`Connection`] implementation.
//!
//! # Design
//!
//! `RestConnection` joins relative request paths onto a base URL, sends
//! JSON bodies, and maps every non-2xx status to [`HttpError`] with the
//! raw body text attached, which is exactly what the classification
//! pipeline needs downstream. It performs no retries; request timeouts
//! belong to the underlying `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;

use super::connection::{Connection, HttpError, Method, Request, Response};

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP connection to a gCTS service endpoint.
pub struct RestConnection {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

// Custom Debug to avoid exposing the bearer token.
impl std::fmt::Debug for RestConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnection")
            .field("base_url", &self.base_url)
            .field("has_bearer_token", &self.bearer_token.is_some())
            .finish()
    }
}

impl RestConnection {
    /// Create a connection for the given service base URL.
    ///
    /// The base URL should point at the gCTS entry point, e.g.
    /// `https://host:port/sap/bc/cts_abapvcs`. A trailing slash is
    /// tolerated.
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| HttpError::new(0, e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Create a connection that authenticates with a bearer token.
    pub fn with_bearer_token(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, HttpError> {
        let mut connection = Self::new(base_url)?;
        connection.bearer_token = Some(token.into());
        Ok(connection)
    }

    /// The configured service base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn headers(&self, request: &Request) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        if let Some(accept) = request.accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        if let Some(ref token) = self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| HttpError::new(0, e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl Connection for RestConnection {
    async fn execute(&self, request: &Request) -> Result<Response, HttpError> {
        let url = self.url(&request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };

        builder = builder.headers(self.headers(request)?);

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::new(0, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::new(status.as_u16(), e.to_string()))?;

        if status.is_success() {
            Ok(Response::new(status.as_u16(), text))
        } else {
            Err(HttpError::new(status.as_u16(), text))
        }
    }
}
