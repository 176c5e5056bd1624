//! rest::mock
//!
//! Mock connection for deterministic testing.
//!
//! # Design
//!
//! The mock replays a scripted queue of responses and records every
//! executed [`Request`] so tests can assert the exact wire traffic.
//! Executing past the end of the script yields a status 599 error,
//! which keeps a forgotten expectation from hanging a test.
//!
//! # Example
//!
//! ```
//! use gcts_client::rest::{Connection, MockConnection, Request, Response};
//!
//! # tokio_test::block_on(async {
//! let connection = MockConnection::new();
//! connection.push_response(Response::ok());
//!
//! let response = connection
//!     .execute(&Request::post("repository/my-repo/clone"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(response.status, 200);
//! assert_eq!(connection.requests().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::connection::{Connection, HttpError, Request, Response};

/// Scripted connection for tests.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share the
/// same script and request log.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    inner: Arc<Mutex<MockConnectionInner>>,
}

#[derive(Debug, Default)]
struct MockConnectionInner {
    /// Responses handed out in FIFO order. An `Err` entry simulates a
    /// non-2xx response from the server.
    responses: VecDeque<Result<Response, HttpError>>,
    /// Every request executed so far.
    requests: Vec<Request>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: Response) {
        self.inner.lock().unwrap().responses.push_back(Ok(response));
    }

    /// Queue a failing response.
    pub fn push_error(&self, error: HttpError) {
        self.inner.lock().unwrap().responses.push_back(Err(error));
    }

    /// The requests executed so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Number of responses still queued.
    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, request: &Request) -> Result<Response, HttpError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());
        inner
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::new(599, "MockConnection: no scripted response")))
    }
}
