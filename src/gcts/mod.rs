//! gcts
//!
//! Domain layer for the gCTS service.
//!
//! # Modules
//!
//! - [`errors`]: error taxonomy and the HTTP-failure classification
//!   pipeline
//! - [`config`]: configuration merge engine with order-preserving
//!   semantics
//! - [`remote_repo`]: the [`Repository`] resource and its cached remote
//!   snapshot
//! - [`simple`]: stateless operations built on top of `Repository`
//!   (clone-with-create, readiness polling, user credentials, system
//!   configuration)
//! - [`sugar`]: scoped temporary-state helpers with recovery hints

pub mod config;
pub mod errors;
pub mod remote_repo;
pub mod simple;
pub mod sugar;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{
    exception_from_http_error, GctsError, GctsRequestError, GctsRequestKind,
};
pub use remote_repo::{
    CreateBranchOptions, RepoActivitiesQueryParams, Repository, EDITABLE_PROPERTIES,
    STATUS_CREATED, STATUS_READY,
};

use crate::rest::Response;
use serde_json::Value;

/// Parse a 2xx response body as JSON.
pub(crate) fn json_body(response: &Response) -> Result<Value, GctsError> {
    response
        .json_value()
        .map_err(|e| GctsError::validation(format!("gCTS response is not valid JSON: {e}")))
}

/// Derive a package name from a repository URL: the last path segment,
/// without a `.git` suffix.
pub fn package_name_from_url(url: &str) -> String {
    let name = url.rsplit('/').next().unwrap_or(url);
    name.strip_suffix(".git").unwrap_or(name).to_string()
}
