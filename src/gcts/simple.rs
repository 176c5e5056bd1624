//! gcts::simple
//!
//! Stateless operations built on top of [`Repository`]: clone-with-create,
//! readiness polling, repository listing, and the user-credential and
//! system-configuration endpoints.
//!
//! # Design
//!
//! Everything here is a free function over the [`Connection`] seam. The
//! polling loop samples an injectable [`Clock`] so its wall-clock bound
//! is deterministic under test; production callers use [`SystemClock`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::rest::{Connection, HttpError, Request, Response};

use super::errors::{exception_from_http_error, GctsError};
use super::json_body;
use super::remote_repo::{Repository, STATUS_READY};

/// Config key holding the checkout directory inside the mirror.
const CONFIG_VCS_TARGET_DIR: &str = "VCS_TARGET_DIR";

/// Config key holding the token used towards the upstream VCS.
const CONFIG_VCS_AUTH_TOKEN: &str = "CLIENT_VCS_AUTH_TOKEN";

/// User config key holding the JSON-encoded credential endpoint list.
const CONFIG_USER_CRED_ENDPOINTS: &str = "USER_AUTH_CRED_ENDPOINTS";

/// Pause between readiness polls unless the caller picks another one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Time source for the readiness polling loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock: `Instant::now` plus tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Parameters for [`clone`].
#[derive(Debug, Clone)]
pub struct CloneParams {
    /// Target virtual system id used at creation.
    pub vsid: String,
    /// Checkout directory inside the mirror; `src/` when not set.
    pub start_dir: Option<String>,
    /// Token towards the upstream VCS, stored in the repository config.
    pub vcs_token: Option<String>,
    /// Repository role; service default is `SOURCE`.
    pub role: Option<String>,
    /// Repository type; service default is `GITHUB`.
    pub typ: Option<String>,
    /// Fail when the repository already exists instead of re-using it.
    pub error_exists: bool,
}

impl Default for CloneParams {
    fn default() -> Self {
        Self {
            vsid: "6IT".to_string(),
            start_dir: None,
            vcs_token: None,
            role: None,
            typ: None,
            error_exists: true,
        }
    }
}

async fn execute(
    connection: &Arc<dyn Connection>,
    request: Request,
) -> Result<Response, GctsError> {
    connection
        .execute(&request)
        .await
        .map_err(exception_from_http_error)
}

/// Create a repository and start its server-side clone.
///
/// When creation fails because the repository already exists, the error
/// is re-raised unless `params.error_exists` is off, in which case the
/// existing repository is fetched and cloned only when its status says
/// the clone never happened.
pub async fn clone(
    connection: Arc<dyn Connection>,
    url: &str,
    rid: &str,
    params: CloneParams,
) -> Result<Repository, GctsError> {
    let mut config = IndexMap::new();
    config.insert(
        CONFIG_VCS_TARGET_DIR.to_string(),
        params.start_dir.clone().unwrap_or_else(|| "src/".to_string()),
    );
    if let Some(ref token) = params.vcs_token {
        config.insert(CONFIG_VCS_AUTH_TOKEN.to_string(), token.clone());
    }

    let mut repo = Repository::new(connection, rid);
    match repo
        .create(
            url,
            &params.vsid,
            Some(&config),
            params.role.as_deref(),
            params.typ.as_deref(),
        )
        .await
    {
        Ok(()) => {}
        Err(error) if error.is_repo_already_exists() && !params.error_exists => {
            debug!("{}", error);
            info!("Re-using the existing repository {}", rid);
            repo.wipe_data();
        }
        Err(error) => return Err(error),
    }

    if !repo.is_cloned().await? {
        repo.clone().await?;
    } else {
        info!("Not cloning the repository {}: already performed", rid);
    }
    Ok(repo)
}

/// Poll until the repository reports `READY`, using the wall clock.
pub async fn wait_for_clone(
    repo: &mut Repository,
    timeout: Duration,
    original_error: Option<HttpError>,
) -> Result<(), GctsError> {
    wait_for_clone_with(
        repo,
        timeout,
        original_error,
        &SystemClock,
        DEFAULT_POLL_INTERVAL,
    )
    .await
}

/// Poll until the repository reports `READY`.
///
/// Each round wipes the cache and re-reads the status; transient request
/// failures are logged at debug level and treated as not ready. When the
/// elapsed time exceeds `timeout`, fails with a message embedding the
/// status and text of `original_error` (the failure that started the
/// wait, if any).
pub async fn wait_for_clone_with(
    repo: &mut Repository,
    timeout: Duration,
    original_error: Option<HttpError>,
    clock: &dyn Clock,
    poll_interval: Duration,
) -> Result<(), GctsError> {
    let start = clock.now();

    while clock.now().duration_since(start) < timeout {
        repo.wipe_data();
        match repo.status().await {
            Ok(status) if status == STATUS_READY => return Ok(()),
            Ok(_) => {}
            Err(error) => {
                debug!(
                    "Failed to get status of the repository {}: {}",
                    repo.rid(),
                    error
                );
            }
        }
        clock.sleep(poll_interval).await;
    }

    let mut message = "Waiting for the repository to be in READY state timed out".to_string();
    if let Some(error) = original_error {
        message.push_str(&format!("\n{}\n{}", error.status, error.text));
    }
    Err(GctsError::Validation(message))
}

/// List all repositories, each pre-seeded with its embedded attributes.
pub async fn fetch_repos(connection: &Arc<dyn Connection>) -> Result<Vec<Repository>, GctsError> {
    let response = execute(connection, Request::get_json("repository")).await?;
    let payload = json_body(&response)?;
    let entries = payload
        .get("result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut repos = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Object(data) = entry else {
            return Err(GctsError::validation(
                "gCTS repository list entry is not an object",
            ));
        };
        let rid = data
            .get("rid")
            .or_else(|| data.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| GctsError::missing_key("rid"))?
            .to_string();
        repos.push(Repository::with_data(Arc::clone(connection), rid, data));
    }
    Ok(repos)
}

/// Switch the active branch of the repository addressed by `rid`.
///
/// Holders of a [`Repository`] call [`Repository::checkout`] directly.
pub async fn checkout(
    connection: &Arc<dyn Connection>,
    rid: &str,
    branch: &str,
) -> Result<Value, GctsError> {
    Repository::new(Arc::clone(connection), rid)
        .checkout(branch)
        .await
}

/// Delete the repository addressed by `rid`.
pub async fn delete(connection: &Arc<dyn Connection>, rid: &str) -> Result<Response, GctsError> {
    Repository::new(Arc::clone(connection), rid).delete().await
}

/// Commit history of the repository addressed by `rid`.
pub async fn log(connection: &Arc<dyn Connection>, rid: &str) -> Result<Vec<Value>, GctsError> {
    Repository::new(Arc::clone(connection), rid).log().await
}

/// Pull the repository addressed by `rid`.
pub async fn pull(connection: &Arc<dyn Connection>, rid: &str) -> Result<Value, GctsError> {
    Repository::new(Arc::clone(connection), rid).pull().await
}

/// Credential endpoints configured for the current user.
///
/// The service nests the list as a JSON-encoded string inside the user's
/// config array.
pub async fn get_user_credentials(
    connection: &Arc<dyn Connection>,
) -> Result<Vec<Value>, GctsError> {
    let response = execute(connection, Request::get_json("user")).await?;
    let payload = json_body(&response)?;
    let user = payload
        .get("user")
        .ok_or_else(|| GctsError::missing_key("user"))?;

    let config = user
        .get("config")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let Some(entry) = config.iter().find(|entry| {
        entry.get("key").and_then(Value::as_str) == Some(CONFIG_USER_CRED_ENDPOINTS)
    }) else {
        return Ok(Vec::new());
    };

    let encoded = entry.get("value").and_then(Value::as_str).unwrap_or("[]");
    serde_json::from_str(encoded)
        .map_err(|e| GctsError::validation(format!("cannot parse user credentials: {e}")))
}

/// Store an API token for the given VCS endpoint.
pub async fn set_user_api_token(
    connection: &Arc<dyn Connection>,
    api_url: &str,
    token: &str,
) -> Result<(), GctsError> {
    let body = json!({
        "endpoint": api_url,
        "user": "",
        "password": "",
        "token": token,
        "type": "token",
    });
    execute(connection, Request::post_json("user/credentials", body)).await?;
    Ok(())
}

/// Drop the credentials stored for the given VCS endpoint.
pub async fn delete_user_credentials(
    connection: &Arc<dyn Connection>,
    api_url: &str,
) -> Result<(), GctsError> {
    let body = json!({
        "endpoint": api_url,
        "user": "",
        "password": "",
        "token": "",
        "type": "none",
    });
    execute(connection, Request::post_json("user/credentials", body)).await?;
    Ok(())
}

/// Read one system configuration property.
pub async fn get_system_config_property(
    connection: &Arc<dyn Connection>,
    key: &str,
) -> Result<Value, GctsError> {
    let response = execute(connection, Request::get_json(format!("system/config/{key}"))).await?;
    json_body(&response)?
        .get("result")
        .cloned()
        .ok_or_else(|| GctsError::missing_key("result"))
}

/// List the system configuration.
pub async fn list_system_config(connection: &Arc<dyn Connection>) -> Result<Vec<Value>, GctsError> {
    let response = execute(connection, Request::get_json("system")).await?;
    let payload = json_body(&response)?;
    let result = payload
        .get("result")
        .ok_or_else(|| GctsError::missing_key("result"))?;
    Ok(result
        .get("config")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Write one system configuration property.
pub async fn set_system_config_property(
    connection: &Arc<dyn Connection>,
    key: &str,
    value: &str,
) -> Result<Value, GctsError> {
    let response = execute(
        connection,
        Request::post_json("system/config", json!({"key": key, "value": value})),
    )
    .await?;
    json_body(&response)?
        .get("result")
        .cloned()
        .ok_or_else(|| GctsError::missing_key("result"))
}

/// Delete one system configuration property; returns the raw body.
pub async fn delete_system_config_property(
    connection: &Arc<dyn Connection>,
    key: &str,
) -> Result<Value, GctsError> {
    let response = execute(connection, Request::delete_json(format!("system/config/{key}"))).await?;
    json_body(&response)
}
