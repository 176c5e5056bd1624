//! gcts::remote_repo
//!
//! The Repository resource: a stateful proxy for one server-side
//! repository mirror.
//!
//! # Design
//!
//! A [`Repository`] owns an optional cached snapshot of the attributes
//! the server reports (`name`, `status`, `url`, `branch`, `config`,
//! ...). The cache is populated lazily on first attribute access and
//! wiped by every operation that can change server state; callers that
//! need a fresh read at a specific point use [`Repository::wipe_data`].
//!
//! All failures coming back from the transport are classified through
//! [`exception_from_http_error`] before they reach the caller. Local
//! precondition violations (non-editable property, invalid activity
//! operation filter) are raised before any network call.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::rest::{Connection, Request, Response};

use super::config::{self, ConfigEntry};
use super::errors::{exception_from_http_error, GctsError};
use super::json_body;

/// Repository properties that may be edited through [`Repository::set_item`].
///
/// `name` is deliberately absent: the service derives it from the rid at
/// creation time and renaming breaks the relation between the two.
pub const EDITABLE_PROPERTIES: &[&str] = &["rid", "role", "type", "vsid", "url"];

/// Repository status reported while the initial clone is still pending.
pub const STATUS_CREATED: &str = "CREATED";

/// Repository status once the mirror is cloned and serviceable.
pub const STATUS_READY: &str = "READY";

/// Options for [`Repository::create_branch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateBranchOptions {
    /// Create a symbolic ref instead of a direct one.
    pub symbolic: bool,
    /// Create a peeled ref.
    pub peeled: bool,
    /// Keep the branch local to the system instead of pushing it.
    pub local_only: bool,
}

/// Filter and pagination parameters for the activity-history endpoint.
///
/// `limit` and `offset` always serialize; the commit bounds and the
/// operation filter only when set. The operation filter validates
/// against [`allowed_operations`] before any state changes.
///
/// [`allowed_operations`]: RepoActivitiesQueryParams::allowed_operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoActivitiesQueryParams {
    limit: u32,
    offset: u32,
    to_commit: Option<String>,
    from_commit: Option<String>,
    operation: Option<String>,
}

impl Default for RepoActivitiesQueryParams {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            to_commit: None,
            from_commit: None,
            operation: None,
        }
    }
}

impl RepoActivitiesQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation names the history endpoint accepts as a filter.
    pub fn allowed_operations() -> &'static [&'static str] {
        &["COMMIT", "PULL", "CLONE", "BRANCH_SW"]
    }

    pub fn set_limit(&mut self, limit: u32) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn set_offset(&mut self, offset: u32) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn set_tocommit(&mut self, commit: impl Into<String>) -> &mut Self {
        self.to_commit = Some(commit.into());
        self
    }

    pub fn set_fromcommit(&mut self, commit: impl Into<String>) -> &mut Self {
        self.from_commit = Some(commit.into());
        self
    }

    /// Set the operation filter.
    ///
    /// Fails without mutating the filter when `operation` is not in the
    /// allow-list.
    pub fn set_operation(&mut self, operation: &str) -> Result<&mut Self, GctsError> {
        if !Self::allowed_operations().contains(&operation) {
            return Err(GctsError::Validation(format!(
                "Invalid gCTS Activity Operation: {operation}"
            )));
        }
        self.operation = Some(operation.to_string());
        Ok(self)
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Serialize into string-valued query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        if let Some(ref commit) = self.to_commit {
            params.push(("toCommit".to_string(), commit.clone()));
        }
        if let Some(ref commit) = self.from_commit {
            params.push(("fromCommit".to_string(), commit.clone()));
        }
        if let Some(ref operation) = self.operation {
            params.push(("type".to_string(), operation.clone()));
        }
        params
    }
}

/// Proxy for a single remote repository, addressed by its rid.
pub struct Repository {
    connection: Arc<dyn Connection>,
    rid: String,
    data: Option<Map<String, Value>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("rid", &self.rid)
            .field("cached", &self.data.is_some())
            .finish()
    }
}

impl Repository {
    /// Create an empty proxy; the first attribute read fetches.
    pub fn new(connection: Arc<dyn Connection>, rid: impl Into<String>) -> Self {
        Self {
            connection,
            rid: rid.into(),
            data: None,
        }
    }

    /// Create a proxy pre-seeded with server data, e.g. from a list
    /// endpoint that embeds full attributes.
    pub fn with_data(
        connection: Arc<dyn Connection>,
        rid: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            connection,
            rid: rid.into(),
            data: Some(data),
        }
    }

    pub fn rid(&self) -> &str {
        &self.rid
    }

    /// Whether a snapshot of server data is currently cached.
    pub fn has_cached_data(&self) -> bool {
        self.data.is_some()
    }

    /// Drop the cached snapshot; the next attribute read fetches.
    pub fn wipe_data(&mut self) {
        self.data = None;
    }

    async fn execute(&self, request: Request) -> Result<Response, GctsError> {
        self.connection
            .execute(&request)
            .await
            .map_err(exception_from_http_error)
    }

    /// Fetch the repository attributes and adopt the `result` object.
    ///
    /// The service answers with an error status for repositories whose
    /// remote is gone, while still embedding the attributes under
    /// `result`; such envelopes are adopted rather than raised.
    async fn fetch_data(&mut self) -> Result<(), GctsError> {
        let request = Request::get_json(format!("repository/{}", self.rid));
        let payload = match self.connection.execute(&request).await {
            Ok(response) => json_body(&response)?,
            Err(error) => match serde_json::from_str::<Value>(&error.text) {
                Ok(body) if body.get("result").is_some() => body,
                _ => return Err(exception_from_http_error(error)),
            },
        };

        match payload.get("result") {
            Some(Value::Object(result)) => {
                self.data = Some(result.clone());
                Ok(())
            }
            _ => Err(GctsError::missing_key("result")),
        }
    }

    async fn ensure_data(&mut self) -> Result<&Map<String, Value>, GctsError> {
        if self.data.is_none() {
            self.fetch_data().await?;
        }
        self.data
            .as_ref()
            .ok_or_else(|| GctsError::missing_key("result"))
    }

    async fn string_item(&mut self, key: &str) -> Result<String, GctsError> {
        let data = self.ensure_data().await?;
        data.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GctsError::missing_key(key))
    }

    /// Generic attribute read; fetches when the cache is absent.
    pub async fn get_item(&mut self, key: &str) -> Result<Option<Value>, GctsError> {
        let data = self.ensure_data().await?;
        Ok(data.get(key).cloned())
    }

    pub async fn name(&mut self) -> Result<String, GctsError> {
        self.string_item("name").await
    }

    pub async fn status(&mut self) -> Result<String, GctsError> {
        self.string_item("status").await
    }

    pub async fn url(&mut self) -> Result<String, GctsError> {
        self.string_item("url").await
    }

    pub async fn branch(&mut self) -> Result<String, GctsError> {
        self.string_item("branch").await
    }

    pub async fn head_commit(&mut self) -> Result<String, GctsError> {
        self.string_item("currentCommit").await
    }

    /// Whether the initial clone has completed.
    pub async fn is_cloned(&mut self) -> Result<bool, GctsError> {
        Ok(self.status().await? != STATUS_CREATED)
    }

    /// Ordered view of the cached configuration entries.
    pub async fn configuration(&mut self) -> Result<IndexMap<String, String>, GctsError> {
        let data = self.ensure_data().await?;
        Ok(config::to_mapping(&config_entries(data)))
    }

    /// Register the repository on the server.
    ///
    /// `config` entries are merged, in supplied order, over any entries
    /// already present in a pre-seeded cache; the request carries a
    /// `config` array only when the merged result is non-empty. On
    /// success the returned `repository` object becomes the new cache.
    pub async fn create(
        &mut self,
        url: &str,
        vsid: &str,
        config: Option<&IndexMap<String, String>>,
        role: Option<&str>,
        typ: Option<&str>,
    ) -> Result<(), GctsError> {
        let mut entries = self
            .data
            .as_ref()
            .map(|data| config_entries(data))
            .unwrap_or_default();
        if let Some(config) = config {
            for (key, value) in config {
                config::upsert(&mut entries, key, value);
            }
        }

        let mut data = Map::new();
        data.insert("rid".into(), Value::String(self.rid.clone()));
        data.insert("name".into(), Value::String(self.rid.clone()));
        data.insert("role".into(), json!(role.unwrap_or("SOURCE")));
        data.insert("type".into(), json!(typ.unwrap_or("GITHUB")));
        data.insert("vsid".into(), json!(vsid));
        data.insert("url".into(), json!(url));
        data.insert("connection".into(), json!("ssl"));
        if !entries.is_empty() {
            data.insert("config".into(), config_to_value(&entries)?);
        }

        let mut body = Map::new();
        body.insert("repository".into(), Value::String(self.rid.clone()));
        body.insert("data".into(), Value::Object(data));

        let response = self
            .execute(Request::post_json("repository", Value::Object(body)))
            .await?;
        let payload = json_body(&response)?;

        if let Some(Value::Object(repository)) = payload.get("repository") {
            self.data = Some(repository.clone());
        }
        Ok(())
    }

    /// Write one configuration key and mirror it into the cache.
    ///
    /// The cache is fetched first when absent so the upsert lands in a
    /// complete snapshot; the rest of the cache stays valid.
    pub async fn set_config(&mut self, key: &str, value: &str) -> Result<(), GctsError> {
        let request = Request::post_json(
            format!("repository/{}/config", self.rid),
            json!({"key": key, "value": value}),
        );
        self.execute(request).await?;

        self.ensure_data().await?;
        if let Some(data) = self.data.as_mut() {
            let mut entries = config_entries(data);
            config::upsert(&mut entries, key, value);
            data.insert("config".into(), config_to_value(&entries)?);
        }
        Ok(())
    }

    /// Read one configuration key.
    ///
    /// Keys present in the cache are answered locally. An uncached key
    /// is probed with a single-key request whose result is returned but
    /// never folded back into the cache: only the full fetch path may
    /// populate it, so a partial probe cannot shadow the server's list.
    pub async fn get_config(&mut self, key: &str) -> Result<Option<String>, GctsError> {
        let mapping = self.configuration().await?;
        if let Some(value) = mapping.get(key) {
            return Ok(Some(value.clone()));
        }

        let request = Request::get_json(format!("repository/{}/config/{}", self.rid, key));
        let response = self.execute(request).await?;
        let payload = json_body(&response)?;

        Ok(payload
            .get("result")
            .and_then(|result| result.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Delete one configuration key and drop it from the cache.
    pub async fn delete_config(&mut self, key: &str) -> Result<(), GctsError> {
        let request = Request::delete(format!("repository/{}/config/{}", self.rid, key));
        self.execute(request).await?;

        if let Some(data) = self.data.as_mut() {
            let mut entries = config_entries(data);
            config::remove(&mut entries, key);
            data.insert("config".into(), config_to_value(&entries)?);
        }
        Ok(())
    }

    /// Start the server-side clone of the configured remote.
    pub async fn clone(&mut self) -> Result<Response, GctsError> {
        let response = self
            .execute(Request::post(format!("repository/{}/clone", self.rid)))
            .await?;
        self.data = None;
        Ok(response)
    }

    /// Switch the active branch.
    ///
    /// The switch endpoint is addressed via the currently active branch,
    /// so an absent cache triggers a fetch first.
    pub async fn checkout(&mut self, branch: &str) -> Result<Value, GctsError> {
        let old_branch = self.branch().await?;
        let request = Request::get(format!(
            "repository/{}/branches/{}/switch",
            self.rid, old_branch
        ))
        .with_params(vec![("branch".to_string(), branch.to_string())]);

        let response = self.execute(request).await?;
        let payload = json_body(&response)?;
        self.data = None;
        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Delete the repository on the server.
    pub async fn delete(&mut self) -> Result<Response, GctsError> {
        let response = self
            .execute(Request::delete(format!("repository/{}", self.rid)))
            .await?;
        self.data = None;
        Ok(response)
    }

    /// Commit history of the active branch.
    pub async fn log(&mut self) -> Result<Vec<Value>, GctsError> {
        let response = self
            .execute(Request::get_json(format!(
                "repository/{}/getCommit",
                self.rid
            )))
            .await?;
        let payload = json_body(&response)?;
        Ok(payload
            .get("commits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Pull the remote into the mirror; returns the commit range moved.
    pub async fn pull(&mut self) -> Result<Value, GctsError> {
        let response = self
            .execute(Request::get_json(format!(
                "repository/{}/pullByCommit",
                self.rid
            )))
            .await?;
        let payload = json_body(&response)?;
        self.data = None;
        Ok(payload)
    }

    /// Query the recorded activity history.
    ///
    /// The service guarantees a non-empty `result` list on success, so
    /// an explicitly empty list is a hard error; a missing `result` key
    /// means the feature reported nothing and yields an empty list.
    pub async fn activities(
        &mut self,
        params: &RepoActivitiesQueryParams,
    ) -> Result<Vec<Value>, GctsError> {
        let request = Request::get_json(format!("repository/{}/getHistory", self.rid))
            .with_params(params.to_params());
        let response = self.execute(request).await?;
        let payload = json_body(&response)?;

        match payload.get("result") {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) if !items.is_empty() => Ok(items.clone()),
            Some(_) => Err(GctsError::validation(
                "A successful gcts getHistory request did not return result",
            )),
        }
    }

    /// Commit the objects of a transport request and push.
    pub async fn commit_transport(
        &mut self,
        corrnr: &str,
        message: &str,
        description: Option<&str>,
    ) -> Result<Response, GctsError> {
        self.commit_object(corrnr, "TRANSPORT", message, description)
            .await
    }

    /// Commit a full package and push.
    pub async fn commit_package(
        &mut self,
        package: &str,
        message: &str,
        description: Option<&str>,
    ) -> Result<Response, GctsError> {
        self.commit_object(package, "FULL_PACKAGE", message, description)
            .await
    }

    // Commits change status and commit id on the server even when the
    // response reports a failure, so the cache is wiped either way.
    async fn commit_object(
        &mut self,
        object: &str,
        object_type: &str,
        message: &str,
        description: Option<&str>,
    ) -> Result<Response, GctsError> {
        let mut body = Map::new();
        body.insert("message".into(), json!(message));
        body.insert("autoPush".into(), json!("true"));
        body.insert(
            "objects".into(),
            json!([{"object": object, "type": object_type}]),
        );
        if let Some(description) = description {
            body.insert("description".into(), json!(description));
        }

        let request = Request::post_json(
            format!("repository/{}/commit", self.rid),
            Value::Object(body),
        );
        let result = self.execute(request).await;
        self.data = None;
        result
    }

    /// Point the repository at a different remote URL.
    ///
    /// Returns `None` without a network write when the URL is unchanged.
    pub async fn set_url(&mut self, url: &str) -> Result<Option<Response>, GctsError> {
        self.set_item("url", url).await
    }

    /// Change the repository role (`SOURCE` / `TARGET`).
    pub async fn set_role(&mut self, role: &str) -> Result<Option<Response>, GctsError> {
        self.set_item("role", role).await
    }

    /// Edit one repository property.
    ///
    /// Only members of [`EDITABLE_PROPERTIES`] are accepted; anything
    /// else fails before a single request is issued. Unchanged values
    /// are a no-op returning `None`.
    pub async fn set_item(
        &mut self,
        property: &str,
        value: &str,
    ) -> Result<Option<Response>, GctsError> {
        if !EDITABLE_PROPERTIES.contains(&property) {
            return Err(GctsError::Validation(format!(
                "Cannot edit property \"{property}\"."
            )));
        }

        let current = self.get_item(property).await?;
        if current.as_ref().and_then(Value::as_str) == Some(value) {
            return Ok(None);
        }

        let mut body = Map::new();
        body.insert(property.to_string(), json!(value));
        let response = self
            .execute(Request::post_json(
                format!("repository/{}", self.rid),
                Value::Object(body),
            ))
            .await?;
        Ok(Some(response))
    }

    /// Create a branch; returns the `branch` object of the response.
    pub async fn create_branch(
        &mut self,
        name: &str,
        options: CreateBranchOptions,
    ) -> Result<Value, GctsError> {
        let body = json!({
            "branch": name,
            "type": if options.local_only { "local" } else { "global" },
            "isSymbolic": options.symbolic,
            "isPeeled": options.peeled,
        });
        let response = self
            .execute(Request::post_json(
                format!("repository/{}/branches", self.rid),
                body,
            ))
            .await?;
        let payload = json_body(&response)?;
        payload
            .get("branch")
            .cloned()
            .ok_or_else(|| GctsError::missing_key("branch"))
    }

    /// Delete a branch; returns the raw response body.
    pub async fn delete_branch(&mut self, name: &str) -> Result<Value, GctsError> {
        let response = self
            .execute(Request::delete(format!(
                "repository/{}/branches/{}",
                self.rid, name
            )))
            .await?;
        json_body(&response)
    }

    /// List branches; the response must carry a `branches` array.
    pub async fn list_branches(&mut self) -> Result<Vec<Value>, GctsError> {
        let response = self
            .execute(Request::get_json(format!(
                "repository/{}/branches",
                self.rid
            )))
            .await?;
        let payload = json_body(&response)?;
        payload
            .get("branches")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| GctsError::missing_key("branches"))
    }
}

fn config_entries(data: &Map<String, Value>) -> Vec<ConfigEntry> {
    data.get("config")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

fn config_to_value(entries: &[ConfigEntry]) -> Result<Value, GctsError> {
    serde_json::to_value(entries)
        .map_err(|e| GctsError::validation(format!("cannot serialize config entries: {e}")))
}
