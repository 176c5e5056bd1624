//! gcts::sugar
//!
//! Scoped temporary-state helpers: acquire a temporary configuration or
//! branch change, run the caller's logic, and restore the previous state
//! in a guaranteed cleanup step.
//!
//! # Recovery hints
//!
//! While a temporary state is active, the supplied
//! [`SugarOperationProgress`] carries a recovery hint describing how to
//! restore the repository manually. Every progress update replaces the
//! hint: acquisition and restoration steps pass the hint that applies
//! from that point on, and the final update after a successful
//! restoration clears it. If restoration fails, the last hint stays
//! retrievable for display.
//!
//! The helpers take the body as an async closure over the repository
//! because restoration must await network calls, which a drop guard
//! cannot.

use futures_util::future::BoxFuture;
use tracing::info;

use super::errors::GctsError;
use super::remote_repo::Repository;

/// Config key that blocks imports into the system while set to `X`.
const CONFIG_VCS_NO_IMPORT: &str = "VCS_NO_IMPORT";

/// Receiver for sugar-operation progress and the current recovery hint.
pub trait SugarOperationProgress: Send {
    /// Report a progress message and replace the recovery hint.
    fn update(&mut self, message: &str, recover_message: Option<String>);

    /// How to restore the repository manually, while a temporary state
    /// is active; `None` once nothing needs recovering.
    fn recover_message(&self) -> Option<&str>;
}

/// Progress receiver reporting through `tracing::info!`.
#[derive(Debug, Default)]
pub struct LogSugarOperationProgress {
    recover_message: Option<String>,
}

impl LogSugarOperationProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SugarOperationProgress for LogSugarOperationProgress {
    fn update(&mut self, message: &str, recover_message: Option<String>) {
        self.recover_message = recover_message;
        info!("{}", message);
    }

    fn recover_message(&self) -> Option<&str> {
        self.recover_message.as_deref()
    }
}

/// The caller's logic, run while the temporary state is active.
pub type SugarBody<'a, T> = Box<
    dyn for<'r> FnOnce(&'r mut Repository) -> BoxFuture<'r, Result<T, GctsError>> + Send + 'a,
>;

/// Run `body` with imports disabled (`VCS_NO_IMPORT = "X"`).
///
/// The previous value is restored afterwards: a prior value is written
/// back, a previously absent key is deleted, an already-`X` value is
/// left alone. Restoration runs even when `body` fails; a body failure
/// takes precedence over a restoration failure in the returned error.
pub async fn abap_modifications_disabled<T>(
    repo: &mut Repository,
    progress: &mut dyn SugarOperationProgress,
    body: SugarBody<'_, T>,
) -> Result<T, GctsError> {
    let previous = repo.get_config(CONFIG_VCS_NO_IMPORT).await?;

    progress.update(
        "Disabling imports by setting the config VCS_NO_IMPORT = \"X\" ...",
        None,
    );
    repo.set_config(CONFIG_VCS_NO_IMPORT, "X").await?;

    match previous.as_deref() {
        Some("X") => progress.update("The config VCS_NO_IMPORT was already set to \"X\"", None),
        Some(value) => progress.update(
            &format!("Successfully changed the config VCS_NO_IMPORT = \"{value}\" -> \"X\""),
            Some(format!(
                "Please set the configuration option VCS_NO_IMPORT = \"{value}\" manually"
            )),
        ),
        None => progress.update(
            "Successfully added the config VCS_NO_IMPORT = \"X\"",
            Some("Please delete the configuration option VCS_NO_IMPORT manually".to_string()),
        ),
    }

    let outcome = body(repo).await;
    let restored = restore_no_import(repo, progress, previous).await;

    match (outcome, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(error), _) => Err(error),
        (Ok(_), Err(error)) => Err(error),
    }
}

async fn restore_no_import(
    repo: &mut Repository,
    progress: &mut dyn SugarOperationProgress,
    previous: Option<String>,
) -> Result<(), GctsError> {
    match previous.as_deref() {
        Some("X") => {
            progress.update("The config VCS_NO_IMPORT has not been changed", None);
            Ok(())
        }
        Some(value) => {
            progress.update(
                &format!("Resetting the config VCS_NO_IMPORT = \"{value}\" ..."),
                Some(format!(
                    "Please set the configuration option VCS_NO_IMPORT = \"{value}\" manually"
                )),
            );
            repo.set_config(CONFIG_VCS_NO_IMPORT, value).await?;
            progress.update(
                &format!("Successfully reset the config VCS_NO_IMPORT = \"{value}\""),
                None,
            );
            Ok(())
        }
        None => {
            progress.update(
                "Removing the config VCS_NO_IMPORT ...",
                Some("Please delete the configuration option VCS_NO_IMPORT manually".to_string()),
            );
            repo.delete_config(CONFIG_VCS_NO_IMPORT).await?;
            progress.update("Successfully removed the config VCS_NO_IMPORT", None);
            Ok(())
        }
    }
}

/// Run `body` on a temporarily switched branch.
///
/// Checking out an already active branch is skipped entirely. Otherwise
/// the previous branch is checked out again afterwards, with the same
/// restoration and hint discipline as [`abap_modifications_disabled`].
pub async fn temporary_switched_branch<T>(
    repo: &mut Repository,
    branch: &str,
    progress: &mut dyn SugarOperationProgress,
    body: SugarBody<'_, T>,
) -> Result<T, GctsError> {
    let old_branch = repo.branch().await?;

    if old_branch == branch {
        progress.update(&format!("The updated branch {branch} is already active"), None);
        let outcome = body(repo).await;
        progress.update(&format!("The updated branch {branch} remains active"), None);
        return outcome;
    }

    progress.update(
        &format!("Temporarily switching to the updated branch {branch} ..."),
        Some(format!(
            "Please double check if the original branch {old_branch} is active"
        )),
    );
    repo.checkout(branch).await?;
    progress.update(
        &format!("Successfully switched to the updated branch {branch}"),
        Some(format!("Please switch to the branch {old_branch} manually")),
    );

    let outcome = body(repo).await;

    progress.update(
        &format!("Restoring the previously active branch {old_branch} ..."),
        Some(format!(
            "Please double check if the original branch {old_branch} is active"
        )),
    );
    let restored = repo.checkout(&old_branch).await;
    if restored.is_ok() {
        progress.update(
            &format!("Successfully restored the previously active branch {old_branch}"),
            None,
        );
    }

    match (outcome, restored) {
        (Ok(value), Ok(_)) => Ok(value),
        (Err(error), _) => Err(error),
        (Ok(_), Err(error)) => Err(error),
    }
}
