//! The repository controller and its components.
//!
//! [`RepoController`] owns one [`RepositoryHandle`] and one git backend and
//! hands out short-lived views over them:
//!
//! - [`WorkingTree`] for status queries
//! - [`BranchRegistry`] for listing, creating and deleting branches
//! - [`SyncController`] for pull, fetch and push
//!
//! The guarded lifecycle actions (clone, checkout, commit) live directly on
//! the controller.

pub mod branches;
pub mod lifecycle;
pub mod sync;
pub mod worktree;

pub use branches::{BranchCreation, BranchDeletion, BranchRegistry};
pub use lifecycle::{BranchRemoval, CheckoutOutcome, CheckoutStage, CommitOutcome};
pub use sync::SyncController;
pub use worktree::{TreeState, WorkingTree};

use std::fs;

use crate::config::settings::DEFAULT_COMMIT_MESSAGE;
use crate::config::ReposyncConfig;
use crate::error::{Result, SyncError};
use crate::git::{Git2Operations, GitOperations};
use crate::handle::RepositoryHandle;

/// Synchronization controller for a single working copy.
pub struct RepoController<G: GitOperations = Git2Operations> {
    handle: RepositoryHandle,
    git: G,
    default_message: String,
}

impl RepoController<Git2Operations> {
    /// Controller backed by libgit2.
    #[must_use]
    pub fn new(handle: RepositoryHandle) -> Self {
        let git = Git2Operations::new(handle.clone());
        Self::with_backend(handle, git)
    }

    /// Builds a controller from configuration.
    ///
    /// A missing or empty working-copy directory is prepared for
    /// [`clone_repository`](Self::clone_repository); anything else is
    /// opened as an existing working copy.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when the path or remote URL is unset,
    /// or the handle validation error.
    pub fn from_config(config: &ReposyncConfig) -> Result<Self> {
        let root = config
            .repository
            .path
            .clone()
            .ok_or_else(|| SyncError::Config("repository.path is not set".to_string()))?;
        let remote = config
            .remote()
            .ok_or_else(|| SyncError::Config("repository.remote_url is not set".to_string()))?;
        let credentials = config.credentials();

        let awaiting_clone =
            !root.exists() || (root.is_dir() && fs::read_dir(&root)?.next().is_none());
        let handle = if awaiting_clone {
            RepositoryHandle::initialize_for_clone(root, remote, credentials)?
        } else {
            RepositoryHandle::open(root, remote, credentials)?
        };
        tracing::debug!(
            path = %handle.root().display(),
            remote = %handle.remote().display_url(),
            awaiting_clone,
            "repository handle ready"
        );

        let mut git = Git2Operations::new(handle.clone());
        if let Some(identity) = config.identity() {
            git = git.with_identity(identity);
        }

        Ok(Self::with_backend(handle, git)
            .with_default_message(config.commit.default_message.clone()))
    }
}

impl<G: GitOperations> RepoController<G> {
    /// Controller over an arbitrary backend.
    pub fn with_backend(handle: RepositoryHandle, git: G) -> Self {
        Self {
            handle,
            git,
            default_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    /// Message used by [`commit`](Self::commit) when none is given.
    #[must_use]
    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }

    pub const fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    pub const fn worktree(&self) -> WorkingTree<'_, G> {
        WorkingTree::new(&self.git)
    }

    pub const fn sync(&self) -> SyncController<'_, G> {
        SyncController::new(&self.git, self.handle.remote())
    }

    pub const fn branches(&self) -> BranchRegistry<'_, G> {
        BranchRegistry::new(&self.git, self.sync())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::operations::tests as operations_tests;
    use tempfile::TempDir;

    fn config_for(path: &std::path::Path, url: &str) -> ReposyncConfig {
        let mut config = ReposyncConfig::default();
        config.repository.path = Some(path.to_path_buf());
        config.repository.remote_url = Some(url.to_string());
        config.commit.author_name = Some("Test".to_string());
        config.commit.author_email = Some("test@test.com".to_string());
        config.commit.default_message = "auto".to_string();
        config
    }

    #[test]
    fn from_config_requires_path_and_remote() {
        let config = ReposyncConfig::default();
        assert!(matches!(
            RepoController::from_config(&config),
            Err(SyncError::Config(_))
        ));

        let temp_dir = TempDir::new().unwrap();
        let mut config = ReposyncConfig::default();
        config.repository.path = Some(temp_dir.path().to_path_buf());
        assert!(matches!(
            RepoController::from_config(&config),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn from_config_rejects_file_as_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            RepoController::from_config(&config_for(&file, "/srv/git/repo.git")),
            Err(SyncError::InvalidLocalPath { .. })
        ));
    }

    #[test]
    fn from_config_clones_into_missing_directory() {
        crate::init_test_tracing();
        let origin = operations_tests::init_origin();
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("work");
        let config = config_for(&root, &origin.path().to_string_lossy());

        let ctl = RepoController::from_config(&config).unwrap();
        ctl.clone_repository().unwrap();
        assert!(root.join("README.md").is_file());

        fs::write(root.join("a.txt"), "a\n").unwrap();
        assert!(matches!(
            ctl.commit(None, false).unwrap(),
            CommitOutcome::Committed { .. }
        ));
        assert_eq!(ctl.history(1).unwrap()[0].summary, "auto");
        assert_eq!(ctl.history(1).unwrap()[0].author, "Test");

        // Reopening an existing working copy does not prepare a clone.
        let reopened = RepoController::from_config(&config).unwrap();
        assert_eq!(reopened.worktree().tree_state(), TreeState::Clean);
        assert!(matches!(
            reopened.clone_repository(),
            Err(SyncError::NotEmptyForClone(_))
        ));
    }
}
