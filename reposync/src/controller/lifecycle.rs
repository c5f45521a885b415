//! Guarded higher-level actions composed from the other components.
//!
//! - [`RepoController::clone_repository`] - clone into an empty directory
//! - [`RepoController::checkout`] - clean-tree gated checkout, then pull
//! - [`RepoController::commit`] - stage untracked files and commit
//! - [`RepoController::create_branch`] - create locally and publish
//! - [`RepoController::delete_branch`] - delete locally and on the remote

use crate::controller::branches::{BranchCreation, BranchDeletion};
use crate::controller::RepoController;
use crate::error::{RemoteOperation, Result, SyncError};
use crate::git::{CommitInfo, GitError, GitOperations, ListScope};

/// Progress of a checkout. Stages are reached strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStage {
    /// Nothing checked yet.
    NotStarted,
    /// The working tree was clean.
    CleanChecked,
    /// The target exists locally.
    BranchVerified,
    /// HEAD now points at the target.
    CheckedOut,
    /// The post-checkout pull succeeded.
    Synced,
}

impl CheckoutStage {
    /// The following stage; `Synced` is terminal.
    #[must_use]
    pub const fn advance(self) -> Self {
        match self {
            Self::NotStarted => Self::CleanChecked,
            Self::CleanChecked => Self::BranchVerified,
            Self::BranchVerified => Self::CheckedOut,
            Self::CheckedOut | Self::Synced => Self::Synced,
        }
    }
}

/// A checkout that got at least as far as [`CheckoutStage::CheckedOut`].
#[derive(Debug)]
pub struct CheckoutOutcome {
    /// The branch now checked out.
    pub branch: String,
    /// `CheckedOut` or `Synced`.
    pub stage: CheckoutStage,
    /// Why the best-effort pull failed, if it did.
    pub sync_failure: Option<SyncError>,
}

impl CheckoutOutcome {
    /// True when the post-checkout pull also succeeded.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self.stage, CheckoutStage::Synced)
    }
}

/// What a commit request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The tree was clean and empty commits were not allowed.
    Skipped,
    /// Only unstaged tracked changes existed; nothing was committed.
    NothingStaged,
    /// A commit was created.
    Committed {
        /// New commit SHA.
        id: String,
        /// Untracked paths staged into it.
        staged: Vec<String>,
    },
}

/// Outcome of deleting a branch on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRemoval {
    pub local: BranchDeletion,
    pub remote: BranchDeletion,
}

impl<G: GitOperations> RepoController<G> {
    /// Clones the remote into the handle's root.
    ///
    /// The root must still be an empty directory when this runs.
    pub fn clone_repository(&self) -> Result<()> {
        let remote = self.handle.remote();
        tracing::info!(
            remote = %remote.display_url(),
            path = %self.handle.root().display(),
            "cloning"
        );

        if let Err(e) = self.handle.ensure_clone_target() {
            tracing::warn!(error = %e, "clone refused");
            return Err(e);
        }

        match self.git.clone_repository() {
            Ok(()) => {
                tracing::info!(path = %self.handle.root().display(), "clone succeeded");
                Ok(())
            },
            Err(source) => {
                let err = SyncError::from_remote(RemoteOperation::Clone, source);
                tracing::warn!(error = %err, "clone failed");
                Err(err)
            },
        }
    }

    /// Checks out an existing local branch, then pulls.
    ///
    /// Refused with [`SyncError::DirtyTree`] (or
    /// [`SyncError::StatusUnknown`]) unless the tree is clean, and with
    /// [`SyncError::BranchNotFound`] unless the branch exists locally. A
    /// failed pull does not undo the checkout; it is reported in
    /// [`CheckoutOutcome::sync_failure`].
    pub fn checkout(&self, branch: &str) -> Result<CheckoutOutcome> {
        tracing::info!(branch, "preparing checkout");
        let mut stage = CheckoutStage::NotStarted;

        let status = self.worktree().status().map_err(|e| {
            tracing::warn!(branch, error = %e, "checkout refused: status unavailable");
            SyncError::StatusUnknown(e.to_string())
        })?;
        if !status.is_clean() {
            tracing::warn!(branch, "checkout refused: working tree has uncommitted changes");
            return Err(SyncError::DirtyTree);
        }
        stage = stage.advance();

        if !self.branches().exists(branch, ListScope::Local)? {
            tracing::warn!(branch, "checkout refused: branch not found");
            return Err(SyncError::BranchNotFound(branch.to_string()));
        }
        stage = stage.advance();

        if let Err(source) = self.git.checkout(branch) {
            tracing::warn!(branch, error = %source, "checkout failed");
            return Err(SyncError::CheckoutFailed {
                branch: branch.to_string(),
                source,
            });
        }
        stage = stage.advance();
        tracing::info!(branch, "checked out");

        let sync_failure = match self.sync().pull() {
            Ok(()) => {
                stage = stage.advance();
                None
            },
            Err(e) => Some(e),
        };

        Ok(CheckoutOutcome {
            branch: branch.to_string(),
            stage,
            sync_failure,
        })
    }

    /// Stages every untracked path and commits.
    ///
    /// Tracked files with unstaged modifications are not staged. A clean
    /// tree with `allow_empty == false` is a successful no-op, and
    /// unresolved conflicts refuse the commit before anything is staged.
    pub fn commit(&self, message: Option<&str>, allow_empty: bool) -> Result<CommitOutcome> {
        let message = message.unwrap_or(&self.default_message);
        tracing::info!(message, allow_empty, "committing");

        let status = self.worktree().status()?;
        if !allow_empty && status.is_clean() {
            tracing::info!("nothing to commit");
            return Ok(CommitOutcome::Skipped);
        }
        if status.has_conflicts() {
            let conflicting: Vec<String> = status.conflicting.iter().cloned().collect();
            tracing::warn!(paths = ?conflicting, "commit refused: unresolved conflicts");
            return Err(SyncError::ConflictsPresent(conflicting));
        }

        let staged: Vec<String> = status.untracked.iter().cloned().collect();
        if !staged.is_empty() {
            tracing::info!(paths = ?staged, "staging untracked files");
        }

        match self.git.commit(message, &staged, allow_empty) {
            Ok(id) => {
                tracing::info!(commit = %id, "commit created");
                Ok(CommitOutcome::Committed { id, staged })
            },
            Err(GitError::NothingToCommit) => {
                tracing::info!("only unstaged tracked changes; nothing committed");
                Ok(CommitOutcome::NothingStaged)
            },
            Err(e) => {
                tracing::warn!(error = %e, "commit failed");
                Err(e.into())
            },
        }
    }

    /// Creates a branch locally and publishes it. See
    /// [`BranchRegistry::create`](crate::controller::BranchRegistry::create).
    pub fn create_branch(&self, name: &str) -> Result<BranchCreation> {
        self.branches().create(name)
    }

    /// Deletes a branch locally, then on the remote.
    ///
    /// Stops at the first failure; a missing branch on either side is not
    /// one.
    pub fn delete_branch(&self, name: &str) -> Result<BranchRemoval> {
        let branches = self.branches();
        let local = branches.delete_local(name)?;
        let remote = branches.delete_remote(name)?;
        Ok(BranchRemoval { local, remote })
    }

    /// Commit log from HEAD, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        let entries = self.git.log(limit)?;
        for entry in &entries {
            tracing::debug!(commit = %entry.id, summary = %entry.summary, "history");
        }
        Ok(entries)
    }
}
