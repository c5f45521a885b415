//! Remote synchronization: pull, fetch and push.
//!
//! Each call performs exactly one round of the corresponding primitive
//! with the handle's credentials. There is no retry or backoff here; callers
//! that need either can use [`SyncError::is_retriable`].

use crate::error::{RemoteOperation, Result, SyncError};
use crate::git::types::LOCAL_PREFIX;
use crate::git::{GitOperations, GitResult};
use crate::handle::Remote;

/// Talks to the remote on behalf of one working copy.
pub struct SyncController<'a, G: GitOperations> {
    git: &'a G,
    remote: &'a Remote,
}

impl<'a, G: GitOperations> SyncController<'a, G> {
    /// Creates a controller over `git` for `remote`.
    pub const fn new(git: &'a G, remote: &'a Remote) -> Self {
        Self { git, remote }
    }

    /// The remote this controller talks to.
    pub const fn remote(&self) -> &'a Remote {
        self.remote
    }

    /// Fetches and merges the current branch's upstream.
    pub fn pull(&self) -> Result<()> {
        tracing::info!(remote = %self.remote.display_url(), "pulling");
        self.finish(RemoteOperation::Pull, self.git.pull())
    }

    /// Updates remote-tracking references without touching the working tree.
    pub fn fetch(&self) -> Result<()> {
        tracing::info!(remote = %self.remote.display_url(), "fetching");
        self.finish(RemoteOperation::Fetch, self.git.fetch())
    }

    /// Pushes the current branch to the branch of the same name on the remote.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BranchNotFound`] when HEAD is detached, otherwise
    /// the classified push failure.
    pub fn push(&self, force: bool) -> Result<()> {
        let branch = self
            .git
            .current_branch()?
            .ok_or_else(|| SyncError::BranchNotFound("HEAD (detached)".to_string()))?;

        let refspec = format!("{LOCAL_PREFIX}{branch}:{LOCAL_PREFIX}{branch}");
        self.push_refspecs(&[refspec], force)
    }

    /// Pushes explicit refspecs.
    pub fn push_refspecs(&self, refspecs: &[String], force: bool) -> Result<()> {
        tracing::info!(
            remote = %self.remote.display_url(),
            refspecs = ?refspecs,
            force,
            "pushing"
        );
        self.finish(RemoteOperation::Push, self.git.push(refspecs, force))
    }

    fn finish(&self, operation: RemoteOperation, result: GitResult<()>) -> Result<()> {
        match result {
            Ok(()) => {
                tracing::info!(remote = %self.remote.name, "{operation} succeeded");
                Ok(())
            },
            Err(source) => {
                let err = SyncError::from_remote(operation, source);
                tracing::warn!(remote = %self.remote.name, error = %err, "{operation} failed");
                Err(err)
            },
        }
    }
}
