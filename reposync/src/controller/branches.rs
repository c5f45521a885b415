//! Branch registry: listing, existence checks, creation and deletion.
//!
//! Name matching follows a loose suffix rule (see [`BranchRef::matches`]):
//! `dev` matches both `refs/heads/dev` and `refs/heads/feature/dev`. It is
//! kept as-is because callers rely on it to refuse creating a branch whose
//! last segment collides with an existing one. Deletion never uses it.

use crate::controller::sync::SyncController;
use crate::error::{Result, SyncError};
use crate::git::types::LOCAL_PREFIX;
use crate::git::{BranchRef, GitOperations, ListScope};

/// Result of creating a branch, which happens in two phases.
#[derive(Debug)]
pub enum BranchCreation {
    /// Created locally and pushed to the remote.
    Published(BranchRef),

    /// Created locally, push failed. The local branch is kept.
    LocalOnly {
        /// The local branch that now exists.
        branch: BranchRef,
        /// Why publishing failed.
        cause: SyncError,
    },
}

impl BranchCreation {
    /// The local branch, present in both outcomes.
    #[must_use]
    pub const fn branch(&self) -> &BranchRef {
        match self {
            Self::Published(branch) | Self::LocalOnly { branch, .. } => branch,
        }
    }

    /// True when the remote received the branch.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Result of deleting a branch. Deleting a missing branch is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDeletion {
    Deleted(BranchRef),
    NotFound,
}

/// Branch operations for one working copy.
pub struct BranchRegistry<'a, G: GitOperations> {
    git: &'a G,
    sync: SyncController<'a, G>,
}

impl<'a, G: GitOperations> BranchRegistry<'a, G> {
    pub const fn new(git: &'a G, sync: SyncController<'a, G>) -> Self {
        Self { git, sync }
    }

    /// Lists branch references. With `refresh`, pulls first so the list
    /// reflects the remote; a failed pull fails the listing.
    pub fn list(&self, scope: ListScope, refresh: bool) -> Result<Vec<BranchRef>> {
        if refresh {
            self.sync.pull()?;
        }

        let refs = self.git.list_refs(scope)?;
        tracing::debug!(?scope, count = refs.len(), "listed branches");
        Ok(refs)
    }

    /// True iff some reference in `scope` matches `name` by suffix.
    pub fn exists(&self, name: &str, scope: ListScope) -> Result<bool> {
        Ok(self.find(name, scope)?.is_some())
    }

    /// Creates `name` locally at HEAD and publishes it.
    ///
    /// Refused with [`SyncError::BranchAlreadyExists`] if any local or
    /// remote reference matches. Not atomic: when the push fails the local
    /// branch stays and [`BranchCreation::LocalOnly`] is returned.
    pub fn create(&self, name: &str) -> Result<BranchCreation> {
        if let Some(existing) = self.find(name, ListScope::All)? {
            tracing::warn!(branch = name, existing = %existing, "branch already exists");
            return Err(SyncError::BranchAlreadyExists(name.to_string()));
        }

        tracing::info!(branch = name, "creating local branch");
        let branch = self.git.create_branch(name)?;

        tracing::info!(branch = name, "publishing branch");
        let refspec = format!("{0}:{0}", branch.name);
        match self.sync.push_refspecs(&[refspec], false) {
            Ok(()) => Ok(BranchCreation::Published(branch)),
            Err(cause) => {
                tracing::warn!(branch = name, error = %cause, "branch created locally only");
                Ok(BranchCreation::LocalOnly { branch, cause })
            },
        }
    }

    /// Force-deletes the local branch `name`.
    pub fn delete_local(&self, name: &str) -> Result<BranchDeletion> {
        let full = format!("{LOCAL_PREFIX}{name}");
        let found = self
            .git
            .list_refs(ListScope::Local)?
            .into_iter()
            .find(|branch| branch.name == full);

        let Some(branch) = found else {
            tracing::info!(branch = name, "no local branch to delete");
            return Ok(BranchDeletion::NotFound);
        };

        tracing::info!(branch = %branch, "deleting local branch");
        self.git.delete_branch(name)?;
        Ok(BranchDeletion::Deleted(branch))
    }

    /// Deletes `refs/heads/<name>` on the remote by pushing an empty source.
    ///
    /// Runs only if the tracking reference `refs/remotes/<remote>/<name>`
    /// exists.
    pub fn delete_remote(&self, name: &str) -> Result<BranchDeletion> {
        let branch = BranchRef::remote(&self.sync.remote().name, name);
        let refs = self.list(ListScope::Remote, false)?;

        if !refs.contains(&branch) {
            if let Some(other) = refs.iter().find(|other| other.matches(name)) {
                tracing::warn!(
                    branch = name,
                    matched = %other,
                    "remote branch only shares a tail segment; not deleting"
                );
                return Ok(BranchDeletion::NotFound);
            }
            tracing::info!(branch = name, "no remote branch to delete");
            return Ok(BranchDeletion::NotFound);
        }

        tracing::info!(branch = %branch, "deleting remote branch");
        let refspec = format!(":{LOCAL_PREFIX}{name}");
        self.sync.push_refspecs(&[refspec], false)?;
        Ok(BranchDeletion::Deleted(branch))
    }

    /// Short name of the checked-out branch, `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let branch = self.git.current_branch()?;
        tracing::debug!(branch = ?branch, "current branch");
        Ok(branch)
    }

    /// Remote-tracking reference configured as upstream of the current branch.
    pub fn upstream_branch(&self) -> Result<Option<String>> {
        Ok(self.git.upstream_branch()?)
    }

    fn find(&self, name: &str, scope: ListScope) -> Result<Option<BranchRef>> {
        Ok(self
            .list(scope, false)?
            .into_iter()
            .find(|branch| branch.matches(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::operations::tests::{fixture, origin_has_branch};
    use crate::git::{BranchScope, GitError, MockGitOperations};
    use crate::handle::Remote;

    fn refs(scope: ListScope) -> Vec<BranchRef> {
        let all = vec![
            BranchRef::local("main"),
            BranchRef::local("feature/dev"),
            BranchRef::remote("origin", "main"),
            BranchRef::remote("origin", "release"),
        ];
        all.into_iter().filter(|r| scope.includes(r.scope)).collect()
    }

    fn listing() -> MockGitOperations {
        let mut git = MockGitOperations::new();
        git.expect_list_refs().returning(|scope| Ok(refs(scope)));
        git
    }

    fn remote() -> Remote {
        Remote::origin("/srv/git/repo.git")
    }

    #[test]
    fn list_without_refresh_does_not_pull() {
        let mut git = listing();
        git.expect_pull().never();

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        let local = registry.list(ListScope::Local, false).unwrap();
        assert_eq!(local.len(), 2);
        assert!(local.iter().all(|r| r.scope == BranchScope::Local));
    }

    #[test]
    fn list_with_refresh_pulls_first() {
        let mut git = listing();
        git.expect_pull().times(1).returning(|| Ok(()));

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        assert_eq!(registry.list(ListScope::All, true).unwrap().len(), 4);
    }

    #[test]
    fn list_refresh_failure_is_reported() {
        let mut git = listing();
        git.expect_pull()
            .returning(|| Err(GitError::Network("unreachable".to_string())));

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        assert!(matches!(
            registry.list(ListScope::Local, true),
            Err(SyncError::NetworkOperationFailed { .. })
        ));
    }

    #[test]
    fn exists_matches_by_suffix() {
        let git = listing();
        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));

        assert!(registry.exists("main", ListScope::Local).unwrap());
        assert!(registry.exists("release", ListScope::Remote).unwrap());
        assert!(!registry.exists("release", ListScope::Local).unwrap());
        assert!(!registry.exists("nope", ListScope::All).unwrap());
    }

    #[test]
    fn exists_collides_on_shared_tail_segment() {
        let git = listing();
        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));

        // `dev` is not a branch, but `feature/dev` ends with "/dev".
        assert!(registry.exists("dev", ListScope::Local).unwrap());
        assert!(registry.exists("feature/dev", ListScope::Local).unwrap());
        assert!(!registry.exists("ature/dev", ListScope::Local).unwrap());
    }

    #[test]
    fn create_rejects_existing_in_any_scope() {
        let mut git = listing();
        git.expect_create_branch().never();
        git.expect_push().never();

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));

        for name in ["main", "release", "dev"] {
            assert!(matches!(
                registry.create(name),
                Err(SyncError::BranchAlreadyExists(ref n)) if n == name
            ));
        }
    }

    #[test]
    fn create_makes_one_branch_and_one_push() {
        let mut git = listing();
        git.expect_create_branch()
            .withf(|name| name == "topic")
            .times(1)
            .returning(|name| Ok(BranchRef::local(name)));
        git.expect_push()
            .withf(|specs, force| {
                specs.len() == 1 && specs[0] == "refs/heads/topic:refs/heads/topic" && !*force
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        let created = registry.create("topic").unwrap();
        assert!(created.is_published());
        assert_eq!(created.branch(), &BranchRef::local("topic"));
    }

    #[test]
    fn create_reports_local_only_when_push_fails() {
        let mut git = listing();
        git.expect_create_branch()
            .times(1)
            .returning(|name| Ok(BranchRef::local(name)));
        git.expect_push()
            .times(1)
            .returning(|_, _| Err(GitError::Authentication("denied".to_string())));
        git.expect_delete_branch().never();

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        match registry.create("topic").unwrap() {
            BranchCreation::LocalOnly { branch, cause } => {
                assert_eq!(branch, BranchRef::local("topic"));
                assert!(cause.requires_credentials());
            },
            BranchCreation::Published(_) => panic!("push failure must not report published"),
        }
    }

    #[test]
    fn delete_local_found_and_missing() {
        let mut git = listing();
        git.expect_delete_branch()
            .withf(|name| name == "feature/dev")
            .times(1)
            .returning(|_| Ok(()));

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));

        assert_eq!(
            registry.delete_local("feature/dev").unwrap(),
            BranchDeletion::Deleted(BranchRef::local("feature/dev"))
        );
        // Exact match only: "dev" is not "refs/heads/dev".
        assert_eq!(registry.delete_local("dev").unwrap(), BranchDeletion::NotFound);
    }

    #[test]
    fn delete_remote_pushes_empty_source() {
        let mut git = listing();
        git.expect_push()
            .withf(|specs, force| specs.len() == 1 && specs[0] == ":refs/heads/release" && !*force)
            .times(1)
            .returning(|_, _| Ok(()));

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));

        assert_eq!(
            registry.delete_remote("release").unwrap(),
            BranchDeletion::Deleted(BranchRef::remote("origin", "release"))
        );
    }

    #[test]
    fn delete_remote_ignores_tail_collision() {
        let mut git = MockGitOperations::new();
        git.expect_list_refs()
            .returning(|_| Ok(vec![BranchRef::remote("origin", "feature/dev")]));
        git.expect_push().never();

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        assert_eq!(registry.delete_remote("dev").unwrap(), BranchDeletion::NotFound);
    }

    #[test]
    fn delete_remote_keeps_colliding_branch_on_origin() {
        let fx = fixture();
        fx.ops.create_branch("feature/dev").unwrap();
        fx.ops
            .push(&["refs/heads/feature/dev:refs/heads/feature/dev".to_string()], false)
            .unwrap();
        fx.ops.fetch().unwrap();

        let remote = fx.ops.handle().remote().clone();
        let registry = BranchRegistry::new(&fx.ops, SyncController::new(&fx.ops, &remote));

        assert_eq!(registry.delete_remote("dev").unwrap(), BranchDeletion::NotFound);
        assert!(origin_has_branch(&fx.origin, "feature/dev"));

        assert_eq!(
            registry.delete_remote("feature/dev").unwrap(),
            BranchDeletion::Deleted(BranchRef::remote("origin", "feature/dev"))
        );
        assert!(!origin_has_branch(&fx.origin, "feature/dev"));
    }

    #[test]
    fn delete_remote_missing_is_noop() {
        let mut git = listing();
        git.expect_push().never();

        let remote = remote();
        let registry = BranchRegistry::new(&git, SyncController::new(&git, &remote));
        assert_eq!(registry.delete_remote("gone").unwrap(), BranchDeletion::NotFound);
    }
}
