//! Git operations abstraction for reposync.
//!
//! This module provides a trait-based abstraction over the version-control
//! primitives the controller composes:
//! - [`GitOperations`] - Trait defining one method per primitive
//! - [`Git2Operations`] - Implementation using the git2 (libgit2) library
//!
//! Every call opens the repository afresh and releases it before returning.

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Utc};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, ErrorCode, FetchOptions, PushOptions, ReferenceType, Repository, Signature, Sort,
    StatusOptions,
};

use crate::git::credentials::remote_callbacks;
use crate::git::error::GitError;
use crate::git::types::{
    BranchRef, BranchScope, CommitInfo, ListScope, WorkingTreeStatus, LOCAL_PREFIX, REMOTE_PREFIX,
};
use crate::handle::RepositoryHandle;

/// Result type for git primitives.
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Trait for git operations (enables mocking in tests).
#[cfg_attr(test, mockall::automock)]
pub trait GitOperations: Send + Sync {
    /// Clones the remote into the (empty) working-copy root.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote is unreachable or rejects credentials.
    fn clone_repository(&self) -> GitResult<()>;

    /// Lists branch references in the given scope, sorted by name.
    ///
    /// Symbolic references such as `refs/remotes/origin/HEAD` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if not in a git repository.
    fn list_refs(&self, scope: ListScope) -> GitResult<Vec<BranchRef>>;

    /// Computes the working-tree status.
    ///
    /// # Errors
    ///
    /// Returns an error if not in a git repository, status cannot be
    /// determined, or a changed path is not valid UTF-8.
    fn status(&self) -> GitResult<WorkingTreeStatus>;

    /// Checks out an existing local branch without discarding local changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch doesn't exist or checkout conflicts.
    fn checkout(&self, branch: &str) -> GitResult<()>;

    /// Stages `files`, then commits the index on top of HEAD.
    ///
    /// Returns the new commit SHA.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NothingToCommit`] if the index equals HEAD's tree
    /// and `allow_empty` is false.
    fn commit(&self, message: &str, files: &[String], allow_empty: bool) -> GitResult<String>;

    /// Creates a local branch at HEAD.
    ///
    /// # Errors
    ///
    /// Returns an error if HEAD is unborn or the branch already exists.
    fn create_branch(&self, name: &str) -> GitResult<BranchRef>;

    /// Force-deletes a local branch by short name.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch doesn't exist or is checked out.
    fn delete_branch(&self, name: &str) -> GitResult<()>;

    /// Pushes refspecs to the remote. `force` prefixes each with `+`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or per-reference rejection.
    fn push(&self, refspecs: &[String], force: bool) -> GitResult<()>;

    /// Fetches the remote and merges the current branch's upstream.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a missing upstream, or merge
    /// conflicts (the merge is left in progress for resolution).
    fn pull(&self) -> GitResult<()>;

    /// Fetches the remote's configured refspecs.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn fetch(&self) -> GitResult<()>;

    /// Gets the current branch name, `None` when HEAD is detached.
    ///
    /// An unborn branch (no commits yet) is reported by name.
    ///
    /// # Errors
    ///
    /// Returns an error if not in a git repository or HEAD is invalid.
    fn current_branch(&self) -> GitResult<Option<String>>;

    /// Gets the remote-tracking ref configured as upstream of the current branch.
    ///
    /// # Errors
    ///
    /// Returns an error if not in a git repository.
    fn upstream_branch(&self) -> GitResult<Option<String>>;

    /// Lists up to `limit` commits reachable from HEAD, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be walked.
    fn log(&self, limit: usize) -> GitResult<Vec<CommitInfo>>;
}

/// Where the current branch pulls from.
struct Upstream {
    /// Remote to fetch.
    remote: String,
    /// Remote-tracking reference to merge.
    reference: String,
    /// Whether `branch.<name>.merge` is set.
    configured: bool,
}

/// Name and email recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Author/committer name.
    pub name: String,
    /// Author/committer email.
    pub email: String,
}

/// Git operations implementation using git2 library.
#[derive(Debug, Clone)]
pub struct Git2Operations {
    handle: RepositoryHandle,
    identity: Option<Identity>,
}

impl Git2Operations {
    /// Creates the backend for a validated handle.
    ///
    /// The repository itself is not opened until the first operation, so a
    /// handle prepared for cloning is accepted.
    #[must_use]
    pub const fn new(handle: RepositoryHandle) -> Self {
        Self {
            handle,
            identity: None,
        }
    }

    /// Overrides the commit identity instead of reading `user.name` and
    /// `user.email` from git config.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The handle this backend operates on.
    #[must_use]
    pub const fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    /// Opens the repository (internal helper).
    fn repo(&self) -> GitResult<Repository> {
        Repository::open(self.handle.root()).map_err(|_| GitError::NotARepository)
    }

    /// Creates the signature used for commits.
    fn signature(&self, repo: &Repository) -> GitResult<Signature<'static>> {
        let signature = self.identity.as_ref().map_or_else(
            || {
                repo.signature()
                    .or_else(|_| Signature::now("reposync", "reposync@localhost"))
            },
            |identity| Signature::now(&identity.name, &identity.email),
        );
        signature.map_err(|e| GitError::Git2(format!("Cannot create signature: {e}")))
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks(self.handle.credentials()));
        options
    }

    fn fetch_remote(&self, repo: &Repository, name: &str) -> GitResult<()> {
        let mut remote = repo
            .find_remote(name)
            .map_err(|e| GitError::from_git2(&format!("Cannot find remote '{name}'"), &e))?;

        remote
            .fetch(&[] as &[&str], Some(&mut self.fetch_options()), None)
            .map_err(|e| GitError::from_git2("fetch", &e))
    }

    /// Short name of the branch HEAD points at, including an unborn one.
    fn head_branch(repo: &Repository) -> GitResult<Option<String>> {
        match repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = repo
                    .find_reference("HEAD")
                    .map_err(|e| GitError::from_git2("Cannot read HEAD", &e))?;
                Ok(head
                    .symbolic_target()
                    .and_then(|target| target.strip_prefix(LOCAL_PREFIX))
                    .map(String::from))
            },
            Err(e) => Err(GitError::from_git2("Cannot get HEAD", &e)),
        }
    }

    /// Remote and tracking ref `branch` merges from, falling back to the
    /// branch of the same name on the handle's remote.
    fn upstream(&self, repo: &Repository, branch: &str) -> GitResult<Upstream> {
        let config = repo
            .config()
            .map_err(|e| GitError::from_git2("Cannot read config", &e))?;

        let merge = config.get_string(&format!("branch.{branch}.merge")).ok();
        let remote = config
            .get_string(&format!("branch.{branch}.remote"))
            .unwrap_or_else(|_| self.handle.remote().name.clone());

        let short = merge
            .as_deref()
            .and_then(|m| m.strip_prefix(LOCAL_PREFIX))
            .unwrap_or(branch);
        Ok(Upstream {
            reference: format!("{REMOTE_PREFIX}{remote}/{short}"),
            remote,
            configured: merge.is_some(),
        })
    }

    fn fast_forward(repo: &Repository, branch: &str, target: git2::Oid) -> GitResult<()> {
        let commit = repo
            .find_commit(target)
            .map_err(|e| GitError::from_git2("Cannot find fetched commit", &e))?;

        // Safe checkout only rewrites files that still match HEAD.
        let mut checkout_opts = CheckoutBuilder::new();
        checkout_opts.safe();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout_opts))
            .map_err(|e| GitError::from_git2("Fast-forward checkout failed", &e))?;

        let mut local = repo
            .find_reference(&format!("{LOCAL_PREFIX}{branch}"))
            .map_err(|_| GitError::BranchNotFound(branch.to_string()))?;
        local
            .set_target(target, "pull: fast-forward")
            .map_err(|e| GitError::from_git2("Cannot move branch", &e))?;
        Ok(())
    }

    fn merge_commit(
        &self,
        repo: &Repository,
        branch: &str,
        upstream: &str,
        fetched: &git2::AnnotatedCommit<'_>,
    ) -> GitResult<()> {
        repo.merge(&[fetched], None, None)
            .map_err(|e| GitError::from_git2("Merge failed", &e))?;

        let mut index = repo
            .index()
            .map_err(|e| GitError::from_git2("Cannot read index", &e))?;
        if index.has_conflicts() {
            let paths: Vec<String> = index
                .conflicts()
                .map_err(|e| GitError::from_git2("Cannot read conflicts", &e))?
                .filter_map(std::result::Result::ok)
                .filter_map(|conflict| conflict.our.or(conflict.their))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            return Err(GitError::Conflict(paths.join(", ")));
        }

        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2("Cannot write tree", &e))?;
        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2("Cannot find tree", &e))?;
        let ours = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| GitError::from_git2("Cannot get commit", &e))?;
        let theirs = repo
            .find_commit(fetched.id())
            .map_err(|e| GitError::from_git2("Cannot find fetched commit", &e))?;
        let signature = self.signature(repo)?;

        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &format!("Merge {upstream} into {branch}"),
            &tree,
            &[&ours, &theirs],
        )
        .map_err(|e| GitError::from_git2("Merge commit failed", &e))?;

        repo.cleanup_state()
            .map_err(|e| GitError::from_git2("Cannot clear merge state", &e))
    }
}

impl GitOperations for Git2Operations {
    fn clone_repository(&self) -> GitResult<()> {
        let remote_name = self.handle.remote().name.as_str();
        let mut builder = RepoBuilder::new();
        builder
            .fetch_options(self.fetch_options())
            .remote_create(move |repo, _name, url| repo.remote(remote_name, url));

        builder
            .clone(&self.handle.remote().url, self.handle.root())
            .map_err(|e| GitError::from_git2("clone", &e))?;
        Ok(())
    }

    fn list_refs(&self, scope: ListScope) -> GitResult<Vec<BranchRef>> {
        let repo = self.repo()?;
        let filter = match scope {
            ListScope::Local => Some(BranchType::Local),
            ListScope::Remote => Some(BranchType::Remote),
            ListScope::All => None,
        };

        let branches = repo
            .branches(filter)
            .map_err(|e| GitError::from_git2("Cannot list branches", &e))?;

        let mut refs = Vec::new();
        for item in branches {
            let (branch, kind) = item.map_err(|e| GitError::from_git2("Cannot read branch", &e))?;
            let reference = branch.get();
            if reference.kind() == Some(ReferenceType::Symbolic) {
                continue;
            }
            let Some(name) = reference.name() else {
                continue;
            };
            refs.push(BranchRef {
                scope: match kind {
                    BranchType::Local => BranchScope::Local,
                    BranchType::Remote => BranchScope::Remote,
                },
                name: name.to_string(),
            });
        }

        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn status(&self) -> GitResult<WorkingTreeStatus> {
        let repo = self.repo()?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::StatusFailed(e.to_string()))?;

        let mut snapshot = WorkingTreeStatus::default();
        for entry in statuses.iter() {
            // A path that cannot be reported must not read as a clean tree.
            let path = entry
                .path()
                .ok_or_else(|| {
                    GitError::StatusFailed(format!(
                        "non-UTF-8 path '{}'",
                        String::from_utf8_lossy(entry.path_bytes())
                    ))
                })?
                .to_string();
            let status = entry.status();

            if status.is_conflicted() {
                snapshot.conflicting.insert(path);
                continue;
            }
            if status.is_index_new() {
                snapshot.added.insert(path.clone());
            }
            if status.is_index_modified() || status.is_index_renamed() || status.is_index_typechange()
            {
                snapshot.changed.insert(path.clone());
            }
            if status.is_index_deleted() {
                snapshot.removed.insert(path.clone());
            }
            if status.is_wt_new() {
                snapshot.untracked.insert(path.clone());
            }
            if status.is_wt_modified() || status.is_wt_renamed() || status.is_wt_typechange() {
                snapshot.modified.insert(path.clone());
            }
            if status.is_wt_deleted() {
                snapshot.missing.insert(path);
            }
        }

        Ok(snapshot)
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        let repo = self.repo()?;

        let reference = repo
            .find_branch(branch, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound(branch.to_string()))?
            .into_reference();

        let tree = reference
            .peel_to_tree()
            .map_err(|e| GitError::Git2(format!("Cannot get tree: {e}")))?;

        let mut checkout_opts = CheckoutBuilder::new();
        checkout_opts.safe();

        repo.checkout_tree(tree.as_object(), Some(&mut checkout_opts))
            .map_err(|e| {
                if e.message().contains("conflict") {
                    GitError::Conflict(e.message().to_string())
                } else {
                    GitError::Git2(format!("Checkout failed: {e}"))
                }
            })?;

        let ref_name = reference
            .name()
            .ok_or_else(|| GitError::Git2("Invalid reference name".to_string()))?;
        repo.set_head(ref_name)
            .map_err(|e| GitError::Git2(format!("Cannot update HEAD: {e}")))?;

        Ok(())
    }

    fn commit(&self, message: &str, files: &[String], allow_empty: bool) -> GitResult<String> {
        let repo = self.repo()?;

        let mut index = repo
            .index()
            .map_err(|e| GitError::from_git2("Cannot read index", &e))?;
        for file in files {
            index
                .add_path(Path::new(file))
                .map_err(|e| GitError::from_git2(&format!("Cannot stage '{file}'"), &e))?;
        }
        index
            .write()
            .map_err(|e| GitError::from_git2("Cannot write index", &e))?;

        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2("Cannot write tree", &e))?;
        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2("Cannot find tree", &e))?;

        let parent = match repo.head() {
            Ok(head) => Some(
                head.peel_to_commit()
                    .map_err(|e| GitError::from_git2("Cannot get commit", &e))?,
            ),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            },
            Err(e) => return Err(GitError::from_git2("Cannot get HEAD", &e)),
        };

        if !allow_empty {
            let unchanged = parent
                .as_ref()
                .map_or_else(|| index.is_empty(), |commit| commit.tree_id() == tree_id);
            if unchanged {
                return Err(GitError::NothingToCommit);
            }
        }

        let signature = self.signature(&repo)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| GitError::from_git2("Commit failed", &e))?;

        Ok(oid.to_string())
    }

    fn create_branch(&self, name: &str) -> GitResult<BranchRef> {
        let repo = self.repo()?;
        let head = repo
            .head()
            .map_err(|e| GitError::from_git2("Cannot get HEAD", &e))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2("Cannot get commit", &e))?;

        repo.branch(name, &commit, false)
            .map_err(|e| GitError::from_git2("Cannot create branch", &e))?;

        Ok(BranchRef::local(name))
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        let repo = self.repo()?;
        let mut branch = repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound(name.to_string()))?;

        branch
            .delete()
            .map_err(|e| GitError::from_git2("Cannot delete branch", &e))
    }

    fn push(&self, refspecs: &[String], force: bool) -> GitResult<()> {
        let repo = self.repo()?;
        let name = &self.handle.remote().name;
        let mut remote = repo
            .find_remote(name)
            .map_err(|e| GitError::from_git2(&format!("Cannot find remote '{name}'"), &e))?;

        let specs: Vec<String> = refspecs
            .iter()
            .map(|spec| {
                if force && !spec.starts_with('+') {
                    format!("+{spec}")
                } else {
                    spec.clone()
                }
            })
            .collect();

        let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
        {
            let mut callbacks = remote_callbacks(self.handle.credentials());
            callbacks.push_update_reference(|reference, status| {
                if let Some(reason) = status {
                    *rejection.borrow_mut() = Some((reference.to_string(), reason.to_string()));
                }
                Ok(())
            });

            let mut push_opts = PushOptions::new();
            push_opts.remote_callbacks(callbacks);

            remote
                .push(&specs, Some(&mut push_opts))
                .map_err(|e| {
                    if e.code() == ErrorCode::NotFastForward {
                        GitError::Rejected {
                            reference: specs.join(" "),
                            reason: e.message().to_string(),
                        }
                    } else {
                        GitError::from_git2("push", &e)
                    }
                })?;
        }

        rejection
            .into_inner()
            .map_or(Ok(()), |(reference, reason)| {
                Err(GitError::Rejected { reference, reason })
            })
    }

    fn pull(&self) -> GitResult<()> {
        let repo = self.repo()?;
        let branch = Self::head_branch(&repo)?
            .ok_or_else(|| GitError::Git2("Cannot pull with a detached HEAD".to_string()))?;

        let Upstream {
            remote,
            reference: upstream,
            ..
        } = self.upstream(&repo, &branch)?;
        self.fetch_remote(&repo, &remote)?;

        let fetched_ref = repo
            .find_reference(&upstream)
            .map_err(|_| GitError::BranchNotFound(upstream.clone()))?;
        let fetched = repo
            .reference_to_annotated_commit(&fetched_ref)
            .map_err(|e| GitError::from_git2("Cannot read fetched head", &e))?;

        let (analysis, _) = repo
            .merge_analysis(&[&fetched])
            .map_err(|e| GitError::from_git2("Merge analysis failed", &e))?;

        if analysis.is_up_to_date() {
            return Ok(());
        }
        if analysis.is_unborn() {
            // Nothing local yet: adopt the fetched history outright.
            repo.reference(
                &format!("{LOCAL_PREFIX}{branch}"),
                fetched.id(),
                false,
                "pull: initial",
            )
            .map_err(|e| GitError::from_git2("Cannot create branch", &e))?;
            return repo
                .checkout_head(Some(CheckoutBuilder::new().safe()))
                .map_err(|e| GitError::from_git2("Checkout failed", &e));
        }
        if analysis.is_fast_forward() {
            return Self::fast_forward(&repo, &branch, fetched.id());
        }

        self.merge_commit(&repo, &branch, &upstream, &fetched)
    }

    fn fetch(&self) -> GitResult<()> {
        let repo = self.repo()?;
        self.fetch_remote(&repo, &self.handle.remote().name)
    }

    fn current_branch(&self) -> GitResult<Option<String>> {
        let repo = self.repo()?;
        Self::head_branch(&repo)
    }

    fn upstream_branch(&self) -> GitResult<Option<String>> {
        let repo = self.repo()?;
        let Some(branch) = Self::head_branch(&repo)? else {
            return Ok(None);
        };

        let upstream = self.upstream(&repo, &branch)?;
        Ok(upstream.configured.then_some(upstream.reference))
    }

    fn log(&self, limit: usize) -> GitResult<Vec<CommitInfo>> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(_) => {},
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(Vec::new()),
            Err(e) => return Err(GitError::from_git2("Cannot get HEAD", &e)),
        }

        let mut walk = repo
            .revwalk()
            .map_err(|e| GitError::from_git2("Cannot walk history", &e))?;
        walk.push_head()
            .map_err(|e| GitError::from_git2("Cannot walk history", &e))?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|e| GitError::from_git2("Cannot walk history", &e))?;

        let mut entries = Vec::new();
        for oid in walk.take(limit) {
            let oid = oid.map_err(|e| GitError::from_git2("Cannot walk history", &e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| GitError::from_git2("Cannot find commit", &e))?;
            let author = commit.author();

            entries.push(CommitInfo {
                id: oid.to_string(),
                summary: commit.summary().unwrap_or_default().to_string(),
                message: commit.message().unwrap_or_default().to_string(),
                author: author.name().unwrap_or_default().to_string(),
                time: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                    .unwrap_or_default(),
            });
        }

        Ok(entries)
    }
}
