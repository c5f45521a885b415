//! Git-related types for reposync.
//!
//! This module defines data structures exchanged with the git primitives:
//! - [`BranchRef`] - A local or remote-tracking branch reference
//! - [`ListScope`] - Which references a listing covers
//! - [`WorkingTreeStatus`] - Snapshot of the working copy's change sets
//! - [`CommitInfo`] - One entry of the commit log

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of fully-qualified local branch names.
pub const LOCAL_PREFIX: &str = "refs/heads/";

/// Prefix of fully-qualified remote-tracking branch names.
pub const REMOTE_PREFIX: &str = "refs/remotes/";

/// Whether a reference lives in the local or remote-tracking namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchScope {
    /// `refs/heads/*`
    Local,
    /// `refs/remotes/<remote>/*`
    Remote,
}

/// Which references a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    /// Local branches only.
    #[default]
    Local,
    /// Remote-tracking branches only.
    Remote,
    /// Both namespaces.
    All,
}

impl ListScope {
    /// Returns true if references of `scope` belong in this listing.
    #[must_use]
    pub const fn includes(self, scope: BranchScope) -> bool {
        matches!(
            (self, scope),
            (Self::All, _) | (Self::Local, BranchScope::Local) | (Self::Remote, BranchScope::Remote)
        )
    }
}

impl From<BranchScope> for ListScope {
    fn from(scope: BranchScope) -> Self {
        match scope {
            BranchScope::Local => Self::Local,
            BranchScope::Remote => Self::Remote,
        }
    }
}

/// A branch reference, always fully qualified (`refs/heads/dev`,
/// `refs/remotes/origin/dev`).
///
/// Derived fresh from the repository on every query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    /// Namespace of the reference.
    pub scope: BranchScope,

    /// Fully-qualified reference name.
    pub name: String,
}

impl BranchRef {
    /// Creates a local branch reference from a short name.
    #[must_use]
    pub fn local(short: &str) -> Self {
        Self {
            scope: BranchScope::Local,
            name: format!("{LOCAL_PREFIX}{short}"),
        }
    }

    /// Creates a remote-tracking reference from a remote and short name.
    #[must_use]
    pub fn remote(remote: &str, short: &str) -> Self {
        Self {
            scope: BranchScope::Remote,
            name: format!("{REMOTE_PREFIX}{remote}/{short}"),
        }
    }

    /// Suffix match used for existence checks: true iff the fully-qualified
    /// name ends with `"/" + name`.
    ///
    /// This is deliberately loose. `refs/heads/feature/dev` matches `dev`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name
            .strip_suffix(name)
            .is_some_and(|head| head.ends_with('/'))
    }

    /// Name without the `refs/heads/` or `refs/remotes/` prefix.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name
            .strip_prefix(LOCAL_PREFIX)
            .or_else(|| self.name.strip_prefix(REMOTE_PREFIX))
            .unwrap_or(&self.name)
    }
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Snapshot of the working copy, one path set per change kind.
///
/// Immutable once produced and recomputed on every status call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingTreeStatus {
    /// Tracked files modified in the index.
    pub changed: BTreeSet<String>,

    /// Tracked files modified in the working tree but not staged.
    pub modified: BTreeSet<String>,

    /// Files not known to the index.
    pub untracked: BTreeSet<String>,

    /// Files with unresolved merge conflicts.
    pub conflicting: BTreeSet<String>,

    /// Tracked files deleted from the working tree but not from the index.
    pub missing: BTreeSet<String>,

    /// New files staged in the index.
    pub added: BTreeSet<String>,

    /// Files staged for deletion.
    pub removed: BTreeSet<String>,
}

impl WorkingTreeStatus {
    /// Returns true when every change set, untracked included, is empty.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty() && !self.has_uncommitted_changes()
    }

    /// Returns true if any tracked path differs from HEAD or is conflicted.
    #[must_use]
    pub fn has_uncommitted_changes(&self) -> bool {
        !(self.changed.is_empty()
            && self.modified.is_empty()
            && self.conflicting.is_empty()
            && self.missing.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty())
    }

    /// Returns true if unresolved conflicts are present.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicting.is_empty()
    }

    /// Total number of paths across all sets.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.changed.len()
            + self.modified.len()
            + self.untracked.len()
            + self.conflicting.len()
            + self.missing.len()
            + self.added.len()
            + self.removed.len()
    }
}

/// One commit from the history of HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit SHA.
    pub id: String,

    /// First line of the message.
    pub summary: String,

    /// Full message.
    pub message: String,

    /// Author name.
    pub author: String,

    /// Author timestamp.
    pub time: DateTime<Utc>,
}
