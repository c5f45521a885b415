//! Working-tree state.

use crate::error::Result;
use crate::git::{GitOperations, WorkingTreeStatus};

/// Three-way answer to "is the tree clean?".
///
/// `Unknown` keeps a failed status query apart from a dirty tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Clean,
    Dirty,
    Unknown,
}

/// Status queries against one working copy.
pub struct WorkingTree<'a, G: GitOperations> {
    git: &'a G,
}

impl<'a, G: GitOperations> WorkingTree<'a, G> {
    pub const fn new(git: &'a G) -> Self {
        Self { git }
    }

    /// Computes a fresh status snapshot.
    pub fn status(&self) -> Result<WorkingTreeStatus> {
        let status = self.git.status()?;
        log_status(&status);
        Ok(status)
    }

    /// Clean, dirty, or unknown when the status itself cannot be read.
    pub fn tree_state(&self) -> TreeState {
        match self.status() {
            Ok(status) if status.is_clean() => TreeState::Clean,
            Ok(_) => TreeState::Dirty,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read working tree status");
                TreeState::Unknown
            },
        }
    }

    /// True only for [`TreeState::Clean`].
    pub fn is_clean(&self) -> bool {
        self.tree_state() == TreeState::Clean
    }
}

fn log_status(status: &WorkingTreeStatus) {
    tracing::debug!(
        clean = status.is_clean(),
        uncommitted = status.has_uncommitted_changes(),
        "working tree status"
    );

    let sets = [
        ("changed", &status.changed),
        ("modified", &status.modified),
        ("untracked", &status.untracked),
        ("conflicting", &status.conflicting),
        ("missing", &status.missing),
        ("added", &status.added),
        ("removed", &status.removed),
    ];
    for (kind, paths) in sets {
        if !paths.is_empty() {
            tracing::debug!(kind, ?paths, "status entries");
        }
    }
}
