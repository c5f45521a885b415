//! Git primitives for reposync.
//!
//! Provides the abstraction layer the controller is built on:
//! - Clone, fetch, pull and push with injected credentials
//! - Branch listing, creation and deletion
//! - Working-tree status, checkout and commit

pub mod credentials;
pub mod error;
pub mod operations;
pub mod types;

pub use credentials::Credentials;
pub use error::GitError;
pub use operations::{Git2Operations, GitOperations, GitResult, Identity};
pub use types::{BranchRef, BranchScope, CommitInfo, ListScope, WorkingTreeStatus};

#[cfg(test)]
pub use operations::MockGitOperations;
