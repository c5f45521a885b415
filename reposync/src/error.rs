//! Error types and result aliases for reposync.
//!
//! This module provides the controller's error taxonomy:
//! - Specific variants for every refused or failed operation
//! - User-friendly messages with recovery suggestions
//! - Helper methods for error classification
//! - Automatic conversion from common error types

use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;

/// Remote-facing operations, used to label network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Clone,
    Fetch,
    Pull,
    Push,
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Clone => "clone",
            Self::Fetch => "fetch",
            Self::Pull => "pull",
            Self::Push => "push",
        })
    }
}

/// Main error type for reposync operations.
///
/// Each variant names one way an operation can be refused or fail. Use
/// [`is_precondition`](Self::is_precondition), [`is_retriable`](Self::is_retriable)
/// and [`requires_credentials`](Self::requires_credentials) to pick a
/// handling strategy.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The working-copy root is missing or not a directory.
    #[error("Invalid local repository path '{}': {reason}.", .path.display())]
    InvalidLocalPath {
        /// The offending path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A clone target already has entries.
    #[error("Cannot clone into '{}': directory is not empty.", .0.display())]
    NotEmptyForClone(PathBuf),

    /// The working tree has uncommitted or untracked changes.
    #[error("Working directory has uncommitted changes. Commit or stash changes first.")]
    DirtyTree,

    /// The working tree state could not be determined.
    #[error("Cannot determine working tree state: {0}")]
    StatusUnknown(String),

    /// No local branch matches the name.
    #[error("Branch '{0}' not found.")]
    BranchNotFound(String),

    /// A branch with a matching name already exists.
    #[error("Branch '{0}' already exists.")]
    BranchAlreadyExists(String),

    /// Unresolved merge conflicts block the operation.
    #[error("Unresolved conflicts in: {}. Resolve them before committing.", .0.join(", "))]
    ConflictsPresent(Vec<String>),

    /// The checkout primitive failed.
    #[error("Checkout of '{branch}' failed: {source}")]
    CheckoutFailed {
        /// Target branch.
        branch: String,
        /// Underlying cause.
        #[source]
        source: GitError,
    },

    /// A remote-facing operation failed in transport or was rejected.
    #[error("{operation} failed: {source}. Check your network connection and the remote URL.")]
    NetworkOperationFailed {
        /// Which remote operation failed.
        operation: RemoteOperation,
        /// Underlying cause.
        #[source]
        source: GitError,
    },

    /// The remote refused the configured credentials.
    #[error("{operation} was refused: the remote rejected the configured credentials.")]
    CredentialRejected {
        /// Which remote operation was refused.
        operation: RemoteOperation,
        /// Underlying cause.
        #[source]
        source: GitError,
    },

    /// Any other git failure.
    #[error(transparent)]
    Git(#[from] GitError),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// Failed to write configuration file.
    #[error("Failed to write configuration file: {0}. Check directory permissions.")]
    ConfigWrite(String),
}

impl SyncError {
    /// Maps a primitive failure during a remote operation onto the taxonomy.
    ///
    /// Authentication failures become [`CredentialRejected`](Self::CredentialRejected),
    /// transport failures and rejections become
    /// [`NetworkOperationFailed`](Self::NetworkOperationFailed). Local
    /// failures pass through as [`Git`](Self::Git).
    #[must_use]
    pub fn from_remote(operation: RemoteOperation, source: GitError) -> Self {
        match source {
            GitError::Authentication(_) => Self::CredentialRejected { operation, source },
            GitError::Network(_) | GitError::Rejected { .. } => {
                Self::NetworkOperationFailed { operation, source }
            },
            other => Self::Git(other),
        }
    }

    /// Checks if this error is a refused precondition rather than a failure.
    ///
    /// Nothing was changed when these are returned.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocalPath { .. }
                | Self::NotEmptyForClone(_)
                | Self::DirtyTree
                | Self::StatusUnknown(_)
                | Self::BranchNotFound(_)
                | Self::BranchAlreadyExists(_)
                | Self::ConflictsPresent(_)
        )
    }

    /// Checks if this error is transient and the operation might succeed on retry.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::NetworkOperationFailed {
                source: GitError::Network(_),
                ..
            }
        )
    }

    /// Checks if this error can be resolved by supplying other credentials.
    #[must_use]
    pub const fn requires_credentials(&self) -> bool {
        matches!(self, Self::CredentialRejected { .. })
    }
}

/// Result type alias using [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        Self::ConfigWrite(format!("TOML serialize error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_friendly() {
        let dirty = SyncError::DirtyTree;
        assert!(dirty.to_string().contains("uncommitted"));

        let exists = SyncError::BranchAlreadyExists("dev".to_string());
        assert!(exists.to_string().contains("dev"));

        let conflicts = SyncError::ConflictsPresent(vec!["a.txt".into(), "b.txt".into()]);
        assert!(conflicts.to_string().contains("a.txt, b.txt"));

        let not_empty = SyncError::NotEmptyForClone(PathBuf::from("/tmp/repo"));
        assert!(not_empty.to_string().contains("/tmp/repo"));
    }

    #[test]
    fn from_remote_maps_auth_to_credential_rejected() {
        let err = SyncError::from_remote(
            RemoteOperation::Push,
            GitError::Authentication("401".to_string()),
        );
        assert!(err.requires_credentials());
        assert!(err.to_string().starts_with("push"));
    }

    #[test]
    fn from_remote_maps_transport_to_network_failure() {
        let err = SyncError::from_remote(
            RemoteOperation::Fetch,
            GitError::Network("timeout".to_string()),
        );
        assert!(matches!(
            err,
            SyncError::NetworkOperationFailed {
                operation: RemoteOperation::Fetch,
                ..
            }
        ));
        assert!(err.is_retriable());
    }

    #[test]
    fn rejected_push_is_not_retriable() {
        let err = SyncError::from_remote(
            RemoteOperation::Push,
            GitError::Rejected {
                reference: "refs/heads/main".to_string(),
                reason: "non-fast-forward".to_string(),
            },
        );
        assert!(matches!(err, SyncError::NetworkOperationFailed { .. }));
        assert!(!err.is_retriable());
    }

    #[test]
    fn from_remote_passes_local_failures_through() {
        let err = SyncError::from_remote(RemoteOperation::Pull, GitError::NotARepository);
        assert!(matches!(err, SyncError::Git(GitError::NotARepository)));
    }

    #[test]
    fn is_precondition_identifies_refusals() {
        assert!(SyncError::DirtyTree.is_precondition());
        assert!(SyncError::StatusUnknown("x".into()).is_precondition());
        assert!(SyncError::BranchNotFound("x".into()).is_precondition());
        assert!(SyncError::ConflictsPresent(vec![]).is_precondition());

        assert!(!SyncError::Git(GitError::NotARepository).is_precondition());
        assert!(!SyncError::CheckoutFailed {
            branch: "x".into(),
            source: GitError::Conflict("y".into()),
        }
        .is_precondition());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::ConfigRead(_)));
    }
}
