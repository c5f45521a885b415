//! Git-specific error types.
//!
//! This module defines error types for the version-control primitives:
//! - [`GitError`] - All failures reported by the underlying git library

use thiserror::Error;

/// Errors specific to git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Not in a git repository.
    #[error("Not a git repository. Clone the remote first or point at an existing working copy.")]
    NotARepository,

    /// Branch not found.
    #[error("Branch '{0}' not found.")]
    BranchNotFound(String),

    /// Conflict during operation.
    #[error("Git operation failed due to conflicts: {0}")]
    Conflict(String),

    /// The index matches HEAD and an empty commit was not allowed.
    #[error("Nothing to commit.")]
    NothingToCommit,

    /// Transport-level failure talking to the remote.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote refused the supplied credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote rejected a pushed reference.
    #[error("Remote rejected '{reference}': {reason}")]
    Rejected {
        /// The destination reference that was refused.
        reference: String,
        /// Server-provided reason.
        reason: String,
    },

    /// Failed to determine repository state.
    #[error("Failed to get repository status: {0}")]
    StatusFailed(String),

    /// General git2 library error.
    #[error("Git error: {0}")]
    Git2(String),
}

impl GitError {
    /// Classifies a raw libgit2 error, prefixing it with `context`.
    ///
    /// Authentication and transport classes are kept apart from general
    /// failures so callers can tell a bad secret from an unreachable host.
    pub fn from_git2(context: &str, err: &git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let detail = format!("{context}: {}", err.message());
        match (err.code(), err.class()) {
            (ErrorCode::Auth | ErrorCode::Certificate, _) => Self::Authentication(detail),
            (ErrorCode::NotFound, ErrorClass::Repository) => Self::NotARepository,
            (ErrorCode::Conflict | ErrorCode::MergeConflict, _) => Self::Conflict(detail),
            (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl) => {
                if err.message().contains("401") || err.message().contains("authentication") {
                    Self::Authentication(detail)
                } else {
                    Self::Network(detail)
                }
            },
            _ => Self::Git2(detail),
        }
    }

    /// Checks if this error indicates a repository is not found.
    #[must_use]
    pub const fn is_not_repository(&self) -> bool {
        matches!(self, Self::NotARepository)
    }

    /// Checks if this error is due to conflicts.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Checks if this error came from the remote transport or its auth layer.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Authentication(_) | Self::Rejected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_not_repository_returns_true() {
        assert!(GitError::NotARepository.is_not_repository());
    }

    #[test]
    fn is_not_repository_returns_false_for_other_errors() {
        assert!(!GitError::NothingToCommit.is_not_repository());
        assert!(!GitError::BranchNotFound("main".to_string()).is_not_repository());
        assert!(!GitError::Conflict("merge".to_string()).is_not_repository());
    }

    #[test]
    fn is_conflict_returns_true() {
        assert!(GitError::Conflict("merge conflict".to_string()).is_conflict());
    }

    #[test]
    fn is_remote_covers_transport_and_auth() {
        assert!(GitError::Network("timeout".to_string()).is_remote());
        assert!(GitError::Authentication("denied".to_string()).is_remote());
        assert!(GitError::Rejected {
            reference: "refs/heads/dev".to_string(),
            reason: "non-fast-forward".to_string(),
        }
        .is_remote());

        assert!(!GitError::NotARepository.is_remote());
        assert!(!GitError::Git2("oops".to_string()).is_remote());
    }

    #[test]
    fn from_git2_classifies_auth_code() {
        let raw = git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Http,
            "too many redirects or authentication replays",
        );
        let err = GitError::from_git2("push", &raw);
        assert!(matches!(err, GitError::Authentication(_)));
    }

    #[test]
    fn from_git2_classifies_network_class() {
        let raw = git2::Error::new(
            git2::ErrorCode::GenericError,
            git2::ErrorClass::Net,
            "failed to resolve address",
        );
        let err = GitError::from_git2("fetch", &raw);
        assert!(matches!(err, GitError::Network(ref msg) if msg.starts_with("fetch:")));
    }

    #[test]
    fn from_git2_does_not_invent_rejected_reference() {
        // Only push knows which reference was refused.
        let raw = git2::Error::new(
            git2::ErrorCode::NotFastForward,
            git2::ErrorClass::Reference,
            "cannot push non-fastforwardable reference",
        );
        assert!(matches!(
            GitError::from_git2("push", &raw),
            GitError::Git2(ref msg) if msg.starts_with("push:")
        ));
    }

    #[test]
    fn from_git2_falls_back_to_general() {
        let raw = git2::Error::from_str("something odd");
        assert!(matches!(
            GitError::from_git2("status", &raw),
            GitError::Git2(_)
        ));
    }

    #[test]
    fn error_messages_are_user_friendly() {
        let branch = GitError::BranchNotFound("feature/test".to_string());
        assert!(branch.to_string().contains("feature/test"));

        let rejected = GitError::Rejected {
            reference: "refs/heads/dev".to_string(),
            reason: "non-fast-forward".to_string(),
        };
        let msg = rejected.to_string();
        assert!(msg.contains("refs/heads/dev"));
        assert!(msg.contains("non-fast-forward"));
    }
}
