//! Validated location of one working copy.
//!
//! A [`RepositoryHandle`] pairs the working-copy root with the remote it
//! tracks and the credentials used to reach it. Construction validates the
//! filesystem location, so everything downstream can assume the root is a
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::git::credentials::redact_url;
use crate::git::Credentials;

/// Name given to the remote when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// The remote a working copy is synchronized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote name inside the repository (usually `origin`).
    pub name: String,

    /// Fetch/push URL or local path.
    pub url: String,
}

impl Remote {
    /// Creates a remote named [`DEFAULT_REMOTE`].
    pub fn origin(url: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_REMOTE.to_string(),
            url: url.into(),
        }
    }

    /// The URL with any embedded user info removed.
    #[must_use]
    pub fn display_url(&self) -> String {
        redact_url(&self.url)
    }
}

/// One working copy: root directory, remote and credentials.
///
/// Owned by a single controller. Not meant to be shared across concurrent
/// operations without external locking.
#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    root: PathBuf,
    remote: Remote,
    credentials: Option<Credentials>,
}

impl RepositoryHandle {
    /// Opens an existing working-copy location.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidLocalPath`] if `root` does not exist or is
    /// not a directory.
    pub fn open(
        root: impl Into<PathBuf>,
        remote: Remote,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let root = root.into();
        ensure_directory(&root)?;

        Ok(Self {
            root,
            remote,
            credentials,
        })
    }

    /// Prepares `root` as a clone target.
    ///
    /// Missing directories, parents included, are created. An existing
    /// directory must be empty.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidLocalPath`] if `root` exists but is not a
    /// directory, [`SyncError::NotEmptyForClone`] if it has entries, or an IO
    /// error if it cannot be created.
    pub fn initialize_for_clone(
        root: impl Into<PathBuf>,
        remote: Remote,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            tracing::debug!(path = %root.display(), "created clone target");
        }

        let handle = Self::open(root, remote, credentials)?;
        handle.ensure_clone_target()?;
        Ok(handle)
    }

    /// Re-checks that the root is still an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidLocalPath`] or
    /// [`SyncError::NotEmptyForClone`].
    pub fn ensure_clone_target(&self) -> Result<()> {
        ensure_directory(&self.root)?;
        if fs::read_dir(&self.root)?.next().is_some() {
            return Err(SyncError::NotEmptyForClone(self.root.clone()));
        }
        Ok(())
    }

    /// Working-copy root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The tracked remote.
    #[must_use]
    pub const fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Credentials for remote-facing operations, if any were supplied.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SyncError::InvalidLocalPath {
            path: path.to_path_buf(),
            reason: "path does not exist".to_string(),
        });
    }
    if !path.is_dir() {
        return Err(SyncError::InvalidLocalPath {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(())
}
