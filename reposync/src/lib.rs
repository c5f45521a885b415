//! reposync - keep a local git working copy in step with its remote.
//!
//! A [`RepoController`] wraps one working copy and exposes guarded
//! operations on it: clone into an empty directory, checkout behind a
//! clean-tree check, commit with automatic staging of new files, and
//! pull/fetch/push with the configured credentials.
//!
//! ```no_run
//! use reposync::{config, RepoController};
//!
//! # fn main() -> reposync::Result<()> {
//! let ctl = RepoController::from_config(&config::load_config()?)?;
//! ctl.sync().pull()?;
//! ctl.commit(Some("update notes"), false)?;
//! ctl.sync().push(false)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod git;
pub mod handle;

pub use config::ReposyncConfig;
pub use controller::{
    BranchCreation, BranchDeletion, BranchRemoval, CheckoutOutcome, CheckoutStage, CommitOutcome,
    RepoController, TreeState,
};
pub use error::{RemoteOperation, Result, SyncError};
pub use git::{BranchRef, BranchScope, CommitInfo, Credentials, ListScope, WorkingTreeStatus};
pub use handle::{Remote, RepositoryHandle};

/// Routes `tracing` output to the test harness, filtered by `REPOSYNC_LOG`.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(config::settings::env::LOG_LEVEL)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
