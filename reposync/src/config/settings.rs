//! Application configuration settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::git::{Credentials, Identity};
use crate::handle::{Remote, DEFAULT_REMOTE};

/// Commit message used when the caller supplies none.
pub const DEFAULT_COMMIT_MESSAGE: &str = "No commit message";

/// Main configuration for reposync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposyncConfig {
    /// Working copy and remote.
    pub repository: RepositoryConfig,
    /// Credential lookup.
    pub credentials: CredentialsConfig,
    /// Commit identity and defaults.
    pub commit: CommitConfig,
}

/// Working copy location and remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working-copy root.
    pub path: Option<PathBuf>,
    /// Name of the remote inside the repository.
    pub remote_name: String,
    /// Remote URL or path.
    pub remote_url: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            remote_name: DEFAULT_REMOTE.to_string(),
            remote_url: None,
        }
    }
}

/// Where remote credentials come from.
///
/// Only the principal may live in the file. The secret is always read from
/// the environment variable named by `password_env`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// User name presented to the remote.
    pub username: Option<String>,
    /// Environment variable holding the password or token.
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: None,
            password_env: env::PASSWORD.to_string(),
        }
    }
}

/// Commit identity and defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Author/committer name; git config is used when unset.
    pub author_name: Option<String>,
    /// Author/committer email; git config is used when unset.
    pub author_email: Option<String>,
    /// Message for commits requested without one.
    pub default_message: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: None,
            author_email: None,
            default_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const REMOTE_URL: &str = "REPOSYNC_REMOTE_URL";
    pub const PATH: &str = "REPOSYNC_PATH";
    pub const USERNAME: &str = "REPOSYNC_USERNAME";
    pub const PASSWORD: &str = "REPOSYNC_PASSWORD";
    pub const LOG_LEVEL: &str = "REPOSYNC_LOG";
}

impl ReposyncConfig {
    /// Apply environment variable overrides to the configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(env::REMOTE_URL) {
            if !url.is_empty() {
                self.repository.remote_url = Some(url);
            }
        }

        if let Ok(path) = std::env::var(env::PATH) {
            if !path.is_empty() {
                self.repository.path = Some(PathBuf::from(path));
            }
        }

        if let Ok(user) = std::env::var(env::USERNAME) {
            if !user.is_empty() {
                self.credentials.username = Some(user);
            }
        }

        self
    }

    /// The configured remote, if a URL is set.
    #[must_use]
    pub fn remote(&self) -> Option<Remote> {
        self.repository.remote_url.as_ref().map(|url| Remote {
            name: self.repository.remote_name.clone(),
            url: url.clone(),
        })
    }

    /// Resolves credentials: the configured user name plus the secret from
    /// the environment. `None` unless both are present.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.credentials.username.as_ref()?;
        let secret = std::env::var(&self.credentials.password_env).ok()?;
        Some(Credentials::new(username.clone(), secret))
    }

    /// Commit identity, when both name and email are configured.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match (&self.commit.author_name, &self.commit.author_email) {
            (Some(name), Some(email)) => Some(Identity {
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ReposyncConfig::default();
        assert_eq!(config.repository.remote_name, "origin");
        assert!(config.repository.remote_url.is_none());
        assert_eq!(config.credentials.password_env, "REPOSYNC_PASSWORD");
        assert_eq!(config.commit.default_message, DEFAULT_COMMIT_MESSAGE);
        assert!(config.remote().is_none());
        assert!(config.identity().is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config: ReposyncConfig = toml::from_str(
            r#"
            [repository]
            path = "/srv/work/demo"
            remote_url = "https://host.example/demo.git"

            [commit]
            author_name = "Bot"
            author_email = "bot@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.repository.path, Some(PathBuf::from("/srv/work/demo")));
        assert_eq!(config.repository.remote_name, "origin");

        let remote = config.remote().unwrap();
        assert_eq!(remote.url, "https://host.example/demo.git");

        let identity = config.identity().unwrap();
        assert_eq!(identity.name, "Bot");
        assert_eq!(config.commit.default_message, DEFAULT_COMMIT_MESSAGE);
    }

    #[test]
    fn credentials_need_secret_from_env() {
        let mut config = ReposyncConfig::default();
        config.credentials.username = Some("alice".to_string());
        config.credentials.password_env = "REPOSYNC_TEST_UNSET_SECRET_VAR".to_string();
        assert!(config.credentials().is_none());

        config.credentials.password_env = "PATH".to_string();
        let creds = config.credentials().unwrap();
        assert_eq!(creds.principal(), "alice");
    }

    #[test]
    fn serialized_config_has_no_secret() {
        let mut config = ReposyncConfig::default();
        config.credentials.username = Some("alice".to_string());

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("password_env"));
        assert!(text.contains("alice"));
    }
}
