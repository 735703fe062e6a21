//! Configuration types for the session core.
//!
//! Defaults match the HR portal as deployed. A host can layer a TOML file
//! and `HR_SESSION__*` environment variables on top through [`ConfigBuilder`]:
//!
//! ```toml
//! [navigation]
//! login_path = "/login"
//! dashboard_path = "/dashboard"
//!
//! [provider]
//! base_url = "https://hr.example.com/api"
//!
//! [policy]
//! allowed_roles = ["employee"]
//! ```

use crate::errors::{AuthError, Result};
use crate::storage::StorageKeys;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the session manager, guard and router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub navigation: NavigationConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub policy: PolicyConfig,
}

/// Destinations the core redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub login_path: String,
    pub dashboard_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub keys: StorageKeys,
    /// Session file for the file-backed store; platform default when unset.
    pub path: Option<PathBuf>,
}

/// Where the authentication and employee services live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub login_path: String,
    pub employee_path: String,
    pub timeout_secs: u64,
}

/// Who may hold a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Roles allowed to sign in, compared case-insensitively.
    pub allowed_roles: Vec<String>,
    /// Token persisted when the login response carries none. `None` makes
    /// a missing token a login failure.
    pub placeholder_token: Option<String>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            login_path: "/auth/login".to_string(),
            employee_path: "/auth/employees".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_roles: vec!["employee".to_string()],
            placeholder_token: Some("dummy-token".to_string()),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.navigation.login_path = path.into();
        self
    }

    pub fn dashboard_path(mut self, path: impl Into<String>) -> Self {
        self.navigation.dashboard_path = path.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.provider.base_url = url.into();
        self
    }

    pub fn allowed_roles(mut self, roles: &[&str]) -> Self {
        self.policy.allowed_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn placeholder_token(mut self, token: Option<&str>) -> Self {
        self.policy.placeholder_token = token.map(str::to_string);
        self
    }

    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.path = Some(path.into());
        self
    }

    /// Rejects configurations the session core cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("navigation.login_path", &self.navigation.login_path),
            ("navigation.dashboard_path", &self.navigation.dashboard_path),
        ] {
            if !path.starts_with('/') {
                return Err(AuthError::configuration(format!(
                    "{name} must be an absolute path, got '{path}'"
                )));
            }
        }

        let keys = self.storage.keys.all();
        if keys.iter().any(|k| k.is_empty()) {
            return Err(AuthError::configuration("storage keys must not be empty"));
        }
        if keys[0] == keys[1] || keys[0] == keys[2] || keys[1] == keys[2] {
            return Err(AuthError::configuration("storage keys must be distinct"));
        }

        if self.policy.allowed_roles.iter().all(|r| r.trim().is_empty()) {
            return Err(AuthError::configuration(
                "policy.allowed_roles must name at least one role",
            ));
        }
        if matches!(self.policy.placeholder_token.as_deref(), Some("")) {
            return Err(AuthError::configuration(
                "policy.placeholder_token must not be empty; unset it instead",
            ));
        }
        Ok(())
    }
}

/// Layers defaults, an optional TOML file and environment variables.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    files: Vec<(PathBuf, bool)>,
    env_prefix: Option<String>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some("HR_SESSION".to_string()),
        }
    }

    /// Add a TOML file; later files override earlier ones.
    pub fn with_file(mut self, path: impl Into<PathBuf>, required: bool) -> Self {
        self.files.push((path.into(), required));
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        let defaults = Config::try_from(&SessionConfig::default())
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let mut builder = Config::builder().add_source(defaults);

        for (path, required) in &self.files {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(*required),
            );
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("policy.allowed_roles")
                    .try_parsing(true),
            );
        }

        let config: SessionConfig = builder
            .build()
            .and_then(|c| c.try_deserialize::<SessionConfig>())
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "Loaded session configuration");
        Ok(config)
    }
}
