//! Configuration for storage location and capturer limits
//!
//! Values come from built-in defaults, optionally overridden by
//! `WORKSHOT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Result, WorkshotError};

/// Directory created under the user's home when no storage root is configured
pub const DEFAULT_DIR_NAME: &str = ".workshot";

/// Default timeout for each git invocation, in seconds
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;

/// Default number of history lines kept by the terminal capturer
pub const DEFAULT_MAX_HISTORY_COMMANDS: usize = 20;

pub const ENV_HOME: &str = "WORKSHOT_HOME";
pub const ENV_GIT_TIMEOUT_SECS: &str = "WORKSHOT_GIT_TIMEOUT_SECS";
pub const ENV_HISTORY_LIMIT: &str = "WORKSHOT_HISTORY_LIMIT";

/// Runtime configuration shared by the storage engine and the capturers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshotConfig {
    /// Root directory holding `shots/` and `index.json` (defaults to `~/.workshot`)
    pub storage_root: Option<PathBuf>,
    /// Upper bound on a single git command
    pub git_timeout_secs: u64,
    /// How many recent shell commands to keep
    pub max_history_commands: usize,
}

impl WorkshotConfig {
    /// Configuration storing snapshots under an explicit directory
    pub fn with_storage_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            storage_root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(home) = get(ENV_HOME) {
            config.storage_root = Some(PathBuf::from(home));
        }
        if let Some(raw) = get(ENV_GIT_TIMEOUT_SECS) {
            config.git_timeout_secs = raw.trim().parse().map_err(|e| {
                WorkshotError::config(format!("{ENV_GIT_TIMEOUT_SECS}={raw:?}: {e}"))
            })?;
        }
        if let Some(raw) = get(ENV_HISTORY_LIMIT) {
            config.max_history_commands = raw.trim().parse().map_err(|e| {
                WorkshotError::config(format!("{ENV_HISTORY_LIMIT}={raw:?}: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.git_timeout_secs == 0 {
            return Err(WorkshotError::config("git timeout must be at least one second"));
        }
        if self.max_history_commands == 0 {
            return Err(WorkshotError::config("history limit must be at least one"));
        }
        if let Some(root) = &self.storage_root {
            if root.as_os_str().is_empty() {
                return Err(WorkshotError::config("storage root cannot be empty"));
            }
        }
        Ok(())
    }

    /// Resolve the directory that holds all workshot data
    pub fn resolve_storage_root(&self) -> Result<PathBuf> {
        match &self.storage_root {
            Some(root) => Ok(root.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| WorkshotError::config("failed to get home directory")),
        }
    }

    pub fn git_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.git_timeout_secs)
    }
}

impl Default for WorkshotConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            git_timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
            max_history_commands: DEFAULT_MAX_HISTORY_COMMANDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = WorkshotConfig::default();
        assert!(config.storage_root.is_none());
        assert_eq!(config.git_timeout_secs, 30);
        assert_eq!(config.max_history_commands, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_without_variables_uses_defaults() {
        let config = WorkshotConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, WorkshotConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = WorkshotConfig::from_lookup(lookup_from(&[
            (ENV_HOME, "/tmp/workshot-test"),
            (ENV_GIT_TIMEOUT_SECS, "5"),
            (ENV_HISTORY_LIMIT, " 50 "),
        ]))
        .unwrap();

        assert_eq!(config.storage_root, Some(PathBuf::from("/tmp/workshot-test")));
        assert_eq!(config.git_timeout_secs, 5);
        assert_eq!(config.max_history_commands, 50);
    }

    #[test]
    fn test_from_lookup_ignores_empty_values() {
        let config =
            WorkshotConfig::from_lookup(lookup_from(&[(ENV_HOME, ""), (ENV_HISTORY_LIMIT, " ")]))
                .unwrap();
        assert!(config.storage_root.is_none());
        assert_eq!(config.max_history_commands, DEFAULT_MAX_HISTORY_COMMANDS);
    }

    #[test]
    fn test_from_lookup_rejects_garbage_numbers() {
        let result = WorkshotConfig::from_lookup(lookup_from(&[(ENV_GIT_TIMEOUT_SECS, "soon")]));
        assert!(matches!(result, Err(WorkshotError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = WorkshotConfig::default();
        config.git_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = WorkshotConfig::default();
        config.max_history_commands = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_storage_root_is_resolved_verbatim() {
        let config = WorkshotConfig::with_storage_root("/srv/shots");
        assert_eq!(
            config.resolve_storage_root().unwrap(),
            PathBuf::from("/srv/shots")
        );
    }
}
