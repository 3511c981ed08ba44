/*!
The persisted snapshot document and its schema version.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::capture::{git, PluginData};
use crate::{Result, WorkshotError};

/// Current on-disk snapshot format version.
///
/// Bump only for breaking changes to the snapshot structure, and add the
/// matching step to `SnapshotEngine::migrate`.
pub const SCHEMA_VERSION: u32 = 1;

const MAX_NAME_LEN: usize = 255;

/// A saved development context at a point in time
///
/// Core fields are strongly typed. Capturer output lives in `plugin_data`,
/// keyed by capturer name, and stays dynamically typed so new capturers can
/// be added without touching this struct.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub schema_version: u32,

    pub name: String,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    pub working_dir: PathBuf,

    /// Copy of `plugin_data.git.branch` for listing without parsing plugin data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,

    /// Copy of `plugin_data.git.remote`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote: Option<String>,

    /// Copy of `plugin_data.git.dirty`
    #[serde(default, skip_serializing_if = "is_false")]
    pub git_dirty: bool,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub plugin_data: PluginData,

    /// Top-level keys this version does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Snapshot {
    /// Create a snapshot stamped with the current schema version and time
    ///
    /// # Example
    /// ```rust
    /// use workshot_core::{Snapshot, SCHEMA_VERSION};
    ///
    /// let snapshot = Snapshot::new("my-work", "/home/me/project");
    /// assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
    /// assert!(snapshot.plugin_data.is_empty());
    /// ```
    pub fn new<S, P>(name: S, working_dir: P) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            schema_version: SCHEMA_VERSION,
            name: name.into(),
            created_at: Utc::now(),
            working_dir: working_dir.into(),
            git_branch: None,
            git_remote: None,
            git_dirty: false,
            plugin_data: PluginData::new(),
            extra: Map::new(),
        }
    }

    /// Set the plugin payloads and refresh the hoisted git fields
    pub fn with_plugin_data(mut self, plugin_data: PluginData) -> Self {
        self.plugin_data = plugin_data;
        self.hoist_git_fields();
        self
    }

    /// Copy the git capturer's branch/remote/dirty onto the top-level fields
    ///
    /// Fields the git payload does not carry are reset, so the top level never
    /// disagrees with `plugin_data`.
    pub fn hoist_git_fields(&mut self) {
        let git_data = self
            .plugin_data
            .get(git::PLUGIN_NAME)
            .and_then(Value::as_object);

        let string_field = |key: &str| {
            git_data
                .and_then(|data| data.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        self.git_branch = string_field(git::KEY_BRANCH);
        self.git_remote = string_field(git::KEY_REMOTE);
        self.git_dirty = git_data
            .and_then(|data| data.get(git::KEY_DIRTY))
            .and_then(Value::as_bool)
            .unwrap_or(false);
    }

    /// Check that a name is usable as a storage key
    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(WorkshotError::validation("snapshot name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(WorkshotError::validation(format!(
                "snapshot name is longer than {MAX_NAME_LEN} bytes"
            )));
        }
        if name.starts_with('.') {
            return Err(WorkshotError::validation(format!(
                "snapshot name '{name}' cannot start with '.'"
            )));
        }
        if name.contains(&['/', '\\', '\0'][..]) {
            return Err(WorkshotError::validation(format!(
                "snapshot name '{name}' cannot contain path separators"
            )));
        }
        Ok(())
    }
}
