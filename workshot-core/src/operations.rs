/*!
Freeze and restore: the two user-level operations, composed from the capture
manager and the snapshot engine.
*/

use std::path::PathBuf;

use tracing::{info, warn};

use crate::manager::CaptureManager;
use crate::storage::StorageAdapter;
use crate::{Result, Snapshot, SnapshotEngine, WorkshotError};

/// Options for [`freeze`]
#[derive(Debug, Clone, Default)]
pub struct FreezeOptions {
    /// Overwrite an existing snapshot with the same name
    pub force: bool,
    /// Directory to record instead of the process working directory
    pub working_dir: Option<PathBuf>,
}

/// A saved snapshot plus the capturer failures that did not prevent it
#[derive(Debug)]
pub struct FreezeOutcome {
    pub snapshot: Snapshot,
    pub warnings: Vec<WorkshotError>,
}

/// Options for [`restore`]
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Change the process working directory to the saved one
    pub change_directory: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            change_directory: true,
        }
    }
}

/// The loaded snapshot plus every restore step that failed
#[derive(Debug)]
pub struct RestoreOutcome {
    pub snapshot: Snapshot,
    pub warnings: Vec<WorkshotError>,
}

/// Capture the current context and save it under `name`
///
/// # Errors
/// * `WorkshotError::Validation` - the name is not a usable storage key
/// * `WorkshotError::AlreadyExists` - the name is taken and `force` is off
/// * `WorkshotError::Io` - the working directory cannot be determined
/// * `WorkshotError::AllCapturersFailed` - no capturer succeeded
pub fn freeze<S: StorageAdapter>(
    name: &str,
    manager: &mut CaptureManager,
    engine: &SnapshotEngine<S>,
    options: FreezeOptions,
) -> Result<FreezeOutcome> {
    Snapshot::validate_name(name)?;
    if !options.force && engine.exists(name) {
        return Err(WorkshotError::AlreadyExists(name.to_string()));
    }

    let working_dir = match options.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let report = manager.capture_all()?;
    let snapshot = Snapshot::new(name, working_dir).with_plugin_data(report.data);
    engine.save(&snapshot)?;

    info!(
        name,
        plugins = snapshot.plugin_data.len(),
        warnings = report.errors.len(),
        "snapshot frozen"
    );
    Ok(FreezeOutcome {
        snapshot,
        warnings: report.errors,
    })
}

/// Load `name` and re-apply it to the current environment
///
/// Only loading can fail. Every restore step that goes wrong is returned as
/// a warning next to the snapshot.
///
/// # Errors
/// * `WorkshotError::NotFound` - no snapshot with this name
/// * `WorkshotError::Json` / `WorkshotError::SchemaMismatch` - unreadable snapshot
pub fn restore<S: StorageAdapter>(
    name: &str,
    manager: &mut CaptureManager,
    engine: &SnapshotEngine<S>,
    options: RestoreOptions,
) -> Result<RestoreOutcome> {
    let snapshot = engine.load(name)?;
    let mut warnings = Vec::new();

    if options.change_directory && !snapshot.working_dir.as_os_str().is_empty() {
        if let Err(source) = std::env::set_current_dir(&snapshot.working_dir) {
            warn!(
                dir = %snapshot.working_dir.display(),
                error = %source,
                "cannot enter working directory"
            );
            warnings.push(WorkshotError::ChangeDirectory {
                path: snapshot.working_dir.clone(),
                source,
            });
        }
    }

    warnings.extend(manager.restore_all(&snapshot.plugin_data));

    info!(name, warnings = warnings.len(), "snapshot restored");
    Ok(RestoreOutcome { snapshot, warnings })
}
