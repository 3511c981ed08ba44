/*!
Local filesystem storage adapter implementation.
*/

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::StorageAdapter;
use crate::{Result, WorkshotError};

/// Suffix of the scratch file written before the atomic rename
pub const TEMP_SUFFIX: &str = ".tmp";

/// Local filesystem storage adapter
///
/// Paths are resolved against a base directory. Writes go to
/// `<path>.tmp` first and are then renamed over `<path>`, so an
/// interrupted write never corrupts an existing file.
///
/// # Example
/// ```rust
/// use workshot_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let dir = std::env::temp_dir().join("workshot-doc-example");
/// let storage = LocalFileStorage::with_base_dir(&dir);
/// storage.save(b"{}", "shots/example.json")?;
/// assert!(storage.exists("shots/example.json"));
/// # storage.delete("shots/example.json")?;
/// # Ok::<(), workshot_core::WorkshotError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    /// Create a storage adapter rooted at `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a directory (relative to the base) if it is missing
    pub fn ensure_dir(&self, dir: &str) -> Result<()> {
        let full_path = self.resolve_path(dir);
        fs::create_dir_all(&full_path).map_err(|e| {
            WorkshotError::storage(format!(
                "Failed to create directory {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    /// Resolve the full path for a given storage path
    fn resolve_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Ensure the parent directory exists, creating it if necessary
    fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    WorkshotError::storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }

    fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(data)?;
        file.sync_all()
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        self.ensure_parent_dir(&full_path)?;

        let mut temp_path = full_path.clone().into_os_string();
        temp_path.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_path);

        Self::write_synced(&temp_path, data).map_err(|e| {
            WorkshotError::storage(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(&temp_path, &full_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(WorkshotError::storage(format!(
                "Failed to finalize {}: {}",
                full_path.display(),
                e
            )));
        }

        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => WorkshotError::NotFound(path.to_string()),
            _ => WorkshotError::storage(format!(
                "Failed to read {}: {}",
                full_path.display(),
                e
            )),
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).is_file()
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        fs::remove_file(&full_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => WorkshotError::NotFound(path.to_string()),
            _ => WorkshotError::storage(format!(
                "Failed to delete {}: {}",
                full_path.display(),
                e
            )),
        })
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let full_path = self.resolve_path(dir);

        let entries = match fs::read_dir(&full_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(WorkshotError::storage(format!(
                    "Failed to read directory {}: {}",
                    full_path.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
