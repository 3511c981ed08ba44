/*!
Storage adapters for snapshot persistence.

This module defines the byte-level storage port used by the snapshot engine
and its filesystem implementation. The engine decides what the bytes mean;
adapters only decide where they live and how they are written safely.
*/

pub mod local;

use crate::Result;

/// Storage abstraction for saving and loading snapshot data
///
/// Paths are relative keys such as `shots/my-work.json`; how they map to
/// physical locations is up to the implementation.
pub trait StorageAdapter {
    /// Save data at the given location, replacing any previous content
    ///
    /// Implementations must make the replacement atomic: a crash mid-write
    /// leaves either the old content or the new content, never a mix.
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load data from the given location
    ///
    /// # Errors
    /// * `WorkshotError::NotFound` - nothing is stored at `path`
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if anything is stored at the given location
    fn exists(&self, path: &str) -> bool;

    /// Delete the data stored at the given location
    ///
    /// # Errors
    /// * `WorkshotError::NotFound` - nothing is stored at `path`
    fn delete(&self, path: &str) -> Result<()>;

    /// File names stored directly under `dir`
    ///
    /// A directory that does not exist yields an empty list.
    fn list(&self, dir: &str) -> Result<Vec<String>>;
}

// Re-export types for convenience
pub use local::LocalFileStorage;

/// Memory-based storage adapter for testing
///
/// This implementation stores blobs in a HashMap keyed by path.
#[cfg(test)]
pub struct MemoryStorage {
    data: std::sync::Arc<std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: std::sync::Arc::new(std::sync::Mutex::new(std::collections::HashMap::new())),
        }
    }

    /// Overwrite a blob directly, bypassing any engine-level checks
    pub fn put_raw(&self, path: &str, data: &[u8]) {
        let mut storage = self.data.lock().unwrap();
        storage.insert(path.to_string(), data.to_vec());
    }
}

#[cfg(test)]
impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let mut storage = self.data.lock().unwrap();
        storage.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let storage = self.data.lock().unwrap();
        storage
            .get(path)
            .cloned()
            .ok_or_else(|| crate::WorkshotError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        let storage = self.data.lock().unwrap();
        storage.contains_key(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut storage = self.data.lock().unwrap();
        storage
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| crate::WorkshotError::NotFound(path.to_string()))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let storage = self.data.lock().unwrap();
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(storage
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_owned)
            .collect())
    }
}
