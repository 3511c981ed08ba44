/*!
Snapshot engine: persists snapshots through a storage adapter and keeps the
listing index in step with the snapshot files.

The snapshot files are the source of truth. The index is a cache that is
updated on a best-effort basis and can be rebuilt from the files at any time.
*/

use tracing::{debug, info, warn};

use crate::config::WorkshotConfig;
use crate::metadata::{sort_newest_first, Metadata, SnapshotIndex};
use crate::snapshot::SCHEMA_VERSION;
use crate::storage::local::TEMP_SUFFIX;
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{Result, Snapshot, WorkshotError};

/// Directory holding one JSON file per snapshot
pub const SHOTS_DIR: &str = "shots";

/// Location of the listing index
pub const INDEX_PATH: &str = "index.json";

const SNAPSHOT_EXTENSION: &str = ".json";

/// Main engine for saving, loading and listing snapshots
///
/// # Example
/// ```rust
/// use workshot_core::{LocalFileStorage, Snapshot, SnapshotEngine};
///
/// let dir = tempfile::tempdir().unwrap();
/// let engine = SnapshotEngine::new(LocalFileStorage::with_base_dir(dir.path()));
///
/// engine.save(&Snapshot::new("my-work", "/home/me/project"))?;
/// assert!(engine.exists("my-work"));
///
/// let loaded = engine.load("my-work")?;
/// assert_eq!(loaded.name, "my-work");
/// # Ok::<(), workshot_core::WorkshotError>(())
/// ```
pub struct SnapshotEngine<S>
where
    S: StorageAdapter,
{
    storage: S,
}

impl<S> SnapshotEngine<S>
where
    S: StorageAdapter,
{
    /// Create a new engine over the given storage adapter
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn snapshot_path(name: &str) -> String {
        format!("{SHOTS_DIR}/{name}{SNAPSHOT_EXTENSION}")
    }

    /// Persist a snapshot, replacing any previous one with the same name
    ///
    /// Nothing is written unless the snapshot carries the current schema
    /// version and a valid name.
    ///
    /// # Errors
    /// * `WorkshotError::SchemaMismatch` - `schema_version` is not current
    /// * `WorkshotError::Validation` - the name is not a usable storage key
    /// * `WorkshotError::Json` / `WorkshotError::Storage` - the write failed
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(WorkshotError::SchemaMismatch {
                found: snapshot.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Snapshot::validate_name(&snapshot.name)?;

        let data = serde_json::to_vec_pretty(snapshot)?;
        self.storage
            .save(&data, &Self::snapshot_path(&snapshot.name))?;
        debug!(name = %snapshot.name, bytes = data.len(), "snapshot written");

        if let Err(e) = self.update_index(|index| index.upsert(snapshot)) {
            warn!(name = %snapshot.name, error = %e, "failed to update snapshot index");
        }
        Ok(())
    }

    /// Load a snapshot by name, migrating older schema versions
    ///
    /// The file name is the snapshot's identity: a document whose `name`
    /// disagrees (a copied or renamed file) is returned under the file name.
    ///
    /// # Errors
    /// * `WorkshotError::NotFound` - no snapshot with this name
    /// * `WorkshotError::Json` - the file is not a valid snapshot document
    /// * `WorkshotError::SchemaMismatch` - written by a newer, incompatible version
    pub fn load(&self, name: &str) -> Result<Snapshot> {
        Snapshot::validate_name(name)?;

        let data = self
            .storage
            .load(&Self::snapshot_path(name))
            .map_err(|e| match e {
                WorkshotError::NotFound(_) => WorkshotError::NotFound(name.to_string()),
                other => other,
            })?;

        let mut snapshot: Snapshot = serde_json::from_slice(&data)?;
        if snapshot.name != name {
            debug!(file = name, recorded = %snapshot.name, "snapshot name differs from file name");
            snapshot.name = name.to_string();
        }

        if snapshot.schema_version > SCHEMA_VERSION {
            return Err(WorkshotError::SchemaMismatch {
                found: snapshot.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if snapshot.schema_version < SCHEMA_VERSION {
            return Ok(Self::migrate(snapshot));
        }
        Ok(snapshot)
    }

    /// Bring an older snapshot up to the current schema
    ///
    /// No format change has happened yet, so only the version is bumped.
    fn migrate(mut snapshot: Snapshot) -> Snapshot {
        debug!(
            name = %snapshot.name,
            from = snapshot.schema_version,
            to = SCHEMA_VERSION,
            "migrating snapshot"
        );
        snapshot.schema_version = SCHEMA_VERSION;
        snapshot
    }

    /// Metadata for every stored snapshot, newest first
    ///
    /// Served from the index; a missing or unreadable index is rebuilt from
    /// the snapshot files.
    pub fn list(&self) -> Result<Vec<Metadata>> {
        match self.load_index() {
            Ok(index) => Ok(index.sorted_entries()),
            Err(e) => {
                debug!(error = %e, "index unavailable, rebuilding");
                self.rebuild_index()
            }
        }
    }

    /// Delete a snapshot and its index entry
    ///
    /// # Errors
    /// * `WorkshotError::NotFound` - no snapshot with this name
    pub fn delete(&self, name: &str) -> Result<()> {
        Snapshot::validate_name(name)?;

        self.storage
            .delete(&Self::snapshot_path(name))
            .map_err(|e| match e {
                WorkshotError::NotFound(_) => WorkshotError::NotFound(name.to_string()),
                other => other,
            })?;

        if let Err(e) = self.update_index(|index| {
            index.remove(name);
        }) {
            warn!(name, error = %e, "failed to update snapshot index");
        }
        Ok(())
    }

    /// Check if a snapshot with this name is stored
    pub fn exists(&self, name: &str) -> bool {
        Snapshot::validate_name(name).is_ok() && self.storage.exists(&Self::snapshot_path(name))
    }

    /// Regenerate the index by scanning every snapshot file
    ///
    /// Files that cannot be loaded are skipped with a warning. A failure to
    /// write the fresh index is logged, not returned.
    pub fn rebuild_index(&self) -> Result<Vec<Metadata>> {
        let index = self.scan_index()?;

        if let Err(e) = self.save_index(&index) {
            warn!(error = %e, "failed to write rebuilt snapshot index");
        }
        info!(count = index.snapshots.len(), "snapshot index rebuilt");

        let mut entries: Vec<Metadata> = index.snapshots.into_values().collect();
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Index built from the snapshot files, keyed by file name
    fn scan_index(&self) -> Result<SnapshotIndex> {
        let mut index = SnapshotIndex::new();

        for file_name in self.storage.list(SHOTS_DIR)? {
            if file_name.ends_with(TEMP_SUFFIX) {
                continue;
            }
            let Some(name) = file_name.strip_suffix(SNAPSHOT_EXTENSION) else {
                continue;
            };

            match self.load(name) {
                Ok(snapshot) => index.upsert(&snapshot),
                Err(e) => {
                    let corrupted = WorkshotError::Corrupted {
                        name: name.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{corrupted}");
                }
            }
        }
        Ok(index)
    }

    fn load_index(&self) -> Result<SnapshotIndex> {
        let data = self.storage.load(INDEX_PATH)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn save_index(&self, index: &SnapshotIndex) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)?;
        self.storage.save(&data, INDEX_PATH)
    }

    /// Apply `change` to the stored index
    ///
    /// A missing or unreadable index is first rebuilt from the snapshot files.
    fn update_index<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut SnapshotIndex),
    {
        let mut index = match self.load_index() {
            Ok(index) => index,
            Err(e) => {
                debug!(error = %e, "index unavailable, scanning snapshot files");
                self.scan_index()?
            }
        };
        change(&mut index);
        self.save_index(&index)
    }
}

/// Create an engine over the configured storage root on the local filesystem
///
/// The snapshot directory is created if it does not exist yet.
///
/// # Example
/// ```rust
/// use workshot_core::{create_default_engine, WorkshotConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// let engine = create_default_engine(&WorkshotConfig::with_storage_root(dir.path()))?;
/// assert!(engine.list()?.is_empty());
/// # Ok::<(), workshot_core::WorkshotError>(())
/// ```
pub fn create_default_engine(config: &WorkshotConfig) -> Result<SnapshotEngine<LocalFileStorage>> {
    config.validate()?;
    let root = config.resolve_storage_root()?;
    let storage = LocalFileStorage::with_base_dir(&root);
    storage.ensure_dir(SHOTS_DIR)?;
    debug!(root = %root.display(), "using snapshot storage");
    Ok(SnapshotEngine::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PluginData;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn create_test_engine() -> SnapshotEngine<MemoryStorage> {
        SnapshotEngine::new(MemoryStorage::new())
    }

    fn snapshot_at(name: &str, minutes: i64) -> Snapshot {
        let mut snapshot = Snapshot::new(name, "/work");
        snapshot.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            + Duration::minutes(minutes);
        snapshot
    }

    fn names(entries: &[Metadata]) -> Vec<&str> {
        entries.iter().map(|m| m.name.as_str()).collect()
    }

    /// Storage that refuses to write the index
    struct IndexlessStorage(MemoryStorage);

    impl StorageAdapter for IndexlessStorage {
        fn save(&self, data: &[u8], path: &str) -> Result<()> {
            if path == INDEX_PATH {
                return Err(WorkshotError::storage("index is read-only"));
            }
            self.0.save(data, path)
        }

        fn load(&self, path: &str) -> Result<Vec<u8>> {
            self.0.load(path)
        }

        fn exists(&self, path: &str) -> bool {
            self.0.exists(path)
        }

        fn delete(&self, path: &str) -> Result<()> {
            self.0.delete(path)
        }

        fn list(&self, dir: &str) -> Result<Vec<String>> {
            self.0.list(dir)
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let engine = create_test_engine();

        let mut plugin_data = PluginData::new();
        plugin_data.insert(
            "git".to_string(),
            json!({ "branch": "feature/login", "dirty": true, "stash_count": 2 }),
        );
        plugin_data.insert("terminal".to_string(), json!({ "recent_commands": ["ls"] }));
        let snapshot = Snapshot::new("my-work", "/home/me/app").with_plugin_data(plugin_data);

        engine.save(&snapshot).unwrap();
        let loaded = engine.load("my-work").unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.git_branch.as_deref(), Some("feature/login"));
        assert_eq!(loaded.plugin_data["git"]["stash_count"], 2);
    }

    #[test]
    fn test_saved_file_is_pretty_json() {
        let engine = create_test_engine();
        engine.save(&Snapshot::new("pretty", "/work")).unwrap();

        let raw = engine.storage().load("shots/pretty.json").unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("\n  \"name\": \"pretty\""));
    }

    #[test]
    fn test_save_rejects_wrong_schema_version_before_writing() {
        let engine = create_test_engine();
        let mut snapshot = Snapshot::new("old", "/work");
        snapshot.schema_version = SCHEMA_VERSION + 1;

        let result = engine.save(&snapshot);

        assert!(matches!(
            result,
            Err(WorkshotError::SchemaMismatch { found, expected })
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
        assert!(!engine.exists("old"));
        assert!(!engine.storage().exists(INDEX_PATH));
    }

    #[test]
    fn test_save_rejects_invalid_name() {
        let engine = create_test_engine();

        let result = engine.save(&Snapshot::new("../escape", "/work"));

        assert!(matches!(result, Err(WorkshotError::Validation(_))));
        assert!(engine.storage().list(SHOTS_DIR).unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_existing() {
        let engine = create_test_engine();
        engine.save(&Snapshot::new("same", "/first")).unwrap();
        engine.save(&Snapshot::new("same", "/second")).unwrap();

        assert_eq!(engine.load("same").unwrap().working_dir.to_str(), Some("/second"));
        assert_eq!(engine.list().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_is_not_found_by_name() {
        let engine = create_test_engine();

        match engine.load("ghost") {
            Err(WorkshotError::NotFound(name)) => assert_eq!(name, "ghost"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let engine = create_test_engine();
        engine.storage().put_raw("shots/broken.json", b"{ not json");

        assert!(matches!(engine.load("broken"), Err(WorkshotError::Json(_))));
    }

    #[test]
    fn test_load_migrates_older_schema() {
        let engine = create_test_engine();
        let raw = json!({
            "schema_version": 0,
            "name": "ancient",
            "created_at": "2023-05-01T10:00:00Z",
            "working_dir": "/src/app"
        });
        engine
            .storage()
            .put_raw("shots/ancient.json", raw.to_string().as_bytes());

        let loaded = engine.load("ancient").unwrap();

        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert_eq!(loaded.name, "ancient");
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let engine = create_test_engine();
        let raw = json!({
            "schema_version": SCHEMA_VERSION + 1,
            "name": "future",
            "created_at": "2030-01-01T00:00:00Z",
            "working_dir": "/src/app"
        });
        engine
            .storage()
            .put_raw("shots/future.json", raw.to_string().as_bytes());

        assert!(matches!(
            engine.load("future"),
            Err(WorkshotError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_list_is_newest_first() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("oldest", 0)).unwrap();
        engine.save(&snapshot_at("newest", 20)).unwrap();
        engine.save(&snapshot_at("middle", 10)).unwrap();

        let listed = engine.list().unwrap();

        assert_eq!(names(&listed), vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn test_list_empty_store() {
        assert!(create_test_engine().list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_then_exists_is_false() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("keep", 0)).unwrap();
        engine.save(&snapshot_at("drop", 5)).unwrap();

        engine.delete("drop").unwrap();

        assert!(!engine.exists("drop"));
        assert!(engine.exists("keep"));
        assert_eq!(names(&engine.list().unwrap()), vec!["keep"]);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let engine = create_test_engine();

        let error = engine.delete("ghost").unwrap_err();

        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "workshot 'ghost' not found");
    }

    #[test]
    fn test_delete_tolerates_missing_index() {
        let engine = create_test_engine();
        engine.save(&Snapshot::new("solo", "/work")).unwrap();
        engine.storage().delete(INDEX_PATH).unwrap();

        engine.delete("solo").unwrap();
        assert!(!engine.exists("solo"));
    }

    #[test]
    fn test_rebuild_matches_incremental_index() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("a", 0)).unwrap();
        engine.save(&snapshot_at("b", 1)).unwrap();
        engine.save(&snapshot_at("c", 2)).unwrap();
        engine.delete("b").unwrap();

        let incremental = engine.list().unwrap();
        engine.storage().put_raw(INDEX_PATH, b"garbage");
        let rebuilt = engine.list().unwrap();

        assert_eq!(rebuilt, incremental);
        assert_eq!(names(&rebuilt), vec!["c", "a"]);

        // The rebuilt index was written back.
        let index: SnapshotIndex =
            serde_json::from_slice(&engine.storage().load(INDEX_PATH).unwrap()).unwrap();
        assert_eq!(index.snapshots.len(), 2);
    }

    #[test]
    fn test_rebuild_skips_corrupted_and_temp_files() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("good", 0)).unwrap();
        engine.storage().put_raw("shots/bad.json", b"{ truncated");
        engine.storage().put_raw("shots/good.json.tmp", b"partial");
        engine.storage().put_raw("shots/notes.txt", b"ignored");

        let rebuilt = engine.rebuild_index().unwrap();

        assert_eq!(names(&rebuilt), vec!["good"]);
    }

    #[test]
    fn test_save_after_index_loss_keeps_earlier_snapshots() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("one", 0)).unwrap();
        engine.save(&snapshot_at("two", 1)).unwrap();
        engine.save(&snapshot_at("three", 2)).unwrap();
        engine.storage().delete(INDEX_PATH).unwrap();

        engine.save(&snapshot_at("four", 3)).unwrap();

        assert_eq!(names(&engine.list().unwrap()), vec!["four", "three", "two", "one"]);
    }

    #[test]
    fn test_save_over_unreadable_index_keeps_earlier_snapshots() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("one", 0)).unwrap();
        engine.storage().put_raw(INDEX_PATH, b"{ truncated");

        engine.save(&snapshot_at("two", 1)).unwrap();

        assert_eq!(names(&engine.list().unwrap()), vec!["two", "one"]);
    }

    #[test]
    fn test_delete_after_index_loss_keeps_remaining_snapshots() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("keep", 0)).unwrap();
        engine.save(&snapshot_at("drop", 1)).unwrap();
        engine.storage().delete(INDEX_PATH).unwrap();

        engine.delete("drop").unwrap();

        assert_eq!(names(&engine.list().unwrap()), vec!["keep"]);
    }

    #[test]
    fn test_copied_file_is_its_own_snapshot() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("orig", 0)).unwrap();
        let raw = engine.storage().load("shots/orig.json").unwrap();
        engine.storage().put_raw("shots/copy.json", &raw);

        let rebuilt = engine.rebuild_index().unwrap();

        assert_eq!(names(&rebuilt), vec!["copy", "orig"]);
        assert_eq!(engine.load("copy").unwrap().name, "copy");
        assert_eq!(engine.load("orig").unwrap().name, "orig");

        engine.delete("copy").unwrap();
        assert_eq!(names(&engine.list().unwrap()), vec!["orig"]);
    }

    #[test]
    fn test_list_equal_timestamps_order_by_name() {
        let engine = create_test_engine();
        engine.save(&snapshot_at("beta", 0)).unwrap();
        engine.save(&snapshot_at("alpha", 0)).unwrap();

        assert_eq!(names(&engine.list().unwrap()), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_index_write_failure_does_not_fail_save() {
        let engine = SnapshotEngine::new(IndexlessStorage(MemoryStorage::new()));

        engine.save(&snapshot_at("first", 0)).unwrap();
        engine.save(&snapshot_at("second", 1)).unwrap();

        assert!(engine.exists("first"));
        // No index can be written, so listing falls back to a scan.
        assert_eq!(names(&engine.list().unwrap()), vec!["second", "first"]);
    }

    #[test]
    fn test_exists_with_invalid_name_is_false() {
        let engine = create_test_engine();
        assert!(!engine.exists(""));
        assert!(!engine.exists("../index"));
    }

    #[test]
    fn test_create_default_engine_creates_shots_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("store");

        let engine = create_default_engine(&WorkshotConfig::with_storage_root(&root)).unwrap();

        assert!(root.join(SHOTS_DIR).is_dir());
        assert_eq!(engine.storage().base_dir(), root.as_path());
    }
}
