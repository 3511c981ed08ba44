/*!
# Workshot Core

Snapshot and restore of a developer's working context.

A snapshot ("workshot") records where you were working and what state your
tools were in, so you can come back to it later:

- The working directory
- Git branch, origin remote, dirty flag, commit and stash count
- Recent shell history, with anything that looks like a secret dropped

## Architecture

- Capturers are independent plugins behind the [`Capturer`] trait. The
  [`CaptureManager`] runs them in priority order and isolates their failures.
- The [`SnapshotEngine`] persists snapshots through a [`StorageAdapter`]
  with atomic writes, a rebuildable listing index and schema migration.
- [`freeze`] and [`restore`] compose the two into the user-level operations.

## Usage

```rust
use workshot_core::{
    freeze, restore, CaptureManager, FreezeOptions, RestoreOptions, SnapshotEngine,
    LocalFileStorage,
};

let dir = tempfile::tempdir().unwrap();
let engine = SnapshotEngine::new(LocalFileStorage::with_base_dir(dir.path()));
let mut manager = CaptureManager::new();

let frozen = freeze("my-work", &mut manager, &engine, FreezeOptions::default())?;
assert!(frozen.warnings.is_empty());

let options = RestoreOptions { change_directory: false };
let restored = restore("my-work", &mut manager, &engine, options)?;
assert_eq!(restored.snapshot.name, "my-work");
# Ok::<(), workshot_core::WorkshotError>(())
```
*/

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod observability;
pub mod operations;
pub mod snapshot;
pub mod storage;
pub mod version;

#[cfg(test)]
mod error_tests;

pub use capture::{Capturer, GitCapturer, PluginData, TerminalCapturer};
pub use config::WorkshotConfig;
pub use engine::{create_default_engine, SnapshotEngine};
pub use error::{Result, WorkshotError};
pub use manager::{CaptureManager, CaptureReport};
pub use metadata::{Metadata, SnapshotIndex};
pub use operations::{
    freeze, restore, FreezeOptions, FreezeOutcome, RestoreOptions, RestoreOutcome,
};
pub use snapshot::{Snapshot, SCHEMA_VERSION};
pub use storage::{LocalFileStorage, StorageAdapter};
pub use version::{resolve_version, BuildInfo};
