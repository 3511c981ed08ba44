/*!
Lightweight snapshot metadata and the listing index built from it.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Snapshot;

/// Current index file format version
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Index entry: the part of a snapshot needed to list it
///
/// Always a pure projection of a [`Snapshot`], so the index can be rebuilt
/// from the snapshot files at any time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub working_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
}

impl From<&Snapshot> for Metadata {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            created_at: snapshot.created_at,
            working_dir: snapshot.working_dir.clone(),
            git_branch: snapshot.git_branch.clone(),
        }
    }
}

/// Cached metadata for every stored snapshot, keyed by name
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SnapshotIndex {
    pub version: u32,
    #[serde(default)]
    pub snapshots: BTreeMap<String, Metadata>,
}

impl SnapshotIndex {
    pub fn new() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            snapshots: BTreeMap::new(),
        }
    }

    /// Insert or replace the entry for a snapshot
    pub fn upsert(&mut self, snapshot: &Snapshot) {
        self.snapshots
            .insert(snapshot.name.clone(), Metadata::from(snapshot));
    }

    pub fn remove(&mut self, name: &str) -> Option<Metadata> {
        self.snapshots.remove(name)
    }

    /// All entries, newest first
    pub fn sorted_entries(&self) -> Vec<Metadata> {
        let mut entries: Vec<Metadata> = self.snapshots.values().cloned().collect();
        sort_newest_first(&mut entries);
        entries
    }
}

impl Default for SnapshotIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by creation time, newest first; equal timestamps order by name
pub fn sort_newest_first(entries: &mut [Metadata]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}
