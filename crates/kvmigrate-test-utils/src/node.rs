// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Temporary node homes backed by real engines

use kvmigrate_store::{
    store_path, BackendKind, EngineProvider, OpenMode, Record, StoreProvider,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic records for `store`, keys in ascending order
pub fn sample_records(store: &str, count: u32) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let key = format!("{store}:{i:08}").into_bytes();
            let value = format!("{store}-value-{i}").into_bytes();
            (key, value)
        })
        .collect()
}

/// A temporary node home with `data/` and `data_migration/` directories.
///
/// # Example
/// ```ignore
/// use kvmigrate_store::BackendKind;
/// use kvmigrate_test_utils::{sample_records, TestNode};
///
/// let node = TestNode::new();
/// node.seed("state", BackendKind::Sled, sample_records("state", 10));
/// assert_eq!(node.read_live("state", BackendKind::Sled).len(), 10);
/// ```
pub struct TestNode {
    temp_dir: TempDir,
    provider: EngineProvider,
}

impl TestNode {
    /// Create a node home with an empty data directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(temp_dir.path().join("data")).expect("Failed to create data directory");
        Self {
            temp_dir,
            provider: EngineProvider::new(),
        }
    }

    /// Create a node holding every core store with `count` records each.
    pub fn with_core_stores(kind: BackendKind, count: u32) -> Self {
        let node = Self::new();
        for store in ["blockstore", "state", "tx_index", "evidence"] {
            node.seed(store, kind, sample_records(store, count));
        }
        node
    }

    /// Root of the node home.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Live data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Default staging directory (not created).
    pub fn staging_dir(&self) -> PathBuf {
        self.path().join("data_migration")
    }

    /// Write `records` into the live store `name` using engine `kind`.
    pub fn seed(&self, name: &str, kind: BackendKind, records: Vec<Record>) {
        let store = self
            .provider
            .open(name, kind, &self.data_dir(), OpenMode::ReadWrite)
            .expect("Failed to open store for seeding");
        let mut batch = store.new_batch();
        for (key, value) in &records {
            batch.set(key, value).expect("Failed to stage record");
        }
        batch.write_sync().expect("Failed to commit seed batch");
        store.close().expect("Failed to close seeded store");
    }

    /// Read every record of store `name` in `dir` using engine `kind`.
    pub fn read(&self, dir: &Path, name: &str, kind: BackendKind) -> Vec<Record> {
        let store = self
            .provider
            .open(name, kind, dir, OpenMode::ReadOnly)
            .expect("Failed to open store for reading");
        let records = store
            .iter()
            .expect("Failed to create iterator")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to read records");
        store.close().expect("Failed to close store");
        records
    }

    /// Read every record of the live store `name`.
    pub fn read_live(&self, name: &str, kind: BackendKind) -> Vec<Record> {
        self.read(&self.data_dir(), name, kind)
    }

    /// Location of the live store `name`.
    pub fn live_store_path(&self, name: &str) -> PathBuf {
        store_path(&self.data_dir(), name)
    }

    /// Top-level entry names of the data directory, sorted.
    pub fn live_entries(&self) -> BTreeSet<String> {
        fs::read_dir(self.data_dir())
            .expect("Failed to read data directory")
            .map(|entry| {
                entry
                    .expect("Failed to read directory entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    /// Contents of every file under the data directory, keyed by path
    /// relative to it.
    pub fn live_files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let root = self.data_dir();
        let mut files = BTreeMap::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).expect("Failed to read directory") {
                let path = entry.expect("Failed to read directory entry").path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let content = fs::read(&path).expect("Failed to read file");
                    let relative = path
                        .strip_prefix(&root)
                        .expect("Entry outside the data directory")
                        .to_path_buf();
                    files.insert(relative, content);
                }
            }
        }
        files
    }

    /// Write a plain marker file inside the data directory.
    pub fn write_marker(&self, relative: &str, content: &[u8]) {
        let path = self.data_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(path, content).expect("Failed to write marker");
    }
}

impl Default for TestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_records_are_sorted() {
        let records = sample_records("state", 20);
        assert_eq!(records.len(), 20);
        assert!(records.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_seed_and_read_back() {
        let node = TestNode::new();
        node.seed("evidence", BackendKind::Redb, sample_records("evidence", 5));

        assert_eq!(
            node.read_live("evidence", BackendKind::Redb),
            sample_records("evidence", 5)
        );
        assert!(node.live_entries().contains("evidence.db"));
        assert!(!node.staging_dir().exists());
    }

    #[test]
    fn test_live_files_are_relative_to_data_dir() {
        let node = TestNode::new();
        node.write_marker("nested/marker", b"x");

        let files = node.live_files();
        assert_eq!(files.get(Path::new("nested/marker")), Some(&b"x".to_vec()));
    }
}
