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

//! In-memory store provider for testing
//!
//! Stores are keyed by their on-disk path ([`store_path`]) but never touch the
//! filesystem. Every store keeps a commit log so tests can inspect batch
//! boundaries, and faults can be injected per store.
//!
//! # Examples
//!
//! ```rust
//! use kvmigrate_store::mock::{Fault, MemoryProvider};
//! use kvmigrate_store::{BackendKind, OpenMode, StoreProvider};
//! use std::path::Path;
//!
//! let provider = MemoryProvider::new();
//! let dir = Path::new("/data");
//! provider.seed(dir, "state", vec![(b"a".to_vec(), b"1".to_vec())]);
//! provider.inject(dir, "state", Fault::CommitAt(1));
//!
//! let store = provider.open("state", BackendKind::Sled, dir, OpenMode::ReadOnly).unwrap();
//! assert_eq!(store.iter().unwrap().count(), 1);
//! assert!(store.new_batch().write_sync().is_err());
//! ```

use crate::{
    store_path, BackendKind, KvStore, OpenMode, Record, RecordIter, StoreError, StoreProvider,
    StoreResult, WriteBatch,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Failure to inject into a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Opening the store fails
    Open,
    /// Starting an iterator fails
    Iterator,
    /// The iterator yields an error in place of its N-th record (1-based)
    ReadAt(u64),
    /// The N-th `set` across all batches fails (1-based)
    SetAt(u64),
    /// The N-th commit fails (1-based)
    CommitAt(usize),
    /// Closing a handle fails; the handle is still released
    Close,
}

#[derive(Default)]
struct MemoryDb {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
    commit_log: Vec<Vec<Vec<u8>>>,
    faults: Vec<Fault>,
    open: bool,
    yielded: u64,
    sets: u64,
    commits_attempted: usize,
}

impl MemoryDb {
    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

type SharedDb = Arc<Mutex<MemoryDb>>;

fn lock(db: &SharedDb) -> MutexGuard<'_, MemoryDb> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`StoreProvider`] with fault injection
#[derive(Clone, Default)]
pub struct MemoryProvider {
    dbs: Arc<Mutex<HashMap<PathBuf, SharedDb>>>,
}

impl MemoryProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    fn db(&self, dir: &Path, name: &str) -> Option<SharedDb> {
        let dbs = self.dbs.lock().unwrap_or_else(PoisonError::into_inner);
        dbs.get(&store_path(dir, name)).cloned()
    }

    fn db_or_create(&self, dir: &Path, name: &str) -> SharedDb {
        let mut dbs = self.dbs.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(dbs.entry(store_path(dir, name)).or_default())
    }

    /// Create (or extend) a store with the given records
    pub fn seed<I>(&self, dir: &Path, name: &str, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let db = self.db_or_create(dir, name);
        lock(&db).records.extend(records);
    }

    /// Arm a fault on a store, creating the store if needed
    pub fn inject(&self, dir: &Path, name: &str, fault: Fault) {
        let db = self.db_or_create(dir, name);
        lock(&db).faults.push(fault);
    }

    /// Committed records of a store in key order
    pub fn records(&self, dir: &Path, name: &str) -> Option<Vec<Record>> {
        self.db(dir, name).map(|db| {
            lock(&db)
                .records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// Keys of every successful commit, in commit order
    pub fn commit_log(&self, dir: &Path, name: &str) -> Vec<Vec<Vec<u8>>> {
        self.db(dir, name)
            .map(|db| lock(&db).commit_log.clone())
            .unwrap_or_default()
    }

    /// Number of records handed out by iterators of a store
    pub fn yielded(&self, dir: &Path, name: &str) -> u64 {
        self.db(dir, name).map(|db| lock(&db).yielded).unwrap_or(0)
    }

    /// Whether a handle to the store is currently open
    pub fn is_open(&self, dir: &Path, name: &str) -> bool {
        self.db(dir, name).map(|db| lock(&db).open).unwrap_or(false)
    }
}

impl fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider").finish()
    }
}

impl StoreProvider for MemoryProvider {
    fn open(
        &self,
        name: &str,
        kind: BackendKind,
        dir: &Path,
        mode: OpenMode,
    ) -> StoreResult<Box<dyn KvStore>> {
        let path = store_path(dir, name);
        let db = match mode {
            OpenMode::ReadOnly => self
                .db(dir, name)
                .ok_or_else(|| StoreError::NotFound(path.clone()))?,
            OpenMode::ReadWrite => self.db_or_create(dir, name),
        };

        {
            let mut guard = lock(&db);
            if guard.has_fault(Fault::Open) {
                return Err(StoreError::injected(format!("open {}", path.display())));
            }
            if guard.open {
                return Err(StoreError::Locked(path));
            }
            guard.open = true;
        }

        Ok(Box::new(MemoryStore {
            name: name.to_string(),
            kind,
            db,
        }))
    }

    fn exists(&self, name: &str, _kind: BackendKind, dir: &Path) -> bool {
        self.db(dir, name).is_some()
    }
}

struct MemoryStore {
    name: String,
    kind: BackendKind,
    db: SharedDb,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").field("name", &self.name).finish()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        lock(&self.db).open = false;
    }
}

impl KvStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn iter(&self) -> StoreResult<RecordIter<'_>> {
        let snapshot: Vec<Record> = {
            let guard = lock(&self.db);
            if guard.has_fault(Fault::Iterator) {
                return Err(StoreError::injected(format!("iterator on {}", self.name)));
            }
            guard
                .records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        Ok(Box::new(MemoryIter {
            db: Arc::clone(&self.db),
            records: snapshot.into_iter(),
        }))
    }

    fn new_batch(&self) -> Box<dyn WriteBatch + '_> {
        Box::new(MemoryBatch {
            db: &self.db,
            pending: Vec::new(),
        })
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        if lock(&self.db).has_fault(Fault::Close) {
            return Err(StoreError::injected(format!("close {}", self.name)));
        }
        Ok(())
    }
}

struct MemoryIter {
    db: SharedDb,
    records: std::vec::IntoIter<Record>,
}

impl Iterator for MemoryIter {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let mut guard = lock(&self.db);
        guard.yielded += 1;
        if guard.has_fault(Fault::ReadAt(guard.yielded)) {
            return Some(Err(StoreError::injected(format!(
                "read of record {}",
                guard.yielded
            ))));
        }
        Some(Ok(record))
    }
}

struct MemoryBatch<'a> {
    db: &'a SharedDb,
    pending: Vec<Record>,
}

impl WriteBatch for MemoryBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let mut guard = lock(self.db);
        guard.sets += 1;
        if guard.has_fault(Fault::SetAt(guard.sets)) {
            return Err(StoreError::injected(format!("set number {}", guard.sets)));
        }
        drop(guard);

        self.pending.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn write_sync(self: Box<Self>) -> StoreResult<()> {
        let mut guard = lock(self.db);
        guard.commits_attempted += 1;
        if guard.has_fault(Fault::CommitAt(guard.commits_attempted)) {
            return Err(StoreError::injected(format!(
                "commit number {}",
                guard.commits_attempted
            )));
        }

        let keys = self.pending.iter().map(|(k, _)| k.clone()).collect();
        guard.records.extend(self.pending);
        guard.commit_log.push(keys);
        Ok(())
    }
}
