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

//! redb-backed store handle
//!
//! A redb store is a single file with one `records` table. Reads are served
//! in fixed-size chunks, each from its own read transaction, so the iterator
//! owns no borrowed table state. Writes are buffered by the batch and applied
//! in one write transaction on commit.

use crate::{
    BackendKind, KvStore, OpenMode, Record, RecordIter, StoreError, StoreResult, WriteBatch,
};
use redb::{Database, DatabaseError, TableDefinition, TableError};
use std::collections::VecDeque;
use std::fmt;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::debug;

const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// Records fetched per read transaction while iterating
const READ_CHUNK: usize = 1024;

fn redb_err<E: fmt::Display>(err: E) -> StoreError {
    StoreError::engine("redb", err)
}

/// Store handle over a redb database file
pub struct RedbStore {
    name: String,
    path: PathBuf,
    db: Database,
}

impl RedbStore {
    /// Open the redb database at `path`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a missing file opened read-only,
    /// [`StoreError::Locked`] if the file is already open.
    pub fn open(name: &str, path: &Path, mode: OpenMode) -> StoreResult<Self> {
        let opened = match mode {
            OpenMode::ReadOnly => {
                if !path.exists() {
                    return Err(StoreError::NotFound(path.to_path_buf()));
                }
                Database::open(path)
            }
            OpenMode::ReadWrite => Database::create(path),
        };

        let db = opened.map_err(|err| match err {
            DatabaseError::DatabaseAlreadyOpen => StoreError::Locked(path.to_path_buf()),
            other => redb_err(other),
        })?;

        debug!(store = name, path = %path.display(), "opened redb store");
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            db,
        })
    }
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl KvStore for RedbStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Redb
    }

    fn iter(&self) -> StoreResult<RecordIter<'_>> {
        // Fail early if a read transaction cannot be started at all.
        self.db.begin_read().map_err(redb_err)?;
        Ok(Box::new(ChunkedIter {
            db: &self.db,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn new_batch(&self) -> Box<dyn WriteBatch + '_> {
        Box::new(RedbBatch {
            db: &self.db,
            pending: Vec::new(),
        })
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        debug!(store = %self.name, "closed redb store");
        Ok(())
    }
}

struct ChunkedIter<'a> {
    db: &'a Database,
    after: Option<Vec<u8>>,
    buffer: VecDeque<Record>,
    exhausted: bool,
}

impl ChunkedIter<'_> {
    fn fill(&mut self) -> StoreResult<()> {
        let txn = self.db.begin_read().map_err(redb_err)?;
        let table = match txn.open_table(RECORDS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => {
                self.exhausted = true;
                return Ok(());
            }
            Err(err) => return Err(redb_err(err)),
        };

        let range = match &self.after {
            Some(last) => table.range::<&[u8]>((Bound::Excluded(last.as_slice()), Bound::Unbounded)),
            None => table.range::<&[u8]>(..),
        }
        .map_err(redb_err)?;

        let mut chunk = Vec::with_capacity(READ_CHUNK);
        for item in range.take(READ_CHUNK) {
            let (key, value) = item.map_err(redb_err)?;
            chunk.push((key.value().to_vec(), value.value().to_vec()));
        }

        if chunk.len() < READ_CHUNK {
            self.exhausted = true;
        }
        if let Some((last, _)) = chunk.last() {
            self.after = Some(last.clone());
        }
        self.buffer.extend(chunk);
        Ok(())
    }
}

impl Iterator for ChunkedIter<'_> {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

struct RedbBatch<'a> {
    db: &'a Database,
    pending: Vec<Record>,
}

impl WriteBatch for RedbBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.pending.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn write_sync(self: Box<Self>) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(redb_err)?;
            for (key, value) in &self.pending {
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(redb_err)?;
            }
        }
        txn.commit().map_err(redb_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded(path: &Path, count: usize) -> RedbStore {
        let store = RedbStore::open("state", path, OpenMode::ReadWrite).unwrap();
        let mut batch = store.new_batch();
        for i in 0..count {
            batch
                .set(format!("key-{i:06}").as_bytes(), &(i as u32).to_be_bytes())
                .unwrap();
        }
        batch.write_sync().unwrap();
        store
    }

    #[test]
    fn test_iteration_spans_multiple_chunks_in_order() {
        let dir = tempdir().unwrap();
        let store = seeded(&dir.path().join("state.db"), READ_CHUNK * 2 + 7);

        let keys: Vec<Vec<u8>> = store.iter().unwrap().map(|r| r.unwrap().0).collect();
        assert_eq!(keys.len(), READ_CHUNK * 2 + 7);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys[0], b"key-000000".to_vec());
    }

    #[test]
    fn test_iteration_of_exact_chunk_multiple() {
        let dir = tempdir().unwrap();
        let store = seeded(&dir.path().join("state.db"), READ_CHUNK);
        assert_eq!(store.iter().unwrap().count(), READ_CHUNK);
    }

    #[test]
    fn test_fresh_database_iterates_empty() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open("state", &dir.path().join("state.db"), OpenMode::ReadWrite)
            .unwrap();
        assert_eq!(store.iter().unwrap().count(), 0);
    }

    #[test]
    fn test_read_only_open_of_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = RedbStore::open("state", &dir.path().join("state.db"), OpenMode::ReadOnly)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
