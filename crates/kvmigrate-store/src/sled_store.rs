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

//! sled-backed store handle
//!
//! Records live in the default tree of a sled database directory. Batches are
//! applied atomically with `apply_batch` and made durable with `flush`.
//!
//! sled has no read-only mode: opening a database runs recovery and may write
//! a new snapshot, and dropping it flushes. A read-only handle therefore
//! opens a private copy of the database made in a scratch directory, and the
//! copy is deleted when the handle is closed.

use crate::{BackendKind, KvStore, OpenMode, RecordIter, StoreError, StoreResult, WriteBatch};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Message sled uses when the database file lock is held elsewhere
const LOCK_CONFLICT: &str = "could not acquire lock";

/// Store handle over a sled database
pub struct SledStore {
    name: String,
    path: PathBuf,
    db: sled::Db,
    // Must be dropped after `db`.
    snapshot: Option<TempDir>,
}

impl SledStore {
    /// Open the sled database at `path`
    ///
    /// Read-only handles copy the database into the system temporary
    /// directory; see [`open_in`](SledStore::open_in).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a missing database opened
    /// read-only, [`StoreError::Locked`] when another handle holds it.
    pub fn open(name: &str, path: &Path, mode: OpenMode) -> StoreResult<Self> {
        Self::open_in(name, path, mode, &std::env::temp_dir())
    }

    /// Open the sled database at `path`, placing read-only copies under
    /// `scratch`
    pub fn open_in(name: &str, path: &Path, mode: OpenMode, scratch: &Path) -> StoreResult<Self> {
        let (db, snapshot) = match mode {
            OpenMode::ReadOnly => {
                if !path.exists() {
                    return Err(StoreError::NotFound(path.to_path_buf()));
                }
                let copy = tempfile::Builder::new()
                    .prefix(&format!(".{name}-source-"))
                    .tempdir_in(scratch)?;
                copy_tree(path, copy.path())?;
                debug!(store = name, copy = %copy.path().display(), "copied sled store for reading");
                (open_db(copy.path())?, Some(copy))
            }
            OpenMode::ReadWrite => (open_db(path)?, None),
        };

        debug!(store = name, path = %path.display(), ?mode, "opened sled store");
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            db,
            snapshot,
        })
    }
}

fn open_db(path: &Path) -> StoreResult<sled::Db> {
    // Batches are flushed explicitly, so no background flusher is needed.
    sled::Config::new()
        .path(path)
        .flush_every_ms(None)
        .open()
        .map_err(|err| {
            if is_lock_conflict(&err) {
                StoreError::Locked(path.to_path_buf())
            } else {
                StoreError::from(err)
            }
        })
}

fn is_lock_conflict(err: &sled::Error) -> bool {
    matches!(err, sled::Error::Io(source) if source.to_string().contains(LOCK_CONFLICT))
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

impl fmt::Debug for SledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("copy", &self.snapshot.as_ref().map(TempDir::path))
            .finish()
    }
}

impl KvStore for SledStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sled
    }

    fn iter(&self) -> StoreResult<RecordIter<'_>> {
        Ok(Box::new(self.db.iter().map(|item| {
            item.map(|(key, value)| (key.to_vec(), value.to_vec()))
                .map_err(StoreError::from)
        })))
    }

    fn new_batch(&self) -> Box<dyn WriteBatch + '_> {
        Box::new(SledBatch {
            db: &self.db,
            batch: sled::Batch::default(),
            len: 0,
        })
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        let SledStore {
            name, db, snapshot, ..
        } = *self;

        match snapshot {
            None => {
                db.flush()?;
            }
            Some(copy) => {
                drop(db);
                copy.close()?;
            }
        }

        debug!(store = %name, "closed sled store");
        Ok(())
    }
}

struct SledBatch<'a> {
    db: &'a sled::Db,
    batch: sled::Batch,
    len: usize,
}

impl WriteBatch for SledBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.batch.insert(key, value);
        self.len += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn write_sync(self: Box<Self>) -> StoreResult<()> {
        let SledBatch { db, batch, .. } = *self;
        db.apply_batch(batch)?;
        db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn seed(path: &Path, records: &[(&[u8], &[u8])]) {
        let store = SledStore::open("state", path, OpenMode::ReadWrite).unwrap();
        let mut batch = store.new_batch();
        for (key, value) in records {
            batch.set(key, value).unwrap();
        }
        batch.write_sync().unwrap();
        Box::new(store).close().unwrap();
    }

    fn file_bytes(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    files.insert(path.clone(), fs::read(&path).unwrap());
                }
            }
        }
        files
    }

    #[test]
    fn test_read_only_open_of_missing_store_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");

        let err = SledStore::open("state", &path, OpenMode::ReadOnly).unwrap_err();
        assert!(err.is_not_found());
        assert!(!path.exists(), "read-only open must not create the store");
    }

    #[test]
    fn test_batch_commit_and_ordered_iteration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = SledStore::open("state", &path, OpenMode::ReadWrite).unwrap();

        let mut batch = store.new_batch();
        batch.set(b"b", b"2").unwrap();
        batch.set(b"a", b"1").unwrap();
        batch.set(b"c", b"3").unwrap();
        assert_eq!(batch.len(), 3);
        batch.write_sync().unwrap();

        let records: Vec<_> = store.iter().unwrap().map(Result::unwrap).collect();
        assert_eq!(
            records,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
            ]
        );
        Box::new(store).close().unwrap();
    }

    #[test]
    fn test_reopen_read_only_sees_committed_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.db");
        seed(&path, &[(&[0x00, 0xff], &[])]);

        let store = SledStore::open("evidence", &path, OpenMode::ReadOnly).unwrap();
        let records: Vec<_> = store.iter().unwrap().map(Result::unwrap).collect();
        assert_eq!(records, vec![(vec![0x00, 0xff], vec![])]);
        Box::new(store).close().unwrap();
    }

    #[test]
    fn test_read_only_handle_leaves_source_bytes_untouched() {
        let dir = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let path = dir.path().join("state.db");
        seed(&path, &[(b"height", b"42"), (b"app_hash", b"abcd")]);
        let before = file_bytes(dir.path());

        let store = SledStore::open_in("state", &path, OpenMode::ReadOnly, scratch.path()).unwrap();
        assert_eq!(store.iter().unwrap().count(), 2);
        Box::new(store).close().unwrap();

        assert_eq!(file_bytes(dir.path()), before);
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0, "copy must be removed");
    }

    #[test]
    fn test_second_open_reports_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let first = SledStore::open("state", &path, OpenMode::ReadWrite).unwrap();

        let err = SledStore::open("state", &path, OpenMode::ReadWrite).unwrap_err();
        assert!(matches!(err, StoreError::Locked(ref p) if p == &path), "{err:?}");

        Box::new(first).close().unwrap();
        SledStore::open("state", &path, OpenMode::ReadWrite).unwrap();
    }
}
