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

//! fjall-backed store handle
//!
//! fjall is the migration target. Each store is a keyspace directory holding a
//! single `records` partition. A batch commit writes through the keyspace
//! journal and is then persisted with [`PersistMode::SyncAll`].

use crate::{BackendKind, KvStore, OpenMode, RecordIter, StoreError, StoreResult, WriteBatch};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const PARTITION: &str = "records";

/// Store handle over a fjall keyspace
pub struct FjallStore {
    name: String,
    path: PathBuf,
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallStore {
    /// Open the fjall keyspace at `path`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a missing keyspace opened
    /// read-only; engine errors otherwise.
    pub fn open(name: &str, path: &Path, mode: OpenMode) -> StoreResult<Self> {
        if mode == OpenMode::ReadOnly && !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        debug!(store = name, path = %path.display(), "opened fjall store");
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            keyspace,
            partition,
        })
    }
}

impl fmt::Debug for FjallStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FjallStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl KvStore for FjallStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Fjall
    }

    fn iter(&self) -> StoreResult<RecordIter<'_>> {
        Ok(Box::new(self.partition.iter().map(|item| {
            item.map(|(key, value)| (key.to_vec(), value.to_vec()))
                .map_err(StoreError::from)
        })))
    }

    fn new_batch(&self) -> Box<dyn WriteBatch + '_> {
        Box::new(FjallBatch {
            keyspace: &self.keyspace,
            partition: &self.partition,
            batch: self.keyspace.batch(),
            len: 0,
        })
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(store = %self.name, "closed fjall store");
        Ok(())
    }
}

struct FjallBatch<'a> {
    keyspace: &'a Keyspace,
    partition: &'a PartitionHandle,
    batch: fjall::Batch,
    len: usize,
}

impl WriteBatch for FjallBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.batch.insert(self.partition, key, value);
        self.len += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn write_sync(self: Box<Self>) -> StoreResult<()> {
        let FjallBatch {
            keyspace, batch, ..
        } = *self;
        batch.commit()?;
        keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
