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

//! Store handle layer for kvmigrate
//!
//! This crate exposes the two capabilities the migration engine needs from an
//! embedded key-value engine, and nothing else:
//! - ordered, full-range iteration over `(key, value)` records
//! - batched writes that are made durable by a synchronous commit
//!
//! Supported engines:
//! - [`sled`](https://docs.rs/sled) (`sled`)
//! - [`redb`](https://docs.rs/redb) (`redb`)
//! - [`fjall`](https://docs.rs/fjall) (`fjall`), the migration target
//!
//! # Core Concepts
//!
//! - **Records**: opaque byte pairs; keys are ordered byte-lexicographically
//! - **Stores**: a logical name (`blockstore`, `state`, ...) opened under a
//!   directory; the store named `N` in directory `D` lives at `D/N.db`
//! - **Batches**: pending writes, consumed by [`WriteBatch::write_sync`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use kvmigrate_store::{BackendKind, EngineProvider, OpenMode, StoreProvider};
//! use std::path::Path;
//!
//! fn main() -> Result<(), kvmigrate_store::StoreError> {
//!     let provider = EngineProvider::new();
//!     let store = provider.open("state", BackendKind::Fjall, Path::new("/tmp/data"), OpenMode::ReadWrite)?;
//!
//!     let mut batch = store.new_batch();
//!     batch.set(b"height", b"42")?;
//!     batch.write_sync()?;
//!
//!     for record in store.iter()? {
//!         let (key, value) = record?;
//!         println!("{:?} => {:?}", key, value);
//!     }
//!
//!     store.close()
//! }
//! ```

pub mod error;
pub mod fjall_store;
pub mod mock;
pub mod provider;
pub mod redb_store;
pub mod sled_store;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use error::{StoreError, StoreResult};
pub use fjall_store::FjallStore;
pub use provider::EngineProvider;
pub use redb_store::RedbStore;
pub use sled_store::SledStore;

/// A single key-value pair, both opaque byte sequences
pub type Record = (Vec<u8>, Vec<u8>);

/// Ordered iterator over every record of a store
pub type RecordIter<'a> = Box<dyn Iterator<Item = StoreResult<Record>> + 'a>;

/// Backend kind the migration always writes to
pub const TARGET_BACKEND: BackendKind = BackendKind::Fjall;

/// Storage engine backing a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// sled B-tree engine
    Sled,
    /// redb copy-on-write B-tree engine
    Redb,
    /// fjall LSM-tree engine
    Fjall,
}

impl BackendKind {
    /// Every supported backend kind
    pub const ALL: [BackendKind; 3] = [BackendKind::Sled, BackendKind::Redb, BackendKind::Fjall];

    /// Lowercase name used in configuration and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sled => "sled",
            BackendKind::Redb => "redb",
            BackendKind::Fjall => "fjall",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(BackendKind::Sled),
            "redb" => Ok(BackendKind::Redb),
            "fjall" => Ok(BackendKind::Fjall),
            other => Err(StoreError::UnsupportedBackend(format!(
                "{other} (expected one of: sled, redb, fjall)"
            ))),
        }
    }
}

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Never creates the store; a missing store is [`StoreError::NotFound`]
    ReadOnly,
    /// Creates the store when it does not exist yet
    ReadWrite,
}

/// On-disk location of the store `name` inside `dir`
pub fn store_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.db"))
}

/// An opened store instance
///
/// Handles are exclusive: opening the same store twice fails until the first
/// handle is closed or dropped.
pub trait KvStore: Send + Debug {
    /// Logical store name
    fn name(&self) -> &str;

    /// Engine backing this handle
    fn kind(&self) -> BackendKind;

    /// Iterate over every record in ascending key order
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a read. Errors hit while
    /// advancing are yielded as items.
    fn iter(&self) -> StoreResult<RecordIter<'_>>;

    /// Start an empty batch of pending writes
    fn new_batch(&self) -> Box<dyn WriteBatch + '_>;

    /// Flush and release the handle
    fn close(self: Box<Self>) -> StoreResult<()>;
}

/// Pending writes against one store
///
/// Nothing added to a batch is visible or durable until
/// [`write_sync`](WriteBatch::write_sync) returns `Ok`.
pub trait WriteBatch {
    /// Queue a record
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Number of queued records
    fn len(&self) -> usize;

    /// Whether nothing is queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit every queued record and flush it to stable storage
    ///
    /// Consumes the batch; a fresh one must be started afterwards.
    fn write_sync(self: Box<Self>) -> StoreResult<()>;
}

/// Opens stores by name, backend kind and directory
pub trait StoreProvider: Send + Sync + Debug {
    /// Open the store `name` under `dir`
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] when opening read-only and no store exists
    /// - [`StoreError::Locked`] when the store is already open
    /// - engine errors for corrupt or unreadable stores
    fn open(
        &self,
        name: &str,
        kind: BackendKind,
        dir: &Path,
        mode: OpenMode,
    ) -> StoreResult<Box<dyn KvStore>>;

    /// Whether the store `name` exists under `dir`
    fn exists(&self, name: &str, kind: BackendKind, dir: &Path) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_round_trips_through_str() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!(" Sled ".parse::<BackendKind>().unwrap(), BackendKind::Sled);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = "goleveldb".parse::<BackendKind>().unwrap_err();
        assert!(err.to_string().contains("goleveldb"));
    }

    #[test]
    fn store_path_appends_db_suffix() {
        let path = store_path(Path::new("/var/data"), "tx_index");
        assert_eq!(path, PathBuf::from("/var/data/tx_index.db"));
    }

    #[test]
    fn traits_are_object_safe() {
        fn _check_store(_: &dyn KvStore) {}
        fn _check_batch(_: &dyn WriteBatch) {}
        fn _check_provider(_: &dyn StoreProvider) {}
    }
}
