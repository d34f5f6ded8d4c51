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

//! Provider that opens real on-disk engines

use crate::{
    store_path, BackendKind, FjallStore, KvStore, OpenMode, RedbStore, SledStore, StoreProvider,
    StoreResult,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens stores with the engine matching their [`BackendKind`]
#[derive(Debug, Clone, Default)]
pub struct EngineProvider {
    scratch_dir: Option<PathBuf>,
}

impl EngineProvider {
    /// Create a new engine provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the private copies made for read-only sled handles under `dir`
    /// instead of the system temporary directory
    ///
    /// `dir` must exist whenever a sled store is opened read-only.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

impl StoreProvider for EngineProvider {
    fn open(
        &self,
        name: &str,
        kind: BackendKind,
        dir: &Path,
        mode: OpenMode,
    ) -> StoreResult<Box<dyn KvStore>> {
        let path = store_path(dir, name);
        info!(store = name, backend = %kind, path = %path.display(), ?mode, "opening store");

        let store: Box<dyn KvStore> = match kind {
            BackendKind::Sled => match &self.scratch_dir {
                Some(scratch) => Box::new(SledStore::open_in(name, &path, mode, scratch)?),
                None => Box::new(SledStore::open(name, &path, mode)?),
            },
            BackendKind::Redb => Box::new(RedbStore::open(name, &path, mode)?),
            BackendKind::Fjall => Box::new(FjallStore::open(name, &path, mode)?),
        };
        Ok(store)
    }

    fn exists(&self, name: &str, _kind: BackendKind, dir: &Path) -> bool {
        store_path(dir, name).exists()
    }
}
