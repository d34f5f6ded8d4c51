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

//! Migration error taxonomy
//!
//! Every variant is fatal to the run. The display text names the failing
//! operation and the store or path; the underlying cause is exposed through
//! [`std::error::Error::source`].

use kvmigrate_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors that abort a migration run
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Source or destination store could not be opened
    #[error("open {store}")]
    Open {
        /// Store being opened
        store: String,
        /// Engine failure
        source: StoreError,
    },

    /// The source iterator could not be created or failed while advancing
    #[error("iterator over {store}")]
    Iterator {
        /// Store being read
        store: String,
        /// Engine failure
        source: StoreError,
    },

    /// Adding a record to the pending batch failed
    #[error("batch set in {store}")]
    BatchWrite {
        /// Store being written
        store: String,
        /// Engine failure
        source: StoreError,
    },

    /// Durable flush of a batch failed
    #[error("commit batch in {store}")]
    Commit {
        /// Store being written
        store: String,
        /// Engine failure
        source: StoreError,
    },

    /// Releasing a store handle failed
    ///
    /// Closing the destination is its last durable flush; closing a sled
    /// source removes the private copy it was read from.
    #[error("close {store}")]
    Close {
        /// Store being closed
        store: String,
        /// Engine failure
        source: StoreError,
    },

    /// Staging, swap or cleanup directory operation failed
    #[error("{op} {}", .path.display())]
    Directory {
        /// Operation that failed (`create`, `remove`, `rename`, `read`)
        op: &'static str,
        /// Offending path
        path: PathBuf,
        /// OS failure
        source: io::Error,
    },

    /// Reading the operator's answer failed
    #[error("read operator confirmation")]
    Prompt(#[source] io::Error),

    /// The staged copy does not match its source
    #[error("verification of {store} failed: {reason}")]
    Verification {
        /// Store being verified
        store: String,
        /// First difference found
        reason: String,
    },

    /// The blocking copy worker did not finish
    #[error("migration worker for {store} stopped: {reason}")]
    Worker {
        /// Store being migrated
        store: String,
        /// Panic or cancellation description
        reason: String,
    },

    /// A store migration failed; the run stops here
    #[error("failed to migrate {store} database")]
    Store {
        /// Store whose migration failed
        store: String,
        /// What went wrong
        source: Box<MigrationError>,
    },

    /// A run report could not be encoded or decoded
    #[error("run report {}", .path.display())]
    Report {
        /// Report file
        path: PathBuf,
        /// JSON failure
        source: serde_json::Error,
    },

    /// The orchestrator already failed and cannot be resumed
    #[error("migration run already failed")]
    RunFailed,
}

impl MigrationError {
    /// Wrap a per-store failure
    pub fn store<S: Into<String>>(store: S, err: MigrationError) -> Self {
        MigrationError::Store {
            store: store.into(),
            source: Box::new(err),
        }
    }

    /// Build a directory error for `op` on `path`
    pub fn directory<P: Into<PathBuf>>(op: &'static str, path: P, source: io::Error) -> Self {
        MigrationError::Directory {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from migrating a store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, MigrationError::Store { .. })
    }
}
