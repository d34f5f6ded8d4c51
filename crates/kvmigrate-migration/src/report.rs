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

//! Run report with JSON persistence
//!
//! The orchestrator fills a [`RunReport`] as stores complete. The CLI writes
//! it out with `--report` so an operator has a record of what was migrated.

use crate::error::{MigrationError, MigrationResult};
use crate::migrator::MigrationSummary;
use crate::staging::SwapResult;
use chrono::{DateTime, Utc};
use kvmigrate_store::{BackendKind, TARGET_BACKEND};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Summary of a whole migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Live data directory
    pub data_dir: PathBuf,

    /// Staging directory
    pub staging_dir: PathBuf,

    /// Engine the stores were read from
    pub source_backend: BackendKind,

    /// Engine the stores were written to
    pub target_backend: BackendKind,

    /// Run start timestamp
    pub started_at: DateTime<Utc>,

    /// Run end timestamp, unset while running or after a failure
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-store results in migration order
    pub stores: Vec<StoreReport>,

    /// What happened to the staged copy
    pub swap: SwapOutcome,
}

/// Result of migrating one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReport {
    /// Store name
    pub name: String,
    /// Records copied
    pub records: u64,
    /// Batches committed
    pub commits: usize,
    /// Copy duration in milliseconds
    pub elapsed_ms: u64,
    /// Verification digest, when verification ran
    pub digest: Option<String>,
}

/// Final disposition of the staging directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwapOutcome {
    /// The run has not reached the confirmation yet
    #[default]
    Pending,

    /// The operator confirmed and the staged stores were moved in
    Confirmed {
        /// Entries moved
        moved: Vec<String>,
        /// Entries that replaced an existing one
        replaced: Vec<String>,
    },

    /// The operator declined; the data directory was left alone
    Declined,
}

impl From<SwapResult> for SwapOutcome {
    fn from(result: SwapResult) -> Self {
        SwapOutcome::Confirmed {
            moved: result.moved,
            replaced: result.replaced,
        }
    }
}

impl RunReport {
    /// Start a report for a run over `data_dir`
    pub fn new(data_dir: PathBuf, staging_dir: PathBuf, source_backend: BackendKind) -> Self {
        Self {
            data_dir,
            staging_dir,
            source_backend,
            target_backend: TARGET_BACKEND,
            started_at: Utc::now(),
            finished_at: None,
            stores: Vec::new(),
            swap: SwapOutcome::Pending,
        }
    }

    /// Record a migrated store
    pub fn record_store(&mut self, summary: &MigrationSummary, digest: Option<String>) {
        self.stores.push(StoreReport {
            name: summary.store.clone(),
            records: summary.records,
            commits: summary.commits,
            elapsed_ms: summary.elapsed.as_millis() as u64,
            digest,
        });
    }

    /// Mark the run finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total records copied across all stores
    pub fn total_records(&self) -> u64 {
        self.stores.iter().map(|s| s.records).sum()
    }

    /// Save the report as pretty JSON
    pub async fn save(&self, path: &Path) -> MigrationResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| MigrationError::Report {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| MigrationError::directory("create", parent, err))?;
        }

        fs::write(path, json)
            .await
            .map_err(|err| MigrationError::directory("write", path, err))
    }

    /// Load a report saved by [`save`](RunReport::save)
    pub async fn load(path: &Path) -> MigrationResult<Self> {
        let json = fs::read_to_string(path)
            .await
            .map_err(|err| MigrationError::directory("read", path, err))?;

        serde_json::from_str(&json).map_err(|source| MigrationError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}
