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

//! Migration run configuration

use kvmigrate_store::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Records per committed batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Progress timer interval unless configured otherwise
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1_000;

/// Log levels accepted by `log_level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log formats accepted by `log_format`
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Settings of one migration run
///
/// Every field has a default, so a configuration file only needs to name
/// what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// Live data directory of the node
    pub data_dir: PathBuf,

    /// Engine the existing stores were written with
    pub source_backend: BackendKind,

    /// Directory the migrated stores are written to before the swap
    pub staging_dir: PathBuf,

    /// Records per committed batch
    pub batch_size: usize,

    /// Interval of timer-driven progress updates
    pub progress_interval_ms: u64,

    /// Compare every migrated store against its source
    pub verify: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (pretty, compact, json)
    pub log_format: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        let home = node_home();
        Self {
            data_dir: home.join("data"),
            source_backend: BackendKind::Sled,
            staging_dir: home.join("data_migration"),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            verify: false,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// `$HOME/.cometbft`, or `.cometbft` when no home directory is known
pub fn node_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".cometbft")
}
