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

//! Command-line arguments and their layering over the configuration

use anyhow::{Context, Result};
use clap::Parser;
use kvmigrate_config::{ConfigLoader, MigrateConfig, Validator};
use kvmigrate_store::BackendKind;
use std::path::PathBuf;

/// Command-line arguments of the kvmigrate binary
#[derive(Parser, Debug)]
#[command(name = "kvmigrate")]
#[command(version, about = "Migrate a node's key-value stores to a new storage engine")]
#[command(
    long_about = "Copies the blockstore, state, tx_index and evidence stores (and the light \
client store when present) from the data directory into a staging directory using the \
new engine. After you confirm a backup exists, the migrated stores replace the originals."
)]
pub struct Cli {
    /// Live data directory [default: $HOME/.cometbft/data]
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Engine the existing stores were written with (sled, redb)
    #[arg(long, value_name = "BACKEND")]
    pub source_backend: Option<BackendKind>,

    /// Directory migrated stores are written to before the swap
    /// [default: $HOME/.cometbft/data_migration]
    #[arg(long, value_name = "PATH")]
    pub staging_dir: Option<PathBuf>,

    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(short, long, value_name = "FILE", env = "KVMIGRATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Records per committed batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Interval between progress updates in milliseconds
    #[arg(long, value_name = "MS")]
    pub progress_interval_ms: Option<u64>,

    /// Compare every migrated store against its source before the swap
    #[arg(long)]
    pub verify: bool,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Answer yes to the backup question
    #[arg(short, long)]
    pub yes: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log format (pretty, compact, json)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Build the effective configuration: defaults, file, environment, flags
    pub async fn resolve_config(&self) -> Result<MigrateConfig> {
        let mut config = ConfigLoader::without_validation()
            .load_with_overrides(self.config.as_deref())
            .await
            .context("load configuration")?;

        self.apply_to(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Overwrite `config` with every flag that was given
    pub fn apply_to(&self, config: &mut MigrateConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(kind) = self.source_backend {
            config.source_backend = kind;
        }
        if let Some(dir) = &self.staging_dir {
            config.staging_dir.clone_from(dir);
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(ms) = self.progress_interval_ms {
            config.progress_interval_ms = ms;
        }
        if self.verify {
            config.verify = true;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        if let Some(format) = &self.log_format {
            config.log_format.clone_from(format);
        }
    }
}
