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

//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{MigrateConfig, LOG_FORMATS, LOG_LEVELS};
use kvmigrate_store::TARGET_BACKEND;
use std::path::{Path, PathBuf};

/// Trait for validating configuration
pub trait Validator {
    /// Check every setting, returning the first problem found
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for MigrateConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("data_dir"));
        }

        if self.staging_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("staging_dir"));
        }

        if directories_overlap(&self.data_dir, &self.staging_dir) {
            return Err(ConfigError::OverlappingDirectories {
                staging_dir: self.staging_dir.clone(),
                data_dir: self.data_dir.clone(),
            });
        }

        if self.source_backend == TARGET_BACKEND {
            return Err(ConfigError::SourceIsTarget(self.source_backend));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "batch_size",
                "must be greater than 0",
            ));
        }

        if self.progress_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "progress_interval_ms",
                "must be greater than 0",
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }
}

/// Whether either directory is, or lies inside, the other
///
/// Both paths are compared in resolved form, so relative spellings and
/// symlinked ancestors cannot hide an overlap.
fn directories_overlap(data_dir: &Path, staging_dir: &Path) -> bool {
    let data_dir = resolve(data_dir);
    let staging_dir = resolve(staging_dir);
    staging_dir.starts_with(&data_dir) || data_dir.starts_with(&staging_dir)
}

/// Absolute form of `path` whose longest existing ancestor is canonicalized
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, part| resolved.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}
