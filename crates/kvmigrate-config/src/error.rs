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

//! Errors raised while loading or validating a migration configuration

use kvmigrate_store::BackendKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("Failed to read configuration file {}", .path.display())]
    Read {
        /// Configuration file
        path: PathBuf,
        /// OS failure
        source: io::Error,
    },

    /// TOML syntax or schema error
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML syntax or schema error
    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax or schema error
    #[error("Failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension names no supported format
    #[error("Unsupported configuration format: {0}. Supported formats: toml, yaml, json")]
    UnsupportedFormat(String),

    /// The configuration file has no extension to pick a format from
    #[error("Configuration file {} has no extension", .0.display())]
    MissingExtension(PathBuf),

    /// No configuration file at the given path
    #[error("Configuration file not found at path: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A `KVMIGRATE_*` variable holds an unusable value
    #[error("Invalid environment variable {variable}={value}: {reason}")]
    InvalidEnvVar {
        /// Full variable name
        variable: String,
        /// Raw value
        value: String,
        /// Expected form
        reason: String,
    },

    /// A directory setting is empty
    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    /// One directory contains the other
    ///
    /// Cleanup removes the whole staging directory, so it may neither hold
    /// nor sit inside the live data.
    #[error(
        "staging directory {} overlaps data directory {}",
        .staging_dir.display(),
        .data_dir.display()
    )]
    OverlappingDirectories {
        /// Configured staging directory
        staging_dir: PathBuf,
        /// Configured data directory
        data_dir: PathBuf,
    },

    /// The source stores already use the target engine
    #[error("source backend {0} is already the migration target")]
    SourceIsTarget(BackendKind),

    /// Any other out-of-range setting
    #[error("Invalid configuration value for field '{field}': {reason}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// Accepted values
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`InvalidEnvVar`](ConfigError::InvalidEnvVar) error
    pub fn invalid_env_var(
        variable: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidEnvVar {
            variable: variable.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`InvalidValue`](ConfigError::InvalidValue) error
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_names_both_directories() {
        let err = ConfigError::OverlappingDirectories {
            staging_dir: PathBuf::from("/node/data/stage"),
            data_dir: PathBuf::from("/node/data"),
        };
        assert_eq!(
            err.to_string(),
            "staging directory /node/data/stage overlaps data directory /node/data"
        );
    }

    #[test]
    fn test_source_is_target_display() {
        let err = ConfigError::SourceIsTarget(BackendKind::Fjall);
        assert_eq!(err.to_string(), "source backend fjall is already the migration target");
    }
}
