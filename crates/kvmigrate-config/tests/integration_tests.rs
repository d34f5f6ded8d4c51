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

//! Integration tests for configuration files on disk

use kvmigrate_config::{ConfigError, ConfigLoader};
use kvmigrate_store::BackendKind;
use std::path::PathBuf;
use tempfile::tempdir;

#[tokio::test]
async fn test_load_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("migrate.toml");
    std::fs::write(
        &path,
        r#"
data_dir = "/var/lib/node/data"
staging_dir = "/var/lib/node/data_migration"
source_backend = "redb"
progress_interval_ms = 250
verify = true
"#,
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.data_dir, PathBuf::from("/var/lib/node/data"));
    assert_eq!(config.source_backend, BackendKind::Redb);
    assert_eq!(config.progress_interval_ms, 250);
    assert!(config.verify);
}

#[tokio::test]
async fn test_load_yaml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("migrate.yml");
    std::fs::write(&path, "data_dir: /d\nstaging_dir: /s\nbatch_size: 64\n").unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.batch_size, 64);
}

#[tokio::test]
async fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = ConfigLoader::new()
        .load_file(dir.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("migrate.ini");
    std::fs::write(&path, "data_dir=/d").unwrap();

    let err = ConfigLoader::new().load_file(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
}

#[tokio::test]
async fn test_invalid_file_is_rejected_after_layering() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("migrate.json");
    std::fs::write(&path, r#"{"data_dir": "/n", "staging_dir": "/n/stage"}"#).unwrap();

    let err = ConfigLoader::new()
        .load_with_overrides(Some(&path))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::OverlappingDirectories { .. }));
}
