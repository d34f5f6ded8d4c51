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

//! Staging directory lifecycle and the final swap into the data directory

use crate::error::{MigrationError, MigrationResult};
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Entries handled by a confirmed swap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    /// Entries moved into the data directory
    pub moved: Vec<String>,
    /// Moved entries that replaced an existing one
    pub replaced: Vec<String>,
}

/// Create the staging directory and any missing parents
pub async fn create_staging(staging_dir: &Path) -> MigrationResult<()> {
    fs::create_dir_all(staging_dir)
        .await
        .map_err(|err| MigrationError::directory("create", staging_dir, err))?;
    info!(path = %staging_dir.display(), "staging directory ready");
    Ok(())
}

/// Remove the staging directory recursively; a missing directory is fine
pub async fn remove_staging(staging_dir: &Path) -> MigrationResult<()> {
    match fs::remove_dir_all(staging_dir).await {
        Ok(()) => {
            info!(path = %staging_dir.display(), "removed staging directory");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(MigrationError::directory("remove", staging_dir, err)),
    }
}

/// Move every top-level directory of `staging_dir` into `data_dir`
///
/// A same-named entry already in `data_dir` is removed first, so the staged
/// copy replaces it rather than merging with it. Plain files in the staging
/// directory are left where they are.
pub async fn swap_into(
    staging_dir: &Path,
    data_dir: &Path,
    output: &dyn ProgressSink,
) -> MigrationResult<SwapResult> {
    let mut entries = fs::read_dir(staging_dir)
        .await
        .map_err(|err| MigrationError::directory("read", staging_dir, err))?;

    let mut staged = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| MigrationError::directory("read", staging_dir, err))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|err| MigrationError::directory("read", entry.path(), err))?;
        if file_type.is_dir() {
            staged.push(entry.file_name());
        }
    }
    staged.sort();

    let mut result = SwapResult::default();
    for name in staged {
        let src = staging_dir.join(&name);
        let dst = data_dir.join(&name);
        let display_name = name.to_string_lossy().into_owned();

        if let Ok(existing) = fs::symlink_metadata(&dst).await {
            output.status(&format!("Replacing {}", dst.display()));
            let removed = if existing.is_dir() {
                fs::remove_dir_all(&dst).await
            } else {
                fs::remove_file(&dst).await
            };
            removed.map_err(|err| MigrationError::directory("remove", &dst, err))?;
            result.replaced.push(display_name.clone());
        }

        fs::rename(&src, &dst)
            .await
            .map_err(|err| MigrationError::directory("rename", &src, err))?;
        output.status(&format!("Moved {} -> {}", src.display(), dst.display()));
        info!(entry = %display_name, "moved staged entry into data directory");
        result.moved.push(display_name);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingSink;
    use std::fs as stdfs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_swap_replaces_instead_of_merging() {
        let root = tempdir().unwrap();
        let staging = root.path().join("staging");
        let data = root.path().join("data");
        stdfs::create_dir_all(staging.join("a.db")).unwrap();
        stdfs::create_dir_all(staging.join("b.db")).unwrap();
        stdfs::write(staging.join("a.db/new"), b"migrated").unwrap();
        stdfs::write(staging.join("b.db/new"), b"migrated").unwrap();
        stdfs::create_dir_all(data.join("a.db")).unwrap();
        stdfs::write(data.join("a.db/old"), b"legacy").unwrap();

        let sink = RecordingSink::default();
        let result = swap_into(&staging, &data, &sink).await.unwrap();

        assert_eq!(result.moved, vec!["a.db", "b.db"]);
        assert_eq!(result.replaced, vec!["a.db"]);
        assert!(!data.join("a.db/old").exists(), "old entry must be replaced");
        assert_eq!(stdfs::read(data.join("a.db/new")).unwrap(), b"migrated");
        assert_eq!(stdfs::read(data.join("b.db/new")).unwrap(), b"migrated");
        assert!(sink
            .events()
            .iter()
            .any(|e| e.starts_with("status Replacing")));
    }

    #[tokio::test]
    async fn test_swap_skips_plain_files() {
        let root = tempdir().unwrap();
        let staging = root.path().join("staging");
        let data = root.path().join("data");
        stdfs::create_dir_all(&staging).unwrap();
        stdfs::create_dir_all(&data).unwrap();
        stdfs::write(staging.join("LOCK"), b"").unwrap();

        let result = swap_into(&staging, &data, &RecordingSink::default())
            .await
            .unwrap();
        assert!(result.moved.is_empty());
        assert!(staging.join("LOCK").exists());
        assert!(!data.join("LOCK").exists());
    }

    #[tokio::test]
    async fn test_remove_staging_tolerates_missing_dir() {
        let root = tempdir().unwrap();
        let staging = root.path().join("never-created");
        remove_staging(&staging).await.unwrap();

        create_staging(&staging).await.unwrap();
        create_staging(&staging).await.unwrap();
        assert!(staging.is_dir());
        remove_staging(&staging).await.unwrap();
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_swap_from_missing_staging_fails_with_path() {
        let root = tempdir().unwrap();
        let staging = root.path().join("missing");
        let err = swap_into(&staging, root.path(), &RecordingSink::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("read "));
    }
}
