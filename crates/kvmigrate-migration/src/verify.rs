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

//! Integrity verification for migrated stores
//!
//! After a store is copied, the verifier re-opens the source and the staged
//! destination and walks both in key order side by side. Every pair must be
//! identical and both sides must end together. A SHA-256 digest over the
//! length-framed record stream is reported for the audit trail.

use crate::error::{MigrationError, MigrationResult};
use crate::migrator::close_both;
use kvmigrate_store::{BackendKind, KvStore, OpenMode, Record, StoreProvider, TARGET_BACKEND};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Result of verifying one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Store name
    pub store: String,
    /// Records compared
    pub records: u64,
    /// SHA-256 of the record stream (hex encoded)
    pub digest: String,
}

/// Running SHA-256 over a sequence of records
///
/// Each key and value is prefixed with its big-endian `u64` length so that
/// different splits of the same bytes hash differently.
#[derive(Default)]
pub struct StreamDigest {
    hasher: Sha256,
}

impl StreamDigest {
    /// Start an empty digest
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record
    pub fn update(&mut self, key: &[u8], value: &[u8]) {
        self.hasher.update((key.len() as u64).to_be_bytes());
        self.hasher.update(key);
        self.hasher.update((value.len() as u64).to_be_bytes());
        self.hasher.update(value);
    }

    /// Hex-encoded digest of everything fed so far
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compares a source store with its migrated copy
#[derive(Clone)]
pub struct RecordVerifier {
    provider: Arc<dyn StoreProvider>,
}

impl RecordVerifier {
    /// Create a verifier opening stores through `provider`
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }

    /// Verify `store` on a blocking worker
    pub async fn verify_store(
        &self,
        store: &str,
        source_dir: &Path,
        source_kind: BackendKind,
        destination_dir: &Path,
    ) -> MigrationResult<VerificationReport> {
        let verifier = self.clone();
        let name = store.to_string();
        let source_dir: PathBuf = source_dir.to_path_buf();
        let destination_dir: PathBuf = destination_dir.to_path_buf();

        tokio::task::spawn_blocking(move || {
            verifier.verify(&name, &source_dir, source_kind, &destination_dir)
        })
        .await
        .unwrap_or_else(|err| {
            Err(MigrationError::Worker {
                store: store.to_string(),
                reason: err.to_string(),
            })
        })
    }

    /// Verify `store` on the calling thread
    ///
    /// # Errors
    ///
    /// [`MigrationError::Verification`] names the first difference found;
    /// open and iteration failures are reported as for a migration.
    pub fn verify(
        &self,
        store: &str,
        source_dir: &Path,
        source_kind: BackendKind,
        destination_dir: &Path,
    ) -> MigrationResult<VerificationReport> {
        let open_err = |source| MigrationError::Open {
            store: store.to_string(),
            source,
        };

        let source = self
            .provider
            .open(store, source_kind, source_dir, OpenMode::ReadOnly)
            .map_err(open_err)?;
        let destination = self
            .provider
            .open(store, TARGET_BACKEND, destination_dir, OpenMode::ReadOnly)
            .map_err(open_err)?;

        let compared = compare(store, source.as_ref(), destination.as_ref());
        let closed = close_both(store, destination, source);
        let (records, digest) = compared?;
        closed?;

        info!(store, records, digest = %digest, "verified migrated store");
        Ok(VerificationReport {
            store: store.to_string(),
            records,
            digest,
        })
    }
}

/// Walk both stores in lockstep, returning the record count and digest
fn compare(
    store: &str,
    source: &dyn KvStore,
    destination: &dyn KvStore,
) -> MigrationResult<(u64, String)> {
    let iter_err = |source| MigrationError::Iterator {
        store: store.to_string(),
        source,
    };
    let mismatch = |reason: String| MigrationError::Verification {
        store: store.to_string(),
        reason,
    };

    let mut expected = source.iter().map_err(iter_err)?;
    let mut actual = destination.iter().map_err(iter_err)?;
    let mut digest = StreamDigest::new();
    let mut records: u64 = 0;

    loop {
        let left: Option<Record> = expected.next().transpose().map_err(iter_err)?;
        let right: Option<Record> = actual.next().transpose().map_err(iter_err)?;

        match (left, right) {
            (None, None) => break,
            (Some((key, _)), None) => {
                return Err(mismatch(format!(
                    "destination is missing key {} (after {records} records)",
                    hex::encode(key)
                )))
            }
            (None, Some((key, _))) => {
                return Err(mismatch(format!(
                    "destination has extra key {}",
                    hex::encode(key)
                )))
            }
            (Some((src_key, src_value)), Some((dst_key, dst_value))) => {
                if src_key != dst_key {
                    return Err(mismatch(format!(
                        "record {} differs: source key {} but destination key {}",
                        records + 1,
                        hex::encode(&src_key),
                        hex::encode(&dst_key)
                    )));
                }
                if src_value != dst_value {
                    return Err(mismatch(format!(
                        "value mismatch for key {}",
                        hex::encode(&src_key)
                    )));
                }
                digest.update(&src_key, &src_value);
                records += 1;
            }
        }
    }

    Ok((records, digest.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmigrate_store::mock::{Fault, MemoryProvider};

    fn record(key: &str, value: &str) -> Record {
        (key.as_bytes().to_vec(), value.as_bytes().to_vec())
    }

    fn setup(source: Vec<Record>, destination: Vec<Record>) -> (MemoryProvider, RecordVerifier) {
        let provider = MemoryProvider::new();
        provider.seed(Path::new("/data"), "state", source);
        provider.seed(Path::new("/staging"), "state", destination);
        let verifier = RecordVerifier::new(Arc::new(provider.clone()));
        (provider, verifier)
    }

    fn run(verifier: &RecordVerifier) -> MigrationResult<VerificationReport> {
        verifier.verify(
            "state",
            Path::new("/data"),
            BackendKind::Sled,
            Path::new("/staging"),
        )
    }

    #[test]
    fn test_empty_stream_digest() {
        // SHA-256 of the empty input
        assert_eq!(
            StreamDigest::new().finish(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_framing_distinguishes_splits() {
        let mut a = StreamDigest::new();
        a.update(b"ab", b"c");
        let mut b = StreamDigest::new();
        b.update(b"a", b"bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_identical_stores_pass() {
        let records = vec![record("a", "1"), record("b", "2")];
        let (_provider, verifier) = setup(records.clone(), records.clone());

        let report = run(&verifier).unwrap();
        assert_eq!(report.records, 2);

        let mut expected = StreamDigest::new();
        for (k, v) in &records {
            expected.update(k, v);
        }
        assert_eq!(report.digest, expected.finish());
    }

    #[test]
    fn test_missing_record_is_reported() {
        let (_provider, verifier) = setup(
            vec![record("a", "1"), record("b", "2")],
            vec![record("a", "1")],
        );
        let err = run(&verifier).unwrap_err();
        assert!(err.to_string().contains("missing key 62"));
    }

    #[test]
    fn test_value_mismatch_is_reported() {
        let (_provider, verifier) = setup(vec![record("a", "1")], vec![record("a", "2")]);
        let err = run(&verifier).unwrap_err();
        assert!(matches!(err, MigrationError::Verification { .. }));
        assert!(err.to_string().contains("value mismatch for key 61"));
    }

    #[test]
    fn test_extra_record_is_reported() {
        let (_provider, verifier) = setup(vec![], vec![record("z", "1")]);
        let err = run(&verifier).unwrap_err();
        assert!(err.to_string().contains("extra key 7a"));
    }

    #[test]
    fn test_handles_are_released() {
        let (provider, verifier) = setup(vec![record("a", "1")], vec![record("a", "1")]);
        run(&verifier).unwrap();
        assert!(!provider.is_open(Path::new("/data"), "state"));
        assert!(!provider.is_open(Path::new("/staging"), "state"));
    }

    #[test]
    fn test_close_failure_fails_verification() {
        let (provider, verifier) = setup(vec![record("a", "1")], vec![record("a", "1")]);
        provider.inject(Path::new("/data"), "state", Fault::Close);

        let err = run(&verifier).unwrap_err();
        assert!(matches!(err, MigrationError::Close { .. }));
        assert!(!provider.is_open(Path::new("/data"), "state"));
    }
}
