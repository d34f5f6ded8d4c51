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

//! Single-store migration
//!
//! [`KvMigrator::migrate`] copies every record of one store from its source
//! engine into a fresh destination store of the target engine. Records are
//! streamed in source order into a batch that is committed durably every
//! `batch_size` records and once more at the end, even if empty.
//!
//! Engine calls are synchronous, so the copy loop runs on a blocking worker
//! while a [`ProgressReporter`] task renders progress. At each batch boundary
//! the worker hands the count to the reporter over a channel of capacity one
//! and may wait there until the reporter catches up.

use crate::error::{MigrationError, MigrationResult};
use crate::progress::{ProgressReporter, ProgressSink};
use kvmigrate_store::{BackendKind, KvStore, OpenMode, StoreProvider, TARGET_BACKEND};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Records per committed batch
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Interval between timer-driven progress renders
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one store migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Logical store name
    pub store: String,
    /// Records copied
    pub records: u64,
    /// Batches committed, including the final one
    pub commits: usize,
    /// Time spent copying
    pub elapsed: Duration,
}

/// Drives the migration of one store at a time
#[derive(Clone)]
pub struct KvMigrator {
    provider: Arc<dyn StoreProvider>,
    progress: Arc<dyn ProgressSink>,
    batch_size: usize,
    progress_interval: Duration,
}

impl KvMigrator {
    /// Create a migrator with the default batch size and progress interval
    pub fn new(provider: Arc<dyn StoreProvider>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            provider,
            progress,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set the number of records per committed batch (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the timer interval of the progress reporter
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Records per committed batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Provider used to open stores
    pub fn provider(&self) -> Arc<dyn StoreProvider> {
        Arc::clone(&self.provider)
    }

    /// Operator-facing output
    pub fn progress(&self) -> Arc<dyn ProgressSink> {
        Arc::clone(&self.progress)
    }

    /// Copy every record of `store` from `source_dir` into `destination_dir`
    ///
    /// The source is opened read-only with `source_kind`; the destination is
    /// created with [`TARGET_BACKEND`]. Both handles are closed before this
    /// returns, whether the copy succeeded or not.
    ///
    /// # Errors
    ///
    /// Any open, iteration, batch or commit failure aborts the copy
    /// immediately. Records committed before the failure stay in the
    /// destination.
    pub async fn migrate(
        &self,
        store: &str,
        source_dir: &Path,
        source_kind: BackendKind,
        destination_dir: &Path,
    ) -> MigrationResult<MigrationSummary> {
        let counter = Arc::new(AtomicU64::new(0));
        let (notify, notifications) = mpsc::channel(1);

        self.progress.start(store);
        let reporter = ProgressReporter::spawn(
            Arc::clone(&self.progress),
            Arc::clone(&counter),
            notifications,
            self.progress_interval,
        );

        let session = CopySession {
            store: store.to_string(),
            provider: Arc::clone(&self.provider),
            source_dir: source_dir.to_path_buf(),
            source_kind,
            destination_dir: destination_dir.to_path_buf(),
            batch_size: self.batch_size as u64,
            counter,
            notify,
        };
        let outcome = tokio::task::spawn_blocking(move || session.run()).await;
        reporter.stop().await;

        let result = outcome.unwrap_or_else(|err| {
            Err(MigrationError::Worker {
                store: store.to_string(),
                reason: err.to_string(),
            })
        });

        match result {
            Ok(summary) => {
                info!(
                    store,
                    records = summary.records,
                    commits = summary.commits,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "store migrated"
                );
                self.progress.finish(&summary);
                Ok(summary)
            }
            Err(err) => {
                self.progress.clear();
                Err(err)
            }
        }
    }
}

/// Close the destination and then the source, reporting the first failure
///
/// Both handles are closed even when the first close fails.
pub(crate) fn close_both(
    store: &str,
    destination: Box<dyn KvStore>,
    source: Box<dyn KvStore>,
) -> MigrationResult<()> {
    let destination_closed = destination.close();
    let source_closed = source.close();
    destination_closed
        .and(source_closed)
        .map_err(|source| MigrationError::Close {
            store: store.to_string(),
            source,
        })
}

/// State of one store's copy, owned by the blocking worker
struct CopySession {
    store: String,
    provider: Arc<dyn StoreProvider>,
    source_dir: PathBuf,
    source_kind: BackendKind,
    destination_dir: PathBuf,
    batch_size: u64,
    counter: Arc<AtomicU64>,
    notify: mpsc::Sender<u64>,
}

impl CopySession {
    fn run(self) -> MigrationResult<MigrationSummary> {
        let source = self
            .provider
            .open(&self.store, self.source_kind, &self.source_dir, OpenMode::ReadOnly)
            .map_err(|source| MigrationError::Open {
                store: self.store.clone(),
                source,
            })?;
        let destination = self
            .provider
            .open(
                &self.store,
                TARGET_BACKEND,
                &self.destination_dir,
                OpenMode::ReadWrite,
            )
            .map_err(|source| MigrationError::Open {
                store: self.store.clone(),
                source,
            })?;

        let copied = self.copy(source.as_ref(), destination.as_ref());
        let closed = close_both(&self.store, destination, source);

        match copied {
            Ok(summary) => closed.map(|()| summary),
            Err(err) => {
                if let Err(close_err) = closed {
                    warn!(store = %self.store, error = %close_err, "failed to close store after error");
                }
                Err(err)
            }
        }
    }

    fn copy(
        &self,
        source: &dyn KvStore,
        destination: &dyn KvStore,
    ) -> MigrationResult<MigrationSummary> {
        let records = source.iter().map_err(|source| MigrationError::Iterator {
            store: self.store.clone(),
            source,
        })?;

        let started = Instant::now();
        let mut batch = destination.new_batch();
        let mut total: u64 = 0;
        let mut commits = 0;

        for record in records {
            let (key, value) = record.map_err(|source| MigrationError::Iterator {
                store: self.store.clone(),
                source,
            })?;
            batch
                .set(&key, &value)
                .map_err(|source| MigrationError::BatchWrite {
                    store: self.store.clone(),
                    source,
                })?;

            total += 1;
            self.counter.store(total, Ordering::Relaxed);

            if total % self.batch_size == 0 {
                // A closed channel only means the reporter is gone.
                let _ = self.notify.blocking_send(total);
                batch.write_sync().map_err(|source| MigrationError::Commit {
                    store: self.store.clone(),
                    source,
                })?;
                commits += 1;
                debug!(store = %self.store, total, "committed batch");
                batch = destination.new_batch();
            }
        }

        batch.write_sync().map_err(|source| MigrationError::Commit {
            store: self.store.clone(),
            source,
        })?;
        commits += 1;

        Ok(MigrationSummary {
            store: self.store.clone(),
            records: total,
            commits,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingSink;
    use kvmigrate_store::mock::{Fault, MemoryProvider};

    fn migrator(provider: &MemoryProvider, sink: &Arc<RecordingSink>) -> KvMigrator {
        KvMigrator::new(
            Arc::new(provider.clone()),
            Arc::clone(sink) as Arc<dyn ProgressSink>,
        )
        .with_batch_size(3)
    }

    fn seed(provider: &MemoryProvider, dir: &Path, count: usize) {
        provider.seed(
            dir,
            "state",
            (0..count).map(|i| (vec![i as u8], vec![i as u8; 2])),
        );
    }

    #[tokio::test]
    async fn test_sink_sees_start_notifications_and_finish() {
        let provider = MemoryProvider::new();
        let sink = Arc::new(RecordingSink::default());
        let (data, staging) = (Path::new("/data"), Path::new("/staging"));
        seed(&provider, data, 7);

        let summary = migrator(&provider, &sink)
            .migrate("state", data, BackendKind::Sled, staging)
            .await
            .unwrap();

        assert_eq!(summary.records, 7);
        assert_eq!(summary.commits, 3);

        let events = sink.events();
        assert_eq!(events.first().map(String::as_str), Some("start state"));
        assert_eq!(events.last().map(String::as_str), Some("finish state 7"));
        assert!(events.contains(&"render 3".to_string()));
        assert!(events.contains(&"render 6".to_string()));
    }

    #[tokio::test]
    async fn test_failure_clears_progress_and_closes_handles() {
        let provider = MemoryProvider::new();
        let sink = Arc::new(RecordingSink::default());
        let (data, staging) = (Path::new("/data"), Path::new("/staging"));
        seed(&provider, data, 5);
        provider.inject(staging, "state", Fault::CommitAt(1));

        let err = migrator(&provider, &sink)
            .migrate("state", data, BackendKind::Sled, staging)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::Commit { .. }));
        assert_eq!(sink.events().last().map(String::as_str), Some("clear"));
        assert!(!provider.is_open(data, "state"));
        assert!(!provider.is_open(staging, "state"));
    }

    #[tokio::test]
    async fn test_destination_close_failure_is_a_close_error() {
        let provider = MemoryProvider::new();
        let sink = Arc::new(RecordingSink::default());
        let (data, staging) = (Path::new("/data"), Path::new("/staging"));
        seed(&provider, data, 4);
        provider.inject(staging, "state", Fault::Close);

        let err = migrator(&provider, &sink)
            .migrate("state", data, BackendKind::Sled, staging)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::Close { ref store, .. } if store == "state"));
        assert_eq!(err.to_string(), "close state");
        assert!(!provider.is_open(data, "state"));
    }

    #[tokio::test]
    async fn test_source_close_failure_fails_the_copy() {
        let provider = MemoryProvider::new();
        let sink = Arc::new(RecordingSink::default());
        let (data, staging) = (Path::new("/data"), Path::new("/staging"));
        seed(&provider, data, 4);
        provider.inject(data, "state", Fault::Close);

        let err = migrator(&provider, &sink)
            .migrate("state", data, BackendKind::Sled, staging)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::Close { .. }));
        assert_eq!(
            provider.records(staging, "state").map(|r| r.len()),
            Some(4),
            "records committed before the close stay in place"
        );
    }

    #[test]
    fn test_batch_size_is_at_least_one() {
        let provider = MemoryProvider::new();
        let sink = Arc::new(RecordingSink::default());
        assert_eq!(migrator(&provider, &sink).with_batch_size(0).batch_size(), 1);
    }
}
