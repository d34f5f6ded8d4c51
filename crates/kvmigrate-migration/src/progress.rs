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

//! Progress reporting for a running store migration
//!
//! The [`ProgressReporter`] is a background task that renders the latest
//! known record count whenever the migrator hands it a count or its timer
//! ticks. The migrator publishes every count to a shared atomic, so a tick
//! between two handoffs still shows a recent (possibly stale) value. The final
//! count is always reported separately through [`ProgressSink::finish`].

use crate::migrator::MigrationSummary;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Operator-facing output of a migration run
pub trait ProgressSink: Send + Sync {
    /// A store migration is starting
    fn start(&self, store: &str);

    /// Replace the progress line with the latest known count
    fn render(&self, count: u64);

    /// A store migration finished successfully
    fn finish(&self, summary: &MigrationSummary);

    /// A store migration failed; remove the progress line
    fn clear(&self);

    /// Print a status line above the progress display
    fn status(&self, line: &str);
}

/// Text shown on the progress line
pub fn progress_line(count: u64) -> String {
    format!("Migrated {count} records...")
}

/// Text shown once a store finished
pub fn summary_line(summary: &MigrationSummary) -> String {
    format!(
        "Migration completed successfully! {} records migrated in {:.2?}",
        summary.records, summary.elapsed
    )
}

/// Terminal sink drawing a single-line spinner to stderr
pub struct ConsoleProgress {
    quiet: bool,
    bar: Mutex<ProgressBar>,
}

impl ConsoleProgress {
    /// Create a console sink; `quiet` hides everything but errors
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(ProgressBar::hidden()),
        }
    }

    fn spinner(&self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    }

    fn with_bar<F: FnOnce(&ProgressBar)>(&self, f: F) {
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        f(&bar);
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&self, _store: &str) {
        let pb = self.spinner();
        pb.set_message(progress_line(0));
        *self.bar.lock().unwrap_or_else(PoisonError::into_inner) = pb;
    }

    fn render(&self, count: u64) {
        self.with_bar(|pb| {
            pb.set_message(progress_line(count));
            pb.tick();
        });
    }

    fn finish(&self, summary: &MigrationSummary) {
        self.with_bar(ProgressBar::finish_and_clear);
        if !self.quiet {
            println!("{}", style(summary_line(summary)).green());
        }
    }

    fn clear(&self) {
        self.with_bar(ProgressBar::finish_and_clear);
    }

    fn status(&self, line: &str) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.suspend(|| println!("{line}")));
    }
}

/// Background task rendering migration progress
///
/// Runs until the notification sender is dropped, then is joined by
/// [`stop`](ProgressReporter::stop).
pub struct ProgressReporter {
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Spawn the reporter on the current runtime
    ///
    /// `notifications` carries explicit counts from the migrator; `counter`
    /// is sampled every `interval`. Neither source takes precedence.
    pub fn spawn(
        sink: Arc<dyn ProgressSink>,
        counter: Arc<AtomicU64>,
        mut notifications: mpsc::Receiver<u64>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    notified = notifications.recv() => match notified {
                        Some(count) => sink.render(count),
                        None => break,
                    },
                    _ = ticker.tick() => sink.render(counter.load(Ordering::Relaxed)),
                }
            }
        });

        Self { handle }
    }

    /// Wait for the reporter to exit after its sender was dropped
    pub async fn stop(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "progress reporter terminated abnormally");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Sink that records everything it is asked to display
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ProgressSink for RecordingSink {
        fn start(&self, store: &str) {
            self.push(format!("start {store}"));
        }

        fn render(&self, count: u64) {
            self.push(format!("render {count}"));
        }

        fn finish(&self, summary: &MigrationSummary) {
            self.push(format!("finish {} {}", summary.store, summary.records));
        }

        fn clear(&self) {
            self.push("clear".to_string());
        }

        fn status(&self, line: &str) {
            self.push(format!("status {line}"));
        }
    }

    #[tokio::test]
    async fn test_explicit_notifications_are_rendered() {
        let sink = Arc::new(RecordingSink::default());
        let counter = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(1);

        let reporter = ProgressReporter::spawn(
            Arc::clone(&sink) as Arc<dyn ProgressSink>,
            counter,
            rx,
            Duration::from_secs(3600),
        );
        tx.send(10_000).await.unwrap();
        tx.send(20_000).await.unwrap();
        drop(tx);
        reporter.stop().await;

        assert_eq!(sink.events(), vec!["render 10000", "render 20000"]);
    }

    #[tokio::test]
    async fn test_timer_samples_shared_counter() {
        let sink = Arc::new(RecordingSink::default());
        let counter = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(1);

        let reporter = ProgressReporter::spawn(
            Arc::clone(&sink) as Arc<dyn ProgressSink>,
            Arc::clone(&counter),
            rx,
            Duration::from_millis(10),
        );
        counter.store(1234, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(tx);
        reporter.stop().await;

        assert!(sink.events().iter().any(|e| e == "render 1234"));
    }

    #[tokio::test]
    async fn test_reporter_exits_when_sender_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::channel(1);
        let reporter = ProgressReporter::spawn(
            sink,
            Arc::new(AtomicU64::new(0)),
            rx,
            Duration::from_secs(3600),
        );
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), reporter.stop())
            .await
            .expect("reporter should stop once its sender is gone");
    }

    #[test]
    fn test_progress_and_summary_text() {
        assert_eq!(progress_line(30_000), "Migrated 30000 records...");

        let summary = MigrationSummary {
            store: "state".to_string(),
            records: 42,
            commits: 1,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            summary_line(&summary),
            "Migration completed successfully! 42 records migrated in 1.50s"
        );
    }

    #[test]
    fn test_quiet_console_hides_progress() {
        let console = ConsoleProgress::new(true);
        console.start("state");
        console.render(10);
        console.with_bar(|pb| assert!(pb.is_hidden()));
    }
}
