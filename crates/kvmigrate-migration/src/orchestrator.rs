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

//! Whole-run orchestration
//!
//! A run walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Staging -> MigratingStore* -> Confirming -> Swapping | SkippingSwap
//!      -> CleaningUp -> Done
//! ```
//!
//! Any error moves the run to [`Phase::Failed`], which is terminal. Stores are
//! migrated one at a time into the staging directory; the live data directory
//! is only written by the swap, and only after the operator confirms a backup
//! exists. The staging directory is removed whether or not the swap happened.

use crate::error::{MigrationError, MigrationResult};
use crate::migrator::KvMigrator;
use crate::report::{RunReport, SwapOutcome};
use crate::staging;
use crate::verify::RecordVerifier;
use kvmigrate_store::BackendKind;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Stores every data directory holds, in migration order
pub const CORE_STORES: [&str; 4] = ["blockstore", "state", "tx_index", "evidence"];

/// Store migrated only when present in the data directory
pub const LIGHT_CLIENT_STORE: &str = "light-client-db";

/// Question asked before the staged stores replace the live ones
pub const BACKUP_QUESTION: &str = "Do you have a backup of the data directory?";

/// Operator confirmation
pub trait Confirmer {
    /// Ask `question` until a yes or no answer is given
    ///
    /// # Errors
    ///
    /// Fails when the answer cannot be read at all.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Confirmer that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        info!(question, answer = self.0, "confirmation answered automatically");
        Ok(self.0)
    }
}

/// Position of a run in its state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Nothing done yet
    Idle,
    /// Preparing the staging directory
    Staging,
    /// Copying one store into staging
    MigratingStore(String),
    /// Waiting for the operator's backup confirmation
    Confirming,
    /// Moving staged stores into the data directory
    Swapping,
    /// Confirmation declined; the data directory is left alone
    SkippingSwap,
    /// Removing the staging directory
    CleaningUp,
    /// Run finished
    Done,
    /// Run aborted
    Failed,
}

impl Phase {
    /// Whether no further step is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Staging => write!(f, "staging"),
            Phase::MigratingStore(store) => write!(f, "migrating {store}"),
            Phase::Confirming => write!(f, "confirming"),
            Phase::Swapping => write!(f, "swapping"),
            Phase::SkippingSwap => write!(f, "skipping swap"),
            Phase::CleaningUp => write!(f, "cleaning up"),
            Phase::Done => write!(f, "done"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Live data directory holding the source stores
    pub data_dir: PathBuf,
    /// Directory the migrated stores are written to before the swap
    pub staging_dir: PathBuf,
    /// Engine of the source stores
    pub source_backend: BackendKind,
    /// Compare every migrated store against its source
    pub verify: bool,
}

/// Drives a full migration run
pub struct Orchestrator {
    settings: RunSettings,
    migrator: KvMigrator,
    verifier: RecordVerifier,
    phase: Phase,
    history: Vec<Phase>,
    report: RunReport,
}

impl Orchestrator {
    /// Create an orchestrator in [`Phase::Idle`]
    pub fn new(settings: RunSettings, migrator: KvMigrator) -> Self {
        let verifier = RecordVerifier::new(migrator.provider());
        let report = RunReport::new(
            settings.data_dir.clone(),
            settings.staging_dir.clone(),
            settings.source_backend,
        );
        Self {
            settings,
            migrator,
            verifier,
            phase: Phase::Idle,
            history: vec![Phase::Idle],
            report,
        }
    }

    /// Current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Every phase entered so far, in order
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// Report of the run so far
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Consume the orchestrator, keeping its report
    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Step until the run reaches a terminal phase
    ///
    /// # Errors
    ///
    /// Returns the error that moved the run to [`Phase::Failed`], or
    /// [`MigrationError::RunFailed`] when called on an already failed run.
    pub async fn run(&mut self, confirmer: &mut dyn Confirmer) -> MigrationResult<()> {
        if self.phase == Phase::Failed {
            return Err(MigrationError::RunFailed);
        }
        while !self.phase.is_terminal() {
            self.step(confirmer).await?;
        }
        Ok(())
    }

    /// Perform the work of the current phase and advance to the next one
    pub async fn step(&mut self, confirmer: &mut dyn Confirmer) -> MigrationResult<()> {
        match self.advance(confirmer).await {
            Ok(next) => {
                self.enter(next);
                Ok(())
            }
            Err(err) => {
                error!(phase = %self.phase, error = %err, "migration run failed");
                self.enter(Phase::Failed);
                Err(err)
            }
        }
    }

    fn enter(&mut self, next: Phase) {
        info!(from = %self.phase, to = %next, "phase transition");
        if let Phase::MigratingStore(store) = &next {
            self.migrator
                .progress()
                .status(&format!("Migrating {store} database..."));
        }
        self.history.push(next.clone());
        self.phase = next;
    }

    async fn advance(&mut self, confirmer: &mut dyn Confirmer) -> MigrationResult<Phase> {
        let settings = &self.settings;
        match &self.phase {
            Phase::Idle => Ok(Phase::Staging),

            Phase::Staging => {
                // Leftovers of an aborted run must not merge with this one.
                staging::remove_staging(&settings.staging_dir).await?;
                staging::create_staging(&settings.staging_dir).await?;
                Ok(Phase::MigratingStore(CORE_STORES[0].to_string()))
            }

            Phase::MigratingStore(store) => {
                let store = store.clone();
                self.migrate_store(&store)
                    .await
                    .map_err(|err| MigrationError::store(store.as_str(), err))?;
                Ok(self.after_store(&store))
            }

            Phase::Confirming => {
                let confirmed = confirmer
                    .confirm(BACKUP_QUESTION)
                    .map_err(MigrationError::Prompt)?;
                Ok(if confirmed {
                    Phase::Swapping
                } else {
                    Phase::SkippingSwap
                })
            }

            Phase::Swapping => {
                let progress = self.migrator.progress();
                progress.status("Copying the migrated data to the original directory...");
                let swapped =
                    staging::swap_into(&settings.staging_dir, &settings.data_dir, progress.as_ref())
                        .await?;
                self.report.swap = SwapOutcome::from(swapped);
                Ok(Phase::CleaningUp)
            }

            Phase::SkippingSwap => {
                warn!(
                    staging = %settings.staging_dir.display(),
                    "backup not confirmed; migrated data will be discarded"
                );
                self.report.swap = SwapOutcome::Declined;
                Ok(Phase::CleaningUp)
            }

            Phase::CleaningUp => {
                staging::remove_staging(&settings.staging_dir).await?;
                self.report.finish();
                self.migrator
                    .progress()
                    .status("Migration completed successfully!");
                Ok(Phase::Done)
            }

            Phase::Done => Ok(Phase::Done),
            Phase::Failed => Err(MigrationError::RunFailed),
        }
    }

    async fn migrate_store(&mut self, store: &str) -> MigrationResult<()> {
        let settings = &self.settings;
        let summary = self
            .migrator
            .migrate(
                store,
                &settings.data_dir,
                settings.source_backend,
                &settings.staging_dir,
            )
            .await?;

        let digest = if settings.verify {
            let verified = self
                .verifier
                .verify_store(
                    store,
                    &settings.data_dir,
                    settings.source_backend,
                    &settings.staging_dir,
                )
                .await?;
            Some(verified.digest)
        } else {
            None
        };

        self.report.record_store(&summary, digest);
        Ok(())
    }

    fn after_store(&self, store: &str) -> Phase {
        let position = CORE_STORES.iter().position(|s| *s == store);
        match position {
            Some(i) if i + 1 < CORE_STORES.len() => {
                Phase::MigratingStore(CORE_STORES[i + 1].to_string())
            }
            Some(_) if self.light_client_present() => {
                Phase::MigratingStore(LIGHT_CLIENT_STORE.to_string())
            }
            _ => Phase::Confirming,
        }
    }

    fn light_client_present(&self) -> bool {
        let present = self.migrator.provider().exists(
            LIGHT_CLIENT_STORE,
            self.settings.source_backend,
            &self.settings.data_dir,
        );
        if !present {
            info!(store = LIGHT_CLIENT_STORE, "optional store not present, skipping");
        }
        present
    }
}
