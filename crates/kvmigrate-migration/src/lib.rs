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

//! Key-value store backend migration engine
//!
//! Copies every store of a node data directory from one embedded engine to
//! another:
//! - [`KvMigrator`] streams one store into the staging directory in durable
//!   batches while a [`ProgressReporter`] renders the running count
//! - [`Orchestrator`] sequences the stores, asks the operator to confirm a
//!   backup exists, swaps the staged stores into place and cleans up
//! - [`RecordVerifier`] optionally compares each staged store to its source
//! - [`RunReport`] records what happened for later inspection

pub mod error;
pub mod migrator;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod staging;
pub mod verify;

pub use error::{MigrationError, MigrationResult};
pub use migrator::{KvMigrator, MigrationSummary, DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL};
pub use orchestrator::{
    AutoConfirm, Confirmer, Orchestrator, Phase, RunSettings, BACKUP_QUESTION, CORE_STORES,
    LIGHT_CLIENT_STORE,
};
pub use progress::{ConsoleProgress, ProgressReporter, ProgressSink};
pub use report::{RunReport, StoreReport, SwapOutcome};
pub use staging::SwapResult;
pub use verify::{RecordVerifier, StreamDigest, VerificationReport};
