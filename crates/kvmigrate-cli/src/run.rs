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

//! Wiring of a full migration run

use crate::cli::Cli;
use crate::output;
use crate::prompt::LinePrompt;
use anyhow::{Context, Result};
use kvmigrate_config::MigrateConfig;
use kvmigrate_migration::{
    AutoConfirm, Confirmer, ConsoleProgress, KvMigrator, Orchestrator, RunSettings, SwapOutcome,
};
use kvmigrate_store::{EngineProvider, TARGET_BACKEND};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run a migration as described by `config`
///
/// The report, when requested, is written whether or not the run succeeded.
pub async fn execute(cli: &Cli, config: &MigrateConfig) -> Result<()> {
    if !cli.quiet {
        output::header(&format!(
            "Migrating stores from {} to {}",
            config.source_backend, TARGET_BACKEND
        ));
        output::detail("Data directory", &config.data_dir.display().to_string());
        output::detail("Staging directory", &config.staging_dir.display().to_string());
    }
    info!(
        data_dir = %config.data_dir.display(),
        staging_dir = %config.staging_dir.display(),
        source = %config.source_backend,
        batch_size = config.batch_size,
        "starting migration"
    );

    // Read-only sled handles work on a copy kept beside the staged stores.
    let provider = EngineProvider::new().with_scratch_dir(&config.staging_dir);
    let migrator = KvMigrator::new(
        Arc::new(provider),
        Arc::new(ConsoleProgress::new(cli.quiet)),
    )
    .with_batch_size(config.batch_size)
    .with_progress_interval(Duration::from_millis(config.progress_interval_ms));

    let mut orchestrator = Orchestrator::new(
        RunSettings {
            data_dir: config.data_dir.clone(),
            staging_dir: config.staging_dir.clone(),
            source_backend: config.source_backend,
            verify: config.verify,
        },
        migrator,
    );

    let mut confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(LinePrompt::stdio())
    };
    let outcome = orchestrator.run(confirmer.as_mut()).await;

    if let Some(path) = &cli.report {
        orchestrator
            .report()
            .save(path)
            .await
            .with_context(|| format!("write report {}", path.display()))?;
        if !cli.quiet {
            output::detail("Report", &path.display().to_string());
        }
    }

    outcome?;

    if !cli.quiet && orchestrator.report().swap == SwapOutcome::Declined {
        output::warning("Migrated data was discarded; the data directory is unchanged");
    }
    Ok(())
}
