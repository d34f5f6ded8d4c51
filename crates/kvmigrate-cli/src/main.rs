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

//! kvmigrate - migrate a node's key-value stores to a new storage engine

use anyhow::Result;
use clap::Parser;
use kvmigrate_cli::{output, run, Cli};
use kvmigrate_migration::MigrationError;
use kvmigrate_observability::{init_tracing_with_config, LogConfig, LogFormat};

const RESTART_HINT: &str = "Please fix the error and restart.";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle errors
    if let Err(e) = try_main(&cli).await {
        output::error(&format!("Error: {:#}", e));
        let store_failure = e
            .downcast_ref::<MigrationError>()
            .is_some_and(MigrationError::is_store_failure);
        if store_failure {
            output::hint(RESTART_HINT);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn try_main(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config().await?;

    // Initialize structured logging
    if !cli.quiet {
        let format: LogFormat = config.log_format.parse()?;
        let log_config = LogConfig::new()
            .with_format(format)
            .with_level(config.log_level.as_str())
            .with_color(console::colors_enabled_stderr());
        init_tracing_with_config(log_config)?;
    }

    run::execute(cli, &config).await
}
