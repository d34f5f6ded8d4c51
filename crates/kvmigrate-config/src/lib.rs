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

//! Configuration management for kvmigrate
//!
//! Settings come from, in increasing precedence:
//! - built-in defaults (`$HOME/.cometbft/data`, sled source, batches of
//!   10,000 records, 1 s progress interval)
//! - an optional configuration file (TOML, YAML or JSON)
//! - `KVMIGRATE_*` environment variables
//!
//! Command-line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use kvmigrate_config::ConfigLoader;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides(Some(Path::new("migrate.toml"))).await?;
//!
//!     println!("Migrating {} from {}", config.data_dir.display(), config.source_backend);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_overrides, ConfigFormat, ConfigLoader, ENV_PREFIX};
pub use schema::*;
pub use validation::Validator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MigrateConfig::default();
        assert!(config.data_dir.ends_with(".cometbft/data"));
        assert!(config.staging_dir.ends_with(".cometbft/data_migration"));
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.progress_interval_ms, 1_000);
        assert!(!config.verify);
    }

    #[test]
    fn test_config_serialization() {
        let config = MigrateConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"source_backend\": \"sled\""));
    }
}
