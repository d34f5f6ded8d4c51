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

//! Configuration file loading and environment overrides

use crate::error::{ConfigError, ConfigResult};
use crate::schema::MigrateConfig;
use crate::validation::Validator;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "KVMIGRATE_";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::MissingExtension(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
///
/// Layers are applied as defaults, then the optional file, then the
/// `KVMIGRATE_*` environment. Command-line flags are applied by the caller
/// on top of the result.
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<MigrateConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<MigrateConfig> {
        let config: MigrateConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        debug!("Configuration loaded from {}", format.name());

        if self.validate {
            config.validate()?;
        }

        Ok(config)
    }

    /// Load the optional file, then apply environment overrides
    ///
    /// Validation runs once, after all layers are applied.
    pub async fn load_with_overrides(&self, path: Option<&Path>) -> ConfigResult<MigrateConfig> {
        let mut config = match path {
            Some(path) => {
                ConfigLoader::without_validation()
                    .load_file(path)
                    .await?
            }
            None => MigrateConfig::default(),
        };
        self.apply_env_overrides(&mut config)?;

        if self.validate {
            config.validate()?;
            info!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Apply `KVMIGRATE_*` overrides from the process environment
    pub fn apply_env_overrides(&self, config: &mut MigrateConfig) -> ConfigResult<()> {
        apply_overrides(config, |name| std::env::var(name).ok())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply overrides looked up by variable name
pub fn apply_overrides<F>(config: &mut MigrateConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(value) = var("DATA_DIR") {
        config.data_dir = PathBuf::from(value);
    }
    if let Some(value) = var("SOURCE_BACKEND") {
        config.source_backend = parse_var("SOURCE_BACKEND", &value, "expected sled or redb")?;
    }
    if let Some(value) = var("STAGING_DIR") {
        config.staging_dir = PathBuf::from(value);
    }
    if let Some(value) = var("BATCH_SIZE") {
        config.batch_size = parse_var("BATCH_SIZE", &value, "expected valid integer")?;
    }
    if let Some(value) = var("PROGRESS_INTERVAL_MS") {
        config.progress_interval_ms =
            parse_var("PROGRESS_INTERVAL_MS", &value, "expected milliseconds")?;
    }
    if let Some(value) = var("VERIFY") {
        config.verify = parse_bool("VERIFY", &value)?;
    }
    if let Some(value) = var("LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = var("LOG_FORMAT") {
        config.log_format = value;
    }

    Ok(())
}

fn parse_var<T: FromStr>(name: &str, value: &str, reason: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_env_var(format!("{ENV_PREFIX}{name}"), value, reason))
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_env_var(
            format!("{ENV_PREFIX}{name}"),
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmigrate_store::BackendKind;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("migrate.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("migrate.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("migrate.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("migrate.json").unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path("migrate.ini").is_err());
        assert!(ConfigFormat::from_path("migrate").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("VERIFY", "yes").unwrap());
        assert!(parse_bool("VERIFY", "ON").unwrap());
        assert!(!parse_bool("VERIFY", "0").unwrap());
        let err = parse_bool("VERIFY", "maybe").unwrap_err();
        assert!(err.to_string().contains("KVMIGRATE_VERIFY=maybe"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
        data_dir = "/srv/node/data"
        staging_dir = "/srv/node/data_migration"
        source_backend = "redb"
        batch_size = 500
        "#;
        let config = ConfigLoader::new()
            .load_from_string(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/node/data"));
        assert_eq!(config.source_backend, BackendKind::Redb);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.progress_interval_ms, 1_000);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "data_dir: /srv/data\nstaging_dir: /srv/staging\nverify: true\n";
        let config = ConfigLoader::new()
            .load_from_string(yaml, ConfigFormat::Yaml)
            .unwrap();
        assert!(config.verify);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"data_dir": "/a/data", "staging_dir": "/a/stage", "log_format": "json"}"#;
        let config = ConfigLoader::new()
            .load_from_string(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_unknown_backend_fails_to_parse() {
        let toml = r#"source_backend = "goleveldb""#;
        let result = ConfigLoader::without_validation().load_from_string(toml, ConfigFormat::Toml);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_loader_validates() {
        let toml = r#"
        data_dir = "/n/data"
        staging_dir = "/n/data/staging"
        "#;
        assert!(ConfigLoader::new()
            .load_from_string(toml, ConfigFormat::Toml)
            .is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(toml, ConfigFormat::Toml)
            .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MigrateConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("KVMIGRATE_DATA_DIR", "/env/data"),
                ("KVMIGRATE_SOURCE_BACKEND", "redb"),
                ("KVMIGRATE_BATCH_SIZE", "42"),
                ("KVMIGRATE_VERIFY", "true"),
                ("KVMIGRATE_LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/env/data"));
        assert_eq!(config.source_backend, BackendKind::Redb);
        assert_eq!(config.batch_size, 42);
        assert!(config.verify);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = MigrateConfig::default();
        let err = apply_overrides(&mut config, env(&[("KVMIGRATE_BATCH_SIZE", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
        assert!(err.to_string().contains("KVMIGRATE_BATCH_SIZE=lots"));
    }
}
