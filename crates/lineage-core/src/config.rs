//! Configuration for lineage capture.
//!
//! Configuration is loaded once at process start from (in priority order):
//! 1. Environment variables (`LINEAGE__` prefix, `__` separator,
//!    e.g. `LINEAGE__NEO4J__URI`)
//! 2. Config file (`lineage.toml`, `[lineage]` section)
//! 3. Defaults
//!
//! The resulting [`LineageConfig`] is an immutable value passed into each
//! component's constructor.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Top-level lineage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LineageConfig {
    /// Master switch for lineage capture.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether the host should register the hook at all.
    #[serde(default = "default_true")]
    pub hook_enabled: bool,

    #[serde(default)]
    pub neo4j: Neo4jSettings,

    /// Upper bound for every graph-store round trip.
    #[serde(default = "default_timeout_secs")]
    pub connection_timeout_seconds: u64,

    /// Total attempts for a write batch that fails transiently.
    #[serde(default = "default_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Log every Cypher statement before it is sent.
    #[serde(default)]
    pub log_cypher: bool,

    /// Drop tables whose name starts with one of `temp_table_prefixes`.
    #[serde(default = "default_true")]
    pub ignore_temp_tables: bool,

    #[serde(default = "default_temp_prefixes")]
    pub temp_table_prefixes: Vec<String>,

    /// Edge retention window in days; zero or negative keeps edges forever.
    #[serde(default)]
    pub retention_days: i64,

    /// Interval between scheduled retention sweeps.
    #[serde(default = "default_retention_interval")]
    pub retention_interval_secs: u64,
}

/// Neo4j endpoint and driver settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Create the `Table(name)` index at startup.
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl LineageConfig {
    /// Load configuration, surfacing unreadable or malformed sources.
    ///
    /// `file_prefix` is a path without extension (e.g. `"lineage"`); the file
    /// is optional. A file without a `[lineage]` section yields defaults.
    pub fn try_load(file_prefix: &str) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(file_prefix).required(false))
            .add_source(
                ::config::Environment::with_prefix("LINEAGE")
                    .prefix_separator("__")
                    .separator("__")
                    .keep_prefix(true)
                    .list_separator(",")
                    .with_list_parse_key("lineage.temp_table_prefixes")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<LineageConfig>("lineage") {
            Ok(c) => Ok(c),
            Err(::config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load configuration, falling back to defaults if it is unavailable.
    pub fn load(file_prefix: &str) -> Self {
        match Self::try_load(file_prefix) {
            Ok(c) => {
                tracing::info!(
                    source = file_prefix,
                    enabled = c.enabled,
                    "Loaded lineage configuration"
                );
                c
            }
            Err(e) => {
                tracing::error!(
                    source = file_prefix,
                    error = %e,
                    "Lineage configuration unavailable, using defaults"
                );
                Self::default()
            }
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_temp_prefixes() -> Vec<String> {
    vec!["tmp_".to_string(), "temp_".to_string()]
}

fn default_retention_interval() -> u64 {
    86_400
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hook_enabled: true,
            neo4j: Neo4jSettings::default(),
            connection_timeout_seconds: default_timeout_secs(),
            max_retry_attempts: default_retry_attempts(),
            log_cypher: false,
            ignore_temp_tables: true,
            temp_table_prefixes: default_temp_prefixes(),
            retention_days: 0,
            retention_interval_secs: default_retention_interval(),
        }
    }
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: default_password(),
            create_indexes: true,
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        let prefix = dir.path().join("lineage").to_string_lossy().into_owned();
        (dir, prefix)
    }

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert!(config.enabled);
        assert!(config.hook_enabled);
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.username, "neo4j");
        assert!(config.neo4j.create_indexes);
        assert_eq!(config.connection_timeout_seconds, 30);
        assert_eq!(config.max_retry_attempts, 3);
        assert!(!config.log_cypher);
        assert!(config.ignore_temp_tables);
        assert_eq!(config.temp_table_prefixes, vec!["tmp_", "temp_"]);
        assert_eq!(config.retention_days, 0);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent").to_string_lossy().into_owned();
        let config = LineageConfig::try_load(&prefix).unwrap();
        assert_eq!(config.connection_timeout_seconds, 30);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let (_dir, prefix) = write_config(
            r#"
[lineage]
enabled = false
log_cypher = true
retention_days = 14
temp_table_prefixes = ["stage_"]

[lineage.neo4j]
uri = "bolt://graph:7687"
password = "secret"
create_indexes = false
"#,
        );

        let config = LineageConfig::try_load(&prefix).unwrap();
        assert!(!config.enabled);
        assert!(config.log_cypher);
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.temp_table_prefixes, vec!["stage_"]);
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.username, "neo4j");
        assert_eq!(config.neo4j.password, "secret");
        assert!(!config.neo4j.create_indexes);
        assert_eq!(config.max_retry_attempts, 3);
    }

    #[test]
    fn test_malformed_file_is_error_and_load_falls_back() {
        let (_dir, prefix) = write_config("[lineage]\nretention_days = \"soon\"\n");

        assert!(LineageConfig::try_load(&prefix).is_err());

        let config = LineageConfig::load(&prefix);
        assert_eq!(config.retention_days, 0);
        assert!(config.enabled);
    }
}
