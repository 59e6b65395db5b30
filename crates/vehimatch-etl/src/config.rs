use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use vehimatch_core::noise::DEFAULT_ATTEMPTS_PER_VARIANT;
use vehimatch_core::AliasTable;
use vehimatch_search::ElasticsearchSettings;

/// Configuration for vehimatch.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (VEHIMATCH_* prefix)
/// 3. Config file (~/.config/vehimatch/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database holding the canonical corpus.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: VEHIMATCH_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/vehimatch/vehicle.db
    pub database_path: PathBuf,

    /// Make abbreviation table (JSON or TOML). The built-in table is used
    /// when unset.
    ///
    /// Can be set via:
    /// - CLI: --aliases /path/to/aliases.json
    /// - ENV: VEHIMATCH_ALIAS_PATH
    /// - Config: alias_path = "/path/to/aliases.json"
    pub alias_path: Option<PathBuf>,

    pub elasticsearch: ElasticsearchSettings,
    pub generation: GenerationSettings,
    pub evaluation: EvaluationSettings,
    pub logging: twyg::Opts,
}

/// Settings for noisy variant generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub variants_per_record: usize,
    /// Records read and written per transaction.
    pub batch_size: usize,
    /// Cap on the number of canonical records processed.
    pub limit: Option<usize>,
    pub attempts_per_variant: usize,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            variants_per_record: 4,
            batch_size: 5000,
            limit: None,
            attempts_per_variant: DEFAULT_ATTEMPTS_PER_VARIANT,
            seed: None,
        }
    }
}

/// Settings for evaluation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub top_k: usize,
    /// Backend calls in flight at once.
    pub concurrency: usize,
    /// Per-query timeout in milliseconds.
    pub timeout_ms: u64,
    /// Stored noisy queries to evaluate.
    pub limit: usize,
}

impl EvaluationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            concurrency: 8,
            timeout_ms: 5000,
            limit: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            alias_path: None,
            elasticsearch: ElasticsearchSettings::default(),
            generation: GenerationSettings::default(),
            evaluation: EvaluationSettings::default(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/vehimatch/config.toml
    /// Reads environment variables with VEHIMATCH_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("vehimatch");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, then apply the `--db` and `--aliases` flags.
    pub fn load_with_overrides(
        db_path: Option<PathBuf>,
        alias_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(db_path) = db_path {
            config.database_path = db_path;
        }
        if alias_path.is_some() {
            config.alias_path = alias_path;
        }
        Ok(config)
    }

    /// Load the make abbreviation table named by `alias_path`, or the
    /// built-in table when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured table cannot be read or parsed.
    pub fn alias_table(&self) -> Result<AliasTable> {
        let table = AliasTable::load_or_builtin(self.alias_path.as_deref()).with_context(|| {
            match &self.alias_path {
                Some(path) => format!("Failed to load make abbreviation table {}", path.display()),
                None => "Failed to load built-in make abbreviation table".to_string(),
            }
        })?;
        Ok(table)
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/vehimatch/vehicle.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vehimatch")
        .join("vehicle.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/vehimatch/config.toml
/// - macOS: ~/Library/Application Support/vehimatch/config.toml
/// - Windows: %APPDATA%\vehimatch\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vehimatch")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Vehimatch Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (VEHIMATCH_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database
#
# Holds the canonical makes/models corpus, generated noisy variants and
# the history of evaluation runs.
#
# Can also be set via:
# - CLI: vehimatch --db /custom/path.db status
# - Environment: VEHIMATCH_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/vehicle.db"

# Make abbreviation table (flat JSON object or TOML table)
#
# Maps make names to a common abbreviation, e.g. "Volkswagen" = "VW".
# When unset, the table bundled with vehimatch is used.
#alias_path = "/path/to/make_abbreviations.toml"

[elasticsearch]
url = "http://localhost:9200"
index = "vehicles"
request_timeout_secs = 30
max_retries = 3
# Either an API key...
#api_key = "base64-encoded-key"
# ...or basic auth
#username = "elastic"
#password = "changeme"

[generation]
variants_per_record = 4
batch_size = 5000
attempts_per_variant = 50
# Process only the first N canonical records
#limit = 100
# Fix the RNG seed for reproducible variant sets
#seed = 42

[evaluation]
top_k = 3
concurrency = 8
timeout_ms = 5000
limit = 100

[logging]
coloured = true
level = "info"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert!(config.alias_path.is_none());
        assert_eq!(config.generation.variants_per_record, 4);
        assert_eq!(config.generation.batch_size, 5000);
        assert_eq!(config.evaluation.top_k, 3);
        assert_eq!(config.elasticsearch.index, "vehicles");
    }

    #[test]
    fn test_evaluation_timeout() {
        let settings = EvaluationSettings {
            timeout_ms: 250,
            ..EvaluationSettings::default()
        };
        assert_eq!(settings.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_overrides() {
        let custom_db = PathBuf::from("/tmp/test.db");
        let custom_aliases = PathBuf::from("/tmp/aliases.json");
        let config =
            Config::load_with_overrides(Some(custom_db.clone()), Some(custom_aliases.clone()))
                .unwrap();
        assert_eq!(config.database_path, custom_db);
        assert_eq!(config.alias_path, Some(custom_aliases));
    }

    #[test]
    fn test_alias_table_defaults_to_builtin() {
        let table = Config::default().alias_table().unwrap();
        assert_eq!(table, AliasTable::builtin().unwrap());
    }

    #[test]
    fn test_alias_table_reads_configured_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"Volkswagen = \"VW\"\n").unwrap();

        let config = Config {
            alias_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let table = config.alias_table().unwrap();
        assert_eq!(table.lookup("Volkswagen"), Some("VW"));
    }

    #[test]
    fn test_alias_table_unreadable_path_is_fatal() {
        let config = Config {
            alias_path: Some(PathBuf::from("/nonexistent/vehimatch/aliases.json")),
            ..Config::default()
        };
        let err = config.alias_table().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vehimatch/aliases.json"));
    }

    #[test]
    fn test_example_config_sections_parse() {
        #[derive(Deserialize)]
        struct Sections {
            elasticsearch: ElasticsearchSettings,
            generation: GenerationSettings,
            evaluation: EvaluationSettings,
        }

        let parsed: Sections = toml::from_str(example_config()).unwrap();
        assert_eq!(parsed.elasticsearch, ElasticsearchSettings::default());
        assert_eq!(parsed.generation, GenerationSettings::default());
        assert_eq!(parsed.evaluation, EvaluationSettings::default());
    }
}
