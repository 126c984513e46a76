//! Application configuration for cellguard.
//!
//! User config lives at `~/.cellguard/cellguard.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CellGuardError, Result};
use crate::types::{DEFAULT_ID_DELIMITER, DEFAULT_TEST_PREFIX, DuplicatePolicy};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cellguard.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cellguard";

// ---------------------------------------------------------------------------
// Config structs (matching cellguard.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Test cell restoration settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Test case extraction settings.
    #[serde(default)]
    pub compile: CompileConfig,
}

/// `[reconcile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Marker that starts the first line of a test cell.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Separator between the marker and the test ID.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// How repeated test IDs within one notebook are handled.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            delimiter: default_delimiter(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// `[compile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Marker that starts the first line of a case cell; the case ID follows it.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Named per-block transform: "identity", "line-terminated", or "indent".
    #[serde(default = "default_transform")]
    pub transform: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            transform: default_transform(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_TEST_PREFIX.into()
}
fn default_delimiter() -> String {
    DEFAULT_ID_DELIMITER.into()
}
fn default_transform() -> String {
    "identity".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cellguard/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CellGuardError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cellguard/cellguard.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CellGuardError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CellGuardError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CellGuardError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CellGuardError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CellGuardError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings that would make every tag line unparseable.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.reconcile.prefix.is_empty() {
        return Err(CellGuardError::config("reconcile.prefix must not be empty"));
    }
    if config.reconcile.delimiter.is_empty() {
        return Err(CellGuardError::config("reconcile.delimiter must not be empty"));
    }
    if config.compile.prefix.is_empty() {
        return Err(CellGuardError::config("compile.prefix must not be empty"));
    }
    Ok(())
}
