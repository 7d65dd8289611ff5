use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for resona.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (RESONA_* prefix)
/// 3. Config file (~/.config/resona/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite catalog database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: RESONA_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/resona/catalog.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Path to the SQLite vector store.
    ///
    /// Can be set via:
    /// - CLI: --vectors /path/to/db
    /// - ENV: RESONA_VECTOR_DB_PATH
    /// - Default: ~/.local/share/resona/vectors.db
    #[serde(default = "default_vector_db_path")]
    pub vector_db_path: PathBuf,

    /// Base URL of the embedding gateway sidecar.
    ///
    /// Can be set via:
    /// - ENV: RESONA_GATEWAY_URL
    /// - Default: http://127.0.0.1:8900
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Base URL of the lyrics lookup API.
    #[serde(default = "default_lyrics_api_url")]
    pub lyrics_api_url: String,

    /// Base URL of the lyric summarizer sidecar. Summaries are skipped
    /// when unset.
    pub summarizer_url: Option<String>,

    /// Program invoked for stem separation.
    #[serde(default = "default_separator_program")]
    pub separator_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            vector_db_path: default_vector_db_path(),
            gateway_url: default_gateway_url(),
            lyrics_api_url: default_lyrics_api_url(),
            summarizer_url: None,
            separator_program: default_separator_program(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/resona/config.toml
    /// Reads environment variables with RESONA_ prefix.
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

        let env_opts = env::Options::with_top_level("resona");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, overriding store paths from CLI flags.
    pub fn load_with_overrides(
        db_path: Option<PathBuf>,
        vector_db_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(path) = db_path {
            config.database_path = path;
        }
        if let Some(path) = vector_db_path {
            config.vector_db_path = path;
        }
        Ok(config)
    }
}

/// Get the default catalog database path.
fn default_db_path() -> PathBuf {
    data_dir().join("catalog.db")
}

/// Get the default vector store path.
fn default_vector_db_path() -> PathBuf {
    data_dir().join("vectors.db")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resona")
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8900".to_string()
}

fn default_lyrics_api_url() -> String {
    "https://api.lyrics.ovh/v1".to_string()
}

fn default_separator_program() -> String {
    "demucs".to_string()
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/resona/config.toml
/// - macOS: ~/Library/Application Support/resona/config.toml
/// - Windows: %APPDATA%\resona\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resona")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Resona Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (RESONA_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite catalog database
#
# Can also be set via:
# - CLI: resona --db /custom/catalog.db sync ...
# - Environment: RESONA_DATABASE_PATH=/custom/catalog.db
#database_path = "/path/to/catalog.db"

# Path to the SQLite vector store
#
# Can also be set via:
# - CLI: resona --vectors /custom/vectors.db sync ...
# - Environment: RESONA_VECTOR_DB_PATH=/custom/vectors.db
#vector_db_path = "/path/to/vectors.db"

# Base URL of the embedding gateway sidecar
#
# The gateway serves POST /embed/text and POST /embed/audio
#gateway_url = "http://127.0.0.1:8900"

# Base URL of the lyrics lookup API
#lyrics_api_url = "https://api.lyrics.ovh/v1"

# Base URL of the lyric summarizer sidecar; summaries are skipped when unset
#summarizer_url = "http://127.0.0.1:8910"

# Program invoked for stem separation
#separator_program = "demucs"
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
        assert!(!config.vector_db_path.as_os_str().is_empty());
        assert!(config.summarizer_url.is_none());
        assert_eq!(config.separator_program, "demucs");
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_overrides() {
        let db = PathBuf::from("/tmp/catalog.db");
        let vectors = PathBuf::from("/tmp/vectors.db");
        let config = Config::load_with_overrides(Some(db.clone()), Some(vectors.clone())).unwrap();
        assert_eq!(config.database_path, db);
        assert_eq!(config.vector_db_path, vectors);
    }
}
