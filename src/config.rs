//! Configuration management for cellcmd.
//!
//! Handles loading configuration from a TOML file and the environment:
//! how incoming command text is unescaped, and which named data sources SQL
//! commands can target.

use crate::command::{CommandClassifier, EscapeStyle, Unescaper};
use crate::error::{CellCmdError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable supplying the `default` data source URL.
pub const DATABASE_URL_ENV: &str = "CELLCMD_DATABASE_URL";

/// Main configuration structure for cellcmd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Command text handling.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Data source used when a command names none.
    #[serde(default = "default_data_source")]
    pub default_data_source: String,

    /// Named data sources.
    #[serde(default)]
    pub data_sources: HashMap<String, DataSourceConfig>,
}

fn default_data_source() -> String {
    "default".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            default_data_source: default_data_source(),
            data_sources: HashMap::new(),
        }
    }
}

/// How raw command text is unescaped before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Remove surrounding quotes and escapes from incoming commands.
    #[serde(default = "default_escape")]
    pub escape: bool,

    /// Quote character wrapping escaped commands.
    #[serde(default = "default_quote")]
    pub quote: char,

    /// How characters are escaped inside the quotes.
    #[serde(default)]
    pub escape_style: EscapeStyle,
}

fn default_escape() -> bool {
    true
}

fn default_quote() -> char {
    '"'
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            escape: default_escape(),
            quote: default_quote(),
            escape_style: EscapeStyle::default(),
        }
    }
}

impl DispatchConfig {
    /// Builds the classifier these settings describe.
    pub fn classifier(&self) -> CommandClassifier {
        if self.escape {
            CommandClassifier::without_escape()
                .with_unescaper(Unescaper::new(self.quote, self.escape_style))
        } else {
            CommandClassifier::without_escape()
        }
    }
}

/// A sqlite data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Connection URL, e.g. `sqlite://data/sales.db` or `sqlite::memory:`.
    pub url: String,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    1
}

impl DataSourceConfig {
    /// Creates a data source config from a URL, validating it.
    pub fn from_url(url: &str) -> Result<Self> {
        let config = Self {
            url: url.to_string(),
            max_connections: default_max_connections(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the URL parses and uses the `sqlite` scheme.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| CellCmdError::config(format!("Invalid data source URL: {e}")))?;

        if url.scheme() != "sqlite" {
            return Err(CellCmdError::config(format!(
                "Invalid scheme '{}'. Expected 'sqlite'",
                url.scheme()
            )));
        }

        if self.max_connections == 0 {
            return Err(CellCmdError::config(
                "max_connections must be at least 1",
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cellcmd")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CellCmdError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string and validates every data source.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            CellCmdError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        for (name, source) in &config.data_sources {
            source
                .validate()
                .map_err(|e| CellCmdError::config(format!("Data source '{name}': {e}")))?;
        }

        Ok(config)
    }

    /// Fills in the `default` data source from [`DATABASE_URL_ENV`] when the
    /// file configures none.
    pub fn apply_env_defaults(&mut self) -> Result<()> {
        if self.data_sources.contains_key(&self.default_data_source) {
            return Ok(());
        }
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            let source = DataSourceConfig::from_url(&url)?;
            self.data_sources
                .insert(self.default_data_source.clone(), source);
        }
        Ok(())
    }

    /// Gets a named data source, or the default one if name is None.
    pub fn get_data_source(&self, name: Option<&str>) -> Option<&DataSourceConfig> {
        let key = name.unwrap_or(&self.default_data_source);
        self.data_sources.get(key)
    }
}
