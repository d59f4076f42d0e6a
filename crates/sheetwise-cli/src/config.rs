//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use sheetwise_extractor::PipelineConfig;
use sheetwise_llm::chat::{DEFAULT_ENDPOINT, DEFAULT_MAX_RETRIES, DEFAULT_MODEL};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".sheetwise";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "index.db";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Chunking, retrieval and extraction settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Index database; `~/.sheetwise/index.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// PDFs parsed at once during ingestion
    #[serde(default = "default_workers")]
    pub max_concurrent_documents: usize,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the config file and default database.
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(CONFIG_DIR))
    }

    /// Get the configuration file path, honouring an explicit override.
    pub fn path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(Self::home()?.join(CONFIG_FILE)),
        }
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.pipeline.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Database path, with an optional command-line override.
    pub fn database_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit.or(self.settings.database.as_deref()) {
            return Ok(path.to_path_buf());
        }
        Ok(Self::home()?.join(DATABASE_FILE))
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            database: None,
            max_concurrent_documents: default_workers(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_workers() -> usize {
    sheetwise_ingest::DEFAULT_MAX_CONCURRENT_DOCUMENTS
}
