//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sheetwise - pull connector attributes out of PDF datasheets.
#[derive(Debug, Parser)]
#[command(name = "sheetwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (values only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index PDF datasheets, replacing whatever was indexed before
    Ingest(IngestArgs),

    /// Run the attribute battery against the index and/or web text
    Extract(ExtractArgs),

    /// Similarity search over indexed chunks
    Search(SearchArgs),

    /// List the attribute catalog
    Attributes(AttributesArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// PDF files to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Index database (defaults to ~/.sheetwise/index.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Documents parsed at once
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Part number mentioned in prompts and retrieval queries
    #[arg(short, long)]
    pub part_number: Option<String>,

    /// Restrict the batch to these attributes (repeatable)
    #[arg(short, long = "attribute")]
    pub attributes: Vec<String>,

    /// File with cleaned `key: value` web text
    #[arg(long, conflicts_with = "web_json")]
    pub web_text: Option<PathBuf>,

    /// File with a product API JSON document
    #[arg(long)]
    pub web_json: Option<PathBuf>,

    /// Name recorded for the web text
    #[arg(long, default_value = "web")]
    pub web_source: String,

    /// Retry NOT FOUND attributes against the web text
    #[arg(long)]
    pub web_fallback: bool,

    /// Use only the web text even if documents are indexed
    #[arg(long)]
    pub web_only: bool,

    /// Attribute catalog TOML replacing the built-in battery
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Index database (defaults to ~/.sheetwise/index.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Seconds between completion calls
    #[arg(long)]
    pub pacing: Option<f64>,

    /// API key for the completion endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Show source, raw output and diagnostics per attribute
    #[arg(short, long)]
    pub details: bool,
}

/// Arguments for the search command.
#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "3")]
    pub limit: usize,

    /// Index database (defaults to ~/.sheetwise/index.db)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Arguments for the attributes command.
#[derive(Debug, Parser)]
pub struct AttributesArgs {
    /// Attribute catalog TOML replacing the built-in battery
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print the full instructions of one attribute
    #[arg(short, long)]
    pub show: Option<String>,

    /// Write the catalog as TOML to this file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a configuration file
    Init {
        /// Pipeline preset
        #[arg(short, long, value_enum, default_value = "default")]
        preset: PresetArg,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Pipeline presets.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum PresetArg {
    /// Balanced defaults
    Default,
    /// Slow pacing for free-tier rate limits
    Conservative,
    /// No pacing, zero temperature, web fallback on
    Deterministic,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<PresetArg> for sheetwise_extractor::PipelineConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => Self::default(),
            PresetArg::Conservative => Self::conservative(),
            PresetArg::Deterministic => Self::deterministic(),
        }
    }
}
