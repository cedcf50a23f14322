//! CLI definitions for tgrank.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tgrank - Rank Telegram groups from a chat export
#[derive(Parser, Debug)]
#[command(name = "tgrank")]
#[command(version)]
#[command(about = "Rank Telegram groups from a chat export and publish a static report")]
#[command(long_about = r#"
tgrank reads a Telegram Desktop export (result.json, usually zipped), scores
every private group by rating hashtags, message volume and recency, and
writes a static HTML report with per-group pages and rank history.

Quick start:
  1. Export your chats from Telegram Desktop as machine-readable JSON
  2. Zip the export to PS/result.zip (or pass --archive)
  3. Run: tgrank run
  4. Open docs/index.html
"#)]
pub struct Cli {
    /// Path to a config file (overrides ~/.config/tgrank/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank all groups and write the HTML report
    Run(RunArgs),

    /// Rank all groups and print the result without writing anything
    Rank(RankArgs),

    /// Show the rank history of one group
    History(HistoryArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Telegram export: .zip, directory or result.json
    #[arg(long, short = 'a', env = "TGRANK_ARCHIVE")]
    pub archive: Option<PathBuf>,

    /// Report output directory
    #[arg(long, short = 'o', env = "TGRANK_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Source photo directory
    #[arg(long, env = "TGRANK_PHOTOS")]
    pub photos: Option<PathBuf>,

    /// Seed for fallback photo selection
    #[arg(long, env = "TGRANK_SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct RankArgs {
    /// Telegram export: .zip, directory or result.json
    #[arg(long, short = 'a', env = "TGRANK_ARCHIVE")]
    pub archive: Option<PathBuf>,

    /// Seed for fallback photo selection
    #[arg(long, env = "TGRANK_SEED")]
    pub seed: Option<u64>,

    /// Only show the top N groups
    #[arg(long, short = 'n')]
    pub top: Option<usize>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Group display name
    pub group: String,

    /// Report output directory holding history.csv
    #[arg(long, short = 'o', env = "TGRANK_OUTPUT")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default config file to the user config location
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    Csv,
}
