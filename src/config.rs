//! Configuration system for tgrank.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/tgrank/config.toml`
//! 3. **Explicit config file** - `--config <path>`
//! 4. **Environment variables** - `TGRANK_*` prefix
//! 5. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! archive = "PS/result.zip"
//! output = "docs"
//! photos = "Photos"
//!
//! [hashtags]
//! ratings = ["#FIVE", "#FOUR", "#THREE"]
//! scene_types = ["#FM", "#FF", "#FFM"]
//!
//! [scoring]
//! five_weight = 10.0
//! volume_scale = 10.0
//!
//! [extract]
//! eligible_types = ["private_group", "private_supergroup"]
//!
//! [media]
//! seed = 42
//!
//! [output]
//! colors = true
//! ```

use crate::error::{RankError, Result};
use crate::extract::ExtractConfig;
use crate::hashtags::HashtagSets;
use crate::media::MediaExtensions;
use crate::scoring::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure for tgrank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub hashtags: HashtagSets,
    pub scoring: ScoringConfig,
    pub extract: ExtractConfig,
    pub media: MediaConfig,
    pub output: OutputConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Telegram export (`.zip`, directory or `result.json`).
    /// Environment variable: `TGRANK_ARCHIVE`
    pub archive: PathBuf,

    /// Report output directory.
    /// Environment variable: `TGRANK_OUTPUT`
    pub output: PathBuf,

    /// Source photo directory, copied into the report.
    /// Environment variable: `TGRANK_PHOTOS`
    pub photos: PathBuf,
}

/// Thumbnail lookup settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Seed for the fallback photo pick; unset means OS entropy.
    /// Environment variable: `TGRANK_SEED`
    pub seed: Option<u64>,

    pub extensions: MediaExtensions,
}

/// Terminal output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Enable colored output.
    pub colors: bool,

    /// Suppress progress bars and summaries.
    pub quiet: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archive: PathBuf::from(crate::DEFAULT_ARCHIVE),
            output: PathBuf::from(crate::DEFAULT_OUTPUT_DIR),
            photos: PathBuf::from(crate::DEFAULT_PHOTOS_DIR),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            colors: true,
            quiet: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Explicit config file, when given
    /// 3. User config file (~/.config/tgrank/config.toml)
    /// 4. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested config file is missing or
    /// malformed. A broken user config file is only warned about.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::user_config_path();
        let mut config = Self::load_layered(user.as_deref(), explicit)?;

        config.apply_env_overrides();
        config.hashtags.canonicalize();

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Merge the user file and the explicit file over the defaults.
    ///
    /// Keys set in the explicit file win; keys it leaves out keep the user
    /// file's value, and tables are merged key by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or malformed.
    pub fn load_layered(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut table = user.and_then(Self::read_user_table).unwrap_or_default();

        if let Some(path) = explicit {
            let overlay = Self::read_table(path)?;
            Self::from_table(path, overlay.clone())?;
            merge_tables(&mut table, overlay);
            info!("Loaded config from: {}", path.display());
        }

        let source = explicit.or(user).unwrap_or_else(|| Path::new("config.toml"));
        Self::from_table(source, table)
    }

    /// Load configuration from a single file over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config = Self::from_table(path, Self::read_table(path)?)?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RankError::path_error("read config", path, e))?;
        toml::from_str(&content).map_err(|e| RankError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn from_table(path: &Path, table: toml::Table) -> Result<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| RankError::ConfigError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// The user file as a table, validated on its own so a broken user file
    /// is dropped whole.
    fn read_user_table(path: &Path) -> Option<toml::Table> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }
        let table = Self::read_table(path)
            .and_then(|table| Self::from_table(path, table.clone()).map(|_| table));
        match table {
            Ok(table) => {
                info!("Loaded user config from: {}", path.display());
                Some(table)
            }
            Err(e) => {
                warn!("Ignoring user config: {e}");
                None
            }
        }
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tgrank").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(archive) = var("TGRANK_ARCHIVE") {
            self.paths.archive = PathBuf::from(archive);
        }
        if let Some(output) = var("TGRANK_OUTPUT") {
            self.paths.output = PathBuf::from(output);
        }
        if let Some(photos) = var("TGRANK_PHOTOS") {
            self.paths.photos = PathBuf::from(photos);
        }
        if let Some(seed) = var("TGRANK_SEED") {
            match seed.parse() {
                Ok(n) => self.media.seed = Some(n),
                Err(_) => warn!("Ignoring invalid TGRANK_SEED: {seed}"),
            }
        }
        if var("TGRANK_NO_COLOR").is_some() || var("NO_COLOR").is_some() {
            self.output.colors = false;
        }
        if var("TGRANK_QUIET").is_some() {
            self.output.quiet = true;
        }
    }

    /// Save the current configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RankError::path_error("create", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| RankError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| RankError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }
}

/// Overlay `overlay` onto `base`, recursing into tables present in both.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
