//! Custom error types for tgrank.
//!
//! Archive problems are fatal for a run; everything that can degrade to a
//! default value (bad dates, bad history rows) is handled where it occurs and
//! never surfaces here.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for tgrank operations.
#[derive(Error, Debug)]
pub enum RankError {
    // =========================================================================
    // Archive Errors
    // =========================================================================
    /// Archive file or directory not found at the specified path.
    #[error("Archive not found at '{path}'")]
    ArchiveNotFound { path: PathBuf },

    /// Archive exists but does not look like a Telegram export.
    #[error("Invalid archive: {reason}")]
    InvalidArchive { reason: String },

    /// The export record set is missing from the archive.
    #[error("Missing '{file}' in archive '{archive}'")]
    MissingExportFile { file: String, archive: PathBuf },

    /// Failed to parse export data.
    #[error("Failed to parse '{file}': {reason}")]
    ParseError { file: String, reason: String },

    /// The export parsed but contains no chats at all.
    #[error("No chats found in '{file}'. Please verify the export content.")]
    NoChats { file: String },

    /// Zip container could not be read.
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // =========================================================================
    // History / Report Errors
    // =========================================================================
    /// CSV read/write failed.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// No history series exists for the requested group.
    #[error("No rank history for group '{name}'")]
    UnknownGroup { name: String },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for tgrank operations.
pub type Result<T> = std::result::Result<T, RankError>;

impl RankError {
    /// Create an archive not found error.
    pub fn archive_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ArchiveNotFound { path: path.into() }
    }

    /// Create an invalid archive error.
    pub fn invalid_archive(reason: impl Into<String>) -> Self {
        Self::InvalidArchive {
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown group error.
    pub fn unknown_group(name: impl Into<String>) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the archive itself is the problem (nothing was written).
    #[must_use]
    pub const fn is_archive_error(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound { .. }
                | Self::InvalidArchive { .. }
                | Self::MissingExportFile { .. }
                | Self::ParseError { .. }
                | Self::NoChats { .. }
                | Self::ZipError(_)
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ArchiveNotFound { .. } => Some(
                "Place the Telegram export at PS/result.zip or pass --archive <path>.",
            ),
            Self::MissingExportFile { .. } | Self::InvalidArchive { .. } => Some(
                "Export the chats from Telegram Desktop in machine-readable JSON format.",
            ),
            Self::NoChats { .. } => {
                Some("Include groups in the export (Settings > Advanced > Export Telegram data).")
            }
            Self::UnknownGroup { .. } => {
                Some("Run 'tgrank run' first, or check the group name spelling.")
            }
            Self::ConfigError { .. } => {
                Some("Run 'tgrank config --init' to write a fresh default config.")
            }
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| RankError::with_context(context, e))
    }
}

// =============================================================================
// CLI Error Rendering
// =============================================================================

use colored::Colorize;

/// Render an error for the terminal: a marked headline, then one line per hint.
#[must_use]
pub fn format_error(message: &str, hints: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), message.bold());
    for hint in hints {
        let _ = write!(output, "\n   {} {hint}", "Hint:".cyan());
    }
    output
}

/// Case-insensitive edit distance, one DP row.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().flat_map(char::to_lowercase).enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Closest recorded group name to `input`.
///
/// Names that start with the input win outright; otherwise the smallest edit
/// distance within a quarter of the name length (at least 2) is picked.
#[must_use]
pub fn suggest_group<'a>(input: &str, names: &[&'a str]) -> Option<&'a str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(name) = names
        .iter()
        .copied()
        .find(|name| name.to_lowercase().starts_with(&needle))
    {
        return Some(name);
    }
    names
        .iter()
        .map(|name| (*name, edit_distance(&needle, name)))
        .filter(|(name, distance)| *distance <= (name.chars().count() / 4).max(2))
        .min_by_key(|(_, distance)| *distance)
        .map(|(name, _)| name)
}

/// Error text for a group name missing from the history file.
#[must_use]
pub fn format_unknown_group(input: &str, names: &[&str]) -> String {
    let message = format!("Unknown group: '{input}'");
    match suggest_group(input, names) {
        Some(name) => {
            let hint = format!("Did you mean '{}'?", name.green());
            format_error(&message, &[hint.as_str()])
        }
        None => {
            let hint = format!("{} groups have history; check the spelling.", names.len());
            format_error(&message, &[hint.as_str()])
        }
    }
}
