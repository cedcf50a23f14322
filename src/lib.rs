//! tgrank - Telegram group ranking
//!
//! Reads a Telegram Desktop chat export, derives per-group metrics, scores
//! and ranks the groups, and renders a static HTML report with rank history.
//!
//! # Modules
//!
//! - [`parser`] - Export loading (zip, directory or `result.json`)
//! - [`extract`] - Per-group metrics from export chats
//! - [`scoring`] - Composite scores normalized across a run
//! - [`ranking`] - Stable dense ranking
//! - [`history`] - Append-only rank history
//! - [`report`] - HTML pages, index and CSV snapshot
//! - [`pipeline`] - End-to-end run orchestration
//! - [`config`] - Layered configuration
//! - [`error`] - Error types with rich context

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod hashtags;
pub mod history;
pub mod logging;
pub mod media;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod scoring;

pub use cli::*;
pub use config::Config;
pub use error::{RankError, Result, format_error, format_unknown_group, suggest_group};
pub use extract::GroupExtractor;
pub use hashtags::HashtagSets;
pub use history::HistoryStore;
pub use media::{DirectoryMediaLocator, MediaLocator, NoMedia};
pub use model::*;
pub use parser::ArchiveParser;
pub use pipeline::{Pipeline, RunSummary, compute_ranking};
pub use ranking::{Ranker, Ranking};
pub use scoring::Scorer;

/// Default export location, relative to the working directory
pub const DEFAULT_ARCHIVE: &str = "PS/result.zip";

/// Default report directory
pub const DEFAULT_OUTPUT_DIR: &str = "docs";

/// Default source photo directory
pub const DEFAULT_PHOTOS_DIR: &str = "Photos";

/// Standard width for header dividers in CLI output
pub const HEADER_DIVIDER_WIDTH: usize = 60;

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number_u64(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Shorten `s` to at most `max_chars` characters, ending in `...`.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
