//! Append-only rank history.
//!
//! History lives in a CSV file with the header `date,group name,rank`. It is
//! read fully at the start of a run and only this run's rows are appended at
//! the end. Series are keyed by group display name, so a renamed group starts
//! a new series.
//!
//! There is no file locking: two runs writing into the same output directory
//! at once can interleave rows. Callers must serialize runs.

use crate::error::{RankError, Result};
use crate::model::{HistoryPoint, HistoryRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info, warn};

const HEADER: [&str; 3] = ["date", "group name", "rank"];
const UNKNOWN_GROUP: &str = "Unknown";

/// Row as read back from disk; every field is optional so that one bad row
/// never aborts loading.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "group name", default)]
    group_name: Option<String>,
    #[serde(default)]
    rank: Option<String>,
}

/// Per-group rank series plus the rows recorded during this run.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    series: HashMap<String, Vec<HistoryPoint>>,
    pending: Vec<HistoryRecord>,
    skipped: usize,
}

impl HistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load history from `path`; a missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be opened or its
    /// header cannot be read. Individual bad rows are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No existing history at {}", path.display());
            return Ok(Self::new());
        }

        let file = std::fs::File::open(path)
            .map_err(|e| RankError::path_error("open", path, e))?;
        let store = Self::from_reader(file)?;
        info!(
            entries = store.len(),
            skipped = store.skipped,
            "Loaded history from {}",
            path.display()
        );
        Ok(store)
    }

    /// Load history from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV header cannot be read.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        let mut store = Self::new();
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        for (line, row) in csv_reader.deserialize::<RawRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(line = line + 2, error = %e, "Skipping unreadable history row");
                    store.skipped += 1;
                    continue;
                }
            };
            let group = row
                .group_name
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
            let Some(rank) = row.rank.as_deref().and_then(parse_rank) else {
                warn!(
                    group = %group,
                    rank = ?row.rank,
                    "Skipping history row with invalid rank"
                );
                store.skipped += 1;
                continue;
            };
            store.series.entry(group).or_default().push(HistoryPoint {
                date: row.date.unwrap_or_default(),
                rank,
            });
        }

        Ok(store)
    }

    /// Number of history points across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows dropped while loading.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// A group's series, oldest first. Empty for unknown groups.
    #[must_use]
    pub fn series(&self, group_name: &str) -> &[HistoryPoint] {
        self.series.get(group_name).map_or(&[], Vec::as_slice)
    }

    /// Names of every group with at least one entry, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Append a rank for this run. No deduplication by date.
    pub fn record(&mut self, date: &str, group_name: &str, rank: i64) {
        self.series
            .entry(group_name.to_string())
            .or_default()
            .push(HistoryPoint {
                date: date.to_string(),
                rank,
            });
        self.pending.push(HistoryRecord {
            date: date.to_string(),
            group_name: group_name.to_string(),
            rank,
        });
    }

    /// Rows recorded since load and not yet persisted.
    #[must_use]
    pub fn pending(&self) -> &[HistoryRecord] {
        &self.pending
    }

    /// Append pending rows to `path`, writing the header for a new file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn persist(&mut self, path: &Path) -> Result<usize> {
        if self.pending.is_empty() {
            info!("No new history entries to append to {}", path.display());
            return Ok(0);
        }

        let needs_header = std::fs::metadata(path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| RankError::path_error("append to", path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
        }
        for record in &self.pending {
            writer.serialize(record)?;
        }
        writer
            .flush()
            .map_err(|e| RankError::path_error("write", path, e))?;

        let appended = self.pending.len();
        self.pending.clear();
        debug!(appended, "Appended history rows to {}", path.display());
        Ok(appended)
    }
}

/// Ranks may have been written as floats ("3.0").
fn parse_rank(value: &str) -> Option<i64> {
    if let Ok(rank) = value.parse::<i64>() {
        return Some(rank);
    }
    let float: f64 = value.parse().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    float.is_finite().then(|| float.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_series_per_group_in_file_order() {
        let csv = "date,group name,rank\n\
                   2025-01-01,Owls,2\n\
                   2025-01-01,Larks,1\n\
                   2025-01-02,Owls,1\n";
        let store = HistoryStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.series("Owls"),
            &[
                HistoryPoint { date: "2025-01-01".into(), rank: 2 },
                HistoryPoint { date: "2025-01-02".into(), rank: 1 },
            ]
        );
        assert_eq!(store.group_names(), vec!["Larks", "Owls"]);
    }

    #[test]
    fn skips_rows_with_bad_rank() {
        let csv = "date,group name,rank\n\
                   2025-01-01,Owls,two\n\
                   2025-01-01,Larks,\n\
                   2025-01-02,Owls,3.0\n";
        let store = HistoryStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.skipped(), 2);
        assert_eq!(store.series("Owls")[0].rank, 3);
        assert!(store.series("Larks").is_empty());
    }

    #[test]
    fn missing_group_name_goes_to_unknown() {
        let csv = "date,group name,rank\n2025-01-01,,4\n";
        let store = HistoryStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.series("Unknown")[0].rank, 4);
    }

    #[test]
    fn parse_rank_accepts_integers_and_floats() {
        assert_eq!(parse_rank("7"), Some(7));
        assert_eq!(parse_rank("7.9"), Some(7));
        assert_eq!(parse_rank("NaN"), None);
        assert_eq!(parse_rank("x"), None);
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::load(&dir.path().join("history.csv")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn persist_appends_with_single_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let mut store = HistoryStore::load(&path).unwrap();
        store.record("2025-03-01", "Owls", 1);
        store.record("2025-03-01", "Larks", 2);
        assert_eq!(store.persist(&path).unwrap(), 2);
        assert!(store.pending().is_empty());

        let mut store = HistoryStore::load(&path).unwrap();
        store.record("2025-03-01", "Owls", 2);
        assert_eq!(store.persist(&path).unwrap(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "date,group name,rank\n\
             2025-03-01,Owls,1\n\
             2025-03-01,Larks,2\n\
             2025-03-01,Owls,2\n"
        );

        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.series("Owls").len(), 2);
    }

    #[test]
    fn persist_without_pending_rows_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        let mut store = HistoryStore::new();
        assert_eq!(store.persist(&path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn group_names_with_commas_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        let mut store = HistoryStore::new();
        store.record("2025-03-01", "Owls, Larks & Co", 1);
        store.persist(&path).unwrap();

        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.series("Owls, Larks & Co").len(), 1);
    }
}
