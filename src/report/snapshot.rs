//! Per-run snapshot CSV (`output.csv`), overwritten on every run.

use crate::error::{RankError, Result};
use crate::hashtags::{HashtagSets, TAG_FIVE, TAG_FOUR, TAG_THREE};
use crate::model::RankedGroup;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize)]
struct SnapshotRow<'a> {
    date: &'a str,
    #[serde(rename = "group name")]
    group_name: &'a str,
    #[serde(rename = "total messages")]
    total_messages: u64,
    #[serde(rename = "Datedifference")]
    date_difference: String,
    #[serde(rename = "count of the hashtag \"#FIVE\"")]
    five: u64,
    #[serde(rename = "count of the hashtag \"#FOUR\"")]
    four: u64,
    #[serde(rename = "count of the hashtag \"#Three\"")]
    three: u64,
    #[serde(rename = "count of the hashtag \"#SceneType\"")]
    scene_types: u64,
    score: f64,
    rank: usize,
    #[serde(rename = "total titles")]
    total_titles: usize,
}

impl<'a> SnapshotRow<'a> {
    fn new(date: &'a str, ranked: &'a RankedGroup, hashtags: &HashtagSets) -> Self {
        let metrics = ranked.metrics();
        Self {
            date,
            group_name: &metrics.group_name,
            total_messages: metrics.total_messages,
            date_difference: metrics
                .most_recent_age_days
                .map_or_else(|| "N/A".to_string(), |days| days.to_string()),
            five: metrics.hashtag_count(TAG_FIVE),
            four: metrics.hashtag_count(TAG_FOUR),
            three: metrics.hashtag_count(TAG_THREE),
            scene_types: metrics.total_for(&hashtags.scene_types),
            score: ranked.group.score,
            rank: ranked.rank,
            total_titles: metrics.titled_items.len(),
        }
    }
}

/// Write the snapshot rows, in rank order, to any writer.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_snapshot_to<W: std::io::Write>(
    writer: W,
    run_date: &str,
    groups: &[RankedGroup],
    hashtags: &HashtagSets,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for ranked in groups {
        csv_writer.serialize(SnapshotRow::new(run_date, ranked, hashtags))?;
    }
    if groups.is_empty() {
        // serde only emits the header alongside the first row
        csv_writer.write_record(HEADER)?;
    }
    csv_writer.flush()?;
    Ok(())
}

const HEADER: [&str; 11] = [
    "date",
    "group name",
    "total messages",
    "Datedifference",
    "count of the hashtag \"#FIVE\"",
    "count of the hashtag \"#FOUR\"",
    "count of the hashtag \"#Three\"",
    "count of the hashtag \"#SceneType\"",
    "score",
    "rank",
    "total titles",
];

/// Overwrite `path` with this run's snapshot.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_snapshot(
    path: &Path,
    run_date: &str,
    groups: &[RankedGroup],
    hashtags: &HashtagSets,
) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| RankError::path_error("create", path, e))?;
    write_snapshot_to(file, run_date, groups, hashtags)?;
    debug!(rows = groups.len(), "Wrote snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupMetrics, ScoreBreakdown, ScoredGroup};
    use std::collections::BTreeMap;

    fn ranked(rank: usize, name: &str, age: Option<i64>, tags: &[(&str, u64)]) -> RankedGroup {
        RankedGroup {
            rank,
            group: ScoredGroup {
                metrics: GroupMetrics {
                    group_id: 7,
                    group_name: name.to_string(),
                    total_messages: 12,
                    hashtag_counts: tags
                        .iter()
                        .map(|(t, c)| ((*t).to_string(), *c))
                        .collect::<BTreeMap<_, _>>(),
                    most_recent_age_days: age,
                    titled_items: vec![],
                },
                breakdown: ScoreBreakdown::default(),
                score: 21.5,
            },
        }
    }

    fn render(groups: &[RankedGroup]) -> String {
        let mut out = Vec::new();
        write_snapshot_to(&mut out, "2025-03-01", groups, &HashtagSets::default()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_and_rows_in_rank_order() {
        let csv = render(&[
            ranked(1, "Owls", Some(2), &[("#FIVE", 2), ("#THREE", 1), ("#FM", 3), ("#FFM", 1)]),
            ranked(2, "Larks, Inc", None, &[]),
        ]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "date,group name,total messages,Datedifference,\
             \"count of the hashtag \"\"#FIVE\"\"\",\"count of the hashtag \"\"#FOUR\"\"\",\
             \"count of the hashtag \"\"#Three\"\"\",\"count of the hashtag \"\"#SceneType\"\"\",\
             score,rank,total titles"
        );
        assert_eq!(lines[1], "2025-03-01,Owls,12,2,2,0,1,4,21.5,1,0");
        assert_eq!(lines[2], "2025-03-01,\"Larks, Inc\",12,N/A,0,0,0,0,21.5,2,0");
    }

    #[test]
    fn empty_run_still_has_header() {
        let csv = render(&[]);
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("date,group name"));
    }
}
