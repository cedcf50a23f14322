//! Stable ranking and history accumulation.

use crate::history::HistoryStore;
use crate::model::{RankedGroup, ScoredGroup};
use std::collections::HashSet;
use tracing::debug;

/// Result of ranking one run: groups in rank order plus the updated history.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub groups: Vec<RankedGroup>,
    pub history: HistoryStore,
}

/// Assigns dense ranks and records them in the history store.
#[derive(Debug, Clone)]
pub struct Ranker {
    run_date: String,
}

impl Ranker {
    /// `run_date` is the history key for this run (`YYYY-MM-DD`).
    pub fn new(run_date: impl Into<String>) -> Self {
        Self {
            run_date: run_date.into(),
        }
    }

    /// Sort by score descending and number the groups `1..=N`.
    ///
    /// Equal scores keep their input order. Each display name gets one new
    /// history row for the run date, even when the same date is already
    /// present. Groups sharing a name record only the best rank among them.
    #[must_use]
    pub fn rank(&self, mut groups: Vec<ScoredGroup>, mut history: HistoryStore) -> Ranking {
        // slice::sort_by is stable
        groups.sort_by(|a, b| b.score.total_cmp(&a.score));

        let groups: Vec<RankedGroup> = groups
            .into_iter()
            .enumerate()
            .map(|(idx, group)| RankedGroup {
                rank: idx + 1,
                group,
            })
            .collect();

        let mut recorded: HashSet<&str> = HashSet::with_capacity(groups.len());
        for ranked in &groups {
            if recorded.insert(ranked.name()) {
                #[allow(clippy::cast_possible_wrap)]
                history.record(&self.run_date, ranked.name(), ranked.rank as i64);
            } else {
                debug!(
                    group = ranked.name(),
                    rank = ranked.rank,
                    "Name already recorded for this run, skipping history row"
                );
            }
            debug!(
                rank = ranked.rank,
                group = ranked.name(),
                score = ranked.group.score,
                "Ranked group"
            );
        }

        Ranking { groups, history }
    }
}
