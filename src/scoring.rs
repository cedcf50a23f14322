//! Composite group scoring.
//!
//! ```text
//! hashtag = w5 * #FIVE + w4 * #FOUR + w3 * #THREE
//! volume  = total_messages / max_total_messages * volume_scale     (0 if max = 0)
//! recency = recency_scale * (1 - (age - min_age) / (max_age - min_age))
//!           recency_scale when every dated group has the same age
//!           0 for groups without any dated message
//! score   = hashtag + volume + recency
//! ```
//!
//! Volume and recency are min-max normalized across all groups in one run, so
//! a group's score depends on the other groups scored alongside it.

use crate::hashtags::{TAG_FIVE, TAG_FOUR, TAG_THREE};
use crate::model::{GroupMetrics, ScoreBreakdown, ScoredGroup};
use serde::{Deserialize, Serialize};

/// Weights and scales for the score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub five_weight: f64,
    pub four_weight: f64,
    pub three_weight: f64,
    pub volume_scale: f64,
    pub recency_scale: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            five_weight: 10.0,
            four_weight: 5.0,
            three_weight: 1.0,
            volume_scale: 10.0,
            recency_scale: 10.0,
        }
    }
}

/// Run-wide extremes used for normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBounds {
    pub max_total_messages: u64,
    /// `(min_age, max_age)` over groups that have an age
    pub age_range: Option<(i64, i64)>,
}

impl RunBounds {
    #[must_use]
    pub fn from_groups(groups: &[GroupMetrics]) -> Self {
        let max_total_messages = groups.iter().map(|g| g.total_messages).max().unwrap_or(0);
        let age_range = groups
            .iter()
            .filter_map(|g| g.most_recent_age_days)
            .fold(None, |range: Option<(i64, i64)>, age| {
                Some(range.map_or((age, age), |(lo, hi)| (lo.min(age), hi.max(age))))
            });
        Self {
            max_total_messages,
            age_range,
        }
    }
}

/// Turns raw metrics into comparable scores.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every group of a run. Order is preserved.
    #[must_use]
    pub fn score_all(&self, groups: Vec<GroupMetrics>) -> Vec<ScoredGroup> {
        let bounds = RunBounds::from_groups(&groups);
        groups
            .into_iter()
            .map(|metrics| {
                let breakdown = self.breakdown(&metrics, bounds);
                ScoredGroup {
                    score: breakdown.total(),
                    breakdown,
                    metrics,
                }
            })
            .collect()
    }

    /// Component scores for one group given the run's bounds.
    #[must_use]
    pub fn breakdown(&self, metrics: &GroupMetrics, bounds: RunBounds) -> ScoreBreakdown {
        ScoreBreakdown {
            hashtag: self.hashtag_component(metrics),
            volume: self.volume_component(metrics.total_messages, bounds.max_total_messages),
            recency: self.recency_component(metrics.most_recent_age_days, bounds.age_range),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn hashtag_component(&self, metrics: &GroupMetrics) -> f64 {
        self.config.five_weight * metrics.hashtag_count(TAG_FIVE) as f64
            + self.config.four_weight * metrics.hashtag_count(TAG_FOUR) as f64
            + self.config.three_weight * metrics.hashtag_count(TAG_THREE) as f64
    }

    #[allow(clippy::cast_precision_loss)]
    fn volume_component(&self, total_messages: u64, max_total_messages: u64) -> f64 {
        if max_total_messages == 0 {
            return 0.0;
        }
        total_messages as f64 / max_total_messages as f64 * self.config.volume_scale
    }

    #[allow(clippy::cast_precision_loss)]
    fn recency_component(&self, age: Option<i64>, age_range: Option<(i64, i64)>) -> f64 {
        let (Some(age), Some((min_age, max_age))) = (age, age_range) else {
            return 0.0;
        };
        if max_age == min_age {
            return self.config.recency_scale;
        }
        let spread = (max_age - min_age) as f64;
        let relative = (age - min_age) as f64 / spread;
        (self.config.recency_scale * (1.0 - relative)).max(0.0)
    }
}
