//! Special hashtag sets and case normalization.
//!
//! Rating tags and scene-type tags are counted case-insensitively (folded to
//! upper case); every other hashtag keeps the casing it was written with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TAG_FIVE: &str = "#FIVE";
pub const TAG_FOUR: &str = "#FOUR";
pub const TAG_THREE: &str = "#THREE";

const DEFAULT_RATINGS: &[&str] = &[TAG_FIVE, TAG_FOUR, TAG_THREE];

const DEFAULT_SCENE_TYPES: &[&str] = &[
    "#FM", "#FF", "#FFM", "#FFFM", "#FFFFM", "#FMM", "#FMMM", "#FMMMM", "#FFMM", "#FFFMMM",
    "#ORGY",
];

/// Which bucket a normalized hashtag falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Rating,
    SceneType,
    Other,
}

/// The two closed sets of special hashtags.
///
/// Members are stored upper-cased; lookups fold the candidate the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashtagSets {
    pub ratings: BTreeSet<String>,
    pub scene_types: BTreeSet<String>,
}

impl Default for HashtagSets {
    fn default() -> Self {
        Self::new(
            DEFAULT_RATINGS.iter().copied(),
            DEFAULT_SCENE_TYPES.iter().copied(),
        )
    }
}

impl HashtagSets {
    /// Build sets from arbitrary tag lists (case of the input is irrelevant).
    pub fn new<'a>(
        ratings: impl IntoIterator<Item = &'a str>,
        scene_types: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            ratings: ratings.into_iter().map(str::to_uppercase).collect(),
            scene_types: scene_types.into_iter().map(str::to_uppercase).collect(),
        }
    }

    /// Normalize a raw hashtag to its counting key.
    #[must_use]
    pub fn normalize(&self, tag: &str) -> String {
        let upper = tag.to_uppercase();
        if self.ratings.contains(&upper) || self.scene_types.contains(&upper) {
            upper
        } else {
            tag.to_string()
        }
    }

    /// Classify an already-normalized hashtag.
    #[must_use]
    pub fn classify(&self, normalized: &str) -> TagClass {
        if self.ratings.contains(normalized) {
            TagClass::Rating
        } else if self.scene_types.contains(normalized) {
            TagClass::SceneType
        } else {
            TagClass::Other
        }
    }

    /// Re-fold members loaded from user config.
    pub(crate) fn canonicalize(&mut self) {
        self.ratings = self.ratings.iter().map(|t| t.to_uppercase()).collect();
        self.scene_types = self.scene_types.iter().map(|t| t.to_uppercase()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_fold_to_upper_case() {
        let sets = HashtagSets::default();
        for raw in ["#five", "#Five", "#FIVE", "#fIvE"] {
            assert_eq!(sets.normalize(raw), TAG_FIVE);
        }
        assert_eq!(sets.normalize("#Three"), TAG_THREE);
    }

    #[test]
    fn scene_types_fold_to_upper_case() {
        let sets = HashtagSets::default();
        assert_eq!(sets.normalize("#ffm"), "#FFM");
        assert_eq!(sets.normalize("#Orgy"), "#ORGY");
    }

    #[test]
    fn other_tags_keep_their_casing() {
        let sets = HashtagSets::default();
        assert_eq!(sets.normalize("#random"), "#random");
        assert_eq!(sets.normalize("#MixedCase"), "#MixedCase");
        assert_eq!(sets.normalize("#fives"), "#fives");
    }

    #[test]
    fn custom_sets_replace_defaults() {
        let sets = HashtagSets::new(["#gold", "#Silver"], ["#duo"]);
        assert_eq!(sets.normalize("#Gold"), "#GOLD");
        assert_eq!(sets.normalize("#five"), "#five");
        assert_eq!(sets.classify("#SILVER"), TagClass::Rating);
        assert_eq!(sets.classify("#DUO"), TagClass::SceneType);
        assert_eq!(sets.classify("#five"), TagClass::Other);
    }

    #[test]
    fn default_scene_type_set_has_eleven_members() {
        assert_eq!(HashtagSets::default().scene_types.len(), 11);
        assert_eq!(HashtagSets::default().ratings.len(), 3);
    }

    #[test]
    fn canonicalize_folds_config_values() {
        let mut sets = HashtagSets {
            ratings: ["#five".to_string()].into_iter().collect(),
            scene_types: BTreeSet::new(),
        };
        sets.canonicalize();
        assert!(sets.ratings.contains(TAG_FIVE));
    }
}
