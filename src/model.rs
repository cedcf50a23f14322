//! Data models for Telegram export data and the ranking pipeline.
//!
//! The `Export*` structures mirror the machine-readable `result.json` produced
//! by Telegram Desktop. Everything below them is the normalized form the
//! extractor, scorer and ranker pass along.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Export records
// =============================================================================

/// Root of a Telegram `result.json` export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    #[serde(default)]
    pub chats: ChatList,
}

/// The `chats` section of an export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatList {
    #[serde(default)]
    pub list: Vec<Chat>,
}

/// A conversation in the export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chat {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub messages: Vec<ExportMessage>,
}

/// A message or service event inside a chat
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub text: Option<MessageText>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Message text: either a plain string or a list of rich-text parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    Plain(String),
    Rich(Vec<TextPart>),
    Other(serde_json::Value),
}

/// One element of a rich-text list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextPart {
    Plain(String),
    Entity(TextEntity),
    Other(serde_json::Value),
}

/// Inline entity (hashtag, link, mention, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct TextEntity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl MessageText {
    /// Iterate over inline entities of the given type.
    pub fn entities_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let parts: &[TextPart] = match self {
            Self::Rich(parts) => parts,
            Self::Plain(_) | Self::Other(_) => &[],
        };
        parts.iter().filter_map(move |part| match part {
            TextPart::Entity(entity) if entity.kind == kind && !entity.text.is_empty() => {
                Some(entity.text.as_str())
            }
            _ => None,
        })
    }
}

// =============================================================================
// Pipeline types
// =============================================================================

/// Media shown for a titled item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "file", rename_all = "snake_case")]
pub enum MediaRef {
    /// File under `<group>/thumbs/` whose stem is the item's serial number
    Thumbnail(String),
    /// Fallback photo picked from `<group>/`
    Photo(String),
    /// Nothing available
    Placeholder,
}

impl MediaRef {
    /// Whether the referenced file is an animated gif.
    #[must_use]
    pub fn is_gif(&self) -> bool {
        match self {
            Self::Thumbnail(file) | Self::Photo(file) => {
                file.to_lowercase().ends_with(".gif")
            }
            Self::Placeholder => false,
        }
    }
}

/// A topic created inside a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitledItem {
    pub title: String,
    pub external_message_id: i64,
    pub date: NaiveDate,
    /// 1-based position in export order
    pub serial_number: u32,
    pub media: MediaRef,
}

/// Raw per-group metrics derived from the export
#[derive(Debug, Clone, Serialize)]
pub struct GroupMetrics {
    pub group_id: i64,
    pub group_name: String,
    pub total_messages: u64,
    /// Normalized hashtag -> occurrences (never zero)
    pub hashtag_counts: BTreeMap<String, u64>,
    /// Days since the newest dated message
    pub most_recent_age_days: Option<i64>,
    /// Sorted by date, newest first
    pub titled_items: Vec<TitledItem>,
}

impl GroupMetrics {
    /// Occurrences of an already-normalized hashtag.
    #[must_use]
    pub fn hashtag_count(&self, tag: &str) -> u64 {
        self.hashtag_counts.get(tag).copied().unwrap_or(0)
    }

    /// Sum of counts over a set of normalized hashtags.
    pub fn total_for<'a>(&self, tags: impl IntoIterator<Item = &'a String>) -> u64 {
        tags.into_iter().map(|tag| self.hashtag_count(tag)).sum()
    }

    /// Group id as used in `t.me/c/` links (supergroup `-100` prefix removed).
    #[must_use]
    pub fn link_id(&self) -> String {
        let id = self.group_id.to_string();
        id.strip_prefix("-100").map_or_else(|| id.clone(), str::to_string)
    }

    /// Deep link to a message in this group.
    #[must_use]
    pub fn message_link(&self, message_id: i64) -> String {
        format!("https://t.me/c/{}/{message_id}", self.link_id())
    }
}

/// Individual score components
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub hashtag: f64,
    pub volume: f64,
    pub recency: f64,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.hashtag + self.volume + self.recency
    }
}

/// A group with its composite score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredGroup {
    #[serde(flatten)]
    pub metrics: GroupMetrics,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
}

/// A scored group with its dense rank (1 = best)
#[derive(Debug, Clone, Serialize)]
pub struct RankedGroup {
    pub rank: usize,
    #[serde(flatten)]
    pub group: ScoredGroup,
}

impl RankedGroup {
    #[must_use]
    pub fn metrics(&self) -> &GroupMetrics {
        &self.group.metrics
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.group.metrics.group_name
    }
}

/// One row of rank history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: String,
    #[serde(rename = "group name")]
    pub group_name: String,
    pub rank: i64,
}

/// A point in a group's rank series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub date: String,
    pub rank: i64,
}
