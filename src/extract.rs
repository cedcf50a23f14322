//! Group extraction: from export chats to per-group raw metrics.

use crate::error::{RankError, Result};
use crate::hashtags::HashtagSets;
use crate::media::MediaLocator;
use crate::model::{Chat, Export, ExportMessage, GroupMetrics, TitledItem};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const MESSAGE_TYPE: &str = "message";
const HASHTAG_ENTITY: &str = "hashtag";

/// Which chats count as groups and which event creates a titled item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Chat `type` values that qualify as private groups.
    pub eligible_types: Vec<String>,
    /// Service `action` marking a topic creation.
    pub topic_action: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            eligible_types: vec!["private_group".to_string(), "private_supergroup".to_string()],
            topic_action: "topic_created".to_string(),
        }
    }
}

/// Derives [`GroupMetrics`] for every eligible chat in an export.
pub struct GroupExtractor<'a> {
    config: &'a ExtractConfig,
    hashtags: &'a HashtagSets,
    now: NaiveDateTime,
}

impl<'a> GroupExtractor<'a> {
    /// `now` is the run time that ages are measured against.
    #[must_use]
    pub const fn new(
        config: &'a ExtractConfig,
        hashtags: &'a HashtagSets,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            config,
            hashtags,
            now,
        }
    }

    /// Whether a chat is a private group/supergroup.
    #[must_use]
    pub fn is_eligible(&self, chat: &Chat) -> bool {
        chat.kind
            .as_deref()
            .is_some_and(|kind| self.config.eligible_types.iter().any(|t| t == kind))
    }

    /// Extract metrics for all eligible groups, in export order.
    ///
    /// # Errors
    ///
    /// Returns an error if an eligible chat has no numeric id.
    pub fn extract(
        &self,
        export: &Export,
        media: &mut dyn MediaLocator,
    ) -> Result<Vec<GroupMetrics>> {
        let mut groups = Vec::new();
        for chat in export.chats.list.iter().filter(|c| self.is_eligible(c)) {
            groups.push(self.extract_group(chat, media)?);
        }
        info!(
            chats = export.chats.list.len(),
            groups = groups.len(),
            "Extracted eligible groups"
        );
        Ok(groups)
    }

    fn extract_group(&self, chat: &Chat, media: &mut dyn MediaLocator) -> Result<GroupMetrics> {
        let group_name = chat
            .name
            .clone()
            .unwrap_or_else(|| "Unknown Group".to_string());
        let group_id = chat.id.ok_or_else(|| {
            RankError::invalid_archive(format!("group '{group_name}' has no numeric id"))
        })?;

        let mut total_messages = 0u64;
        let mut hashtag_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut newest: Option<NaiveDateTime> = None;

        for message in chat.messages.iter().filter(|m| is_message(m)) {
            total_messages += 1;

            if let Some(text) = &message.text {
                for tag in text.entities_of(HASHTAG_ENTITY) {
                    *hashtag_counts.entry(self.hashtags.normalize(tag)).or_insert(0) += 1;
                }
            }

            if let Some(date) = message.date.as_deref().and_then(parse_export_date) {
                newest = Some(newest.map_or(date, |n| n.max(date)));
            }
        }

        let most_recent_age_days = newest.map(|date| age_in_days(self.now, date));
        let titled_items = self.titled_items(chat, &group_name, media);

        debug!(
            group = %group_name,
            id = group_id,
            total_messages,
            hashtags = hashtag_counts.len(),
            age_days = ?most_recent_age_days,
            titles = titled_items.len(),
            "Group metrics"
        );

        Ok(GroupMetrics {
            group_id,
            group_name,
            total_messages,
            hashtag_counts,
            most_recent_age_days,
            titled_items,
        })
    }

    /// Topic-creation events in encounter order, then sorted newest first.
    fn titled_items(
        &self,
        chat: &Chat,
        group_name: &str,
        media: &mut dyn MediaLocator,
    ) -> Vec<TitledItem> {
        let mut items = Vec::new();
        let mut serial_number = 1u32;

        for message in &chat.messages {
            if message.action.as_deref() != Some(self.config.topic_action.as_str()) {
                continue;
            }
            let Some(title) = message.title.as_deref().filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let Some(message_id) = message.id.filter(|id| *id != 0) else {
                continue;
            };
            let Some(date) = message.date.as_deref().and_then(parse_export_date) else {
                continue;
            };

            items.push(TitledItem {
                title: title.to_string(),
                external_message_id: message_id,
                date: date.date(),
                serial_number,
                media: media.locate(group_name, serial_number),
            });
            serial_number += 1;
        }

        // Stable: same-date items stay in serial order
        items.sort_by(|a, b| b.date.cmp(&a.date));
        items
    }
}

fn is_message(message: &ExportMessage) -> bool {
    message.kind.as_deref() == Some(MESSAGE_TYPE)
}

/// Whole days between `now` and `then`, never negative.
#[must_use]
pub fn age_in_days(now: NaiveDateTime, then: NaiveDateTime) -> i64 {
    now.signed_duration_since(then).num_days().max(0)
}

/// Parse an ISO-8601 export date.
///
/// Accepts RFC 3339 (converted to local time), naive date-times with `T` or
/// space separator and optional fractional seconds, and bare dates.
#[must_use]
pub fn parse_export_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaRef;

    /// Hands out placeholders and records every request.
    #[derive(Default)]
    struct RecordingLocator {
        calls: Vec<(String, u32)>,
    }

    impl MediaLocator for RecordingLocator {
        fn locate(&mut self, group_name: &str, serial_number: u32) -> MediaRef {
            self.calls.push((group_name.to_string(), serial_number));
            MediaRef::Thumbnail(format!("{serial_number}.mp4"))
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 11)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn export(json: &str) -> Export {
        serde_json::from_str(json).unwrap()
    }

    fn extract(json: &str) -> Vec<GroupMetrics> {
        let config = ExtractConfig::default();
        let sets = HashtagSets::default();
        let extractor = GroupExtractor::new(&config, &sets, now());
        extractor
            .extract(&export(json), &mut RecordingLocator::default())
            .unwrap()
    }

    #[test]
    fn only_private_groups_are_eligible() {
        let groups = extract(
            r#"{"chats": {"list": [
                {"type": "private_supergroup", "id": 1, "name": "Super", "messages": []},
                {"type": "private_group", "id": 2, "name": "Small", "messages": []},
                {"type": "private_channel", "id": 3, "name": "Channel", "messages": []},
                {"type": "personal_chat", "id": 4, "name": "Friend", "messages": []},
                {"type": "bot_chat", "id": 5, "name": "Bot", "messages": []},
                {"type": "public_supergroup", "id": 6, "name": "Public", "messages": []}
            ]}}"#,
        );
        let names: Vec<&str> = groups.iter().map(|g| g.group_name.as_str()).collect();
        assert_eq!(names, vec!["Super", "Small"]);
    }

    #[test]
    fn counts_messages_and_skips_service_events() {
        let groups = extract(
            r#"{"chats": {"list": [{"type": "private_supergroup", "id": 1, "name": "G", "messages": [
                {"type": "message", "id": 1, "date": "2025-03-01T10:00:00", "text": "hi"},
                {"type": "service", "id": 2, "date": "2025-03-10T10:00:00", "action": "pin_message"},
                {"type": "message", "id": 3, "date": "2025-03-02T10:00:00", "text": ""}
            ]}]}}"#,
        );
        assert_eq!(groups[0].total_messages, 2);
        // Service event date is ignored for recency
        assert_eq!(groups[0].most_recent_age_days, Some(9));
    }

    #[test]
    fn hashtags_are_normalized_and_counted() {
        let groups = extract(
            r##"{"chats": {"list": [{"type": "private_supergroup", "id": 1, "name": "G", "messages": [
                {"type": "message", "text": [{"type": "hashtag", "text": "#five"}, " ", {"type": "hashtag", "text": "#Five"}]},
                {"type": "message", "text": [{"type": "hashtag", "text": "#FIVE"}, {"type": "hashtag", "text": "#ffm"}]},
                {"type": "message", "text": [{"type": "hashtag", "text": "#random"}, {"type": "hashtag", "text": "#Random"}]},
                {"type": "service", "text": [{"type": "hashtag", "text": "#FOUR"}]}
            ]}]}}"##,
        );
        let counts = &groups[0].hashtag_counts;
        assert_eq!(counts.get("#FIVE"), Some(&3));
        assert_eq!(counts.get("#FFM"), Some(&1));
        assert_eq!(counts.get("#random"), Some(&1));
        assert_eq!(counts.get("#Random"), Some(&1));
        assert_eq!(counts.get("#FOUR"), None);
        assert!(counts.values().all(|&c| c >= 1));
    }

    #[test]
    fn unparseable_dates_are_skipped() {
        let groups = extract(
            r#"{"chats": {"list": [{"type": "private_supergroup", "id": 1, "name": "G", "messages": [
                {"type": "message", "date": "not a date"},
                {"type": "message", "date": "2025-03-06T08:00:00"},
                {"type": "message"}
            ]}]}}"#,
        );
        assert_eq!(groups[0].total_messages, 3);
        assert_eq!(groups[0].most_recent_age_days, Some(5));
    }

    #[test]
    fn no_dates_means_no_age() {
        let groups = extract(
            r#"{"chats": {"list": [{"type": "private_supergroup", "id": 1, "name": "G", "messages": [
                {"type": "message", "date": "garbage"}
            ]}]}}"#,
        );
        assert_eq!(groups[0].most_recent_age_days, None);
    }

    #[test]
    fn titled_items_keep_encounter_serials_and_sort_by_date() {
        let config = ExtractConfig::default();
        let sets = HashtagSets::default();
        let extractor = GroupExtractor::new(&config, &sets, now());
        let mut locator = RecordingLocator::default();
        let groups = extractor
            .extract(
                &export(
                    r#"{"chats": {"list": [{"type": "private_supergroup", "id": -1001234, "name": "G", "messages": [
                        {"type": "service", "id": 10, "date": "2025-01-05T10:00:00", "action": "topic_created", "title": "Middle"},
                        {"type": "service", "id": 11, "date": "2025-02-01T10:00:00", "action": "topic_created", "title": "Newest"},
                        {"type": "service", "id": 12, "date": "2025-01-01T10:00:00", "action": "topic_created", "title": "Oldest"},
                        {"type": "service", "id": 13, "date": "2025-01-05T18:00:00", "action": "topic_created", "title": "Middle too"}
                    ]}]}}"#,
                ),
                &mut locator,
            )
            .unwrap();

        let items: Vec<(&str, u32)> = groups[0]
            .titled_items
            .iter()
            .map(|t| (t.title.as_str(), t.serial_number))
            .collect();
        assert_eq!(
            items,
            vec![("Newest", 2), ("Middle", 1), ("Middle too", 4), ("Oldest", 3)]
        );
        assert_eq!(groups[0].titled_items[0].date.to_string(), "2025-02-01");
        assert_eq!(
            locator.calls,
            (1..=4).map(|s| ("G".to_string(), s)).collect::<Vec<_>>()
        );
        assert_eq!(
            groups[0].titled_items[0].media,
            MediaRef::Thumbnail("2.mp4".into())
        );
    }

    #[test]
    fn incomplete_topic_events_do_not_consume_serials() {
        let groups = extract(
            r#"{"chats": {"list": [{"type": "private_supergroup", "id": 1, "name": "G", "messages": [
                {"type": "service", "id": 1, "date": "2025-01-01T10:00:00", "action": "topic_created", "title": "   "},
                {"type": "service", "date": "2025-01-02T10:00:00", "action": "topic_created", "title": "No id"},
                {"type": "service", "id": 3, "date": "bad", "action": "topic_created", "title": "Bad date"},
                {"type": "service", "id": 4, "date": "2025-01-04T10:00:00", "action": "topic_edit", "title": "Edit"},
                {"type": "service", "id": 5, "date": "2025-01-05T10:00:00", "action": "topic_created", "title": "Real"}
            ]}]}}"#,
        );
        let items = &groups[0].titled_items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Real");
        assert_eq!(items[0].serial_number, 1);
        assert_eq!(items[0].external_message_id, 5);
    }

    #[test]
    fn empty_group_is_still_extracted() {
        let groups = extract(
            r#"{"chats": {"list": [{"type": "private_supergroup", "id": 7, "name": "Quiet"}]}}"#,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_messages, 0);
        assert!(groups[0].hashtag_counts.is_empty());
        assert!(groups[0].titled_items.is_empty());
        assert_eq!(groups[0].most_recent_age_days, None);
    }

    #[test]
    fn eligible_group_without_id_is_malformed() {
        let config = ExtractConfig::default();
        let sets = HashtagSets::default();
        let extractor = GroupExtractor::new(&config, &sets, now());
        let err = extractor
            .extract(
                &export(r#"{"chats": {"list": [{"type": "private_group", "name": "NoId"}]}}"#),
                &mut RecordingLocator::default(),
            )
            .unwrap_err();
        assert!(err.is_archive_error());
    }

    #[test]
    fn parses_export_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(parse_export_date("2024-05-06T07:08:09"), Some(expected));
        assert_eq!(parse_export_date("2024-05-06 07:08:09"), Some(expected));
        assert!(parse_export_date("2024-05-06T07:08:09.250").is_some());
        assert!(parse_export_date("2024-05-06T07:08:09+02:00").is_some());
        assert_eq!(
            parse_export_date("2024-05-06"),
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_export_date(""), None);
        assert_eq!(parse_export_date("06/05/2024"), None);
    }

    #[test]
    fn age_is_whole_days_and_never_negative() {
        let then = now() - chrono::Duration::hours(47);
        assert_eq!(age_in_days(now(), then), 1);
        assert_eq!(age_in_days(now(), now() + chrono::Duration::days(3)), 0);
    }
}
