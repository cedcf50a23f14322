//! HTML rendering for group pages and the ranked index.
//!
//! Templates are compiled in and filled by `{{{NAME}}}` substitution. Every
//! value taken from the export goes through `html_escape` first.

use crate::error::Result;
use crate::hashtags::{HashtagSets, TAG_FIVE, TAG_FOUR, TAG_THREE, TagClass};
use crate::media::THUMBS_DIR;
use crate::report::PHOTOS_DIR;
use crate::model::{GroupMetrics, HistoryPoint, MediaRef, RankedGroup, TitledItem};
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt::Write as _;

const GROUP_TEMPLATE: &str = include_str!("templates/group.html");
const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

pub const INDEX_TITLE: &str = "PS Ranking";

const ITEM_PLACEHOLDER: &str = "https://via.placeholder.com/600x300";
const SLIDE_PLACEHOLDER: &str = "https://via.placeholder.com/1920x800";
const COVER_PLACEHOLDER: &str = "https://via.placeholder.com/300";

/// Bytes escaped inside one path segment of a relative URL.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Relative URL built from raw path segments, each percent-encoded.
#[must_use]
pub fn relative_url(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Everything needed to render one group page.
#[derive(Debug, Clone, Copy)]
pub struct GroupPage<'a> {
    pub ranked: &'a RankedGroup,
    /// Rank series including this run
    pub history: &'a [HistoryPoint],
    /// Photo files directly under the group's photo folder
    pub photos: &'a [String],
    pub hashtags: &'a HashtagSets,
    /// Number of groups in the run, used as the chart's lowest rank
    pub group_count: usize,
}

/// One row of the index table.
#[derive(Debug, Clone)]
pub struct IndexRow<'a> {
    pub ranked: &'a RankedGroup,
    /// Page path relative to the index
    pub page: String,
    /// Cover photo path relative to the index
    pub cover: Option<String>,
}

/// `"<n> days"`, or `N/A` for groups without dated messages.
#[must_use]
pub fn format_age(age_days: Option<i64>) -> String {
    age_days.map_or_else(|| "N/A".to_string(), |days| format!("{days} days"))
}

/// Render a group page.
///
/// # Errors
///
/// Returns an error if the history series cannot be serialized.
pub fn render_group_page(page: &GroupPage<'_>) -> Result<String> {
    let metrics = page.ranked.metrics();
    let name = encode_text(&metrics.group_name);
    let rank = page.ranked.rank.to_string();
    let total_messages = metrics.total_messages.to_string();
    let last_activity = format_age(metrics.most_recent_age_days);
    let score = format!("{:.2}", page.ranked.group.score);
    let title_count = metrics.titled_items.len().to_string();
    let group_count = page.group_count.max(1).to_string();
    let slides = render_slides(&metrics.group_name, page.photos);
    let ratings = render_tag_list(metrics, page.hashtags, TagClass::Rating, "rating");
    let scenes = render_tag_list(metrics, page.hashtags, TagClass::SceneType, "scene type");
    let others = render_tag_list(metrics, page.hashtags, TagClass::Other, "other");
    let grid = render_titles_grid(metrics);
    let table = render_titles_table(metrics);
    // Keep `</script>` inside a group name from closing the script block
    let history_json = serde_json::to_string(page.history)?.replace("</", "<\\/");

    Ok(fill(
        GROUP_TEMPLATE,
        &[
            ("GROUP_NAME", name.as_ref()),
            ("RANK", rank.as_str()),
            ("SLIDES", slides.as_str()),
            ("TOTAL_MESSAGES", total_messages.as_str()),
            ("LAST_ACTIVITY", last_activity.as_str()),
            ("SCORE", score.as_str()),
            ("RATING_TAGS", ratings.as_str()),
            ("SCENE_TAGS", scenes.as_str()),
            ("OTHER_TAGS", others.as_str()),
            ("TITLE_COUNT", title_count.as_str()),
            ("TITLES_GRID", grid.as_str()),
            ("TITLES_TABLE", table.as_str()),
            ("HISTORY_JSON", history_json.as_str()),
            ("GROUP_COUNT", group_count.as_str()),
        ],
    ))
}

/// Render the ranked index page.
#[must_use]
pub fn render_index(run_date: &str, rows: &[IndexRow<'_>], hashtags: &HashtagSets) -> String {
    let mut body = String::new();
    for row in rows {
        let metrics = row.ranked.metrics();
        let name = &metrics.group_name;
        let cover = row.cover.as_deref().unwrap_or(COVER_PLACEHOLDER);
        let _ = writeln!(
            body,
            "            <tr>\
             <td>{rank}</td>\
             <td><a href=\"{page}\">{name_text}</a></td>\
             <td><div class=\"flip-card\"><div class=\"flip-card-inner\">\
             <div class=\"flip-card-front\"><img src=\"{cover}\" alt=\"{name_attr}\"></div>\
             <div class=\"flip-card-back\"><h3>{name_text}</h3></div>\
             </div></div></td>\
             <td>{age}</td><td>{titles}</td>\
             <td>{five}</td><td>{four}</td><td>{three}</td>\
             <td>{scenes}</td><td>{score:.2}</td></tr>",
            rank = row.ranked.rank,
            page = encode_double_quoted_attribute(&row.page),
            name_text = encode_text(name),
            name_attr = encode_double_quoted_attribute(name),
            cover = encode_double_quoted_attribute(cover),
            age = format_age(metrics.most_recent_age_days),
            titles = metrics.titled_items.len(),
            five = metrics.hashtag_count(TAG_FIVE),
            four = metrics.hashtag_count(TAG_FOUR),
            three = metrics.hashtag_count(TAG_THREE),
            scenes = metrics.total_for(&hashtags.scene_types),
            score = row.ranked.group.score,
        );
    }

    let run_date = encode_text(run_date);
    let group_count = rows.len().to_string();
    fill(
        INDEX_TEMPLATE,
        &[
            ("TITLE", INDEX_TITLE),
            ("RUN_DATE", run_date.as_ref()),
            ("GROUP_COUNT", group_count.as_str()),
            ("ROWS", body.trim_end()),
        ],
    )
}

fn render_slides(group_name: &str, photos: &[String]) -> String {
    if photos.is_empty() {
        return format!(
            "        <div class=\"slide\" style=\"display: block;\"><img src=\"{SLIDE_PLACEHOLDER}\" alt=\"No photos\"></div>"
        );
    }

    let mut out = String::new();
    for (idx, photo) in photos.iter().enumerate() {
        let src = relative_url(&["..", PHOTOS_DIR, group_name, photo.as_str()]);
        let _ = writeln!(
            out,
            "        <div class=\"slide\"><div class=\"slide-counter\">{} / {}</div>\
             <img src=\"{}\" alt=\"{}\"></div>",
            idx + 1,
            photos.len(),
            encode_double_quoted_attribute(&src),
            encode_double_quoted_attribute(photo),
        );
    }
    out.trim_end().to_string()
}

fn render_tag_list(
    metrics: &GroupMetrics,
    hashtags: &HashtagSets,
    class: TagClass,
    label: &str,
) -> String {
    let items: String = metrics
        .hashtag_counts
        .iter()
        .filter(|(tag, _)| hashtags.classify(tag) == class)
        .map(|(tag, count)| {
            format!(
                "<li class=\"hashtag-item\">{}: {count}</li>",
                encode_text(tag)
            )
        })
        .collect();

    if items.is_empty() {
        format!("<li>No {label} hashtags found</li>")
    } else {
        items
    }
}

fn media_element(group_name: &str, item: &TitledItem) -> String {
    let alt = encode_double_quoted_attribute(&item.title);
    let (src, video) = match &item.media {
        MediaRef::Thumbnail(file) => (
            relative_url(&["..", PHOTOS_DIR, group_name, THUMBS_DIR, file.as_str()]),
            !item.media.is_gif(),
        ),
        MediaRef::Photo(file) => (
            relative_url(&["..", PHOTOS_DIR, group_name, file.as_str()]),
            false,
        ),
        MediaRef::Placeholder => (ITEM_PLACEHOLDER.to_string(), false),
    };
    let src = encode_double_quoted_attribute(&src);

    if video {
        format!("<video src=\"{src}\" loop muted playsinline preload=\"metadata\" title=\"{alt}\"></video>")
    } else {
        format!("<img src=\"{src}\" alt=\"{alt}\">")
    }
}

fn render_titles_grid(metrics: &GroupMetrics) -> String {
    if metrics.titled_items.is_empty() {
        return "            <p>No titles found</p>".to_string();
    }

    let mut out = String::from("            <div class=\"titles-grid\" id=\"titlesGrid\">\n");
    for item in &metrics.titled_items {
        let link = metrics.message_link(item.external_message_id);
        let _ = writeln!(
            out,
            "                <div class=\"grid-item\" data-serial=\"{serial}\" data-date=\"{date}\">\
             {media}\
             <p class=\"title\"><a href=\"{link}\" target=\"_blank\">{title}</a></p>\
             <p class=\"meta\">S.No: {serial} | {date}</p></div>",
            serial = item.serial_number,
            date = item.date.format("%Y-%m-%d"),
            media = media_element(&metrics.group_name, item),
            link = encode_double_quoted_attribute(&link),
            title = encode_text(&item.title),
        );
    }
    out.push_str("            </div>");
    out
}

fn render_titles_table(metrics: &GroupMetrics) -> String {
    if metrics.titled_items.is_empty() {
        return "            <p>No titles found</p>".to_string();
    }

    let mut out = String::from("            <table class=\"titles-table\">\n");
    out.push_str(
        "                <thead><tr>\
         <th onclick=\"sortTitlesTable(0)\">S.No</th>\
         <th onclick=\"sortTitlesTable(1)\">Items</th>\
         <th onclick=\"sortTitlesTable(2)\">Date</th>\
         </tr></thead>\n",
    );
    out.push_str("                <tbody id=\"titlesTableBody\">\n");
    for item in &metrics.titled_items {
        let link = metrics.message_link(item.external_message_id);
        let _ = writeln!(
            out,
            "                <tr><td>{}</td><td><a href=\"{}\" target=\"_blank\">{}</a></td><td>{}</td></tr>",
            item.serial_number,
            encode_double_quoted_attribute(&link),
            encode_text(&item.title),
            item.date.format("%Y-%m-%d"),
        );
    }
    out.push_str("                </tbody>\n            </table>");
    out
}

/// Substitute `{{{KEY}}}` markers in one pass, so inserted values are never
/// scanned for markers themselves. Unknown markers are left in place.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 3..];
        let Some(end) = after.find("}}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 6]),
        }
        rest = &after[end + 3..];
    }

    out.push_str(rest);
    out
}
