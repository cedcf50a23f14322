//! Performance benchmarks for the extract -> score -> rank core.
//!
//! Run with: `cargo bench --bench ranking_perf`

use chrono::{NaiveDate, NaiveDateTime};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use tgrank::model::GroupMetrics;
use tgrank::parser::parse_export;
use tgrank::{Config, HistoryStore, NoMedia, Ranker, Scorer, compute_ranking};

const GROUP_COUNTS: &[usize] = &[10, 100, 1_000];

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

/// Deterministic synthetic metrics with spread-out volumes, ages and tags.
fn synthetic_groups(count: usize) -> Vec<GroupMetrics> {
    (0..count)
        .map(|i| {
            let i64_i = i64::try_from(i).unwrap_or(i64::MAX);
            let mut tags = BTreeMap::new();
            tags.insert("#FIVE".to_string(), (i % 7) as u64);
            tags.insert("#FOUR".to_string(), (i % 5) as u64);
            tags.insert("#THREE".to_string(), (i % 3) as u64);
            tags.insert("#FM".to_string(), (i % 4) as u64);
            GroupMetrics {
                group_id: -1_000_000_000 - i64_i,
                group_name: format!("Group {i}"),
                total_messages: (i as u64 * 37) % 5_000,
                hashtag_counts: tags,
                most_recent_age_days: (i % 11 != 0).then_some(i64_i % 365),
                titled_items: vec![],
            }
        })
        .collect()
}

/// Export JSON with `groups` chats of `messages` messages each.
fn synthetic_export(groups: usize, messages: usize) -> String {
    let mut out = String::from(r#"{"chats": {"list": ["#);
    for g in 0..groups {
        if g > 0 {
            out.push(',');
        }
        let _ = write!(
            out,
            r#"{{"type": "private_supergroup", "id": -100{g}, "name": "Group {g}", "messages": ["#
        );
        for m in 0..messages {
            if m > 0 {
                out.push(',');
            }
            let day = 1 + (g + m) % 28;
            if m % 10 == 0 {
                let _ = write!(
                    out,
                    r#"{{"type": "service", "id": {m}, "date": "2025-05-{day:02}T10:00:00", "action": "topic_created", "title": "Topic {m}"}}"#
                );
            } else {
                let _ = write!(
                    out,
                    r##"{{"type": "message", "id": {m}, "date": "2025-05-{day:02}T10:00:00", "text": ["hi ", {{"type": "hashtag", "text": "#five"}}, {{"type": "hashtag", "text": "#fm"}}]}}"##
                );
            }
        }
        out.push_str("]}");
    }
    out.push_str("]}}");
    out
}

fn bench_score_and_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_and_rank");
    let scorer = Scorer::default();
    let ranker = Ranker::new("2025-06-01");

    for &count in GROUP_COUNTS {
        let metrics = synthetic_groups(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &metrics, |b, metrics| {
            b.iter(|| {
                let scored = scorer.score_all(black_box(metrics.clone()));
                ranker.rank(scored, HistoryStore::new())
            });
        });
    }
    group.finish();
}

fn bench_compute_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_ranking");
    let config = Config::default();

    for &count in &[10usize, 100] {
        let json = synthetic_export(count, 200);
        let Ok(export) = parse_export(&json, "bench") else {
            continue;
        };
        group.throughput(Throughput::Elements((count * 200) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &export, |b, export| {
            b.iter(|| {
                compute_ranking(
                    black_box(export),
                    &config,
                    now(),
                    &mut NoMedia,
                    HistoryStore::new(),
                )
            });
        });
    }
    group.finish();
}

fn bench_history_load(c: &mut Criterion) {
    let mut csv = String::from("date,group name,rank\n");
    for day in 1..=90 {
        for g in 0..100 {
            let _ = writeln!(csv, "2025-03-{:02},Group {g},{}", day % 28 + 1, g + 1);
        }
    }
    c.bench_function("history_load_9000_rows", |b| {
        b.iter(|| HistoryStore::from_reader(black_box(csv.as_bytes())));
    });
}

criterion_group!(
    name = ranking_benches;
    config = Criterion::default().significance_level(0.05).noise_threshold(0.02);
    targets =
        bench_score_and_rank,
        bench_compute_ranking,
        bench_history_load,
);

criterion_main!(ranking_benches);
