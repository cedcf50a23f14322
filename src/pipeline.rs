//! Run orchestration: archive -> metrics -> scores -> ranks -> report.

use crate::config::Config;
use crate::error::Result;
use crate::extract::GroupExtractor;
use crate::history::HistoryStore;
use crate::logging::OperationGuard;
use crate::media::{DirectoryMediaLocator, MediaLocator};
use crate::model::Export;
use crate::parser::ArchiveParser;
use crate::ranking::{Ranker, Ranking};
use crate::report::{self, OutputLayout, ReportWriter};
use crate::scoring::Scorer;
use chrono::NaiveDateTime;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_date: String,
    pub groups: usize,
    pub pages_written: usize,
    pub photos_copied: usize,
    pub history_rows_appended: usize,
    pub history_rows_skipped: usize,
    pub output_dir: PathBuf,
    /// Top ranked group and its score
    pub leader: Option<(String, f64)>,
}

/// `YYYY-MM-DD` key used for history rows and page titles.
#[must_use]
pub fn run_date(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Random source for fallback photos: seeded when configured.
#[must_use]
pub fn media_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Extract, score and rank an export without touching the output directory.
///
/// # Errors
///
/// Returns an error if an eligible group cannot be extracted.
pub fn compute_ranking(
    export: &Export,
    config: &Config,
    now: NaiveDateTime,
    locator: &mut dyn MediaLocator,
    history: HistoryStore,
) -> Result<Ranking> {
    let extractor = GroupExtractor::new(&config.extract, &config.hashtags, now);
    let metrics = extractor.extract(export, locator)?;
    let scored = Scorer::new(config.scoring.clone()).score_all(metrics);
    Ok(Ranker::new(run_date(now)).rank(scored, history))
}

/// A full run writing the report into the configured output directory.
pub struct Pipeline<'a> {
    config: &'a Config,
    now: NaiveDateTime,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(config: &'a Config, now: NaiveDateTime) -> Self {
        Self {
            config,
            now,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Execute the run.
    ///
    /// The export is loaded and fully ranked before anything is written, so a
    /// missing or malformed export leaves the output directory untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal archive problem or any write failure.
    pub fn run(&self) -> Result<RunSummary> {
        let guard = OperationGuard::new("ranking run");
        match self.execute() {
            Ok(summary) => {
                guard.complete();
                Ok(summary)
            }
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    fn execute(&self) -> Result<RunSummary> {
        let paths = &self.config.paths;
        let export = ArchiveParser::new(&paths.archive).parse()?;

        let layout = OutputLayout::new(&paths.output);
        let history = HistoryStore::load(&layout.history_csv)?;
        let history_rows_skipped = history.skipped();

        // Media is resolved against the source tree; the copy mirrors it.
        let mut locator = DirectoryMediaLocator::new(
            &paths.photos,
            self.config.media.extensions.clone(),
            media_rng(self.config.media.seed),
        );
        let mut ranking =
            compute_ranking(&export, self.config, self.now, &mut locator, history)?;
        let date = run_date(self.now);

        layout.create_dirs()?;
        let photos_copied = report::copy_photos(&paths.photos, &layout.photos_dir)?;

        let writer = ReportWriter::new(
            &layout,
            &self.config.hashtags,
            &self.config.media.extensions,
        )
        .with_progress(self.show_progress);
        let pages_written = writer.write_group_pages(&ranking)?;
        writer.write_snapshot(&ranking, &date)?;
        let history_rows_appended = ranking.history.persist(&layout.history_csv)?;
        writer.write_index(&ranking, &date)?;

        let leader = ranking
            .groups
            .first()
            .map(|g| (g.name().to_string(), g.group.score));
        info!(
            groups = ranking.groups.len(),
            pages_written,
            history_rows_appended,
            "Report written to {}",
            layout.root.display()
        );

        Ok(RunSummary {
            run_date: date,
            groups: ranking.groups.len(),
            pages_written,
            photos_copied,
            history_rows_appended,
            history_rows_skipped,
            output_dir: layout.root,
            leader,
        })
    }
}
