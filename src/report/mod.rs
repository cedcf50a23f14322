//! Static report output.
//!
//! ```text
//! <output>/
//!   HTML/<sanitized name>_<group id>.html
//!   Photos/                copy of the source photo directory
//!   index.html
//!   output.csv             this run's snapshot
//!   history.csv            appended every run
//! ```

pub mod html;
pub mod snapshot;

use crate::error::{RankError, Result, ResultExt};
use crate::hashtags::HashtagSets;
use crate::media::{MediaExtensions, list_files};
use crate::ranking::Ranking;
use html::{GroupPage, IndexRow};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const HTML_DIR: &str = "HTML";
pub const PHOTOS_DIR: &str = "Photos";
pub const INDEX_FILE: &str = "index.html";
pub const SNAPSHOT_FILE: &str = "output.csv";
pub const HISTORY_FILE: &str = "history.csv";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Invalid filename regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Paths of everything a run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub html_dir: PathBuf,
    pub photos_dir: PathBuf,
    pub index_html: PathBuf,
    pub snapshot_csv: PathBuf,
    pub history_csv: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            html_dir: root.join(HTML_DIR),
            photos_dir: root.join(PHOTOS_DIR),
            index_html: root.join(INDEX_FILE),
            snapshot_csv: root.join(SNAPSHOT_FILE),
            history_csv: root.join(HISTORY_FILE),
            root,
        }
    }

    /// Create the output root and the page directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.root, &self.html_dir] {
            std::fs::create_dir_all(dir).map_err(|e| RankError::path_error("create", dir, e))?;
        }
        Ok(())
    }
}

/// File-system safe form of a group name: word characters, whitespace and
/// `-` survive, whitespace runs become `_`, result is lower-cased.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let kept = UNSAFE_CHARS.replace_all(name, "");
    WHITESPACE.replace_all(&kept, "_").to_lowercase()
}

/// Page file name for a group.
#[must_use]
pub fn page_file_name(group_name: &str, group_id: i64) -> String {
    format!("{}_{group_id}.html", sanitize_filename(group_name))
}

/// Replace `dest` with a fresh copy of `source`.
///
/// A missing source leaves an empty `dest`. Returns the number of files
/// copied.
///
/// # Errors
///
/// Returns an error if `dest` cannot be cleared or a file cannot be copied.
pub fn copy_photos(source: &Path, dest: &Path) -> Result<usize> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| RankError::path_error("remove", dest, e))?;
    }
    std::fs::create_dir_all(dest).map_err(|e| RankError::path_error("create", dest, e))?;

    if !source.is_dir() {
        info!("Photo directory {} not found, report will use placeholders", source.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.context("walk photo directory")?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("resolve photo path")?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| RankError::path_error("create", &target, e))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| RankError::path_error("copy", entry.path(), e))?;
            copied += 1;
        }
    }

    info!(copied, "Copied photos to {}", dest.display());
    Ok(copied)
}

/// `<group name><ext>` directly under the photo directory, first match in
/// extension order.
#[must_use]
pub fn find_cover(photos_dir: &Path, group_name: &str, extensions: &[String]) -> Option<String> {
    extensions
        .iter()
        .map(|ext| format!("{group_name}{ext}"))
        .find(|file| photos_dir.join(file).is_file())
}

/// Writes group pages, the index and the snapshot for a ranking.
pub struct ReportWriter<'a> {
    layout: &'a OutputLayout,
    hashtags: &'a HashtagSets,
    extensions: &'a MediaExtensions,
    show_progress: bool,
}

impl<'a> ReportWriter<'a> {
    #[must_use]
    pub const fn new(
        layout: &'a OutputLayout,
        hashtags: &'a HashtagSets,
        extensions: &'a MediaExtensions,
    ) -> Self {
        Self {
            layout,
            hashtags,
            extensions,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Render one page per ranked group into `HTML/`.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be rendered or written.
    pub fn write_group_pages(&self, ranking: &Ranking) -> Result<usize> {
        let total = ranking.groups.len();
        let pb = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("##-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for ranked in &ranking.groups {
            let metrics = ranked.metrics();
            pb.set_message(metrics.group_name.clone());

            let photos = list_files(
                &self.layout.photos_dir.join(&metrics.group_name),
                &self.extensions.photos,
            );
            let page = GroupPage {
                ranked,
                history: ranking.history.series(&metrics.group_name),
                photos: &photos,
                hashtags: self.hashtags,
                group_count: total,
            };
            let content = html::render_group_page(&page)?;
            let path = self
                .layout
                .html_dir
                .join(page_file_name(&metrics.group_name, metrics.group_id));
            std::fs::write(&path, content).map_err(|e| RankError::path_error("write", &path, e))?;
            debug!(group = %metrics.group_name, path = %path.display(), "Wrote group page");
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(total)
    }

    /// Write `index.html`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_index(&self, ranking: &Ranking, run_date: &str) -> Result<()> {
        let rows: Vec<IndexRow<'_>> = ranking
            .groups
            .iter()
            .map(|ranked| {
                let metrics = ranked.metrics();
                IndexRow {
                    ranked,
                    page: html::relative_url(&[
                        HTML_DIR,
                        page_file_name(&metrics.group_name, metrics.group_id).as_str(),
                    ]),
                    cover: find_cover(
                        &self.layout.photos_dir,
                        &metrics.group_name,
                        &self.extensions.photos,
                    )
                    .map(|file| html::relative_url(&[PHOTOS_DIR, file.as_str()])),
                }
            })
            .collect();

        let content = html::render_index(run_date, &rows, self.hashtags);
        let path = &self.layout.index_html;
        std::fs::write(path, content).map_err(|e| RankError::path_error("write", path, e))?;
        info!("Wrote index to {}", path.display());
        Ok(())
    }

    /// Overwrite `output.csv` with this run's snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_snapshot(&self, ranking: &Ranking, run_date: &str) -> Result<()> {
        snapshot::write_snapshot(
            &self.layout.snapshot_csv,
            run_date,
            &ranking.groups,
            self.hashtags,
        )
    }
}
