//! Thumbnail resolution for titled items.
//!
//! Layout under the photo root:
//!
//! ```text
//! <root>/<group name>/           photos, used for the random fallback
//! <root>/<group name>/thumbs/    <serial>.<ext> clips, matched by file stem
//! ```

use crate::model::MediaRef;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subdirectory holding per-item thumbnails.
pub const THUMBS_DIR: &str = "thumbs";

/// Resolves the representative media for a titled item.
pub trait MediaLocator {
    fn locate(&mut self, group_name: &str, serial_number: u32) -> MediaRef;
}

/// Locator that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMedia;

impl MediaLocator for NoMedia {
    fn locate(&mut self, _group_name: &str, _serial_number: u32) -> MediaRef {
        MediaRef::Placeholder
    }
}

/// File extensions accepted for thumbnails and fallback photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaExtensions {
    pub thumbs: Vec<String>,
    pub photos: Vec<String>,
}

impl Default for MediaExtensions {
    fn default() -> Self {
        Self {
            thumbs: [".mp4", ".webm", ".ogg", ".gif"].map(String::from).to_vec(),
            photos: [".jpg", ".jpeg", ".png", ".gif", ".webp"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Sorted directory listings for one group.
#[derive(Debug, Default)]
struct GroupMedia {
    thumbs: Vec<String>,
    photos: Vec<String>,
}

/// Filesystem-backed locator with an injected random source.
pub struct DirectoryMediaLocator<R: Rng> {
    root: PathBuf,
    extensions: MediaExtensions,
    rng: R,
    cache: HashMap<String, GroupMedia>,
}

impl<R: Rng> DirectoryMediaLocator<R> {
    pub fn new(root: impl AsRef<Path>, extensions: MediaExtensions, rng: R) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions,
            rng,
            cache: HashMap::new(),
        }
    }

    fn group_media(&mut self, group_name: &str) -> &GroupMedia {
        if !self.cache.contains_key(group_name) {
            let group_dir = self.root.join(group_name);
            let media = GroupMedia {
                thumbs: list_files(&group_dir.join(THUMBS_DIR), &self.extensions.thumbs),
                photos: list_files(&group_dir, &self.extensions.photos),
            };
            debug!(
                group = group_name,
                thumbs = media.thumbs.len(),
                photos = media.photos.len(),
                "Scanned group media"
            );
            self.cache.insert(group_name.to_string(), media);
        }
        &self.cache[group_name]
    }
}

impl<R: Rng> MediaLocator for DirectoryMediaLocator<R> {
    fn locate(&mut self, group_name: &str, serial_number: u32) -> MediaRef {
        let wanted = serial_number.to_string();
        let media = self.group_media(group_name);

        if let Some(thumb) = media
            .thumbs
            .iter()
            .find(|file| file_stem(file) == wanted)
        {
            debug!(group = group_name, serial_number, file = %thumb, "Matched thumbnail");
            return MediaRef::Thumbnail(thumb.clone());
        }

        let photos = &self.cache[group_name].photos;
        match photos.choose(&mut self.rng) {
            Some(photo) => {
                debug!(group = group_name, serial_number, file = %photo, "Using fallback photo");
                MediaRef::Photo(photo.clone())
            }
            None => MediaRef::Placeholder,
        }
    }
}

fn file_stem(file: &str) -> &str {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
}

/// Regular files directly in `dir` with one of `extensions`, sorted by name.
pub(crate) fn list_files(dir: &Path, extensions: &[String]) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| has_extension(name, extensions))
        .collect();
    files.sort();
    files
}

pub(crate) fn has_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}
