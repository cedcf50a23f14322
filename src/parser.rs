//! Telegram export loader.
//!
//! Telegram Desktop writes a machine-readable export as `result.json`. Users
//! usually zip the export folder, so the loader accepts:
//!
//! - a `.zip` archive containing `result.json` anywhere inside it
//! - a directory containing `result.json`
//! - a bare `result.json` (or any `.json`) file

use crate::error::{RankError, Result};
use crate::model::Export;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the export record set inside an archive.
pub const EXPORT_FILE: &str = "result.json";

/// Loader for Telegram export archives
pub struct ArchiveParser {
    archive_path: PathBuf,
}

impl ArchiveParser {
    pub fn new(archive_path: impl AsRef<Path>) -> Self {
        Self {
            archive_path: archive_path.as_ref().to_path_buf(),
        }
    }

    /// Path this parser reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.archive_path
    }

    /// Read and parse the export.
    ///
    /// # Errors
    ///
    /// Fails when the path is missing, the zip is corrupt or lacks
    /// `result.json`, the JSON is malformed, or the export has no chats.
    pub fn parse(&self) -> Result<Export> {
        let path = &self.archive_path;
        if !path.exists() {
            return Err(RankError::archive_not_found(path));
        }

        let (content, source) = if path.is_dir() {
            let json_path = path.join(EXPORT_FILE);
            if !json_path.is_file() {
                return Err(RankError::MissingExportFile {
                    file: EXPORT_FILE.to_string(),
                    archive: path.clone(),
                });
            }
            (read_file(&json_path)?, json_path.display().to_string())
        } else if is_zip(path) {
            self.read_from_zip()?
        } else {
            (read_file(path)?, path.display().to_string())
        };

        parse_export(&content, &source)
    }

    /// Extract `result.json` from the zip into memory.
    fn read_from_zip(&self) -> Result<(String, String)> {
        let path = &self.archive_path;
        info!("Extracting {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| RankError::path_error("open", path, e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            RankError::invalid_archive(format!("'{}' is not a valid zip file: {e}", path.display()))
        })?;

        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.is_dir() || !entry.name().ends_with(EXPORT_FILE) {
                continue;
            }
            let name = entry.name().to_string();
            debug!(entry = %name, size = entry.size(), "Found export entry");

            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| RankError::parse_error(&name, e.to_string()))?;
            return Ok((content, format!("{}:{name}", path.display())));
        }

        Err(RankError::MissingExportFile {
            file: EXPORT_FILE.to_string(),
            archive: path.clone(),
        })
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| RankError::path_error("read", path, e))
}

/// Parse export JSON; `source` names it in errors and logs.
///
/// # Errors
///
/// Fails on malformed JSON or when the export has no chats.
pub fn parse_export(content: &str, source: &str) -> Result<Export> {
    info!("Loading {source}");
    let export: Export =
        serde_json::from_str(content).map_err(|e| RankError::parse_error(source, e.to_string()))?;

    info!("Found {} chats in {source}", export.chats.list.len());
    if export.chats.list.is_empty() {
        return Err(RankError::NoChats {
            file: source.to_string(),
        });
    }
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const EXPORT: &str = r#"{"chats": {"list": [
        {"type": "private_supergroup", "id": 1, "name": "G", "messages": []}
    ]}}"#;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn reads_nested_result_json_from_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.zip");
        write_zip(
            &path,
            &[
                ("DataExport/photos/readme.txt", "x"),
                ("DataExport/result.json", EXPORT),
            ],
        );

        let export = ArchiveParser::new(&path).parse().unwrap();
        assert_eq!(export.chats.list.len(), 1);
        assert_eq!(export.chats.list[0].name.as_deref(), Some("G"));
    }

    #[test]
    fn reads_directory_and_bare_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(EXPORT_FILE), EXPORT).unwrap();

        assert!(ArchiveParser::new(dir.path()).parse().is_ok());
        assert!(ArchiveParser::new(dir.path().join(EXPORT_FILE)).parse().is_ok());
    }

    #[test]
    fn missing_archive_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = ArchiveParser::new(dir.path().join("result.zip"))
            .parse()
            .unwrap_err();
        assert!(matches!(err, RankError::ArchiveNotFound { .. }));
    }

    #[test]
    fn zip_without_export_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.zip");
        write_zip(&path, &[("other.json", "{}")]);
        let err = ArchiveParser::new(&path).parse().unwrap_err();
        assert!(matches!(err, RankError::MissingExportFile { .. }));
    }

    #[test]
    fn corrupt_zip_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        let err = ArchiveParser::new(&path).parse().unwrap_err();
        assert!(matches!(err, RankError::InvalidArchive { .. }));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = parse_export("{\"chats\": ", "result.json").unwrap_err();
        assert!(matches!(err, RankError::ParseError { .. }));
    }

    #[test]
    fn export_without_chats_is_fatal() {
        let err = parse_export(r#"{"chats": {"list": []}}"#, "result.json").unwrap_err();
        assert!(matches!(err, RankError::NoChats { .. }));
        let err = parse_export("{}", "result.json").unwrap_err();
        assert!(matches!(err, RankError::NoChats { .. }));
    }
}
