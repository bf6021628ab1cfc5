//! # Extension Inventory
//!
//! Read-only diagnostic that tallies file extensions under a directory tree
//! and flags each one against a [`SupportTable`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::target::normalize_extension;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("cannot scan {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Extensions the engine is known to process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportTable {
    supported: HashSet<String>,
}

impl SupportTable {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supported = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { supported }
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.supported.contains(extension)
    }

    pub fn len(&self) -> usize {
        self.supported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: u64,
    pub supported: bool,
}

impl fmt::Display for ExtensionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.supported { "[SUPPORTED]" } else { "[MISSING]" };
        write!(f, "{}: {} {}", self.extension, self.count, status)
    }
}

/// Per-extension tallies, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupportReport {
    pub total_files: u64,
    pub entries: Vec<ExtensionCount>,
}

impl SupportReport {
    pub fn get(&self, extension: &str) -> Option<&ExtensionCount> {
        self.entries.iter().find(|e| e.extension == extension)
    }

    pub fn missing(&self) -> impl Iterator<Item = &ExtensionCount> {
        self.entries.iter().filter(|e| !e.supported)
    }
}

impl fmt::Display for SupportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Lower-cased extension with its leading dot, or `""` when there is none.
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Walk `root` and tally every regular file by extension.
///
/// Entries that cannot be read are skipped with a warning; only an
/// unreadable root is an error. Ties keep the order in which extensions were
/// first encountered. Each directory's files are visited before its
/// subdirectories, both in file-name order.
pub fn count_extensions(root: &Path, table: &SupportTable) -> Result<SupportReport, InventoryError> {
    let meta = std::fs::metadata(root).map_err(|source| InventoryError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(InventoryError::NotADirectory(root.to_path_buf()));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tallies: Vec<(String, u64)> = Vec::new();
    let mut total_files = 0u64;

    let walker = WalkDir::new(root).follow_links(false).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then(a.file_name().cmp(b.file_name()))
    });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = extension_of(entry.path());
        match index.get(&ext) {
            Some(&slot) => tallies[slot].1 += 1,
            None => {
                index.insert(ext.clone(), tallies.len());
                tallies.push((ext, 1));
            }
        }
        total_files += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    tallies.sort_by(|a, b| b.1.cmp(&a.1));
    let entries = tallies
        .into_iter()
        .map(|(extension, count)| ExtensionCount {
            supported: table.is_supported(&extension),
            extension,
            count,
        })
        .collect();

    debug!("counted {total_files} files under {}", root.display());
    Ok(SupportReport {
        total_files,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, b"x").expect("write");
    }

    fn table() -> SupportTable {
        SupportTable::new([".mp4", ".mkv", ".wav"])
    }

    #[test]
    fn case_insensitive_tally() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "b.MP4");
        touch(dir.path(), "c.srt");

        let report = count_extensions(dir.path(), &table()).expect("count");
        assert_eq!(report.total_files, 3);
        assert_eq!(report.to_string(), ".mp4: 2 [SUPPORTED]\n.srt: 1 [MISSING]\n");
    }

    #[test]
    fn recurses_and_counts_files_without_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Makefile");
        touch(dir.path(), ".hidden");
        touch(dir.path(), "deep/er/song.WAV");
        touch(dir.path(), "deep/clip.mkv");

        let report = count_extensions(dir.path(), &table()).expect("count");
        assert_eq!(report.total_files, 4);
        assert_eq!(report.get("").map(|e| e.count), Some(2));
        assert_eq!(report.get(".wav").map(|e| e.supported), Some(true));
        assert_eq!(report.missing().count(), 1);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "a.zzz");
        touch(dir.path(), "b.aaa");
        touch(dir.path(), "c.mkv");
        touch(dir.path(), "d.mkv");

        let report = count_extensions(dir.path(), &table()).expect("count");
        let order: Vec<&str> = report.entries.iter().map(|e| e.extension.as_str()).collect();
        assert_eq!(order, vec![".mkv", ".zzz", ".aaa"]);
    }

    #[test]
    fn report_serializes_for_json_logs() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "b.srt");

        let report = count_extensions(dir.path(), &table()).expect("count");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["total_files"], 2);
        assert_eq!(json["entries"][0]["extension"], ".mp4");
        assert_eq!(json["entries"][0]["supported"], true);
        assert_eq!(json["entries"][1]["supported"], false);
    }

    #[test]
    fn subdirectories_are_visited_after_sibling_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "a/x.zzz");
        touch(dir.path(), "b.aaa");

        let report = count_extensions(dir.path(), &table()).expect("count");
        let order: Vec<&str> = report.entries.iter().map(|e| e.extension.as_str()).collect();
        assert_eq!(order, vec![".aaa", ".zzz"]);
    }

    #[test]
    fn empty_directory_yields_empty_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = count_extensions(dir.path(), &table()).expect("count");
        assert_eq!(report, SupportReport::default());
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = count_extensions(&dir.path().join("absent"), &table()).expect_err("missing");
        assert!(matches!(err, InventoryError::Root { .. }));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "single.mp4");
        let err = count_extensions(&dir.path().join("single.mp4"), &table()).expect_err("file");
        assert!(matches!(err, InventoryError::NotADirectory(_)));
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension_of(Path::new("x/Movie.MKV")), ".mkv");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new(".bashrc")), "");
        assert_eq!(extension_of(Path::new("README")), "");
    }

    #[test]
    fn table_normalizes_entries() {
        let table = SupportTable::new(["MP4", ".Flac", ""]);
        assert_eq!(table.len(), 2);
        assert!(table.is_supported(".mp4"));
        assert!(table.is_supported(".flac"));
    }
}
