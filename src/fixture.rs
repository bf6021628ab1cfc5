//! # Fixture Directory
//!
//! Materializes one small file per target extension inside a dedicated
//! directory. The directory is wiped before being populated, and the returned
//! [`FixtureDir`] guard removes it again when dropped, so no fixture outlives
//! the run that created it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::target::fixture_file_name;

/// Content written into every fixture file.
pub const FIXTURE_CONTENT: &[u8] = b"dummy content";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixture extension: {0:?}")]
    InvalidExtension(String),
}

impl FixtureError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        FixtureError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Owned fixture directory. Removed on drop unless already cleaned up.
#[derive(Debug)]
pub struct FixtureDir {
    path: PathBuf,
    file_names: Vec<String>,
    cleaned: bool,
}

impl FixtureDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fixture file names in creation order.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Remove the directory now and report any failure.
    pub fn cleanup(mut self) -> Result<(), FixtureError> {
        self.cleaned = true;
        remove_dir_if_present(&self.path)
    }
}

impl Drop for FixtureDir {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(err) = remove_dir_if_present(&self.path) {
            warn!("failed to remove fixture directory: {err}");
        }
    }
}

/// Recreate `dir` and write `test<ext>` for every distinct extension.
///
/// Any existing directory at `dir` is deleted first, so `dir` must be
/// dedicated to fixtures. Duplicate extensions collapse to a single file.
pub fn prepare<I, S>(dir: &Path, extensions: I) -> Result<FixtureDir, FixtureError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut file_names = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref();
        validate_extension(ext)?;
        if seen.insert(ext.to_string()) {
            file_names.push(fixture_file_name(ext));
        }
    }

    // Absolute, so the engine finds the fixtures whatever its working dir.
    let dir = std::path::absolute(dir).map_err(|err| FixtureError::io(dir, err))?;
    let dir = dir.as_path();

    remove_dir_if_present(dir)?;
    std::fs::create_dir_all(dir).map_err(|err| FixtureError::io(dir, err))?;

    // From here on the guard owns the directory, so a failed write below
    // still removes it.
    let fixtures = FixtureDir {
        path: dir.to_path_buf(),
        file_names,
        cleaned: false,
    };
    for name in &fixtures.file_names {
        let path = dir.join(name);
        std::fs::write(&path, FIXTURE_CONTENT).map_err(|err| FixtureError::io(&path, err))?;
    }
    debug!(
        "prepared {} fixtures in {}",
        fixtures.file_names.len(),
        dir.display()
    );
    Ok(fixtures)
}

fn validate_extension(ext: &str) -> Result<(), FixtureError> {
    let invalid = ext.is_empty() || ext.contains(['/', '\\']);
    if invalid {
        return Err(FixtureError::InvalidExtension(ext.to_string()));
    }
    Ok(())
}

fn remove_dir_if_present(dir: &Path) -> Result<(), FixtureError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(FixtureError::io(dir, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_one_file_per_extension() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        let fixtures = prepare(&dir, [".mp3", ".txt"]).expect("prepare");

        assert_eq!(fixtures.file_names(), ["test.mp3", "test.txt"]);
        assert_eq!(listing(&dir), vec!["test.mp3", "test.txt"]);
        let content = std::fs::read(dir.join("test.mp3")).expect("read");
        assert_eq!(content, FIXTURE_CONTENT);
    }

    #[test]
    fn stale_files_are_removed() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        std::fs::create_dir_all(dir.join("nested")).expect("mkdir");
        std::fs::write(dir.join("old.flac"), b"stale").expect("write");

        let fixtures = prepare(&dir, [".ogg"]).expect("prepare");
        assert_eq!(listing(fixtures.path()), vec!["test.ogg"]);
    }

    #[test]
    fn repeated_prepare_yields_same_set() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        let exts = [".mp3", ".wma", ".mp3"];

        let first = prepare(&dir, exts).expect("first");
        let first_listing = listing(first.path());
        std::mem::forget(first);
        let second = prepare(&dir, exts).expect("second");

        assert_eq!(first_listing, vec!["test.mp3", "test.wma"]);
        assert_eq!(listing(second.path()), first_listing);
    }

    #[test]
    fn drop_removes_directory() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        {
            let _fixtures = prepare(&dir, [".ts"]).expect("prepare");
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn explicit_cleanup_removes_directory() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        let fixtures = prepare(&dir, [".3gp"]).expect("prepare");
        fixtures.cleanup().expect("cleanup");
        assert!(!dir.exists());
    }

    #[test]
    fn rejects_path_like_extensions_before_touching_disk() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("keep.me"), b"x").expect("write");

        let err = prepare(&dir, [".mp3", "/../etc"]).expect_err("invalid");
        assert!(matches!(err, FixtureError::InvalidExtension(_)));
        assert!(dir.join("keep.me").exists());
    }

    #[test]
    fn dotted_extensions_are_plain_file_names() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("fixtures");
        let fixtures = prepare(&dir, [".tar.gz", "..bak"]).expect("prepare");
        assert_eq!(listing(fixtures.path()), vec!["test..bak", "test.tar.gz"]);
    }

    #[test]
    fn stored_path_is_absolute() {
        let root = tempfile::tempdir().expect("tempdir");
        let fixtures = prepare(&root.path().join("fixtures"), [".mp3"]).expect("prepare");
        assert!(fixtures.path().is_absolute());
        assert!(fixtures.path().join("test.mp3").exists());
    }

    #[test]
    fn io_error_carries_path() {
        let root = tempfile::tempdir().expect("tempdir");
        let blocker = root.path().join("blocker");
        std::fs::write(&blocker, b"file, not a dir").expect("write");
        let dir = blocker.join("fixtures");

        let err = prepare(&dir, [".mp3"]).expect_err("cannot create under a file");
        match err {
            FixtureError::Io { path, .. } => assert!(path.starts_with(&blocker)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
