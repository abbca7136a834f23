//! Temporary data directories for file inventory tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway data directory that is removed on drop.
///
/// # Example
///
/// ```
/// use test_utils::TestArchive;
///
/// let archive = TestArchive::new();
/// archive.touch_all(["2009-01-01.nofile", "2009-01-02.nofile"]);
/// assert!(archive.path().join("2009-01-02.nofile").exists());
/// ```
pub struct TestArchive {
    dir: TempDir,
}

impl TestArchive {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a small non-empty file, including parent directories.
    pub fn touch(&self, name: &str) -> PathBuf {
        self.write(name, b"test data")
    }

    /// Create a zero-byte file.
    pub fn touch_empty(&self, name: &str) -> PathBuf {
        self.write(name, b"")
    }

    pub fn touch_all<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.touch(name.as_ref());
        }
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path().join(name)).expect("remove test file");
    }

    fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write test file");
        path
    }
}

impl Default for TestArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_nested() {
        let archive = TestArchive::new();
        let path = archive.touch("2009/data_2009001.cdf");
        assert!(path.exists());
        assert!(fs::metadata(path).unwrap().len() > 0);
    }

    #[test]
    fn test_touch_empty_and_remove() {
        let archive = TestArchive::new();
        let path = archive.touch_empty("a.cdf");
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        archive.remove("a.cdf");
        assert!(!path.exists());
    }

    #[test]
    fn test_archive_removed_on_drop() {
        let path = {
            let archive = TestArchive::new();
            archive.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
