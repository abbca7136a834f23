//! Local filesystem scanning.

use std::fs;
use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Options controlling which matched files are returned.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip zero-byte files.
    pub ignore_empty_files: bool,
    /// Follow symbolic links to directories while walking. Links to files
    /// are always listed.
    pub follow_links: bool,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// List files below `data_path` whose relative path matches `search_pattern`.
///
/// The pattern is matched against paths relative to `data_path` using `/`
/// separators, so `????/data_??.cdf` only matches one directory level
/// down. A missing `data_path` yields an empty list.
#[instrument(skip(options), fields(path = %data_path.display()))]
pub fn scan(data_path: &Path, search_pattern: &str, options: &ScanOptions) -> Result<Vec<String>> {
    if !data_path.is_dir() {
        debug!("Data path does not exist, no files to list");
        return Ok(Vec::new());
    }

    let pattern = Pattern::new(search_pattern)?;
    let depth = search_pattern.split('/').filter(|c| !c.is_empty()).count().max(1);

    let mut files = Vec::new();
    let walker = WalkDir::new(data_path)
        .min_depth(depth)
        .max_depth(depth)
        .follow_links(options.follow_links);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(data_path) else {
            continue;
        };
        let relative = normalize_path(relative);
        if !pattern.matches_with(&relative, MATCH_OPTIONS) {
            continue;
        }

        if options.ignore_empty_files {
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.len() == 0 => {
                    debug!(file = %relative, "Ignoring empty file");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %relative, error = %e, "Unable to stat file, skipping");
                    continue;
                }
            }
        }

        files.push(relative);
    }

    files.sort();
    debug!(count = files.len(), pattern = %search_pattern, "Scanned files");
    Ok(files)
}

/// Join path components with `/` regardless of platform.
fn normalize_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, name: &str, contents: &[u8]) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let files = scan(Path::new("/nonexistent/data/path"), "????.cdf", &ScanOptions::default())
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_scan_matches_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2009-01-01.nofile", b"x");
        touch(dir.path(), "2009-01-02.nofile", b"x");
        touch(dir.path(), "notes.txt", b"x");
        touch(dir.path(), "2009-01-03.nofile.bak", b"x");

        let files = scan(dir.path(), "????-??-??.nofile", &ScanOptions::default()).unwrap();
        assert_eq!(files, vec!["2009-01-01.nofile", "2009-01-02.nofile"]);
    }

    #[test]
    fn test_scan_subdirectories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2009/f_001.cdf", b"x");
        touch(dir.path(), "2010/f_002.cdf", b"x");
        touch(dir.path(), "f_003.cdf", b"x");

        let files = scan(dir.path(), "????/f_???.cdf", &ScanOptions::default()).unwrap();
        assert_eq!(files, vec!["2009/f_001.cdf", "2010/f_002.cdf"]);
    }

    #[test]
    fn test_ignore_empty_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a_01.cdf", b"");
        touch(dir.path(), "a_02.cdf", b"data");

        let all = scan(dir.path(), "a_??.cdf", &ScanOptions::default()).unwrap();
        assert_eq!(all.len(), 2);

        let options = ScanOptions {
            ignore_empty_files: true,
            ..Default::default()
        };
        let non_empty = scan(dir.path(), "a_??.cdf", &options).unwrap();
        assert_eq!(non_empty, vec!["a_02.cdf"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_listed() {
        let store = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        touch(store.path(), "2009-01-01.nofile", b"x");
        touch(store.path(), "2009-01-02.nofile", b"");
        for name in ["2009-01-01.nofile", "2009-01-02.nofile"] {
            std::os::unix::fs::symlink(store.path().join(name), dir.path().join(name)).unwrap();
        }
        std::os::unix::fs::symlink(store.path().join("missing.nofile"), dir.path().join("2009-01-03.nofile"))
            .unwrap();

        let files = scan(dir.path(), "????-??-??.nofile", &ScanOptions::default()).unwrap();
        assert_eq!(files, vec!["2009-01-01.nofile", "2009-01-02.nofile"]);

        // Emptiness is judged on the target, not the link.
        let options = ScanOptions {
            ignore_empty_files: true,
            ..Default::default()
        };
        let non_empty = scan(dir.path(), "????-??-??.nofile", &options).unwrap();
        assert_eq!(non_empty, vec!["2009-01-01.nofile"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        assert!(scan(dir.path(), "[unclosed", &ScanOptions::default()).is_err());
    }
}
