//! Filesystem helpers.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all files from a directory recursively, sorted by path.
///
/// A missing directory yields no files.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Join a `/`-separated relative path onto `base`.
pub fn join_url_path(base: &Path, path: &str) -> PathBuf {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Render a path relative to `base` with `/` separators.
pub fn relative_url_path(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let segments: Option<Vec<&str>> = rel.iter().map(|s| s.to_str()).collect();
    Some(segments?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_all_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files = collect_all_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| relative_url_path(p, dir.path()).unwrap())
            .collect();
        assert_eq!(names, ["a.txt", "b/z.txt"]);
    }

    #[test]
    fn test_collect_all_files_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(collect_all_files(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep/nested/file.txt");
        write_file(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn test_join_url_path() {
        let base = Path::new("/site/build");
        assert_eq!(
            join_url_path(base, "./images/logo.png"),
            PathBuf::from("/site/build/images/logo.png")
        );
        assert_eq!(join_url_path(base, "index.html"), base.join("index.html"));
    }
}
