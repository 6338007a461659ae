//! Top-level directory enumeration.
//!
//! Backups and account files live directly inside their directories, so
//! every listing here is non-recursive.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Which kind of entries to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Directories, and links to directories
    Directory,
    /// Regular files, and links to regular files
    File,
}

/// An entry found directly inside the listed directory
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Full path to the entry
    pub path: PathBuf,

    /// Final path component
    pub name: String,

    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl EntryInfo {
    fn from_entry(entry: &DirEntry) -> std::io::Result<Self> {
        let metadata = entry.metadata().map_err(std::io::Error::other)?;
        Ok(Self {
            path: entry.path().to_path_buf(),
            name: entry.file_name().to_string_lossy().into_owned(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
        })
    }
}

fn matches_kind(entry: &DirEntry, kind: EntryKind) -> bool {
    let file_type = entry.file_type();
    match kind {
        EntryKind::Directory => file_type.is_dir(),
        EntryKind::File => file_type.is_file(),
    }
}

/// List the entries of `kind` directly inside `dir`, sorted by name.
///
/// Symlinks are followed, so a link to a directory counts as a directory.
/// A link whose target is missing is neither and is skipped.
///
/// # Errors
/// Fails if `dir` cannot be read. A missing `dir` is an error here; callers
/// that treat it as empty check for existence first.
pub fn list_top_level(dir: &Path, kind: EntryKind) -> std::io::Result<Vec<EntryInfo>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_unusable_link(&e) => {
                warn!("Skipping broken link {}", e.path().unwrap_or(dir).display());
                continue;
            }
            Err(e) => return Err(std::io::Error::other(e)),
        };
        if matches_kind(&entry, kind) {
            entries.push(EntryInfo::from_entry(&entry)?);
        }
    }

    Ok(entries)
}

/// A link below `dir` whose target is missing or is one of its own ancestors
fn is_unusable_link(err: &walkdir::Error) -> bool {
    err.depth() > 0
        && (err.loop_ancestor().is_some()
            || err.io_error().is_some_and(|e| e.kind() == ErrorKind::NotFound))
}

/// Does `dir` directly contain a subdirectory called exactly `name`?
pub fn has_subdirectory(dir: &Path, name: &str) -> std::io::Result<bool> {
    Ok(list_top_level(dir, EntryKind::Directory)?
        .iter()
        .any(|e| e.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_empty_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        assert!(list_top_level(temp_dir.path(), EntryKind::File)?.is_empty());
        assert!(list_top_level(temp_dir.path(), EntryKind::Directory)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_files_and_directories_are_separated() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::write(temp_dir.path().join("b.keys"), b"keys")?;
        fs::write(temp_dir.path().join("a.bin"), b"12345")?;
        fs::create_dir(temp_dir.path().join("2023-01-01"))?;

        let files = list_top_level(temp_dir.path(), EntryKind::File)?;
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.bin", "b.keys"]);
        assert_eq!(files[0].size, 5);

        let dirs = list_top_level(temp_dir.path(), EntryKind::Directory)?;
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "2023-01-01");
        assert_eq!(dirs[0].size, 0);

        Ok(())
    }

    #[test]
    fn test_does_not_recurse() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("subdir"))?;
        fs::write(temp_dir.path().join("subdir/nested.bin"), b"nested")?;

        assert!(list_top_level(temp_dir.path(), EntryKind::File)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_has_subdirectory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("2023-01-01"))?;
        fs::write(temp_dir.path().join("2023-02-01"), b"not a dir")?;

        assert!(has_subdirectory(temp_dir.path(), "2023-01-01")?);
        assert!(!has_subdirectory(temp_dir.path(), "2023-02-01")?);
        assert!(!has_subdirectory(temp_dir.path(), "2023-03-01")?);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_links_are_skipped() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("2023-01-01"))?;
        fs::write(temp_dir.path().join("wallet.bin"), b"bin")?;
        std::os::unix::fs::symlink(temp_dir.path().join("missing"), temp_dir.path().join("stale-link"))?;

        let dirs = list_top_level(temp_dir.path(), EntryKind::Directory)?;
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "2023-01-01");

        let files = list_top_level(temp_dir.path(), EntryKind::File)?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "wallet.bin");
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_top_level(&temp_dir.path().join("missing"), EntryKind::File).is_err());
    }
}
