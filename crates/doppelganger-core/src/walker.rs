//! Lazy enumeration of one directory tree.
//!
//! The walk yields folder paths and file metadata records relative to the
//! root, pruning excluded directories whole. Unreadable entries are reported
//! to the warning sink and skipped; a walk never aborts on a bad entry.
//! Symlinks are not followed, so self-referential structures cannot recurse.

use std::path::Path;
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::exclude::{rel_string, ExcludeFilter};
use crate::progress::ProgressReporter;

/// Metadata for one regular file, content untouched.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    /// Root-relative path of the containing folder, `""` at the root level.
    pub parent_path: String,
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch. Full precision:
    /// a rewrite within the same second must not look unchanged.
    pub modified_ns: i64,
}

impl FileMeta {
    pub fn rel_path(&self) -> String {
        join_rel(&self.parent_path, &self.name)
    }
}

#[derive(Debug, Clone)]
pub enum WalkedEntry {
    Folder { path: String },
    File(FileMeta),
}

/// Join a parent path and a name into a root-relative path.
pub fn join_rel(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    }
}

/// Walk `root` lazily. Restartable by calling again; enumeration order is
/// filesystem-dependent and callers must not rely on it.
pub fn walk<'a>(
    root: &'a Path,
    filter: &'a ExcludeFilter,
    reporter: &'a dyn ProgressReporter,
) -> impl Iterator<Item = WalkedEntry> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| !filter.is_excluded(&rel_string(rel)))
                    .unwrap_or(true)
        })
        .filter_map(move |item| {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    reporter.warning("walk", &format!("skipping unreadable entry: {err}"));
                    return None;
                }
            };

            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel_string(rel),
                Err(_) => return None,
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                return Some(WalkedEntry::Folder { path: rel });
            }
            if !file_type.is_file() {
                // Symlinks and special files are not catalogued.
                return None;
            }

            let metadata = match entry.metadata() {
                Ok(md) => md,
                Err(err) => {
                    reporter.warning(
                        "walk",
                        &format!("skipping '{rel}': cannot read metadata: {err}"),
                    );
                    return None;
                }
            };

            let modified_ns = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0);

            let (parent_path, name) = match rel.rsplit_once('/') {
                Some((parent, name)) => (parent.to_string(), name.to_string()),
                None => (String::new(), rel),
            };

            Some(WalkedEntry::File(FileMeta {
                name,
                parent_path,
                size: metadata.len(),
                modified_ns,
            }))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs;
    use tempfile::tempdir;

    fn collect(root: &Path, filter: &ExcludeFilter) -> (Vec<String>, Vec<FileMeta>) {
        let mut folders = Vec::new();
        let mut files = Vec::new();
        for entry in walk(root, filter, &SilentReporter) {
            match entry {
                WalkedEntry::Folder { path } => folders.push(path),
                WalkedEntry::File(meta) => files.push(meta),
            }
        }
        (folders, files)
    }

    #[test]
    fn yields_files_with_relative_parents() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("top.txt"), "top").unwrap();
        fs::write(dir.path().join("docs/readme.txt"), "hello").unwrap();

        let filter = ExcludeFilter::new(&[], &SilentReporter);
        let (folders, files) = collect(dir.path(), &filter);

        assert!(folders.contains(&String::new()), "root folder entry");
        assert!(folders.contains(&"docs".to_string()));

        let readme = files.iter().find(|f| f.name == "readme.txt").unwrap();
        assert_eq!(readme.parent_path, "docs");
        assert_eq!(readme.size, 5);
        assert_eq!(readme.rel_path(), "docs/readme.txt");

        let top = files.iter().find(|f| f.name == "top.txt").unwrap();
        assert_eq!(top.parent_path, "");
    }

    #[test]
    fn excluded_directory_is_pruned_whole() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("keep")).unwrap();
        fs::create_dir(dir.path().join("skip")).unwrap();
        fs::write(dir.path().join("keep/a.txt"), "a").unwrap();
        fs::write(dir.path().join("skip/b.txt"), "b").unwrap();

        let filter = ExcludeFilter::new(&["skip".to_string()], &SilentReporter);
        let (folders, files) = collect(dir.path(), &filter);

        assert!(!folders.contains(&"skip".to_string()));
        assert!(files.iter().all(|f| f.parent_path != "skip"));
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn empty_folder_is_still_yielded() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("hollow")).unwrap();

        let filter = ExcludeFilter::new(&[], &SilentReporter);
        let (folders, files) = collect(dir.path(), &filter);

        assert!(folders.contains(&"hollow".to_string()));
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/data.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("loop")).unwrap();

        let filter = ExcludeFilter::new(&[], &SilentReporter);
        let (folders, files) = collect(dir.path(), &filter);

        assert!(!folders.contains(&"loop".to_string()));
        assert_eq!(files.len(), 1);
    }
}
