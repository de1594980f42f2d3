//! Cross-tree comparison of two catalogues.
//!
//! Matching uses both identities a file has: its place (`name` within
//! `parent_path`) and its content (fingerprint). Two entries are equivalent
//! when either matches, so a byte-identical file that moved is a relocation
//! rather than a missing entry, and a same-path file whose bytes changed is a
//! content conflict. Folders are resolved before files: a folder whose whole
//! direct-file set reappears elsewhere is reported once, and its files are
//! suppressed from file-level rows, so a moved subtree does not flood the
//! result with one row per file.
//!
//! Where several entries share a fingerprint (duplicate content), conflict
//! and relocation buckets carry one row per (A-entry, B-entry) pair while
//! absence checks are existential; callers must expect a combinatorial row
//! set when duplicates are numerous.

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::empty_aggregate;
use crate::error::Error;
use crate::fingerprint::Fingerprint;
use crate::store::Catalogue;
use crate::walker::join_rel;

/// One side's file entry as seen by the comparator. Fingerprints are
/// mandatory here; incomplete catalogues are rejected at load time.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub parent_path: String,
    pub size: u64,
    pub modified_ns: i64,
    pub fingerprint: Fingerprint,
}

impl FileEntry {
    fn rel_path(&self) -> String {
        join_rel(&self.parent_path, &self.name)
    }

    fn to_ref(&self) -> FileRef {
        FileRef {
            path: self.rel_path(),
            size: self.size,
            fingerprint: self.fingerprint,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FolderEntry {
    pub path: String,
    pub fingerprint: Fingerprint,
}

impl FolderEntry {
    fn to_ref(&self) -> FolderRef {
        FolderRef {
            path: self.path.clone(),
            fingerprint: self.fingerprint,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRef {
    pub path: String,
    pub size: u64,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderRef {
    pub path: String,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilePairing {
    pub a: FileRef,
    pub b: FileRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderPairing {
    pub a: FolderRef,
    pub b: FolderRef,
}

/// Classified outcome of one comparison. Ordering within a bucket is
/// unspecified; consumers should treat each bucket as a set.
#[derive(Debug, Default, Serialize)]
pub struct TreeDiff {
    pub folder_relocations: Vec<FolderPairing>,
    pub folders_missing_in_a: Vec<FolderRef>,
    pub folders_missing_in_b: Vec<FolderRef>,
    pub content_conflicts: Vec<FilePairing>,
    pub file_relocations: Vec<FilePairing>,
    pub files_missing_in_a: Vec<FileRef>,
    pub files_missing_in_b: Vec<FileRef>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.folder_relocations.is_empty()
            && self.folders_missing_in_a.is_empty()
            && self.folders_missing_in_b.is_empty()
            && self.content_conflicts.is_empty()
            && self.file_relocations.is_empty()
            && self.files_missing_in_a.is_empty()
            && self.files_missing_in_b.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.folder_relocations.len()
            + self.folders_missing_in_a.len()
            + self.folders_missing_in_b.len()
            + self.content_conflicts.len()
            + self.file_relocations.len()
            + self.files_missing_in_a.len()
            + self.files_missing_in_b.len()
    }
}

/// One catalogue loaded into joinable in-memory indexes.
pub struct CatalogueView {
    files: Vec<FileEntry>,
    folders: Vec<FolderEntry>,
    file_by_rel: AHashMap<String, usize>,
    files_by_fp: AHashMap<Fingerprint, Vec<usize>>,
    files_by_parent: AHashMap<String, Vec<usize>>,
    folder_fp_by_path: AHashMap<String, Fingerprint>,
    folders_by_fp: AHashMap<Fingerprint, Vec<usize>>,
}

impl CatalogueView {
    pub fn new(files: Vec<FileEntry>, folders: Vec<FolderEntry>) -> Self {
        let mut file_by_rel = AHashMap::with_capacity(files.len());
        let mut files_by_fp: AHashMap<Fingerprint, Vec<usize>> = AHashMap::new();
        let mut files_by_parent: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (i, file) in files.iter().enumerate() {
            file_by_rel.insert(file.rel_path(), i);
            files_by_fp.entry(file.fingerprint).or_default().push(i);
            files_by_parent
                .entry(file.parent_path.clone())
                .or_default()
                .push(i);
        }

        let mut folder_fp_by_path = AHashMap::with_capacity(folders.len());
        let mut folders_by_fp: AHashMap<Fingerprint, Vec<usize>> = AHashMap::new();
        for (i, folder) in folders.iter().enumerate() {
            folder_fp_by_path.insert(folder.path.clone(), folder.fingerprint);
            folders_by_fp.entry(folder.fingerprint).or_default().push(i);
        }

        CatalogueView {
            files,
            folders,
            file_by_rel,
            files_by_fp,
            files_by_parent,
            folder_fp_by_path,
            folders_by_fp,
        }
    }

    /// Load a catalogue read-only. A catalogue holding any record without a
    /// fingerprint is refused outright: comparing it would force a silent
    /// guess about unreadable content.
    pub fn load(catalogue_path: &Path) -> Result<Self, Error> {
        let catalogue = Catalogue::open_read_only(catalogue_path)?;

        let missing = catalogue.unfingerprinted_count()?;
        if missing > 0 {
            return Err(Error::Incomplete {
                path: catalogue_path.display().to_string(),
                missing,
            });
        }

        let files = catalogue
            .files()?
            .into_iter()
            .map(|record| {
                let fingerprint = record.fingerprint.ok_or_else(|| Error::Incomplete {
                    path: catalogue_path.display().to_string(),
                    missing: 1,
                })?;
                Ok(FileEntry {
                    name: record.name,
                    parent_path: record.parent_path,
                    size: record.size,
                    modified_ns: record.modified_ns,
                    fingerprint,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let folders = catalogue
            .folders()?
            .into_iter()
            .map(|record| FolderEntry {
                path: record.path,
                fingerprint: record.fingerprint,
            })
            .collect();

        Ok(CatalogueView::new(files, folders))
    }

    fn has_equivalent_of(&self, file: &FileEntry) -> bool {
        self.file_by_rel.contains_key(&file.rel_path())
            || self.files_by_fp.contains_key(&file.fingerprint)
    }
}

/// Compare two catalogues on disk. Both are opened read-only and never
/// mutated; `a`/`b` orientation follows the argument order.
pub fn compare_catalogues(catalogue_a: &Path, catalogue_b: &Path) -> Result<TreeDiff, Error> {
    let a = CatalogueView::load(catalogue_a)?;
    let b = CatalogueView::load(catalogue_b)?;
    let diff = diff_views(&a, &b);
    debug!(
        "compared {} ({} files) with {} ({} files): {} result rows",
        catalogue_a.display(),
        a.files.len(),
        catalogue_b.display(),
        b.files.len(),
        diff.total_rows(),
    );
    Ok(diff)
}

pub fn diff_views(a: &CatalogueView, b: &CatalogueView) -> TreeDiff {
    let empty = empty_aggregate();
    let mut diff = TreeDiff::default();

    // Folder relocations first. Suppression sets collect the folder pairs
    // whose direct files must not be re-reported as file-level relocations.
    let mut suppressed_a: AHashSet<&str> = AHashSet::new();
    let mut suppressed_b: AHashSet<&str> = AHashSet::new();
    for fa in &a.folders {
        // The empty aggregate carries no content evidence; any two childless
        // folders would otherwise pair with each other.
        if fa.fingerprint == empty {
            continue;
        }
        if b.folder_fp_by_path.get(&fa.path) == Some(&fa.fingerprint) {
            continue;
        }
        let Some(candidates) = b.folders_by_fp.get(&fa.fingerprint) else {
            continue;
        };
        for &bi in candidates {
            let fb = &b.folders[bi];
            if fb.path == fa.path {
                continue;
            }
            if a.folder_fp_by_path.get(&fb.path) == Some(&fb.fingerprint) {
                continue;
            }
            diff.folder_relocations.push(FolderPairing {
                a: fa.to_ref(),
                b: fb.to_ref(),
            });
            suppressed_a.insert(fa.path.as_str());
            suppressed_b.insert(fb.path.as_str());
        }
    }

    // Folder-level absence, each direction.
    let missing_folders_b = collect_missing_folders(a, b, &empty, &mut diff.folders_missing_in_b);
    let missing_folders_a = collect_missing_folders(b, a, &empty, &mut diff.folders_missing_in_a);

    // File-level classification, driven from the A side for the pairwise
    // buckets (each pair is emitted exactly once).
    for file in &a.files {
        let rel = file.rel_path();

        let path_match = b.file_by_rel.get(&rel).map(|&bi| &b.files[bi]);
        if let Some(other) = path_match {
            if other.fingerprint != file.fingerprint {
                diff.content_conflicts.push(FilePairing {
                    a: file.to_ref(),
                    b: other.to_ref(),
                });
            }
        }

        let fp_matches = b.files_by_fp.get(&file.fingerprint);
        if let Some(candidates) = fp_matches {
            for &bi in candidates {
                let other = &b.files[bi];
                if other.rel_path() == rel {
                    continue;
                }
                if suppressed_a.contains(file.parent_path.as_str())
                    || suppressed_b.contains(other.parent_path.as_str())
                {
                    continue;
                }
                diff.file_relocations.push(FilePairing {
                    a: file.to_ref(),
                    b: other.to_ref(),
                });
            }
        }

        if path_match.is_none()
            && fp_matches.is_none()
            && !missing_folders_b.contains(&file.parent_path)
        {
            diff.files_missing_in_b.push(file.to_ref());
        }
    }

    // Absence on the B side; pairwise buckets were already emitted above.
    for file in &b.files {
        if a.has_equivalent_of(file) {
            continue;
        }
        if missing_folders_a.contains(&file.parent_path) {
            continue;
        }
        diff.files_missing_in_a.push(file.to_ref());
    }

    diff
}

/// Folders of `x` with no counterpart in `y`: path absent, aggregate absent
/// (unless empty), and no direct file with any path-or-content match. Their
/// paths suppress the per-file missing rows.
fn collect_missing_folders(
    x: &CatalogueView,
    y: &CatalogueView,
    empty: &Fingerprint,
    out: &mut Vec<FolderRef>,
) -> AHashSet<String> {
    let mut missing = AHashSet::new();
    for folder in &x.folders {
        if y.folder_fp_by_path.contains_key(&folder.path) {
            continue;
        }
        if folder.fingerprint != *empty && y.folders_by_fp.contains_key(&folder.fingerprint) {
            continue;
        }
        let children_unmatched = x
            .files_by_parent
            .get(&folder.path)
            .map_or(true, |ids| !ids.iter().any(|&i| y.has_equivalent_of(&x.files[i])));
        if children_unmatched {
            out.push(folder.to_ref());
            missing.insert(folder.path.clone());
        }
    }
    missing
}
