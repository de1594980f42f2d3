//! Orchestration of catalogue builds and incremental updates.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::Error;
use crate::exclude::{self, ExcludeFilter};
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::store::{self, Catalogue};
use crate::walker::{self, WalkedEntry};

pub struct IndexEngine {
    root: PathBuf,
    catalogue_path: PathBuf,
    extra_patterns: Vec<String>,
}

#[derive(Debug)]
pub struct IndexResult {
    pub walk_duration: Duration,
    pub hash_duration: Duration,
    pub files_seen: usize,
    pub bytes_seen: u64,
    pub files_hashed: usize,
    pub fingerprints_reused: usize,
    pub folders_recorded: usize,
    /// Relative paths that could not be read during hashing. Their records
    /// stay in the catalogue without a fingerprint, and the catalogue is
    /// rejected by the comparator until a later pass succeeds.
    pub failed_files: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Full,
    Incremental,
}

impl IndexEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let catalogue_path = store::default_location(&root);
        IndexEngine {
            root,
            catalogue_path,
            extra_patterns: Vec::new(),
        }
    }

    pub fn with_catalogue_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalogue_path = path.into();
        self
    }

    /// Exclusion patterns applied on top of the tree's own pattern file.
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.extra_patterns = patterns;
        self
    }

    pub fn catalogue_path(&self) -> &Path {
        &self.catalogue_path
    }

    /// Full baseline build: discard any existing file table and fingerprint
    /// the whole tree.
    pub fn create(&self, reporter: &dyn ProgressReporter) -> Result<IndexResult, Error> {
        self.run(Mode::Full, reporter)
    }

    /// Incremental pass: re-walk the tree, reuse the previous snapshot's
    /// fingerprint for every file whose size and modification time are
    /// unchanged, and hash only the rest.
    pub fn update(&self, reporter: &dyn ProgressReporter) -> Result<IndexResult, Error> {
        self.run(Mode::Incremental, reporter)
    }

    fn run(&self, mode: Mode, reporter: &dyn ProgressReporter) -> Result<IndexResult, Error> {
        if !self.root.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("tree root '{}' is not a readable directory", self.root.display()),
            )));
        }
        // An unenumerable root is fatal before the previous snapshot is
        // touched; only entries below the root degrade to warnings.
        std::fs::read_dir(&self.root)?;

        let mut patterns = exclude::load_tree_patterns(&self.root)?;
        patterns.extend(self.extra_patterns.iter().cloned());
        let filter = ExcludeFilter::new(&patterns, reporter)
            .auto_exclude_catalogue(&self.root, &self.catalogue_path);

        let catalogue = Catalogue::open(&self.catalogue_path)?;

        // One transaction per pass: a reader of the catalogue sees the
        // previous snapshot until the commit, then the new one, never a mix.
        let tx = catalogue.connection().unchecked_transaction()?;
        let snapshot_id = catalogue.begin_snapshot()?;

        match mode {
            Mode::Full => catalogue.reset_file_table()?,
            Mode::Incremental => catalogue.stage_previous_file_table()?,
        }

        // Phase 1: walk. Metadata only; no file content is read here.
        reporter.on_walk_start();
        let walk_start = Instant::now();
        let mut files = Vec::new();
        let mut folders = Vec::new();
        for entry in walker::walk(&self.root, &filter, reporter) {
            match entry {
                WalkedEntry::Folder { path } => folders.push(path),
                WalkedEntry::File(meta) => {
                    reporter.on_walk_progress(files.len() + 1, &meta.rel_path());
                    files.push(meta);
                }
            }
        }
        let bytes_seen: u64 = files.iter().map(|f| f.size).sum();
        catalogue.insert_file_metadata(&files)?;
        let walk_duration = walk_start.elapsed();
        reporter.on_walk_complete(files.len(), walk_duration.as_secs_f64());
        debug!(
            "walk found {} files ({} bytes) in {} folders",
            files.len(),
            bytes_seen,
            folders.len()
        );

        // Phase 2: reuse fingerprints for metadata-identical files.
        let fingerprints_reused = match mode {
            Mode::Full => 0,
            Mode::Incremental => catalogue.carry_forward_fingerprints()?,
        };

        // Phase 3: hash whatever is still missing a fingerprint.
        let pending = catalogue.pending_fingerprints()?;
        reporter.on_hash_start(pending.len());
        let hash_start = Instant::now();
        let outcomes = hasher::fingerprint_all(&self.root, pending, reporter);
        let mut files_hashed = 0;
        let mut failed_files = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(fingerprint) => {
                    catalogue.store_fingerprint(&outcome.key, &fingerprint)?;
                    files_hashed += 1;
                }
                Err(_) => failed_files.push(outcome.key.rel_path()),
            }
        }
        let hash_duration = hash_start.elapsed();
        reporter.on_hash_complete(files_hashed, hash_duration.as_secs_f64());

        if mode == Mode::Incremental {
            catalogue.discard_previous_file_table()?;
        }

        // Phase 4: folder aggregates over the completed file table.
        let folders_recorded = catalogue.rebuild_folders(&folders)?;

        let status = if failed_files.is_empty() {
            "complete"
        } else {
            "partial"
        };
        catalogue.finish_snapshot(
            snapshot_id,
            status,
            files.len(),
            bytes_seen,
            files_hashed,
            fingerprints_reused,
            failed_files.len(),
        )?;
        tx.commit()?;

        info!(
            "indexed '{}': {} files, {} hashed, {} reused, {} failed",
            self.root.display(),
            files.len(),
            files_hashed,
            fingerprints_reused,
            failed_files.len()
        );

        Ok(IndexResult {
            walk_duration,
            hash_duration,
            files_seen: files.len(),
            bytes_seen,
            files_hashed,
            fingerprints_reused,
            folders_recorded,
            failed_files,
        })
    }
}
