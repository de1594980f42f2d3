/// Trait for reporting walk/hash progress and non-fatal warnings.
///
/// Implementations are shared across hashing worker threads, hence the
/// `Send + Sync` bound; they must be observational only and never influence
/// results. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_walk_start(&self) {}
    fn on_walk_progress(&self, _files_seen: usize, _current_path: &str) {}
    fn on_walk_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_hash_complete(&self, _files_hashed: usize, _duration_secs: f64) {}

    /// A recoverable problem: the named action skipped one entry and moved on.
    fn warning(&self, _action: &str, _message: &str) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
