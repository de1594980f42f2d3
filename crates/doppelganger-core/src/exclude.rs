//! Exclusion filtering for tree walks.
//!
//! Patterns are glob expressions matched against paths relative to the tree
//! root. The catalogue's own storage location is always excluded, regardless
//! of the configured pattern list, so a catalogue never indexes itself.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use glob::Pattern;

use crate::progress::ProgressReporter;

/// Default per-tree pattern file: one glob per line, `#` starts a comment.
pub const IGNORE_FILE_NAME: &str = ".doppelganger.ignore";

pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
    /// Relative path prefixes excluded unconditionally (the catalogue file
    /// itself; `starts_with` also covers SQLite's `-wal`/`-shm` sidecars).
    auto: Vec<String>,
}

impl ExcludeFilter {
    /// Compile a pattern list. Invalid globs are reported to the warning sink
    /// and skipped; they never abort the walk.
    pub fn new(patterns: &[String], reporter: &dyn ProgressReporter) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(p) => Some(p),
                Err(e) => {
                    reporter.warning("exclude", &format!("invalid glob pattern '{raw}': {e}"));
                    None
                }
            })
            .collect();
        ExcludeFilter {
            patterns: compiled,
            auto: Vec::new(),
        }
    }

    /// Unconditionally exclude the catalogue location when it lives inside
    /// the tree being walked.
    pub fn auto_exclude_catalogue(mut self, root: &Path, catalogue_path: &Path) -> Self {
        if let Ok(rel) = catalogue_path.strip_prefix(root) {
            let rel = rel_string(rel);
            if !rel.is_empty() {
                self.auto.push(rel);
            }
        }
        self
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.auto.iter().any(|a| {
            rel_path == a
                || rel_path
                    .strip_prefix(a.as_str())
                    .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('/'))
        }) || self.patterns.iter().any(|p| p.matches(rel_path))
    }
}

/// A root-relative path as stored in the catalogue: components joined with
/// `/` on every platform, `""` for the root itself.
pub fn rel_string(rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Load the tree's flat pattern file, if present.
pub fn load_tree_patterns(root: &Path) -> io::Result<Vec<String>> {
    let path = root.join(IGNORE_FILE_NAME);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
