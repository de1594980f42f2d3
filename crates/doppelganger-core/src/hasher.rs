//! Parallel content hashing over a batch of catalogued files.
//!
//! Each file is one independent unit of work on rayon's global pool, which is
//! sized to the machine's available parallelism. Workers share nothing but an
//! atomic progress counter and the reporter; a file that cannot be read
//! produces a per-file error outcome while the rest of the batch proceeds.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::fingerprint::{self, Fingerprint};
use crate::progress::ProgressReporter;
use crate::walker::join_rel;

/// Identifies one file record awaiting a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub name: String,
    pub parent_path: String,
}

impl FileKey {
    pub fn rel_path(&self) -> String {
        join_rel(&self.parent_path, &self.name)
    }
}

pub struct HashOutcome {
    pub key: FileKey,
    pub result: Result<Fingerprint, io::Error>,
}

/// Fingerprint every file in `keys` under `root`. Outcomes are keyed, not
/// ordered: completion order across workers is unspecified and callers must
/// reassociate results by key.
pub fn fingerprint_all(
    root: &Path,
    keys: Vec<FileKey>,
    reporter: &dyn ProgressReporter,
) -> Vec<HashOutcome> {
    let total = keys.len();
    let completed = AtomicUsize::new(0);

    keys.into_par_iter()
        .map(|key| {
            let path = root.join(key.rel_path());
            let result = fingerprint::fingerprint_file(&path);
            if let Err(err) = &result {
                reporter.warning(
                    "hash",
                    &format!("cannot read '{}': {err}", key.rel_path()),
                );
            }
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_hash_progress(done, total);
            HashOutcome { key, result }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use crate::progress::SilentReporter;
    use std::fs;
    use tempfile::tempdir;

    fn key(parent: &str, name: &str) -> FileKey {
        FileKey {
            name: name.to_string(),
            parent_path: parent.to_string(),
        }
    }

    #[test]
    fn hashes_every_file_in_the_batch() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();

        let outcomes = fingerprint_all(
            dir.path(),
            vec![key("", "a.txt"), key("sub", "b.txt")],
            &SilentReporter,
        );
        assert_eq!(outcomes.len(), 2);

        let by_rel = |rel: &str| {
            outcomes
                .iter()
                .find(|o| o.key.rel_path() == rel)
                .unwrap()
                .result
                .as_ref()
                .unwrap()
        };
        assert_eq!(*by_rel("a.txt"), fingerprint_bytes(b"alpha"));
        assert_eq!(*by_rel("sub/b.txt"), fingerprint_bytes(b"beta"));
    }

    #[test]
    fn one_unreadable_file_does_not_abort_the_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.txt"), "fine").unwrap();

        let outcomes = fingerprint_all(
            dir.path(),
            vec![key("", "good.txt"), key("", "vanished.txt")],
            &SilentReporter,
        );

        let good = outcomes
            .iter()
            .find(|o| o.key.name == "good.txt")
            .unwrap();
        assert!(good.result.is_ok());

        let bad = outcomes
            .iter()
            .find(|o| o.key.name == "vanished.txt")
            .unwrap();
        assert!(bad.result.is_err());
    }
}
