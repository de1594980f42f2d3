use serde::Serialize;

use crate::fingerprint::Fingerprint;
use crate::walker::join_rel;

/// One catalogued file, keyed by `(name, parent_path)` within its tree.
/// The fingerprint is absent between a metadata walk and the hashing pass,
/// and stays absent for files that could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub parent_path: String,
    pub size: u64,
    pub modified_ns: i64,
    pub fingerprint: Option<Fingerprint>,
}

impl FileRecord {
    pub fn rel_path(&self) -> String {
        join_rel(&self.parent_path, &self.name)
    }
}

/// One catalogued folder with the aggregate fingerprint of its direct files.
#[derive(Debug, Clone, Serialize)]
pub struct FolderRecord {
    pub path: String,
    pub fingerprint: Fingerprint,
}

/// Bookkeeping for one create/update pass over a tree.
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub files_seen: i64,
    pub bytes_seen: i64,
    pub files_hashed: i64,
    pub fingerprints_reused: i64,
    pub files_failed: i64,
}
