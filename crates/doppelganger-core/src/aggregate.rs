//! Order-independent folder fingerprints.
//!
//! A folder's aggregate covers the multiset of its direct children's
//! `(name, size, modified_ns, fingerprint)` tuples and nothing else: not the
//! enumeration order, which is filesystem-dependent, and not descendant
//! folders, which keep their own aggregates. Each child tuple is serialized
//! to a canonical byte string and drained from a min-heap in ascending order
//! through one incremental hasher. That is equivalent to sorting all
//! encodings and hashing the concatenation, without materializing a sorted
//! list.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::fingerprint::Fingerprint;

pub struct FolderAggregator {
    heap: BinaryHeap<Reverse<Vec<u8>>>,
}

impl FolderAggregator {
    pub fn new() -> Self {
        FolderAggregator {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, name: &str, size: u64, modified_ns: i64, fingerprint: &Fingerprint) {
        // Canonical child encoding: length-prefixed name, fixed-width
        // big-endian fields, raw digest bytes. The length prefix keeps
        // distinct tuples from ever encoding to the same byte string.
        let name_bytes = name.as_bytes();
        let mut buf = Vec::with_capacity(8 + name_bytes.len() + 8 + 8 + 32);
        buf.extend_from_slice(&(name_bytes.len() as u64).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend_from_slice(&size.to_be_bytes());
        buf.extend_from_slice(&modified_ns.to_be_bytes());
        buf.extend_from_slice(fingerprint.as_bytes());
        self.heap.push(Reverse(buf));
    }

    pub fn finish(mut self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        while let Some(Reverse(encoded)) = self.heap.pop() {
            hasher.update(&encoded);
        }
        Fingerprint::from_bytes(*hasher.finalize().as_bytes())
    }
}

impl Default for FolderAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// The aggregate of a folder with no direct files. Stable across processes.
pub fn empty_aggregate() -> Fingerprint {
    FolderAggregator::new().finish()
}
