//! Content fingerprints: streaming BLAKE3 digests of file bytes.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Serialize, Serializer};

/// Read buffer for streaming file content through the hasher. Files are never
/// slurped whole; a digest over a multi-gigabyte file holds 64 KiB at a time.
const READ_CHUNK: usize = 64 * 1024;

/// A 32-byte BLAKE3 digest identifying a byte sequence by content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Fingerprint(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the stored hex form. `None` for anything that is not exactly
    /// 64 hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; 32] = raw.try_into().ok()?;
        Some(Fingerprint(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}…)", &self.to_hex()[..12])
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Fingerprint everything a reader yields, in bounded chunks.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

/// Fingerprint a file's content. An unreadable file is an error, never the
/// digest of zero bytes; callers must be able to tell "empty" from
/// "unavailable".
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    fingerprint_reader(File::open(path)?)
}

/// Fingerprint an in-memory byte sequence.
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint(*blake3::hash(data).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn deterministic_across_calls() {
        let a = fingerprint_bytes(b"hello world");
        let b = fingerprint_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(fingerprint_bytes(b"v1"), fingerprint_bytes(b"v2"));
    }

    #[test]
    fn chunked_read_matches_one_shot() {
        // Larger than one read chunk so the streaming loop iterates.
        let data = vec![0x5Au8; READ_CHUNK * 2 + 17];
        let streamed = fingerprint_reader(&data[..]).unwrap();
        assert_eq!(streamed, fingerprint_bytes(&data));
    }

    #[test]
    fn file_and_bytes_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"catalogue me").unwrap();
        assert_eq!(
            fingerprint_file(&path).unwrap(),
            fingerprint_bytes(b"catalogue me")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(fingerprint_file(&dir.path().join("gone")).is_err());
    }

    #[test]
    fn hex_round_trip() {
        let fp = fingerprint_bytes(b"round trip");
        assert_eq!(Fingerprint::from_hex(&fp.to_hex()), Some(fp));
        assert_eq!(Fingerprint::from_hex("zz"), None);
    }
}
