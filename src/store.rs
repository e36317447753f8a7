// Feature store — opaque keyed access to precomputed frame features
//
// The training pipeline treats the store as a read-only map from string video
// identifiers to dense `[frames, spatial, dim]` feature arrays. Two backends
// are provided: an in-memory map (tests, small runs) and a single-file binary
// pack read fully into memory at open time.
//
// Pack layout (all integers little-endian):
//   magic(u32 = "VFP1") | count(u32)
//   per entry: key_len(u32) | key bytes (utf-8) |
//              frames(u32) | spatial(u32) | dim(u32) | f32 data
//
// Rank-2 extractions are written with spatial = 1, so every stored sequence
// is rank-3 on the way out.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::dataset::FeatureSequence;
use crate::error::{Error, Result};

/// Magic number at the head of a feature pack file ("VFP1").
pub const PACK_MAGIC: u32 = 0x5646_5031;

/// Read-only keyed access to per-video feature sequences.
///
/// Handles are not shared across worker processes; each worker opens its own.
pub trait FeatureStore: Send + Sync {
    /// Retrieve the sequence stored under `key`.
    fn get(&self, key: &str) -> Result<FeatureSequence>;

    /// All keys, in the store's canonical order.
    fn keys(&self) -> Vec<String>;

    /// Number of stored sequences.
    fn len(&self) -> usize;

    /// Whether the store holds no sequences.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }
}

// MemoryFeatureStore

/// An in-memory feature store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    entries: HashMap<String, FeatureSequence>,
    order: Vec<String>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sequence under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, seq: FeatureSequence) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, seq);
    }
}

impl FromIterator<(String, FeatureSequence)> for MemoryFeatureStore {
    fn from_iter<I: IntoIterator<Item = (String, FeatureSequence)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, seq) in iter {
            store.insert(key, seq);
        }
        store
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn get(&self, key: &str) -> Result<FeatureSequence> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingKey { key: key.to_string() })
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

// PackedFeatureStore

/// A feature store loaded from a single pack file.
///
/// The whole file is parsed at open time; malformed packs fail fatally there
/// rather than surfacing mid-epoch.
#[derive(Debug)]
pub struct PackedFeatureStore {
    entries: HashMap<String, FeatureSequence>,
    order: Vec<String>,
}

impl PackedFeatureStore {
    /// Open and fully parse a pack file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let store = Self::from_bytes(&bytes)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            sequences = store.len(),
            "opened feature pack"
        );
        Ok(store)
    }

    /// Parse a pack from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u32()?;
        if magic != PACK_MAGIC {
            return Err(Error::InvalidMagic {
                expected: PACK_MAGIC,
                got: magic,
            });
        }
        let count = cursor.read_u32()? as usize;

        let mut entries = HashMap::with_capacity(count);
        let mut order = Vec::with_capacity(count);
        for _ in 0..count {
            let key_len = cursor.read_u32()? as usize;
            let key = String::from_utf8_lossy(cursor.read_bytes(key_len)?).into_owned();
            let frames = cursor.read_u32()? as usize;
            let spatial = cursor.read_u32()? as usize;
            let dim = cursor.read_u32()? as usize;
            // Header fields come straight off disk; a corrupt entry must
            // surface as Err, never an arithmetic panic.
            let numel = frames
                .checked_mul(spatial)
                .and_then(|n| n.checked_mul(dim))
                .ok_or(Error::ShapeOverflow {
                    frames,
                    spatial,
                    dim,
                })?;
            let data = cursor.read_f32s(numel)?;
            entries.insert(key.clone(), FeatureSequence::new(frames, spatial, dim, data)?);
            order.push(key);
        }
        Ok(Self { entries, order })
    }
}

impl FeatureStore for PackedFeatureStore {
    fn get(&self, key: &str) -> Result<FeatureSequence> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingKey { key: key.to_string() })
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

// Pack writing — used by dataset-preparation tooling and tests

/// Serialize entries into pack bytes.
///
/// Fails rather than truncating when a count or key does not fit the
/// format's u32 fields, so the writer can never emit a pack the reader
/// misparses.
pub fn build_pack_bytes<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a FeatureSequence)>,
{
    let entries: Vec<_> = entries.into_iter().collect();
    let mut buf = Vec::new();
    buf.extend_from_slice(&PACK_MAGIC.to_le_bytes());
    buf.extend_from_slice(&u32_field("entry count", entries.len())?.to_le_bytes());
    for (key, seq) in entries {
        buf.extend_from_slice(&u32_field("key length", key.len())?.to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&u32_field("frame count", seq.frames())?.to_le_bytes());
        buf.extend_from_slice(&u32_field("spatial size", seq.spatial())?.to_le_bytes());
        buf.extend_from_slice(&u32_field("feature dim", seq.dim())?.to_le_bytes());
        for &v in seq.data() {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    Ok(buf)
}

/// Write entries to a pack file at `path`.
pub fn write_pack<'a, I>(path: impl AsRef<Path>, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a FeatureSequence)>,
{
    fs::write(path, build_pack_bytes(entries)?)?;
    Ok(())
}

fn u32_field(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::PackFieldTooLarge { field, len })
}

// Byte cursor helpers

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = match self.pos.checked_add(n) {
            Some(end) if end <= self.bytes.len() => end,
            _ => {
                return Err(Error::Truncated {
                    expected: self.pos.saturating_add(n),
                    got: self.bytes.len(),
                })
            }
        };
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32s(&mut self, n: usize) -> Result<Vec<f32>> {
        let byte_len = n.checked_mul(4).ok_or(Error::Truncated {
            expected: usize::MAX,
            got: self.bytes.len(),
        })?;
        let b = self.read_bytes(byte_len)?;
        Ok(b.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(frames: usize, dim: usize, fill: f32) -> FeatureSequence {
        FeatureSequence::from_2d(frames, dim, vec![fill; frames * dim]).unwrap()
    }

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryFeatureStore::new();
        store.insert("a", seq(2, 3, 1.0));
        store.insert("b", seq(4, 3, 2.0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert!(store.contains("a"));
        assert_eq!(store.get("b").unwrap().frames(), 4);
    }

    #[test]
    fn memory_store_missing_key() {
        let store = MemoryFeatureStore::new();
        let err = store.get("nope").unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn pack_roundtrip() {
        let a = seq(2, 3, 1.5);
        let b = FeatureSequence::new(1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let bytes = build_pack_bytes([("a", &a), ("b", &b)]).unwrap();

        let store = PackedFeatureStore::from_bytes(&bytes).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap(), a);
        assert_eq!(store.get("b").unwrap(), b);
    }

    #[test]
    fn pack_invalid_magic() {
        let mut bytes = build_pack_bytes([("a", &seq(1, 1, 0.0))]).unwrap();
        bytes[0] ^= 0xff;
        let err = PackedFeatureStore::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn pack_truncated() {
        let bytes = build_pack_bytes([("a", &seq(3, 8, 0.0))]).unwrap();
        let err = PackedFeatureStore::from_bytes(&bytes[..bytes.len() - 5]).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn pack_overflowing_shape_header_is_an_error() {
        // A corrupt entry declaring an astronomically large shape must come
        // back as Err, not an arithmetic panic.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&PACK_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'a');
        for _ in 0..3 {
            bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        }
        let err = PackedFeatureStore::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::ShapeOverflow { .. }));
    }

    #[test]
    fn pack_huge_payload_length_is_an_error() {
        // Element count fits usize but the byte length does not: still Err.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&PACK_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'a');
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        let err = PackedFeatureStore::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn writer_rejects_fields_beyond_u32() {
        let err = u32_field("entry count", usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            Error::PackFieldTooLarge {
                field: "entry count",
                ..
            }
        ));
    }
}
