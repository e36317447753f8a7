use std::path::PathBuf;

/// All errors that can occur while supplying training data.
///
/// Construction-time failures (missing ground-truth file, malformed feature
/// pack) are fatal and propagate to the caller. Per-item retrieval failures
/// are recovered at the dataset boundary; see `SequenceFeatureDataset`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while reading a store or ground-truth file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ground-truth JSON failed to parse.
    #[error("ground-truth parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// No ground-truth file exists for the named teacher model.
    #[error("unknown teacher {name:?}: no similarity file at {}", path.display())]
    UnknownTeacher { name: String, path: PathBuf },

    /// The feature store has no record under this key.
    #[error("missing key {key:?} in feature store")]
    MissingKey { key: String },

    /// A video id appears in the pair table but not in the ground-truth index.
    #[error("video id {id} has no entry in the ground-truth index")]
    UnknownVideo { id: u32 },

    /// A sequence was declared with a zero-sized axis.
    #[error("degenerate sequence shape [{frames}, {spatial}, {dim}]")]
    DegenerateShape {
        frames: usize,
        spatial: usize,
        dim: usize,
    },

    /// A declared shape's element count overflows `usize`.
    #[error("sequence shape [{frames}, {spatial}, {dim}] overflows the element count")]
    ShapeOverflow {
        frames: usize,
        spatial: usize,
        dim: usize,
    },

    /// Flat data length does not match the declared shape.
    #[error("element count mismatch: shape [{frames}, {spatial}, {dim}] requires {expected} elements, got {got}")]
    ElementCountMismatch {
        frames: usize,
        spatial: usize,
        dim: usize,
        expected: usize,
        got: usize,
    },

    /// A feature pack file did not start with the expected magic number.
    #[error("invalid pack magic: expected {expected:#010x}, got {got:#010x}")]
    InvalidMagic { expected: u32, got: u32 },

    /// A feature pack file ended before its declared contents.
    #[error("truncated pack: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// A value does not fit the pack format's u32 fields.
    #[error("pack {field} too large to encode: {len}")]
    PackFieldTooLarge { field: &'static str, len: usize },

    /// Index passed to `get` is past the end of the dataset.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// `trainset_percentage` must lie in (0, 100].
    #[error("trainset percentage must be in (0, 100], got {got}")]
    InvalidPercentage { got: f64 },

    /// The ground-truth index maps no videos at all.
    #[error("ground-truth index is empty")]
    EmptyIndex,
}

/// Convenience Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
