// Dataset trait and the frame-feature sequence type shared by all datasets

use crate::error::{Error, Result};

/// An ordered sequence of per-frame feature grids for one video.
///
/// Data is stored flat in row-major `[frames, spatial, dim]` layout. The
/// spatial axis is always present: sequences extracted as plain
/// `[frames, dim]` matrices are normalized to `spatial = 1` at ingest time,
/// so downstream code never deals with rank-2 inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    frames: usize,
    spatial: usize,
    dim: usize,
    data: Vec<f32>,
}

impl FeatureSequence {
    /// Create a sequence from flat data, validating the declared shape.
    pub fn new(frames: usize, spatial: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        if frames == 0 || spatial == 0 || dim == 0 {
            return Err(Error::DegenerateShape {
                frames,
                spatial,
                dim,
            });
        }
        let expected = frames
            .checked_mul(spatial)
            .and_then(|n| n.checked_mul(dim))
            .ok_or(Error::ShapeOverflow {
                frames,
                spatial,
                dim,
            })?;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                frames,
                spatial,
                dim,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            frames,
            spatial,
            dim,
            data,
        })
    }

    /// Create from a rank-2 `[frames, dim]` matrix, inserting a unit spatial axis.
    pub fn from_2d(frames: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        Self::new(frames, 1, dim, data)
    }

    /// An all-zero sequence of the given shape.
    pub fn zeros(frames: usize, spatial: usize, dim: usize) -> Self {
        Self {
            frames,
            spatial,
            dim,
            data: vec![0.0; frames * spatial * dim],
        }
    }

    /// The fixed sentinel returned when a record cannot be retrieved.
    ///
    /// Shape `[1, 9, 512]`, all zeros. Consumers treat this as a skipped
    /// sample rather than an error.
    pub fn placeholder() -> Self {
        Self::zeros(1, 9, 512)
    }

    /// Number of frames (time axis).
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Size of the spatial axis (1 for sequences ingested as 2-D).
    pub fn spatial(&self) -> usize {
        self.spatial
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Shape as `[frames, spatial, dim]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.frames, self.spatial, self.dim]
    }

    /// Total number of scalar elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// The flat row-major data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The `spatial * dim` values of frame `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.frames()`.
    pub fn frame(&self, i: usize) -> &[f32] {
        let stride = self.spatial * self.dim;
        &self.data[i * stride..(i + 1) * stride]
    }

    /// Repeat the whole sequence along the time axis until `frames >= min_len`.
    ///
    /// Each pass concatenates the sequence with itself, doubling its length,
    /// so the final length may overshoot `min_len` but is never truncated to
    /// it. Frames `i` and `i + L` of a doubled sequence are bit-identical.
    pub fn extend_to_min_frames(&mut self, min_len: usize) {
        while self.frames > 0 && self.frames < min_len {
            self.data.extend_from_within(..);
            self.frames *= 2;
        }
    }

    /// Build a new sequence by gathering the given frame indices, in order.
    ///
    /// # Panics
    /// Panics if any index is `>= self.frames()`.
    pub fn gather_frames(&self, indices: &[usize]) -> Self {
        let stride = self.spatial * self.dim;
        let mut data = Vec::with_capacity(indices.len() * stride);
        for &i in indices {
            data.extend_from_slice(self.frame(i));
        }
        Self {
            frames: indices.len(),
            spatial: self.spatial,
            dim: self.dim,
            data,
        }
    }
}

/// An indexed collection of samples.
///
/// The external training loop iterates indices `0..len()`, optionally
/// shuffled and batched by its own collator. Implementations must be
/// `Send + Sync` so consumers can read from multiple workers, each holding
/// its own store handle.
pub trait Dataset: Send + Sync {
    /// What one retrieval yields.
    type Item;

    /// Total number of samples.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the sample at position `index`.
    fn get(&self, index: usize) -> Self::Item;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_element_count() {
        let err = FeatureSequence::new(2, 1, 3, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, Error::ElementCountMismatch { expected: 6, got: 5, .. }));
    }

    #[test]
    fn new_rejects_overflowing_shape() {
        let err = FeatureSequence::new(usize::MAX, 2, 2, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ShapeOverflow { .. }));
    }

    #[test]
    fn new_rejects_zero_axis() {
        let err = FeatureSequence::new(0, 1, 3, vec![]).unwrap_err();
        assert!(matches!(err, Error::DegenerateShape { .. }));
    }

    #[test]
    fn from_2d_inserts_unit_spatial_axis() {
        let seq = FeatureSequence::from_2d(2, 3, vec![1.0; 6]).unwrap();
        assert_eq!(seq.shape(), [2, 1, 3]);
    }

    #[test]
    fn placeholder_shape() {
        let seq = FeatureSequence::placeholder();
        assert_eq!(seq.shape(), [1, 9, 512]);
        assert!(seq.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn extend_doubles_until_floor_met() {
        let mut seq = FeatureSequence::from_2d(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        seq.extend_to_min_frames(4);
        // 3 → 6, overshooting the floor rather than truncating to it
        assert_eq!(seq.frames(), 6);
        for i in 0..3 {
            assert_eq!(seq.frame(i), seq.frame(i + 3));
        }
    }

    #[test]
    fn extend_noop_when_already_long_enough() {
        let mut seq = FeatureSequence::from_2d(4, 2, vec![0.0; 8]).unwrap();
        seq.extend_to_min_frames(4);
        assert_eq!(seq.frames(), 4);
    }

    #[test]
    fn gather_frames_reorders_and_repeats() {
        let seq = FeatureSequence::from_2d(3, 2, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]).unwrap();
        let out = seq.gather_frames(&[2, 0, 0]);
        assert_eq!(out.frames(), 3);
        assert_eq!(out.frame(0), &[2.0, 2.0]);
        assert_eq!(out.frame(1), &[0.0, 0.0]);
        assert_eq!(out.frame(2), &[0.0, 0.0]);
    }
}
