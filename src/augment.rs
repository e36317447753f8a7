// Temporal augmentation — random transforms over the time axis
//
// Applied only to positive/negative sequences of a triplet. One uniform draw
// in [0, 1) picks exactly one branch; transforms never compose:
//
//   [0.0, 0.1)  frame dropout (70% keep probability)
//   [0.1, 0.2)  stride-2 downsample
//   [0.2, 0.3)  2x duplication upsample (short sequences only)
//   [0.3, 1.0)  identity

use rand::Rng;

use crate::dataset::FeatureSequence;

/// Categorical temporal augmentation with the draw thresholds above.
#[derive(Debug, Clone)]
pub struct TemporalAugment {
    /// Sequences with at most this many frames are never transformed.
    pub min_frames: usize,
    /// Per-frame survival probability for the dropout branch.
    pub keep_prob: f64,
    /// The duplication branch only fires below this many frames.
    pub max_upsample_frames: usize,
}

impl Default for TemporalAugment {
    fn default() -> Self {
        Self {
            min_frames: 6,
            keep_prob: 0.7,
            max_upsample_frames: 150,
        }
    }
}

impl TemporalAugment {
    /// Apply at most one random temporal transform to `seq`.
    pub fn apply<R: Rng>(&self, seq: FeatureSequence, rng: &mut R) -> FeatureSequence {
        if seq.frames() <= self.min_frames {
            return seq;
        }
        let draw: f64 = rng.gen();
        if draw < 0.1 {
            frame_dropout(seq, self.keep_prob, rng)
        } else if draw < 0.2 {
            downsample(seq, 2)
        } else if draw < 0.3 {
            if seq.frames() < self.max_upsample_frames {
                duplicate_frames(seq)
            } else {
                seq
            }
        } else {
            seq
        }
    }
}

/// Drop frames via a random keep-mask with survival probability `keep_prob`.
///
/// If no frame survives the draw, the input is returned unchanged — the
/// result is never an empty sequence.
pub fn frame_dropout<R: Rng>(seq: FeatureSequence, keep_prob: f64, rng: &mut R) -> FeatureSequence {
    let kept: Vec<usize> = (0..seq.frames())
        .filter(|_| rng.gen::<f64>() < keep_prob)
        .collect();
    if kept.is_empty() {
        return seq;
    }
    seq.gather_frames(&kept)
}

/// Keep every `stride`-th frame, starting at frame 0.
pub fn downsample(seq: FeatureSequence, stride: usize) -> FeatureSequence {
    let kept: Vec<usize> = (0..seq.frames()).step_by(stride).collect();
    seq.gather_frames(&kept)
}

/// Double the sequence by interleaving each frame with itself: 0,0,1,1,2,2,...
pub fn duplicate_frames(seq: FeatureSequence) -> FeatureSequence {
    let indices: Vec<usize> = (0..seq.frames()).flat_map(|i| [i, i]).collect();
    seq.gather_frames(&indices)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(frames: usize) -> FeatureSequence {
        let data: Vec<f32> = (0..frames * 2).map(|i| (i / 2) as f32).collect();
        FeatureSequence::from_2d(frames, 2, data).unwrap()
    }

    #[test]
    fn short_sequences_never_transformed() {
        let aug = TemporalAugment::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = aug.apply(ramp(6), &mut rng);
            assert_eq!(out, ramp(6));
        }
    }

    #[test]
    fn long_sequences_never_duplicated() {
        let aug = TemporalAugment::default();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = aug.apply(ramp(150), &mut rng);
            assert!(out.frames() <= 150, "duplication fired at {} frames", out.frames());
        }
    }

    #[test]
    fn single_branch_per_call() {
        // Whatever the draw, the output is one of the four known outcomes.
        let aug = TemporalAugment::default();
        let input = ramp(10);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = aug.apply(input.clone(), &mut rng);
            let frames = out.frames();
            assert!(
                frames == 20 || frames == 5 || (1..=10).contains(&frames),
                "unexpected frame count {frames}"
            );
        }
    }

    #[test]
    fn dropout_keeps_at_least_one_frame() {
        let mut rng = StdRng::seed_from_u64(7);
        // keep_prob 0 empties the mask; the input must come back unchanged
        let out = frame_dropout(ramp(8), 0.0, &mut rng);
        assert_eq!(out, ramp(8));
    }

    #[test]
    fn dropout_full_keep_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = frame_dropout(ramp(8), 1.0, &mut rng);
        assert_eq!(out, ramp(8));
    }

    #[test]
    fn downsample_stride_two() {
        let out = downsample(ramp(7), 2);
        assert_eq!(out.frames(), 4);
        assert_eq!(out.frame(0), ramp(7).frame(0));
        assert_eq!(out.frame(1), ramp(7).frame(2));
        assert_eq!(out.frame(3), ramp(7).frame(6));
    }

    #[test]
    fn duplicate_interleaves_frames() {
        let out = duplicate_frames(ramp(3));
        assert_eq!(out.frames(), 6);
        let src = ramp(3);
        for i in 0..3 {
            assert_eq!(out.frame(2 * i), src.frame(i));
            assert_eq!(out.frame(2 * i + 1), src.frame(i));
        }
    }
}
