// TripletPairDataset — per-epoch triplet sampling from teacher similarities
//
// Holds the ground-truth index and pair table, a fixed random subsample of
// the video universe, and the per-epoch list of selected (query, positive,
// negative) triples. The list is rebuilt wholesale by `next_epoch()` and
// consumed by index between refreshes.
//
// Usage:
//
//   let config = TripletConfig::new("resnet")
//       .data_dir("data")
//       .student_type(COARSE_GRAINED)
//       .trainset_percentage(80.0)
//       .seed(17);
//   let mut dataset = TripletPairDataset::new(store, config)?;
//
//   for _epoch in 0..num_epochs {
//       dataset.next_epoch();
//       for i in 0..dataset.len() {
//           let item = dataset.get(i);
//           // feed (anchor, positive, negative, similarities) to the trainer
//       }
//   }

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::augment::TemporalAugment;
use crate::dataset::{Dataset, FeatureSequence};
use crate::error::{Error, Result};
use crate::ground_truth::{GroundTruth, GroundTruthIndex, PairTable, VideoId};
use crate::store::FeatureStore;

/// Student type whose training targets must live in `[0, 1]`.
///
/// Teacher similarities are cosine scores in `[-1, 1]`; for this student they
/// are remapped with `x / 2 + 0.5` at pair-selection time.
pub const COARSE_GRAINED: &str = "coarse-grained";

// Configuration

/// Configuration for [`TripletPairDataset`].
#[derive(Debug, Clone)]
pub struct TripletConfig {
    /// Name of the teacher model whose similarity file to load.
    pub teacher: String,
    /// Directory holding `trainset_similarities_{teacher}.json`.
    pub data_dir: PathBuf,
    /// Whether positives/negatives pass through temporal augmentation.
    pub augmentation: bool,
    /// Student flavor; [`COARSE_GRAINED`] enables similarity remapping.
    pub student_type: String,
    /// Percentage of the video universe eligible for sampling, in (0, 100].
    pub trainset_percentage: f64,
    /// Optional random seed for reproducible subsampling and selection.
    pub seed: Option<u64>,
}

impl TripletConfig {
    pub fn new(teacher: impl Into<String>) -> Self {
        Self {
            teacher: teacher.into(),
            data_dir: PathBuf::from("data"),
            augmentation: false,
            student_type: "fine-grained".to_string(),
            trainset_percentage: 100.0,
            seed: None,
        }
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn augmentation(mut self, a: bool) -> Self {
        self.augmentation = a;
        self
    }

    pub fn student_type(mut self, s: impl Into<String>) -> Self {
        self.student_type = s.into();
        self
    }

    pub fn trainset_percentage(mut self, p: f64) -> Self {
        self.trainset_percentage = p;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }
}

// Selected pairs and items

/// One sampled triplet for the current epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPair {
    pub query: VideoId,
    pub positive: VideoId,
    pub negative: VideoId,
    pub sim_positive: f32,
    pub sim_negative: f32,
}

/// One training example: three feature sequences plus the teacher targets.
#[derive(Debug, Clone, PartialEq)]
pub struct TripletItem {
    pub anchor: FeatureSequence,
    pub positive: FeatureSequence,
    pub negative: FeatureSequence,
    /// `[sim_positive, sim_negative]`.
    pub similarities: [f32; 2],
}

impl TripletItem {
    /// The substitute returned when a record in the triplet is unreadable.
    pub fn placeholder() -> Self {
        Self {
            anchor: FeatureSequence::placeholder(),
            positive: FeatureSequence::placeholder(),
            negative: FeatureSequence::placeholder(),
            similarities: [0.0, 0.0],
        }
    }
}

// TripletPairDataset

/// Per-epoch triplet sampler over a feature store and teacher similarities.
///
/// The active subset is drawn once at construction and never resampled; a
/// query with no in-subset positive or negative is silently absent from every
/// epoch. `next_epoch` takes `&mut self` while `get` takes `&self`, so the
/// borrow checker enforces that the pair list is never refreshed while reads
/// are in flight.
pub struct TripletPairDataset {
    store: Box<dyn FeatureStore>,
    index: GroundTruthIndex,
    pairs: PairTable,
    active: HashSet<VideoId>,
    selected: Vec<SelectedPair>,
    augment: Option<TemporalAugment>,
    normalize: bool,
    rng: Mutex<StdRng>,
}

impl TripletPairDataset {
    /// Load the teacher's ground truth from disk and construct the dataset.
    pub fn new(store: Box<dyn FeatureStore>, config: TripletConfig) -> Result<Self> {
        let ground_truth = GroundTruth::load(&config.data_dir, &config.teacher)?;
        Self::from_parts(store, ground_truth, config)
    }

    /// Construct from an already-loaded ground-truth structure.
    pub fn from_parts(
        store: Box<dyn FeatureStore>,
        ground_truth: GroundTruth,
        config: TripletConfig,
    ) -> Result<Self> {
        let pct = config.trainset_percentage;
        if !(pct > 0.0 && pct <= 100.0) {
            return Err(Error::InvalidPercentage { got: pct });
        }
        if ground_truth.index.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Fixed for the dataset's lifetime; re-construction is the only redraw.
        let mut ids: Vec<VideoId> = ground_truth.index.keys().copied().collect();
        ids.shuffle(&mut rng);
        let keep = (ids.len() as f64 * pct / 100.0).round() as usize;
        let active: HashSet<VideoId> = ids.into_iter().take(keep).collect();

        debug!(
            teacher = %config.teacher,
            universe = ground_truth.index.len(),
            active = active.len(),
            "constructed triplet dataset"
        );

        Ok(Self {
            store,
            index: ground_truth.index,
            pairs: ground_truth.pairs,
            active,
            selected: Vec::new(),
            augment: config.augmentation.then(TemporalAugment::default),
            normalize: config.student_type == COARSE_GRAINED,
            rng: Mutex::new(rng),
        })
    }

    /// Redraw one positive and one negative per eligible query.
    ///
    /// Builds a fresh pair list in the pair table's insertion order and
    /// replaces the previous one wholesale. Queries whose candidates fall
    /// entirely outside the active subset are dropped for this epoch.
    pub fn next_epoch(&mut self) {
        let mut selected = Vec::with_capacity(self.pairs.len());
        let mut dropped = 0usize;
        {
            let mut rng = self.rng.lock().unwrap();
            for (&query, candidates) in &self.pairs {
                if !self.active.contains(&query) {
                    dropped += 1;
                    continue;
                }
                let pos: Vec<VideoId> = candidates
                    .positives
                    .keys()
                    .copied()
                    .filter(|v| self.active.contains(v))
                    .collect();
                let neg: Vec<VideoId> = candidates
                    .negatives
                    .keys()
                    .copied()
                    .filter(|v| self.active.contains(v))
                    .collect();
                let (Some(&positive), Some(&negative)) =
                    (pos.choose(&mut *rng), neg.choose(&mut *rng))
                else {
                    dropped += 1;
                    continue;
                };

                let mut sim_positive = candidates.positives[&positive];
                let mut sim_negative = candidates.negatives[&negative];
                if self.normalize {
                    sim_positive = sim_positive / 2.0 + 0.5;
                    sim_negative = sim_negative / 2.0 + 0.5;
                }
                selected.push(SelectedPair {
                    query,
                    positive,
                    negative,
                    sim_positive,
                    sim_negative,
                });
            }
        }
        debug!(pairs = selected.len(), dropped, "refreshed epoch pair list");
        self.selected = selected;
    }

    /// The pairs selected by the most recent [`next_epoch`](Self::next_epoch).
    pub fn selected_pairs(&self) -> &[SelectedPair] {
        &self.selected
    }

    /// The fixed set of video ids eligible for sampling.
    pub fn active_subset(&self) -> &HashSet<VideoId> {
        &self.active
    }

    /// Whether similarity scores are remapped from `[-1, 1]` to `[0, 1]`.
    pub fn normalizes_similarities(&self) -> bool {
        self.normalize
    }

    /// Resolve a video id and fetch its sequence from the store.
    ///
    /// No length floor is applied here; triplet sequences may be shorter
    /// than the leaf dataset's minimum and downstream code tolerates that.
    fn load_video(&self, id: VideoId, augment: bool) -> Result<FeatureSequence> {
        let key = self.index.get(&id).ok_or(Error::UnknownVideo { id })?;
        let mut seq = self.store.get(key)?;
        if augment {
            if let Some(aug) = &self.augment {
                let mut rng = self.rng.lock().unwrap();
                seq = aug.apply(seq, &mut *rng);
            }
        }
        Ok(seq)
    }

    /// Fallible retrieval; [`Dataset::get`] collapses errors to a placeholder.
    pub fn try_item(&self, index: usize) -> Result<TripletItem> {
        let pair = self.selected.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.selected.len(),
        })?;
        let anchor = self.load_video(pair.query, false)?;
        let positive = self.load_video(pair.positive, true)?;
        let negative = self.load_video(pair.negative, true)?;
        Ok(TripletItem {
            anchor,
            positive,
            negative,
            similarities: [pair.sim_positive, pair.sim_negative],
        })
    }
}

impl Dataset for TripletPairDataset {
    type Item = TripletItem;

    /// Zero before the first `next_epoch()` call.
    fn len(&self) -> usize {
        self.selected.len()
    }

    fn get(&self, index: usize) -> Self::Item {
        match self.try_item(index) {
            Ok(item) => item,
            Err(e) => {
                warn!(index, error = %e, "substituting placeholder triplet");
                TripletItem::placeholder()
            }
        }
    }

    fn name(&self) -> &str {
        "triplet-pairs"
    }
}

// Tests
