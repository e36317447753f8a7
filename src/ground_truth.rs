// Ground truth — persisted teacher similarities and the video-id index
//
// One JSON file per named teacher model, `trainset_similarities_{teacher}.json`:
//
//   {
//     "index": { "<video_id>": "<store_key>", ... },
//     "pairs": {
//       "<query_id>": {
//         "positives": { "<video_id>": <similarity>, ... },
//         "negatives": { "<video_id>": <similarity>, ... }
//       }, ...
//     }
//   }
//
// Both maps are IndexMaps so iteration follows file insertion order; the
// per-epoch pair list inherits that order.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compact integer identifier for one video.
pub type VideoId = u32;

/// Mapping from video id to the key used to retrieve its features.
pub type GroundTruthIndex = IndexMap<VideoId, String>;

/// Mapping from query id to its candidate positives and negatives.
pub type PairTable = IndexMap<VideoId, Candidates>;

/// Positive and negative candidates for one query, with teacher similarities.
///
/// Similarities are raw cosine scores in `[-1, 1]`; remapping to `[0, 1]`
/// happens at pair-selection time when the student requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidates {
    #[serde(default)]
    pub positives: IndexMap<VideoId, f32>,
    #[serde(default)]
    pub negatives: IndexMap<VideoId, f32>,
}

/// The full persisted ground-truth structure for one teacher model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub index: GroundTruthIndex,
    pub pairs: PairTable,
}

impl GroundTruth {
    /// Path of the similarity file for `teacher` under `dir`.
    pub fn similarity_file(dir: &Path, teacher: &str) -> PathBuf {
        dir.join(format!("trainset_similarities_{teacher}.json"))
    }

    /// Load the ground truth for a named teacher from `dir`.
    ///
    /// A missing file is a fatal startup error, not a recoverable one.
    pub fn load(dir: &Path, teacher: &str) -> Result<Self> {
        let path = Self::similarity_file(dir, teacher);
        if !path.exists() {
            return Err(Error::UnknownTeacher {
                name: teacher.to_string(),
                path,
            });
        }
        let text = fs::read_to_string(&path)?;
        let gt: GroundTruth = serde_json::from_str(&text)?;
        tracing::info!(
            teacher,
            videos = gt.index.len(),
            queries = gt.pairs.len(),
            "loaded ground-truth pairs"
        );
        Ok(gt)
    }

    /// Persist to the similarity file for `teacher` under `dir`.
    pub fn save(&self, dir: &Path, teacher: &str) -> Result<()> {
        let path = Self::similarity_file(dir, teacher);
        fs::write(&path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

// Tests
