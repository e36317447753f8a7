// SequenceFeatureDataset — keyed sequence access with a soft-fail boundary
//
// Wraps a feature store behind the Dataset contract. Short sequences are
// floor-padded by whole-sequence repetition; any retrieval failure collapses
// to a fixed zero placeholder at the public boundary so an epoch never dies
// on one corrupt record.

use tracing::warn;

use crate::dataset::{Dataset, FeatureSequence};
use crate::error::{Error, Result};
use crate::store::FeatureStore;

/// Default floor on sequence length, in frames.
pub const DEFAULT_MIN_FRAMES: usize = 4;

/// An indexed view over a feature store's registered video keys.
pub struct SequenceFeatureDataset {
    store: Box<dyn FeatureStore>,
    keys: Vec<String>,
    min_len: usize,
}

impl SequenceFeatureDataset {
    /// Create a dataset over an explicit key list.
    pub fn new(store: Box<dyn FeatureStore>, keys: Vec<String>, min_len: usize) -> Self {
        Self {
            store,
            keys,
            min_len,
        }
    }

    /// Create a dataset over every key in the store, in store order.
    pub fn for_store(store: Box<dyn FeatureStore>) -> Self {
        let keys = store.keys();
        Self::new(store, keys, DEFAULT_MIN_FRAMES)
    }

    /// The floor applied to sequence length.
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Fallible retrieval: the failure reason stays inspectable here.
    ///
    /// The public [`Dataset::get`] collapses any error from this path into
    /// the placeholder sentinel.
    pub fn try_get(&self, index: usize) -> Result<(FeatureSequence, String)> {
        let key = self.keys.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.keys.len(),
        })?;
        let mut seq = self.store.get(key)?;
        seq.extend_to_min_frames(self.min_len);
        Ok((seq, key.clone()))
    }
}

impl Dataset for SequenceFeatureDataset {
    type Item = (FeatureSequence, String);

    fn len(&self) -> usize {
        self.keys.len()
    }

    /// Retrieve `(sequence, key)`, or the placeholder `(zeros[1,9,512], "")`
    /// on any failure. This boundary never panics past a bad record; the
    /// sentinel is the documented skip-corrupt-sample policy.
    fn get(&self, index: usize) -> Self::Item {
        match self.try_get(index) {
            Ok(item) => item,
            Err(e) => {
                warn!(index, error = %e, "substituting placeholder for unreadable record");
                (FeatureSequence::placeholder(), String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "sequence-features"
    }
}

// Tests
