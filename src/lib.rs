//! # vidsim-data
//!
//! Data supply for training a video-similarity distillation model.
//!
//! This crate provides:
//! - [`Dataset`] trait — size + indexed retrieval, iterated by an external
//!   training loop (optionally shuffled and batched by its own collator)
//! - [`FeatureStore`] — opaque keyed access to precomputed per-frame feature
//!   sequences, with in-memory and single-file pack backends
//! - [`GroundTruth`] — persisted teacher similarities (per-query positive and
//!   negative candidates) plus the video-id → store-key index
//! - [`SequenceFeatureDataset`] — sequence loading with repetition padding
//!   and a soft-fail placeholder boundary
//! - [`TripletPairDataset`] — per-epoch (anchor, positive, negative,
//!   similarity) sampling over a fixed random subsample of the video universe
//! - [`TemporalAugment`] — categorical temporal augmentation of positive and
//!   negative sequences
//!
//! Everything is single-threaded and blocking; consumers that want parallel
//! loading run multiple workers, each with its own store handle.

pub mod augment;
pub mod dataset;
pub mod error;
pub mod ground_truth;
pub mod sequence_dataset;
pub mod store;
pub mod triplet_dataset;

pub use augment::{downsample, duplicate_frames, frame_dropout, TemporalAugment};
pub use dataset::{Dataset, FeatureSequence};
pub use error::{Error, Result};
pub use ground_truth::{Candidates, GroundTruth, GroundTruthIndex, PairTable, VideoId};
pub use sequence_dataset::{SequenceFeatureDataset, DEFAULT_MIN_FRAMES};
pub use store::{
    build_pack_bytes, write_pack, FeatureStore, MemoryFeatureStore, PackedFeatureStore,
};
pub use triplet_dataset::{
    SelectedPair, TripletConfig, TripletItem, TripletPairDataset, COARSE_GRAINED,
};
