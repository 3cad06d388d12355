//! Dataset-level featurization
//!
//! - [`PipelineConfig`]: fixed stage parameters, loadable from JSON
//! - [`FeaturePipeline`]: per-clip stage orchestration
//! - [`MetadataTable`] / [`SoundDataset`]: indexed access to a labelled corpus
//! - [`collate`] / [`BatchIter`]: tensors for a downstream classifier

mod batch;
mod config;
mod dataset;
mod featurize;
mod metadata;

pub use batch::{collate, shuffled_indices, BatchIter, FeatureBatch};
pub use config::PipelineConfig;
pub use dataset::{item_rng, item_seed, FeatureSource, SoundDataset};
pub use featurize::FeaturePipeline;
pub use metadata::{DatasetItem, MetadataTable};
