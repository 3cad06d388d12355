//! Indexed feature producer over a metadata table

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::featurize::FeaturePipeline;
use super::metadata::{DatasetItem, MetadataTable};
use crate::error::Result;
use crate::spectrogram::Spectrogram;

/// Random-access source of `(features, class_id)` pairs
pub trait FeatureSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce the features for `index`, drawing all randomness from `rng`
    fn item_at<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<(Spectrogram, u32)>;
}

/// Metadata table + audio root + pipeline
#[derive(Debug)]
pub struct SoundDataset {
    table: MetadataTable,
    data_root: String,
    pipeline: FeaturePipeline,
}

impl SoundDataset {
    /// `data_root` is prefixed verbatim to each item's relative path
    pub fn new(
        table: MetadataTable,
        data_root: impl Into<String>,
        pipeline: FeaturePipeline,
    ) -> Self {
        Self {
            table,
            data_root: data_root.into(),
            pipeline,
        }
    }

    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    pub fn data_root(&self) -> &str {
        &self.data_root
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn item(&self, index: usize) -> Result<&DatasetItem> {
        self.table.get(index)
    }

    /// Featurize `index` with an RNG derived from `base_seed` and `index`.
    ///
    /// The result depends only on those two values, not on which thread or in
    /// which order items are processed.
    pub fn item_at_seeded(&self, index: usize, base_seed: u64) -> Result<(Spectrogram, u32)> {
        let mut rng = item_rng(base_seed, index);
        self.item_at(index, &mut rng)
    }

    /// Featurize every item in parallel; results are in index order.
    pub fn featurize_all(&self, base_seed: u64) -> Vec<Result<(Spectrogram, u32)>> {
        tracing::info!(
            items = self.len(),
            threads = rayon::current_num_threads(),
            "featurizing dataset"
        );
        (0..self.len())
            .into_par_iter()
            .map(|index| self.item_at_seeded(index, base_seed))
            .collect()
    }
}

impl FeatureSource for SoundDataset {
    fn len(&self) -> usize {
        self.table.len()
    }

    fn item_at<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<(Spectrogram, u32)> {
        let item = self.table.get(index)?;
        self.pipeline.featurize(index, item, &self.data_root, rng)
    }
}

/// Seed for `(base_seed, index)`; the index is spread by the 64-bit golden
/// ratio so neighbouring base seeds do not share per-item streams.
pub fn item_seed(base_seed: u64, index: usize) -> u64 {
    base_seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Per-item generator for `(base_seed, index)`
pub fn item_rng(base_seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(item_seed(base_seed, index))
}
