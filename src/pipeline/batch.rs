//! Grouping features into tensors for a classifier

use candle_core::{Device, Tensor};
use rand::seq::SliceRandom;
use rand::Rng;

use super::dataset::FeatureSource;
use crate::error::{FeatureError, Result};
use crate::spectrogram::Spectrogram;

/// A stacked batch of features and labels
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    /// `[batch, channels, n_mels, n_frames]`, f32
    pub features: Tensor,
    /// `[batch]`, u32 class ids
    pub labels: Tensor,
}

impl FeatureBatch {
    pub fn len(&self) -> usize {
        self.labels.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stack `(spectrogram, class_id)` pairs into a [`FeatureBatch`].
///
/// All spectrograms must share one shape.
pub fn collate(items: &[(Spectrogram, u32)], device: &Device) -> Result<FeatureBatch> {
    let Some((first, _)) = items.first() else {
        return Err(FeatureError::InvalidConfig("cannot collate an empty batch".into()));
    };

    let shape = first.shape();
    let mut features = Vec::with_capacity(items.len());
    let mut labels = Vec::with_capacity(items.len());
    for (spec, label) in items {
        if spec.shape() != shape {
            return Err(FeatureError::InvalidConfig(format!(
                "batch shape mismatch: {:?} vs {:?}",
                spec.shape(),
                shape
            )));
        }
        features.push(spec.to_tensor(device)?);
        labels.push(*label);
    }

    let features = Tensor::stack(&features, 0)?;
    let labels = Tensor::from_vec(labels, items.len(), device)?;
    Ok(FeatureBatch { features, labels })
}

/// `0..len` in random order
pub fn shuffled_indices<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}

/// Yields fixed-size batches from a [`FeatureSource`] in a given index order.
///
/// The final batch may be smaller. Any item failure ends that batch with the
/// item's error.
pub struct BatchIter<'a, S, R> {
    source: &'a S,
    order: Vec<usize>,
    batch_size: usize,
    position: usize,
    rng: R,
    device: Device,
}

impl<'a, S: FeatureSource, R: Rng> BatchIter<'a, S, R> {
    pub fn new(
        source: &'a S,
        order: Vec<usize>,
        batch_size: usize,
        rng: R,
        device: Device,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(FeatureError::InvalidConfig("batch_size must be > 0".into()));
        }
        Ok(Self {
            source,
            order,
            batch_size,
            position: 0,
            rng,
            device,
        })
    }

    /// Number of batches still to come
    pub fn remaining(&self) -> usize {
        (self.order.len() - self.position).div_ceil(self.batch_size)
    }
}

impl<S: FeatureSource, R: Rng> Iterator for BatchIter<'_, S, R> {
    type Item = Result<FeatureBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let indices = &self.order[self.position..end];
        self.position = end;

        let items: Result<Vec<_>> = indices
            .iter()
            .map(|&index| self.source.item_at(index, &mut self.rng))
            .collect();
        Some(items.and_then(|items| collate(&items, &self.device)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}
