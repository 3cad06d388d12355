//! Per-item orchestration of the featurization stages

use rand::Rng;

use super::config::PipelineConfig;
use super::metadata::DatasetItem;
use crate::audio::{self, pad_or_truncate, rechannel, time_shift, AudioSignal, Resampler};
use crate::error::Result;
use crate::spectrogram::{augment, MaskParams, MelSpectrogram, Spectrogram};

/// Runs load → resample → rechannel → pad/truncate → time shift → log-mel →
/// masking for one clip.
///
/// Holds only read-only state, so one pipeline can serve many threads as long
/// as each call gets its own RNG.
#[derive(Debug)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    resampler: Resampler,
    mel: MelSpectrogram,
    masks: MaskParams,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let mel = MelSpectrogram::new(config.mel_config())?;
        Ok(Self {
            resampler: Resampler::new(config.resample_quality),
            masks: config.mask_params(),
            mel,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage after decoding on an in-memory signal
    pub fn process<R: Rng + ?Sized>(
        &self,
        signal: AudioSignal,
        rng: &mut R,
    ) -> Result<Spectrogram> {
        let config = &self.config;

        let signal = self.resampler.resample(signal, config.target_sample_rate)?;
        let signal = rechannel(signal, config.target_channel_count)?;
        let signal = pad_or_truncate(signal, config.target_duration_ms, rng);
        let signal = time_shift(signal, config.max_time_shift_fraction, rng);

        let spec = self.mel.compute_db(&signal)?;
        Ok(augment(spec, &self.masks, rng))
    }

    /// Load and featurize one dataset item.
    ///
    /// Any stage failure comes back wrapped in [`FeatureError::Item`] with
    /// `index` and the item's relative path.
    ///
    /// [`FeatureError::Item`]: crate::error::FeatureError::Item
    pub fn featurize<R: Rng + ?Sized>(
        &self,
        index: usize,
        item: &DatasetItem,
        data_root: &str,
        rng: &mut R,
    ) -> Result<(Spectrogram, u32)> {
        let path = item.resolve(data_root);
        tracing::debug!(index, path = %path, "featurizing");

        audio::load(&path)
            .and_then(|signal| self.process(signal, rng))
            .map(|spec| (spec, item.class_id))
            .map_err(|e| e.for_item(index, item.relative_path.as_str()))
    }
}
