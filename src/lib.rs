//! # soundclip-features
//!
//! Turns labelled audio clips into fixed-shape, augmented log-mel spectrograms
//! for clip classification.
//!
//! Every clip goes through the same stages:
//!
//! 1. decode (WAV via hound, other containers via symphonia)
//! 2. resample to the target rate
//! 3. convert to the target channel count
//! 4. pad or truncate to the target duration
//! 5. random circular time shift
//! 6. mel power spectrogram in dB
//! 7. random frequency and time masks
//!
//! ## Example
//!
//! ```rust,ignore
//! use soundclip_features::{FeaturePipeline, MetadataTable, PipelineConfig, SoundDataset};
//!
//! let table = MetadataTable::from_csv("UrbanSound8K/metadata/UrbanSound8K.csv")?;
//! let pipeline = FeaturePipeline::new(PipelineConfig::default())?;
//! let dataset = SoundDataset::new(table, "UrbanSound8K/audio", pipeline);
//!
//! let (spec, class_id) = dataset.item_at_seeded(0, 42)?;
//! assert_eq!(spec.shape(), (2, 64, 344));
//! ```

pub mod audio;
pub mod error;
pub mod pipeline;
pub mod spectrogram;

/// Re-exports for convenience
pub use audio::{AudioSignal, ResampleQuality};
pub use error::{FeatureError, Result};
pub use pipeline::{
    collate, BatchIter, DatasetItem, FeatureBatch, FeaturePipeline, FeatureSource,
    MetadataTable, PipelineConfig, SoundDataset,
};
pub use spectrogram::Spectrogram;

/// Default target sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default target clip duration (ms)
pub const DEFAULT_DURATION_MS: u32 = 4000;

/// Default number of mel bands
pub const DEFAULT_N_MELS: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.target_duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(config.mel_bin_count, DEFAULT_N_MELS);
    }

    #[test]
    fn test_default_output_shape() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.config().output_shape(), (2, 64, 344));
    }
}
