//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::{target_len, ResampleQuality};
use crate::error::{FeatureError, Result};
use crate::spectrogram::{MaskParams, MelConfig};

/// Fixed parameters of the feature pipeline.
///
/// Immutable once a pipeline is built and shared read-only between workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sample rate every clip is resampled to
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Channel count every clip is converted to (1 or 2)
    #[serde(default = "default_target_channel_count")]
    pub target_channel_count: usize,

    /// Clip length after padding/truncation, in milliseconds
    #[serde(default = "default_target_duration_ms")]
    pub target_duration_ms: u32,

    /// Upper bound on the circular time shift, as a fraction of the clip
    #[serde(default = "default_max_time_shift_fraction")]
    pub max_time_shift_fraction: f64,

    /// Number of mel bands
    #[serde(default = "default_mel_bin_count")]
    pub mel_bin_count: usize,

    /// FFT window size
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    /// STFT hop; `fft_size / 2` when unset
    #[serde(default)]
    pub hop_length: Option<usize>,

    /// Dynamic range kept below the spectrogram maximum, in dB
    #[serde(default = "default_top_decibel_range")]
    pub top_decibel_range: f32,

    /// Upper bound on mask width as a fraction of the masked axis
    #[serde(default = "default_max_mask_fraction")]
    pub max_mask_fraction: f32,

    /// Frequency masks per clip
    #[serde(default = "default_mask_count")]
    pub frequency_mask_count: usize,

    /// Time masks per clip
    #[serde(default = "default_mask_count")]
    pub time_mask_count: usize,

    /// Resampler preset
    #[serde(default)]
    pub resample_quality: ResampleQuality,
}

fn default_target_sample_rate() -> u32 {
    crate::DEFAULT_SAMPLE_RATE
}
fn default_target_channel_count() -> usize {
    2
}
fn default_target_duration_ms() -> u32 {
    crate::DEFAULT_DURATION_MS
}
fn default_max_time_shift_fraction() -> f64 {
    0.4
}
fn default_mel_bin_count() -> usize {
    crate::DEFAULT_N_MELS
}
fn default_fft_size() -> usize {
    1024
}
fn default_top_decibel_range() -> f32 {
    80.0
}
fn default_max_mask_fraction() -> f32 {
    0.1
}
fn default_mask_count() -> usize {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: default_target_sample_rate(),
            target_channel_count: default_target_channel_count(),
            target_duration_ms: default_target_duration_ms(),
            max_time_shift_fraction: default_max_time_shift_fraction(),
            mel_bin_count: default_mel_bin_count(),
            fft_size: default_fft_size(),
            hop_length: None,
            top_decibel_range: default_top_decibel_range(),
            max_mask_fraction: default_max_mask_fraction(),
            frequency_mask_count: default_mask_count(),
            time_mask_count: default_mask_count(),
            resample_quality: ResampleQuality::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a local JSON file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            FeatureError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter the stages depend on
    pub fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.target_channel_count) {
            return Err(FeatureError::UnsupportedChannels {
                requested: self.target_channel_count,
                found: self.target_channel_count,
            });
        }
        if self.target_sample_rate < 1000 {
            return Err(FeatureError::InvalidConfig(format!(
                "target_sample_rate must be at least 1000 Hz, got {}",
                self.target_sample_rate
            )));
        }
        if self.target_duration_ms == 0 {
            return Err(FeatureError::InvalidConfig("target_duration_ms must be > 0".into()));
        }
        if self.fft_size == 0 {
            return Err(FeatureError::InvalidConfig("fft_size must be > 0".into()));
        }
        if self.hop_length() == 0 {
            return Err(FeatureError::InvalidConfig("hop_length must be > 0".into()));
        }
        if self.mel_bin_count == 0 {
            return Err(FeatureError::InvalidConfig("mel_bin_count must be > 0".into()));
        }
        if !self.max_time_shift_fraction.is_finite() || self.max_time_shift_fraction < 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "max_time_shift_fraction must be finite and >= 0, got {}",
                self.max_time_shift_fraction
            )));
        }
        if !self.max_mask_fraction.is_finite() || !(0.0..=1.0).contains(&self.max_mask_fraction) {
            return Err(FeatureError::InvalidConfig(format!(
                "max_mask_fraction must be in [0, 1], got {}",
                self.max_mask_fraction
            )));
        }
        if !self.top_decibel_range.is_finite() || self.top_decibel_range < 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "top_decibel_range must be finite and >= 0, got {}",
                self.top_decibel_range
            )));
        }
        Ok(())
    }

    /// Effective STFT hop
    pub fn hop_length(&self) -> usize {
        self.hop_length.unwrap_or(self.fft_size / 2)
    }

    /// Samples per channel after duration normalization
    pub fn target_len(&self) -> usize {
        target_len(self.target_sample_rate, self.target_duration_ms)
    }

    /// `(channels, mel_bins, frames)` of every spectrogram this config yields
    pub fn output_shape(&self) -> (usize, usize, usize) {
        (
            self.target_channel_count,
            self.mel_bin_count,
            self.target_len() / self.hop_length() + 1,
        )
    }

    pub fn mel_config(&self) -> MelConfig {
        MelConfig {
            sample_rate: self.target_sample_rate,
            n_fft: self.fft_size,
            hop_length: self.hop_length(),
            n_mels: self.mel_bin_count,
            top_db: Some(self.top_decibel_range),
            ..Default::default()
        }
    }

    pub fn mask_params(&self) -> MaskParams {
        MaskParams {
            max_mask_fraction: self.max_mask_fraction,
            freq_masks: self.frequency_mask_count,
            time_masks: self.time_mask_count,
        }
    }
}
