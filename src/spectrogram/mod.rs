//! Time-frequency features
//!
//! - [`Spectrogram`]: dense `(channels, mel_bins, frames)` buffer
//! - [`MelSpectrogram`]: STFT + mel filterbank + dB compression
//! - [`augment`]: frequency/time masking

mod masking;
mod mel;

pub use masking::{augment, mask_along_axis, MaskAxis, MaskParams};
pub use mel::{amplitude_to_db, mel_spectrogram_db, MelConfig, MelSpectrogram, AMIN};

use candle_core::{Device, Tensor};

use crate::error::{FeatureError, Result};

/// Log-mel spectrogram stored row-major as `[channel][mel][frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    data: Vec<f32>,
    channels: usize,
    n_mels: usize,
    n_frames: usize,
}

impl Spectrogram {
    /// Wrap a flat buffer, checking it matches the shape
    pub fn new(data: Vec<f32>, channels: usize, n_mels: usize, n_frames: usize) -> Result<Self> {
        if data.len() != channels * n_mels * n_frames {
            return Err(FeatureError::InvalidConfig(format!(
                "spectrogram buffer of {} values does not match shape ({channels}, {n_mels}, {n_frames})",
                data.len()
            )));
        }
        Ok(Self {
            data,
            channels,
            n_mels,
            n_frames,
        })
    }

    /// `(channels, n_mels, n_frames)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.n_mels, self.n_frames)
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn offset(&self, channel: usize, mel: usize, frame: usize) -> usize {
        (channel * self.n_mels + mel) * self.n_frames + frame
    }

    /// Value at `(channel, mel, frame)`
    pub fn get(&self, channel: usize, mel: usize, frame: usize) -> f32 {
        self.data[self.offset(channel, mel, frame)]
    }

    /// One mel row of one channel
    pub fn row(&self, channel: usize, mel: usize) -> &[f32] {
        let start = self.offset(channel, mel, 0);
        &self.data[start..start + self.n_frames]
    }

    pub(crate) fn row_mut(&mut self, channel: usize, mel: usize) -> &mut [f32] {
        let start = self.offset(channel, mel, 0);
        let n_frames = self.n_frames;
        &mut self.data[start..start + n_frames]
    }

    /// Flat view of all values
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Mean over every value, accumulated in f64
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64) as f32
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Convert to a `[channels, n_mels, n_frames]` f32 tensor
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        Ok(Tensor::from_slice(
            &self.data,
            (self.channels, self.n_mels, self.n_frames),
            device,
        )?)
    }
}
