//! Frequency and time masking augmentation
//!
//! Each mask draws a width `w = u1 * max_width` and a start
//! `floor(u2 * (size - w))`, then overwrites `start..start + floor(w)` along
//! one axis, across all channels, with the pre-mask mean of the spectrogram.

use rand::Rng;
use std::ops::Range;

use super::Spectrogram;

/// Masking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParams {
    /// Upper bound on mask width as a fraction of the axis length
    pub max_mask_fraction: f32,
    /// Number of frequency (mel bin) masks
    pub freq_masks: usize,
    /// Number of time (frame) masks
    pub time_masks: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            max_mask_fraction: 0.1,
            freq_masks: 2,
            time_masks: 2,
        }
    }
}

/// Axis a mask runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskAxis {
    /// Contiguous band of mel bins, all frames
    Frequency,
    /// Contiguous run of frames, all mel bins
    Time,
}

/// Apply the configured frequency masks then time masks.
///
/// Takes the spectrogram by value and masks that owned buffer; callers that
/// need the unmasked features keep their own clone.
pub fn augment<R: Rng + ?Sized>(
    mut spec: Spectrogram,
    params: &MaskParams,
    rng: &mut R,
) -> Spectrogram {
    let mask_value = spec.mean();

    let freq_param = params.max_mask_fraction * spec.n_mels() as f32;
    for _ in 0..params.freq_masks {
        mask_along_axis(&mut spec, MaskAxis::Frequency, freq_param, mask_value, rng);
    }

    let time_param = params.max_mask_fraction * spec.n_frames() as f32;
    for _ in 0..params.time_masks {
        mask_along_axis(&mut spec, MaskAxis::Time, time_param, mask_value, rng);
    }

    spec
}

/// Draw one mask of width at most `max_width` along `axis`, fill it with
/// `mask_value`, and return the masked index range.
pub fn mask_along_axis<R: Rng + ?Sized>(
    spec: &mut Spectrogram,
    axis: MaskAxis,
    max_width: f32,
    mask_value: f32,
    rng: &mut R,
) -> Range<usize> {
    let size = match axis {
        MaskAxis::Frequency => spec.n_mels(),
        MaskAxis::Time => spec.n_frames(),
    };

    let width = rng.gen::<f32>() * max_width.max(0.0);
    let start_f = rng.gen::<f32>() * (size as f32 - width).max(0.0);
    let start = (start_f as usize).min(size);
    let end = (start + width as usize).min(size);

    let (channels, n_mels, _) = spec.shape();
    match axis {
        MaskAxis::Frequency => {
            for ch in 0..channels {
                for mel in start..end {
                    spec.row_mut(ch, mel).fill(mask_value);
                }
            }
        }
        MaskAxis::Time => {
            for ch in 0..channels {
                for mel in 0..n_mels {
                    spec.row_mut(ch, mel)[start..end].fill(mask_value);
                }
            }
        }
    }

    start..end
}
