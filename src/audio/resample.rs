//! Audio resampling using rubato
//!
//! Each channel runs through its own resampler instance. The filter delay is
//! trimmed and the output is cut to `ceil(len * to / from)` samples, so every
//! channel of a clip comes out with the same length.

use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResampler, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

use super::AudioSignal;
use crate::error::{FeatureError, Result};

const CHUNK_SIZE: usize = 1024;

/// Resampling quality preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Cubic polynomial interpolation, not band-limited
    Fast,
    /// Windowed-sinc, 128 taps
    #[default]
    Normal,
    /// Windowed-sinc, 256 taps
    High,
}

/// Audio resampler
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler {
    quality: ResampleQuality,
}

impl Resampler {
    /// Create a new resampler
    pub fn new(quality: ResampleQuality) -> Self {
        Self { quality }
    }

    /// Resample every channel of `audio` to `target_rate`
    pub fn resample(&self, audio: AudioSignal, target_rate: u32) -> Result<AudioSignal> {
        if audio.sample_rate == target_rate {
            return Ok(audio);
        }
        if audio.sample_rate == 0 || target_rate == 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "cannot resample {} Hz -> {} Hz",
                audio.sample_rate, target_rate
            )));
        }

        let expected_len = output_len(audio.len(), audio.sample_rate, target_rate);
        tracing::debug!(
            from = audio.sample_rate,
            to = target_rate,
            samples = audio.len(),
            expected_len,
            "resampling"
        );

        let channels = audio
            .channels
            .iter()
            .map(|channel| self.resample_channel(channel, audio.sample_rate, target_rate))
            .collect::<Result<Vec<_>>>()?;

        Ok(AudioSignal::new(channels, target_rate))
    }

    fn resample_channel(&self, samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
        let expected_len = output_len(samples.len(), from, to);
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        let ratio = to as f64 / from as f64;

        match self.quality {
            ResampleQuality::Fast => {
                let mut resampler =
                    FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, CHUNK_SIZE, 1)
                        .map_err(|e| FeatureError::Resample(e.to_string()))?;
                let delay = resampler.output_delay();
                process_channel(&mut resampler, samples, expected_len, delay)
            }
            ResampleQuality::Normal | ResampleQuality::High => {
                let taps = if self.quality == ResampleQuality::High {
                    256
                } else {
                    128
                };
                let params = SincInterpolationParameters {
                    sinc_len: taps,
                    f_cutoff: 0.95,
                    interpolation: SincInterpolationType::Linear,
                    oversampling_factor: taps,
                    window: WindowFunction::BlackmanHarris2,
                };
                let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
                    .map_err(|e| FeatureError::Resample(e.to_string()))?;
                // SincFixedIn starts with its read position centred on the first
                // input sample, so its output is already aligned
                process_channel(&mut resampler, samples, expected_len, 0)
            }
        }
    }
}

/// Number of output samples for `len` input samples, rounded up
pub fn output_len(len: usize, from: u32, to: u32) -> usize {
    if from == 0 {
        return 0;
    }
    (len as u64 * to as u64).div_ceil(from as u64) as usize
}

/// Feed one channel through `resampler` in fixed chunks, flush the tail, drop
/// the first `delay` output samples and return exactly `expected_len` samples.
fn process_channel<R: RubatoResampler<f32>>(
    resampler: &mut R,
    samples: &[f32],
    expected_len: usize,
    delay: usize,
) -> Result<Vec<f32>> {
    let map_err = |e: rubato::ResampleError| FeatureError::Resample(e.to_string());

    let needed = delay + expected_len;
    let mut output = Vec::with_capacity(needed + CHUNK_SIZE);

    let mut chunks = samples.chunks_exact(CHUNK_SIZE);
    for chunk in chunks.by_ref() {
        let result = resampler.process(&[chunk][..], None).map_err(map_err)?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let result = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(map_err)?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // Push zeros through until the delayed tail has come out
    while output.len() < needed {
        let result = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(map_err)?;
        match result.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => break,
        }
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected_len, 0.0);
    Ok(output)
}

/// Convenience function to resample with the default quality
pub fn resample(audio: AudioSignal, target_rate: u32) -> Result<AudioSignal> {
    Resampler::default().resample(audio, target_rate)
}
