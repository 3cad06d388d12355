//! Mel-spectrogram computation
//!
//! Centered STFT with reflect padding and a periodic Hann window, an HTK-scale
//! triangular filterbank spanning 0 Hz to Nyquist, and power-to-dB conversion
//! clipped to a fixed range below the buffer maximum.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::Spectrogram;
use crate::audio::AudioSignal;
use crate::error::{FeatureError, Result};

/// Power floor applied before taking the logarithm
pub const AMIN: f32 = 1e-10;

/// Configuration for mel spectrogram computation
#[derive(Debug, Clone, PartialEq)]
pub struct MelConfig {
    /// Sample rate of input audio
    pub sample_rate: u32,
    /// FFT window size
    pub n_fft: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Minimum frequency for mel filterbank
    pub fmin: f32,
    /// Maximum frequency for mel filterbank (defaults to sample_rate / 2)
    pub fmax: Option<f32>,
    /// Dynamic range kept below the maximum, in dB (None = unclipped)
    pub top_db: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            n_fft: 1024,
            hop_length: 512,
            n_mels: 64,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
        }
    }
}

/// Mel-spectrogram extractor
///
/// Holds the precomputed filterbank, window and FFT plan; immutable once built,
/// so one instance can be shared between worker threads.
pub struct MelSpectrogram {
    config: MelConfig,
    /// Filterbank, `[n_mels][n_fft / 2 + 1]`
    mel_basis: Vec<Vec<f32>>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for MelSpectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelSpectrogram")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MelSpectrogram {
    /// Create a new mel spectrogram extractor
    pub fn new(config: MelConfig) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(FeatureError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if config.n_fft == 0 {
            return Err(FeatureError::InvalidConfig("n_fft must be > 0".into()));
        }
        if config.hop_length == 0 {
            return Err(FeatureError::InvalidConfig("hop_length must be > 0".into()));
        }
        if config.n_mels == 0 {
            return Err(FeatureError::InvalidConfig("n_mels must be > 0".into()));
        }

        let fmax = config.fmax.unwrap_or((config.sample_rate / 2) as f32);
        let mel_basis = Self::create_mel_filterbank(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.fmin,
            fmax,
        );
        let window = Self::hann_window(config.n_fft);
        let fft = FftPlanner::new().plan_fft_forward(config.n_fft);
        tracing::debug!(
            sample_rate = config.sample_rate,
            n_fft = config.n_fft,
            hop_length = config.hop_length,
            n_mels = config.n_mels,
            fmax,
            "built mel filterbank"
        );

        Ok(Self {
            config,
            mel_basis,
            window,
            fft,
        })
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Frames produced for a signal of `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        len / self.config.hop_length + 1
    }

    /// Mel power spectrogram `[frames][n_mels]` of one channel
    pub fn compute(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let stft = self.stft(samples);

        let power_spec: Vec<Vec<f32>> = stft
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect();

        self.apply_mel_filterbank(&power_spec)
    }

    /// Mel power spectrogram of every channel, shape `(channels, n_mels, frames)`
    pub fn compute_power(&self, signal: &AudioSignal) -> Result<Spectrogram> {
        if signal.sample_rate != self.config.sample_rate {
            return Err(FeatureError::InvalidConfig(format!(
                "extractor built for {} Hz, got {} Hz",
                self.config.sample_rate, signal.sample_rate
            )));
        }

        let n_mels = self.config.n_mels;
        let n_frames = self.n_frames(signal.len());
        let mut data = vec![0.0f32; signal.num_channels() * n_mels * n_frames];

        for (ch, samples) in signal.channels.iter().enumerate() {
            let frames = self.compute(samples);
            let base = ch * n_mels * n_frames;
            for (t, frame) in frames.iter().enumerate() {
                for (m, &value) in frame.iter().enumerate() {
                    data[base + m * n_frames + t] = value;
                }
            }
        }

        Spectrogram::new(data, signal.num_channels(), n_mels, n_frames)
    }

    /// Log-mel spectrogram in dB, clipped to `top_db` below the maximum
    pub fn compute_db(&self, signal: &AudioSignal) -> Result<Spectrogram> {
        let mut spec = self.compute_power(signal)?;
        amplitude_to_db(&mut spec, self.config.top_db);
        Ok(spec)
    }

    /// Centered short-time Fourier transform, positive frequencies only
    fn stft(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let n_fft = self.config.n_fft;
        let hop_length = self.config.hop_length;
        let padded = Self::center_pad(samples, n_fft / 2);

        let n_frames = self.n_frames(samples.len());
        let mut result = Vec::with_capacity(n_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for i in 0..n_frames {
            let start = i * hop_length;
            for (j, slot) in buffer.iter_mut().enumerate() {
                let sample = padded.get(start + j).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[j], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);
            result.push(buffer[..n_fft / 2 + 1].to_vec());
        }

        result
    }

    /// Reflect-pad `pad` samples on both sides; falls back to zeros when the
    /// signal is too short to reflect.
    fn center_pad(samples: &[f32], pad: usize) -> Vec<f32> {
        let n = samples.len();
        let mut padded = Vec::with_capacity(n + 2 * pad);

        if n > pad {
            padded.extend((1..=pad).rev().map(|i| samples[i]));
            padded.extend_from_slice(samples);
            padded.extend((n - 1 - pad..n - 1).rev().map(|i| samples[i]));
        } else {
            padded.resize(pad, 0.0);
            padded.extend_from_slice(samples);
            padded.resize(n + 2 * pad, 0.0);
        }
        padded
    }

    /// Apply mel filterbank to power spectrogram
    fn apply_mel_filterbank(&self, power_spec: &[Vec<f32>]) -> Vec<Vec<f32>> {
        power_spec
            .iter()
            .map(|frame| {
                self.mel_basis
                    .iter()
                    .map(|filter| filter.iter().zip(frame.iter()).map(|(f, p)| f * p).sum())
                    .collect()
            })
            .collect()
    }

    /// Triangular HTK-mel filterbank over linearly spaced FFT bin frequencies
    fn create_mel_filterbank(
        sample_rate: u32,
        n_fft: usize,
        n_mels: usize,
        fmin: f32,
        fmax: f32,
    ) -> Vec<Vec<f32>> {
        let n_freqs = n_fft / 2 + 1;
        let nyquist = (sample_rate / 2) as f32;

        let hz_to_mel = |f: f32| 2595.0 * (1.0 + f / 700.0).log10();
        let mel_to_hz = |m: f32| 700.0 * (10.0f32.powf(m / 2595.0) - 1.0);

        let all_freqs: Vec<f32> = (0..n_freqs)
            .map(|i| {
                if n_freqs > 1 {
                    nyquist * i as f32 / (n_freqs - 1) as f32
                } else {
                    0.0
                }
            })
            .collect();

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let hz_points: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
            .collect();

        let mut filterbank = vec![vec![0.0f32; n_freqs]; n_mels];
        for (m, filter) in filterbank.iter_mut().enumerate() {
            let left = hz_points[m];
            let center = hz_points[m + 1];
            let right = hz_points[m + 2];
            let rising = (center - left).max(f32::EPSILON);
            let falling = (right - center).max(f32::EPSILON);

            for (val, &freq) in filter.iter_mut().zip(&all_freqs) {
                let down = (freq - left) / rising;
                let up = (right - freq) / falling;
                *val = down.min(up).max(0.0);
            }
        }

        filterbank
    }

    /// Periodic Hann window
    fn hann_window(length: usize) -> Vec<f32> {
        (0..length)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / length as f32).cos()))
            .collect()
    }
}

/// Convert mel power to dB in place: `10 * log10(max(v, AMIN))`, then raise
/// everything below `max - top_db` to that floor.
pub fn amplitude_to_db(spec: &mut Spectrogram, top_db: Option<f32>) {
    let values = spec.as_mut_slice();
    for v in values.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10();
    }

    if let Some(top_db) = top_db {
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max - top_db;
        for v in values.iter_mut() {
            *v = v.max(floor);
        }
    }
}

/// One-shot log-mel spectrogram at the signal's own sample rate.
///
/// `hop_length` defaults to `n_fft / 2`.
pub fn mel_spectrogram_db(
    signal: &AudioSignal,
    n_mels: usize,
    n_fft: usize,
    hop_length: Option<usize>,
    top_db: f32,
) -> Result<Spectrogram> {
    let mel = MelSpectrogram::new(MelConfig {
        sample_rate: signal.sample_rate,
        n_fft,
        hop_length: hop_length.unwrap_or(n_fft / 2),
        n_mels,
        top_db: Some(top_db),
        ..Default::default()
    })?;
    mel.compute_db(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn small_config() -> MelConfig {
        MelConfig {
            sample_rate: 16000,
            n_fft: 512,
            hop_length: 256,
            n_mels: 40,
            ..Default::default()
        }
    }

    #[test]
    fn test_mel_config_default() {
        let config = MelConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.n_fft, 1024);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.n_mels, 64);
        assert_eq!(config.top_db, Some(80.0));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        for config in [
            MelConfig {
                n_fft: 0,
                ..Default::default()
            },
            MelConfig {
                hop_length: 0,
                ..Default::default()
            },
            MelConfig {
                n_mels: 0,
                ..Default::default()
            },
            MelConfig {
                sample_rate: 0,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                MelSpectrogram::new(config),
                Err(FeatureError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_hann_window() {
        let window = MelSpectrogram::hann_window(4);
        assert_eq!(window.len(), 4);
        assert!((window[0] - 0.0).abs() < 1e-6);
        assert!((window[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_center_pad_reflects() {
        let padded = MelSpectrogram::center_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_center_pad_short_signal_zero_fills() {
        let padded = MelSpectrogram::center_pad(&[1.0, 2.0], 3);
        assert_eq!(padded, vec![0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mel_filterbank_shape() {
        let mel = MelSpectrogram::new(MelConfig::default()).unwrap();
        assert_eq!(mel.mel_basis.len(), 64);
        assert_eq!(mel.mel_basis[0].len(), 513);
    }

    #[test]
    fn test_mel_filterbank_triangular() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        for filter in &mel.mel_basis {
            assert!(filter.iter().all(|&v| (0.0..=1.0).contains(&v)));
            // Rises to a single peak then falls
            let peak = filter
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert!(filter[..peak].windows(2).all(|w| w[0] <= w[1]));
            assert!(filter[peak..].windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn test_frame_count_formula() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        for len in [0usize, 1, 255, 256, 257, 16000, 16001] {
            let signal = AudioSignal::mono(vec![0.1; len], 16000);
            let spec = mel.compute_power(&signal).unwrap();
            assert_eq!(spec.shape(), (1, 40, len / 256 + 1), "len {len}");
        }
    }

    #[test]
    fn test_stereo_shape_and_channel_independence() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        let left = sine(440.0, 16000, 8000);
        let right = vec![0.0; 8000];
        let signal = AudioSignal::new(vec![left.clone(), right], 16000);
        let spec = mel.compute_db(&signal).unwrap();
        assert_eq!(spec.shape(), (2, 40, 32));

        let mono = mel.compute_db(&AudioSignal::mono(left, 16000)).unwrap();
        // The global max comes from the left channel in both runs
        for m in 0..40 {
            assert_eq!(spec.row(0, m), mono.row(0, m));
        }
    }

    #[test]
    fn test_sine_peak_lands_in_matching_filter() {
        let config = small_config();
        let mel = MelSpectrogram::new(config.clone()).unwrap();
        let signal = AudioSignal::mono(sine(1000.0, 16000, 16000), 16000);
        let spec = mel.compute_power(&signal).unwrap();

        let energy: Vec<f32> = (0..config.n_mels)
            .map(|m| spec.row(0, m).iter().sum())
            .collect();
        let peak = energy
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        let bin_1k = (1000.0 * config.n_fft as f32 / config.sample_rate as f32).round() as usize;
        assert!(mel.mel_basis[peak][bin_1k] > 0.0);
    }

    #[test]
    fn test_db_range_clipped() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        let mut samples = sine(440.0, 16000, 16000);
        // Leave a silent stretch so the floor is exercised
        for s in &mut samples[8000..] {
            *s = 0.0;
        }
        let spec = mel.compute_db(&AudioSignal::mono(samples, 16000)).unwrap();
        let max = spec.max();
        let min = spec.min();
        assert!(max.is_finite() && min.is_finite());
        assert!(min >= max - 80.0 - 1e-4);
        assert!((min - (max - 80.0)).abs() < 1e-3);
    }

    #[test]
    fn test_silence_is_epsilon_floor() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        let spec = mel
            .compute_db(&AudioSignal::mono(vec![0.0; 4000], 16000))
            .unwrap();
        for &v in spec.as_slice() {
            assert!((v + 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_amplitude_to_db_values() {
        let mut spec = Spectrogram::new(vec![1.0, 10.0, 100.0, 0.0], 1, 1, 4).unwrap();
        amplitude_to_db(&mut spec, None);
        let v = spec.as_slice();
        assert!((v[0] - 0.0).abs() < 1e-5);
        assert!((v[1] - 10.0).abs() < 1e-5);
        assert!((v[2] - 20.0).abs() < 1e-5);
        assert!((v[3] + 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_amplitude_to_db_top_db_floor() {
        let mut spec = Spectrogram::new(vec![1.0, 1e-12, 1e4], 1, 1, 3).unwrap();
        amplitude_to_db(&mut spec, Some(30.0));
        let v = spec.as_slice();
        assert!((v[0] - 10.0).abs() < 1e-4);
        assert!((v[1] - 10.0).abs() < 1e-4);
        assert!((v[2] - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let mel = MelSpectrogram::new(small_config()).unwrap();
        let signal = AudioSignal::mono(vec![0.0; 100], 22050);
        assert!(mel.compute_db(&signal).is_err());
    }

    #[test]
    fn test_mel_spectrogram_db_default_hop() {
        let signal = AudioSignal::mono(sine(440.0, 22050, 22050), 22050);
        let spec = mel_spectrogram_db(&signal, 64, 1024, None, 80.0).unwrap();
        assert_eq!(spec.shape(), (1, 64, 22050 / 512 + 1));
    }
}
