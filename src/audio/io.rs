//! Audio decoding and WAV output

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{FeatureError, Result};

/// Planar audio: one sample vector per channel, all of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    /// Samples in [-1.0, 1.0], indexed `[channel][sample]`
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSignal {
    /// Create a signal from planar channel data
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "all channels must have the same length"
        );
        Self {
            channels,
            sample_rate,
        }
    }

    /// Create a single-channel signal
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved frames into planar channels
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Interleave channels frame by frame
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.num_channels());
        for i in 0..self.len() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Check if there are no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Decode an audio file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load(path)
    }

    /// Save to WAV file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_wav(path, self)
    }
}

/// Decode the file at `path` into planar PCM at its native sample rate.
///
/// WAV files go through `hound`; everything else is probed with `symphonia`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioSignal> {
    let path = path.as_ref();
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    let signal = if is_wav {
        load_wav(path)?
    } else {
        load_with_symphonia(path)?
    };

    if signal.num_channels() == 0 {
        return Err(FeatureError::decode(path, "no audio channels"));
    }

    tracing::debug!(
        path = %path.display(),
        channels = signal.num_channels(),
        samples = signal.len(),
        sample_rate = signal.sample_rate,
        "decoded clip"
    );
    Ok(signal)
}

/// Load a WAV file, scaling integer PCM to [-1.0, 1.0]
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioSignal> {
    let path = path.as_ref();
    let reader = WavReader::open(path).map_err(|e| FeatureError::decode(path, e))?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| FeatureError::decode(path, e))?;

    Ok(AudioSignal::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    ))
}

fn extend_planar<T>(
    channels: &mut Vec<Vec<f32>>,
    data: std::borrow::Cow<symphonia::core::audio::AudioBuffer<T>>,
) where
    T: symphonia::core::sample::Sample,
    f32: FromSample<T>,
{
    let n = data.spec().channels.count();
    if channels.len() < n {
        channels.resize_with(n, Vec::new);
    }
    for (ch, out) in channels.iter_mut().enumerate().take(n) {
        out.extend(data.chan(ch).iter().map(|v| f32::from_sample(*v)));
    }
}

fn load_with_symphonia(path: &Path) -> Result<AudioSignal> {
    let src = File::open(path).map_err(|e| FeatureError::decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FeatureError::decode(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FeatureError::decode(path, "no supported audio tracks"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| FeatureError::decode(path, "unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| FeatureError::decode(path, e))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(FeatureError::decode(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(AudioBufferRef::F64(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::F32(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::S32(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::S24(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::S16(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::S8(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::U32(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::U24(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::U16(buf)) => extend_planar(&mut channels, buf),
            Ok(AudioBufferRef::U8(buf)) => extend_planar(&mut channels, buf),
            // Corrupt packet, skip it
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::warn!(path = %path.display(), "skipping bad packet: {msg}");
            }
            Err(e) => return Err(FeatureError::decode(path, e)),
        }
    }

    Ok(AudioSignal::new(channels, sample_rate))
}

/// Save a signal as a 32-bit float WAV file
pub fn save_wav<P: AsRef<Path>>(path: P, signal: &AudioSignal) -> Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: signal.num_channels() as u16,
        sample_rate: signal.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let to_io = |e: hound::Error| match e {
        hound::Error::IoError(io) => FeatureError::Io(io),
        other => FeatureError::Io(std::io::Error::other(other.to_string())),
    };

    let mut writer = WavWriter::create(path, spec).map_err(to_io)?;
    for sample in signal.to_interleaved() {
        writer.write_sample(sample).map_err(to_io)?;
    }
    writer.finalize().map_err(to_io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_duration() {
        let signal = AudioSignal::mono(vec![0.0; 44100], 44100);
        assert!((signal.duration() - 1.0).abs() < 1e-6);
        assert_eq!(signal.num_channels(), 1);
    }

    #[test]
    fn test_interleave_round_trip() {
        let interleaved = [0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3];
        let signal = AudioSignal::from_interleaved(&interleaved, 2, 8000);
        assert_eq!(signal.channels[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(signal.channels[1], vec![-0.1, -0.2, -0.3]);
        assert_eq!(signal.to_interleaved(), interleaved.to_vec());
    }

    #[test]
    fn test_save_and_load_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let signal = AudioSignal::new(vec![vec![0.5, 0.25, 0.0], vec![-0.5, -0.25, 0.0]], 22050);
        signal.save(&path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, signal);
    }

    #[test]
    fn test_load_int_wav_is_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int16.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.sample_rate, 16000);
        assert!((loaded.channels[0][0] - 0.5).abs() < 1e-6);
        assert!((loaded.channels[0][1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = load("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, FeatureError::Decode { .. }));

        let err = load("/definitely/not/here.mp3").unwrap_err();
        assert!(matches!(err, FeatureError::Decode { .. }));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.ogg");
        std::fs::write(&path, b"this is not audio").unwrap();
        assert!(matches!(load(&path), Err(FeatureError::Decode { .. })));
    }
}
