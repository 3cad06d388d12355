//! Fixed-length normalization and time-shift augmentation

use rand::Rng;

use super::AudioSignal;

/// Target sample count for `duration_ms` at `sample_rate`.
///
/// The rate is truncated to whole samples per millisecond first, so 22050 Hz
/// gives 22 samples/ms.
pub fn target_len(sample_rate: u32, duration_ms: u32) -> usize {
    (sample_rate / 1000) as usize * duration_ms as usize
}

/// Pad or truncate every channel to exactly [`target_len`] samples.
///
/// Longer signals keep their first `target_len` samples. Shorter signals get
/// zero padding split between the start and the end, with the leading length
/// drawn uniformly from `0..=total_pad`.
pub fn pad_or_truncate<R: Rng + ?Sized>(
    signal: AudioSignal,
    duration_ms: u32,
    rng: &mut R,
) -> AudioSignal {
    let max_len = target_len(signal.sample_rate, duration_ms);
    let len = signal.len();

    if len == max_len {
        return signal;
    }

    let AudioSignal {
        mut channels,
        sample_rate,
    } = signal;

    if len > max_len {
        tracing::debug!(from = len, to = max_len, "truncating");
        for channel in &mut channels {
            channel.truncate(max_len);
        }
    } else {
        let total_pad = max_len - len;
        let pad_begin = rng.gen_range(0..=total_pad);
        let pad_end = total_pad - pad_begin;
        tracing::debug!(pad_begin, pad_end, "padding");

        channels = channels
            .into_iter()
            .map(|channel| {
                let mut padded = Vec::with_capacity(max_len);
                padded.resize(pad_begin, 0.0);
                padded.extend_from_slice(&channel);
                padded.resize(max_len, 0.0);
                padded
            })
            .collect();
    }

    AudioSignal::new(channels, sample_rate)
}

/// Circularly shift the time axis by `floor(u * shift_limit * len)` samples,
/// `u` uniform in [0, 1). Samples pushed off the end wrap around to the start.
pub fn time_shift<R: Rng + ?Sized>(
    mut signal: AudioSignal,
    shift_limit: f64,
    rng: &mut R,
) -> AudioSignal {
    let len = signal.len();
    let u: f64 = rng.gen();
    if len == 0 {
        return signal;
    }

    let shift = (u * shift_limit * len as f64) as usize % len;
    for channel in &mut signal.channels {
        channel.rotate_right(shift);
    }
    signal
}
