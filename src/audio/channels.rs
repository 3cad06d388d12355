//! Mono/stereo channel conversion

use super::AudioSignal;
use crate::error::{FeatureError, Result};

/// Convert a signal to `target_channels` (1 or 2).
///
/// Stereo to mono keeps the first channel only, it does not average. Mono to
/// stereo duplicates the single channel.
pub fn rechannel(signal: AudioSignal, target_channels: usize) -> Result<AudioSignal> {
    let found = signal.num_channels();
    if found == target_channels {
        return Ok(signal);
    }

    let AudioSignal {
        mut channels,
        sample_rate,
    } = signal;

    match (found, target_channels) {
        (2, 1) => {
            tracing::debug!("stereo -> mono, keeping first channel");
            channels.truncate(1);
            Ok(AudioSignal::new(channels, sample_rate))
        }
        (1, 2) => {
            tracing::debug!("mono -> stereo, duplicating channel");
            let copy = channels[0].clone();
            channels.push(copy);
            Ok(AudioSignal::new(channels, sample_rate))
        }
        _ => Err(FeatureError::UnsupportedChannels {
            requested: target_channels,
            found,
        }),
    }
}
