//! Time-domain audio stages
//!
//! This module provides:
//! - Decoding to planar PCM (WAV via hound, other containers via symphonia)
//! - Mono/stereo channel conversion
//! - Per-channel resampling
//! - Fixed-length padding/truncation and circular time shift

mod channels;
mod duration;
mod io;
pub mod resample;

pub use channels::rechannel;
pub use duration::{pad_or_truncate, target_len, time_shift};
pub use io::{load, load_wav, save_wav, AudioSignal};
pub use resample::{ResampleQuality, Resampler};
