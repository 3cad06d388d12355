//! Error types for the feature pipeline
//!
//! Every stage returns [`FeatureError`]. The orchestrator wraps stage failures in
//! [`FeatureError::Item`] so callers can tell which dataset entry failed.
//!
//! ```text
//! FeatureError
//! ├── Decode               -- unreadable file or unsupported format
//! ├── UnsupportedChannels  -- channel count outside {1, 2}
//! ├── InvalidConfig        -- non-positive sizes, bad fractions
//! ├── IndexOutOfRange      -- dataset index past the metadata table
//! ├── Resample / Tensor / Metadata / Io
//! └── Item { index, path, source }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors produced while turning a clip into features.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// The file could not be read or its format is not supported
    #[error("Failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Requested or encountered channel count is not mono or stereo
    #[error("Unsupported channel conversion: {found} -> {requested} channels")]
    UnsupportedChannels { requested: usize, found: usize },

    /// A configuration value is out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Dataset index beyond the metadata table
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Resampler construction or processing failed
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Tensor conversion for the downstream consumer failed
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Metadata table could not be parsed
    #[error("Metadata error: {0}")]
    Metadata(#[from] csv::Error),

    /// I/O error outside of decoding (config files, fixtures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage failed while processing one dataset item
    #[error("Item {index} ({path}): {source}")]
    Item {
        index: usize,
        path: String,
        #[source]
        source: Box<FeatureError>,
    },
}

impl FeatureError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Tag a stage error with the dataset entry it came from.
    pub fn for_item(self, index: usize, path: impl Into<String>) -> Self {
        Self::Item {
            index,
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The underlying stage error, with any item tagging stripped.
    pub fn root_cause(&self) -> &FeatureError {
        match self {
            Self::Item { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
