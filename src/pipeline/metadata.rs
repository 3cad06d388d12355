//! Dataset metadata table

use serde::Deserialize;
use std::path::Path;

use crate::error::{FeatureError, Result};

/// One labelled clip: path relative to the audio root plus its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetItem {
    pub relative_path: String,
    pub class_id: u32,
}

impl DatasetItem {
    pub fn new(relative_path: impl Into<String>, class_id: u32) -> Self {
        Self {
            relative_path: relative_path.into(),
            class_id,
        }
    }

    /// Full path as the audio root string followed by the relative path
    pub fn resolve(&self, data_root: &str) -> String {
        format!("{data_root}{}", self.relative_path)
    }
}

/// Row of an UrbanSound8K-style metadata CSV; other columns are ignored.
#[derive(Debug, Deserialize)]
struct MetadataRow {
    slice_file_name: String,
    fold: u32,
    #[serde(rename = "classID")]
    class_id: u32,
}

/// Ordered, immutable list of dataset items
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    items: Vec<DatasetItem>,
}

impl MetadataTable {
    /// Read a headered CSV with `slice_file_name`, `fold` and `classID` columns.
    ///
    /// Each row maps to `/fold{fold}/{slice_file_name}`.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;

        let mut items = Vec::new();
        for row in reader.deserialize() {
            let row: MetadataRow = row?;
            items.push(DatasetItem {
                relative_path: format!("/fold{}/{}", row.fold, row.slice_file_name),
                class_id: row.class_id,
            });
        }

        tracing::info!(path = %path.display(), items = items.len(), "loaded metadata");
        Ok(Self { items })
    }

    pub fn from_items(items: Vec<DatasetItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&DatasetItem> {
        self.items.get(index).ok_or(FeatureError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn items(&self) -> &[DatasetItem] {
        &self.items
    }

    /// Keep only the first `n` items
    pub fn truncate(&mut self, n: usize) {
        self.items.truncate(n);
    }
}

impl FromIterator<DatasetItem> for MetadataTable {
    fn from_iter<I: IntoIterator<Item = DatasetItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
