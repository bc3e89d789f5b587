use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{ItemIndex, MetadataField};
use crate::error::MirrorError;

/// Local mirror: one subdirectory per fetched item, named by its index.
#[derive(Debug, Clone)]
pub struct Archive {
    root: Utf8PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn item_dir(&self, index: ItemIndex) -> Utf8PathBuf {
        self.root.join(index.to_string())
    }

    pub fn metadata_path(&self, index: ItemIndex, field: MetadataField) -> Utf8PathBuf {
        self.item_dir(index).join(field.file_name(index))
    }

    pub fn asset_path(&self, index: ItemIndex, file_name: &str) -> Utf8PathBuf {
        self.item_dir(index).join(file_name)
    }

    /// Creates the archive root when absent. Returns whether it was created.
    pub fn ensure_root(&self) -> Result<bool, MirrorError> {
        if self.root.as_std_path().exists() {
            return Ok(false);
        }
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| MirrorError::Filesystem(format!("create {}: {err}", self.root)))?;
        Ok(true)
    }

    /// Presence only; the item's files are not inspected.
    pub fn contains(&self, index: ItemIndex) -> bool {
        self.item_dir(index).as_std_path().exists()
    }

    /// Indices in `1..=upper` that have no directory yet, in ascending order.
    pub fn missing_items(&self, upper: ItemIndex, known_absent: &[u32]) -> Vec<ItemIndex> {
        (1..=upper.get())
            .filter(|value| !known_absent.contains(value))
            .filter_map(|value| ItemIndex::new(value).ok())
            .filter(|index| !self.contains(*index))
            .collect()
    }
}
