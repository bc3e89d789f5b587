use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// How the fetch pool bounds the number of items in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// A fixed group of `rate_limit` workers draining the missing set.
    Pooled,
    /// Blocks of `rate_limit` items, one block at a time.
    Batched,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Pooled => write!(f, "pooled"),
            DispatchMode::Batched => write!(f, "batched"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(u32);

impl ItemIndex {
    pub fn new(value: u32) -> Result<Self, MirrorError> {
        if value == 0 {
            return Err(MirrorError::InvalidIndex(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text fields stored next to the asset, one file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Alt,
    Transcript,
}

impl MetadataField {
    pub fn suffix(self) -> &'static str {
        match self {
            MetadataField::Alt => "alt",
            MetadataField::Transcript => "transcript",
        }
    }

    pub fn file_name(self, index: ItemIndex) -> String {
        format!("{index}-{}", self.suffix())
    }
}

/// One catalog entry as served by the metadata endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub num: u32,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Item {
    pub fn index(&self) -> Result<ItemIndex, MirrorError> {
        ItemIndex::new(self.num)
    }

    /// Last path segment of `img`, or `None` when the item has no asset.
    pub fn asset_filename(&self) -> Option<&str> {
        let name = self.img.rsplit('/').next().unwrap_or_default();
        match name {
            "" | "." | ".." => None,
            name => Some(name),
        }
    }

    /// Present, non-empty text fields in write order.
    pub fn metadata_fields(&self) -> Vec<(MetadataField, &str)> {
        [
            (MetadataField::Alt, self.alt.as_deref()),
            (MetadataField::Transcript, self.transcript.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(text) if !text.is_empty() => Some((field, text)),
            _ => None,
        })
        .collect()
    }
}
