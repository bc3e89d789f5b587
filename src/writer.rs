use std::fs::{self, File};
use std::io::{self, Read};

use tracing::debug;

use crate::archive::Archive;
use crate::domain::{Item, ItemIndex};
use crate::error::MirrorError;

/// Asset body ready to be copied into the item directory.
pub struct AssetStream {
    pub file_name: String,
    pub url: String,
    pub reader: Box<dyn Read + Send>,
}

#[derive(Debug)]
pub enum WriteOutcome {
    Complete,
    /// Directory and metadata are on disk, the asset copy stopped on the
    /// read side. The asset file is left truncated.
    AssetInterrupted(MirrorError),
}

/// Creates `<root>/<index>/` and writes the metadata files and the asset.
///
/// Every `Err` returned here is a filesystem failure.
pub fn write_item(
    archive: &Archive,
    index: ItemIndex,
    item: &Item,
    asset: Option<AssetStream>,
) -> Result<WriteOutcome, MirrorError> {
    let dir = archive.item_dir(index);
    fs::create_dir(dir.as_std_path())
        .map_err(|err| MirrorError::Filesystem(format!("create {dir}: {err}")))?;

    for (field, text) in item.metadata_fields() {
        let path = archive.metadata_path(index, field);
        fs::write(path.as_std_path(), text)
            .map_err(|err| MirrorError::Filesystem(format!("write {path}: {err}")))?;
    }

    let Some(asset) = asset else {
        return Ok(WriteOutcome::Complete);
    };

    let path = archive.asset_path(index, &asset.file_name);
    let mut file = File::create(path.as_std_path())
        .map_err(|err| MirrorError::Filesystem(format!("create {path}: {err}")))?;
    let mut reader = TrackedReader::new(asset.reader);
    match io::copy(&mut reader, &mut file) {
        Ok(bytes) => {
            debug!(%index, bytes, "asset written");
            Ok(WriteOutcome::Complete)
        }
        Err(err) if reader.failed => Ok(WriteOutcome::AssetInterrupted(MirrorError::Transport {
            url: asset.url,
            message: err.to_string(),
        })),
        Err(err) => Err(MirrorError::Filesystem(format!("write {path}: {err}"))),
    }
}

/// Remembers whether an error came from the source so copy failures can be
/// split into network and disk errors.
struct TrackedReader<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> TrackedReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            failed: false,
        }
    }
}

impl<R: Read> Read for TrackedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.inner.read(buf);
        if let Err(err) = &result {
            if err.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
        }
        result
    }
}
