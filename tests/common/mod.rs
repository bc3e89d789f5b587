#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;

use xkcd_mirror::app::{ProgressEvent, ProgressSink};
use xkcd_mirror::catalog::CatalogClient;
use xkcd_mirror::config::MirrorConfig;
use xkcd_mirror::domain::{Item, ItemIndex};
use xkcd_mirror::error::MirrorError;

/// Catalog stand-in that records how many items overlap, counting from the
/// metadata fetch until the asset reader is dropped after the write.
#[derive(Default)]
pub struct MockCatalog {
    pub latest: Option<u32>,
    pub malformed: HashSet<u32>,
    pub broken_assets: HashSet<u32>,
    pub without_asset: HashSet<u32>,
    pub delay: Duration,
    in_flight: Arc<AtomicUsize>,
    high_water: AtomicUsize,
    item_calls: Mutex<Vec<u32>>,
    asset_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn with_latest(latest: u32) -> Self {
        Self {
            latest: Some(latest),
            ..Self::default()
        }
    }

    pub fn item(index: u32) -> Item {
        Item {
            num: index,
            img: format!("https://imgs.example.com/comics/item_{index}.png"),
            transcript: (index % 2 == 0).then(|| format!("transcript {index}")),
            alt: Some(format!("alt {index}")),
        }
    }

    pub fn asset_bytes(index: u32) -> Vec<u8> {
        format!("png-{index}").into_bytes()
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> Vec<u32> {
        let mut calls = self.item_calls.lock().unwrap().clone();
        calls.sort_unstable();
        calls
    }

    pub fn asset_calls(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }
}

impl CatalogClient for MockCatalog {
    fn fetch_latest(&self) -> Result<Item, MirrorError> {
        match self.latest {
            Some(latest) => Ok(Self::item(latest)),
            None => Err(MirrorError::Transport {
                url: "mock://latest".to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }

    fn fetch_item(&self, index: ItemIndex) -> Result<Item, MirrorError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);
        self.item_calls.lock().unwrap().push(index.get());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if self.malformed.contains(&index.get()) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(MirrorError::Decode {
                url: format!("mock://{index}"),
                message: "expected value at line 1 column 1".to_string(),
            });
        }
        let mut item = Self::item(index.get());
        if self.without_asset.contains(&index.get()) {
            item.img = "https://imgs.example.com/comics/".to_string();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(item)
    }

    fn open_asset(&self, url: &str) -> Result<Box<dyn Read + Send>, MirrorError> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let index: u32 = url
            .trim_start_matches("https://imgs.example.com/comics/item_")
            .trim_end_matches(".png")
            .parse()
            .unwrap();
        let inner: Box<dyn Read + Send> = if self.broken_assets.contains(&index) {
            Box::new(Cursor::new(b"png-".to_vec()).chain(ResetReader))
        } else {
            Box::new(Cursor::new(Self::asset_bytes(index)))
        };
        Ok(Box::new(InFlightReader {
            inner,
            in_flight: Arc::clone(&self.in_flight),
        }))
    }
}

/// Releases the item's in-flight slot once the writer is done with it.
struct InFlightReader {
    inner: Box<dyn Read + Send>,
    in_flight: Arc<AtomicUsize>,
}

impl Read for InFlightReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for InFlightReader {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ResetReader;

impl Read for ResetReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }
}

/// Collects progress lines.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

pub fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("xkcdDB")).unwrap();
    (temp, root)
}

pub fn config_for(root: &Utf8PathBuf, rate_limit: usize) -> MirrorConfig {
    MirrorConfig {
        archive_root: root.clone(),
        rate_limit,
        ..MirrorConfig::default()
    }
}

pub fn index(value: u32) -> ItemIndex {
    ItemIndex::new(value).unwrap()
}
