//! Bounded fan-out over the missing set.
//!
//! Each in-flight item holds one slot of the pool for its metadata fetch,
//! asset fetch and write. Network and decode failures stay with the item;
//! a filesystem failure poisons the run so no further item is written.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::archive::Archive;
use crate::batch::split_blocks;
use crate::catalog::CatalogClient;
use crate::domain::{DispatchMode, ItemIndex};
use crate::error::MirrorError;
use crate::writer::{AssetStream, WriteOutcome, write_item};

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub index: ItemIndex,
    pub error: String,
}

/// `failed` holds abandoned items only; partial items are listed once, in
/// `partial`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolReport {
    pub attempted: usize,
    pub completed: usize,
    pub partial: Vec<ItemIndex>,
    pub failed: Vec<FailedItem>,
}

#[derive(Debug)]
enum ItemOutcome {
    Complete,
    Partial(MirrorError),
    Abandoned(MirrorError),
    /// Fetched, but the run was poisoned before anything was written.
    Skipped,
}

#[derive(Default)]
struct RunState {
    poisoned: AtomicBool,
    cursor: AtomicUsize,
    attempted: AtomicUsize,
    completed: AtomicUsize,
    fatal: Mutex<Option<MirrorError>>,
    partial: Mutex<Vec<ItemIndex>>,
    failed: Mutex<Vec<FailedItem>>,
}

impl RunState {
    fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    fn poison(&self, err: MirrorError) {
        self.poisoned.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.fatal.lock() {
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }

    fn record_partial(&self, index: ItemIndex) {
        if let Ok(mut partial) = self.partial.lock() {
            partial.push(index);
        }
    }

    fn record_failure(&self, index: ItemIndex, err: &MirrorError) {
        if let Ok(mut failed) = self.failed.lock() {
            failed.push(FailedItem {
                index,
                error: err.to_string(),
            });
        }
    }

    fn finish(self) -> Result<PoolReport, MirrorError> {
        let fatal = self
            .fatal
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(err) = fatal {
            return Err(err);
        }

        let mut partial = self
            .partial
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        partial.sort();
        let mut failed = self
            .failed
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        failed.sort_by_key(|item| item.index);

        Ok(PoolReport {
            attempted: self.attempted.into_inner(),
            completed: self.completed.into_inner(),
            partial,
            failed,
        })
    }
}

pub struct FetchPool<'a> {
    client: &'a dyn CatalogClient,
    archive: &'a Archive,
    rate_limit: usize,
    dispatch: DispatchMode,
    sink: &'a dyn ProgressSink,
}

impl<'a> FetchPool<'a> {
    pub fn new(
        client: &'a dyn CatalogClient,
        archive: &'a Archive,
        rate_limit: usize,
        dispatch: DispatchMode,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            client,
            archive,
            rate_limit: rate_limit.max(1),
            dispatch,
            sink,
        }
    }

    /// Attempts every index once. Returns `Err` only for a fatal filesystem
    /// failure.
    pub fn run(&self, missing: &[ItemIndex]) -> Result<PoolReport, MirrorError> {
        let state = RunState::default();
        match self.dispatch {
            DispatchMode::Pooled => self.run_pooled(missing, &state),
            DispatchMode::Batched => self.run_batched(missing, &state),
        }
        state.finish()
    }

    fn run_pooled(&self, missing: &[ItemIndex], state: &RunState) {
        let workers = self.rate_limit.min(missing.len());
        info!(workers, items = missing.len(), "starting fetch workers");
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !state.is_poisoned() {
                        let next = state.cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(index) = missing.get(next) else {
                            break;
                        };
                        self.process(*index, state);
                    }
                });
            }
        });
    }

    fn run_batched(&self, missing: &[ItemIndex], state: &RunState) {
        let blocks = split_blocks(missing, self.rate_limit);
        info!(blocks = blocks.len(), items = missing.len(), "fetching in blocks");
        for block in blocks {
            if state.is_poisoned() {
                break;
            }
            thread::scope(|scope| {
                for index in block {
                    scope.spawn(move || self.process(*index, state));
                }
            });
        }
    }

    fn process(&self, index: ItemIndex, state: &RunState) {
        if state.is_poisoned() {
            return;
        }
        state.attempted.fetch_add(1, Ordering::SeqCst);

        match self.fetch_and_write(index, state) {
            Ok(ItemOutcome::Complete) => {
                state.completed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(ItemOutcome::Partial(err)) => {
                warn!(
                    %index,
                    error = %err,
                    dir = %self.archive.item_dir(index),
                    "asset download interrupted; item left incomplete and will not be refetched until its directory is removed"
                );
                state.record_partial(index);
            }
            Ok(ItemOutcome::Abandoned(err)) => {
                warn!(%index, error = %err, "skipping item");
                state.record_failure(index, &err);
            }
            Ok(ItemOutcome::Skipped) => {}
            Err(err) => {
                error!(%index, error = %err, "aborting run");
                state.poison(err);
            }
        }
    }

    fn fetch_and_write(
        &self,
        index: ItemIndex,
        state: &RunState,
    ) -> Result<ItemOutcome, MirrorError> {
        self.sink.event(ProgressEvent {
            message: format!("Fetching item #{index} ..."),
            elapsed: None,
        });

        let item = match self.client.fetch_item(index) {
            Ok(item) => item,
            Err(err) => return recover(err),
        };

        let asset = match item.asset_filename() {
            Some(file_name) => match self.client.open_asset(&item.img) {
                Ok(reader) => Some(AssetStream {
                    file_name: file_name.to_string(),
                    url: item.img.clone(),
                    reader,
                }),
                Err(err) => return recover(err),
            },
            None => {
                info!(%index, "item has no asset");
                None
            }
        };

        if state.is_poisoned() {
            return Ok(ItemOutcome::Skipped);
        }

        match write_item(self.archive, index, &item, asset)? {
            WriteOutcome::Complete => Ok(ItemOutcome::Complete),
            WriteOutcome::AssetInterrupted(err) => Ok(ItemOutcome::Partial(err)),
        }
    }
}

fn recover(err: MirrorError) -> Result<ItemOutcome, MirrorError> {
    if err.is_fatal() {
        return Err(err);
    }
    Ok(ItemOutcome::Abandoned(err))
}
