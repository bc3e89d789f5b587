use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::archive::Archive;
use crate::catalog::{CatalogClient, latest_index};
use crate::config::MirrorConfig;
use crate::domain::{DispatchMode, ItemIndex};
use crate::error::MirrorError;
use crate::pool::{FailedItem, FetchPool};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub latest: ItemIndex,
    pub archive_root: String,
    pub dispatch: DispatchMode,
    pub missing: usize,
    pub attempted: usize,
    pub completed: usize,
    pub partial: Vec<ItemIndex>,
    pub failed: Vec<FailedItem>,
    pub dry_run: bool,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

/// Receives progress lines; called concurrently from fetch workers.
pub trait ProgressSink: Sync {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: CatalogClient> {
    config: MirrorConfig,
    archive: Archive,
    client: C,
}

impl<C: CatalogClient> App<C> {
    pub fn new(config: MirrorConfig, client: C) -> Self {
        let archive = Archive::new(config.archive_root.clone());
        Self {
            config,
            archive,
            client,
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Probe, scan, fetch. Only a probe failure or a filesystem failure is
    /// returned as `Err`; per-item failures end up in the report.
    pub fn sync(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, MirrorError> {
        let started = Instant::now();
        let started_at = iso_timestamp();

        let latest = latest_index(&self.client)?;
        info!(%latest, "catalog probed");

        if !options.dry_run && self.archive.ensure_root()? {
            sink.event(ProgressEvent {
                message: format!("{} does not exist. Creating...", self.archive.root()),
                elapsed: None,
            });
        }

        let missing = self
            .archive
            .missing_items(latest, &self.config.known_absent);
        sink.event(ProgressEvent {
            message: if missing.is_empty() {
                "Found no missing items".to_string()
            } else {
                format!("Found {} missing items", missing.len())
            },
            elapsed: None,
        });

        let mut report = SyncReport {
            latest,
            archive_root: self.archive.root().to_string(),
            dispatch: self.config.dispatch,
            missing: missing.len(),
            attempted: 0,
            completed: 0,
            partial: Vec::new(),
            failed: Vec::new(),
            dry_run: options.dry_run,
            started_at,
            finished_at: String::new(),
        };

        if !options.dry_run && !missing.is_empty() {
            let pool = FetchPool::new(
                &self.client,
                &self.archive,
                self.config.rate_limit,
                self.config.dispatch,
                sink,
            );
            let outcome = pool.run(&missing)?;
            report.attempted = outcome.attempted;
            report.completed = outcome.completed;
            report.partial = outcome.partial;
            report.failed = outcome.failed;

            sink.event(ProgressEvent {
                message: format!(
                    "Downloaded {} of {} missing items",
                    report.completed,
                    missing.len()
                ),
                elapsed: Some(started.elapsed()),
            });
        }

        report.finished_at = iso_timestamp();
        Ok(report)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
