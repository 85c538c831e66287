//! Watch loop.
//!
//! Polls the configured source, feeds unprocessed items one at a time
//! through the pipeline, and sleeps between scans. Shutdown (ctrl-c) is
//! honored between items at this loop, never mid-item.

use crate::{
    AppResult, DriveFolder, LocalFolder,
    pipeline::{Pipeline, SourceItem},
};

use call_audit_core::SheetStore;

use std::time::Duration;

use tracing::{error, info, instrument};

/// Where new recordings come from.
pub(crate) enum ItemSource {
    /// Local folder scan.
    Local(LocalFolder),
    /// Cloud folder listing + download.
    Cloud(DriveFolder),
}

impl ItemSource {
    async fn scan(&self) -> AppResult<Vec<SourceItem>> {
        match self {
            ItemSource::Local(folder) => folder.scan(),
            ItemSource::Cloud(folder) => folder.scan().await,
        }
    }

    /// Makes the item's bytes locally readable.
    ///
    /// Local items just settle briefly so an in-flight copy finishes being
    /// written; cloud items are downloaded to their temp path.
    async fn fetch(&self, item: &SourceItem, settle_delay: Duration) -> AppResult<()> {
        match self {
            ItemSource::Local(_) => {
                tokio::time::sleep(settle_delay).await;
                Ok(())
            }
            ItemSource::Cloud(folder) => folder.download(&item.id, &item.path).await,
        }
    }
}

/// Main application loop state.
pub(crate) struct App<S: SheetStore> {
    pub(crate) pipeline: Pipeline<S>,
    pub(crate) source: ItemSource,
    pub(crate) poll_interval: Duration,
    pub(crate) settle_delay: Duration,
}

impl<S: SheetStore> App<S> {
    /// Run the watch loop until ctrl-c.
    ///
    /// A failed scan is logged and retried on the next poll; per-item
    /// failures are contained inside the pipeline.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        let stats = self.pipeline.ledger_stats();
        info!(
            processed = stats.total,
            successful = stats.successful,
            failed = stats.failed,
            "Call-audit starting"
        );

        loop {
            match self.source.scan().await {
                Ok(items) => {
                    for item in items {
                        if self.pipeline.is_processed(&item.id) {
                            continue;
                        }

                        if let Err(e) = self.source.fetch(&item, self.settle_delay).await {
                            error!(item = %item.display_name, error = ?e, "Failed to fetch item");
                            continue;
                        }

                        self.pipeline.process_item(&item).await;
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Folder scan failed");
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Call-audit shut down successfully");
        Ok(())
    }
}
