//! Local folder watcher.
//!
//! Polling scan of the recordings folder. File-system events are not
//! needed: the poll interval bounds detection latency, and the ledger (not
//! the scan) decides what still needs processing.

use crate::{AppError, AppResult, config::WatchConfig, pipeline::SourceItem};

use std::{fs, panic::Location};

use error_location::ErrorLocation;
use tracing::{debug, instrument, warn};

/// Watched local audio folder.
pub(crate) struct LocalFolder {
    watch: WatchConfig,
}

impl LocalFolder {
    /// Creates the watcher over the configured folder.
    pub(crate) fn new(watch: WatchConfig) -> Self {
        Self { watch }
    }

    /// Lists the folder's acceptable audio files, name-sorted so items are
    /// processed in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::WatchError`] when the folder cannot be read.
    #[track_caller]
    #[instrument(skip(self))]
    pub(crate) fn scan(&self) -> AppResult<Vec<SourceItem>> {
        let entries = fs::read_dir(&self.watch.folder).map_err(|e| AppError::WatchError {
            reason: format!("cannot read {}: {e}", self.watch.folder.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let mut items = Vec::new();

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();

            if !path.is_file() || !self.watch.extension_supported(&path) {
                continue;
            }

            match entry.metadata() {
                Ok(meta) if meta.len() > self.watch.max_file_size_bytes() => {
                    warn!(
                        path = %path.display(),
                        size_mb = meta.len() / 1024 / 1024,
                        "File too large, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat file, skipping");
                    continue;
                }
                Ok(_) => {}
            }

            let display_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            items.push(SourceItem {
                id: path.display().to_string(),
                display_name,
                path,
            });
        }

        items.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        debug!(count = items.len(), "Local folder scanned");
        Ok(items)
    }
}
