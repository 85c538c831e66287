//! Deduplication ledger.
//!
//! A JSON document on disk mapping source-item identity (file path or cloud
//! file id) to its last processing outcome. The ledger is the sole source
//! of truth for "already processed": it gates every item before
//! transcription starts and is rewritten and flushed after every mutation,
//! so a crash between items leaves it consistent with completed work.
//! Entries are never dropped automatically — removing one is the operator's
//! retry mechanism.

use crate::{CoreError, CoreResult};

use std::{
    collections::HashMap,
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Outcome of one processing attempt for one source item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Human-readable item name for logs and stats.
    pub display_name: String,
    /// When the attempt finished.
    pub processed_at: DateTime<Utc>,
    /// Whether the item was committed successfully.
    pub success: bool,
    /// Failure description for unsuccessful attempts.
    pub error: Option<String>,
    /// Sheet row the item was written to, on success.
    pub written_row: Option<u32>,
}

/// Processing counters derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    /// All recorded attempts.
    pub total: usize,
    /// Attempts that committed a row.
    pub successful: usize,
    /// Attempts that failed.
    pub failed: usize,
}

/// Persistent item-identity → outcome map.
#[derive(Debug)]
pub struct ProcessedLedger {
    path: PathBuf,
    entries: HashMap<String, LedgerEntry>,
}

impl ProcessedLedger {
    /// Opens the ledger at `path`, starting empty when the file is missing.
    ///
    /// A corrupt ledger file is logged and replaced with an empty ledger
    /// rather than blocking processing; the bad file is overwritten on the
    /// next mutation.
    #[instrument]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, LedgerEntry>>(&contents) {
                Ok(entries) => {
                    info!(count = entries.len(), "Ledger loaded");
                    entries
                }
                Err(e) => {
                    warn!(error = %e, "Corrupt ledger file, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => {
                info!("No ledger file found, starting empty");
                HashMap::new()
            }
        };

        Self { path, entries }
    }

    /// True when `item_id` has a recorded outcome (success or failure).
    pub fn is_processed(&self, item_id: &str) -> bool {
        self.entries.contains_key(item_id)
    }

    /// Returns the recorded outcome for `item_id`, if any.
    pub fn entry(&self, item_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(item_id)
    }

    /// Records (or overwrites) the outcome of a processing attempt and
    /// flushes the ledger to disk.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Ledger`] when the file cannot be written; the
    /// in-memory entry is kept either way.
    #[track_caller]
    #[instrument(skip(self, entry))]
    pub fn mark_processed(&mut self, item_id: &str, entry: LedgerEntry) -> CoreResult<()> {
        info!(
            item = %entry.display_name,
            success = entry.success,
            row = ?entry.written_row,
            "Item recorded in ledger"
        );
        self.entries.insert(item_id.to_string(), entry);
        self.persist()
    }

    /// Removes one entry so the item will be reprocessed on the next scan.
    #[track_caller]
    pub fn remove(&mut self, item_id: &str) -> CoreResult<bool> {
        match self.entries.remove(item_id) {
            Some(entry) => {
                info!(item = %entry.display_name, "Entry removed from ledger");
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Clears the entire ledger.
    #[track_caller]
    pub fn clear(&mut self) -> CoreResult<()> {
        self.entries.clear();
        info!("Ledger cleared");
        self.persist()
    }

    /// Processing counters for startup logging.
    pub fn stats(&self) -> LedgerStats {
        let successful = self.entries.values().filter(|e| e.success).count();
        LedgerStats {
            total: self.entries.len(),
            successful,
            failed: self.entries.len() - successful,
        }
    }

    /// Rewrites the ledger file wholesale, write-then-rename so a crash
    /// mid-write never corrupts the previous state.
    #[track_caller]
    fn persist(&self) -> CoreResult<()> {
        let contents =
            serde_json::to_string_pretty(&self.entries).map_err(|e| CoreError::Ledger {
                reason: format!("serialization failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let temp_path = self.path.with_extension("json.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| CoreError::Ledger {
            reason: format!("failed to create {}: {e}", temp_path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| CoreError::Ledger {
                reason: format!("failed to write {}: {e}", temp_path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| CoreError::Ledger {
            reason: format!("failed to sync {}: {e}", temp_path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| CoreError::Ledger {
            reason: format!("failed to replace {}: {e}", self.path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(count = self.entries.len(), "Ledger persisted");
        Ok(())
    }
}
