//! Per-item processing pipeline.
//!
//! One item flows through: ledger gate → transcription → local transcript
//! save → schema read → field extraction → rubric evaluation → score
//! aggregation → row commit → ledger update. Items are processed strictly
//! one at a time, and this module is the per-item error boundary: nothing
//! escapes into the watch loop. Only a missing transcript or a failed
//! commit aborts an item — everything in between degrades to fallbacks.

use crate::AppResult;

use call_audit_core::{
    EvaluationPolicy, GenerationClient, LedgerEntry, ProcessedLedger, SheetStore, Transcriber,
    aggregate_score, commit, evaluate, extract, read_schema,
};

use std::{fs, path::PathBuf, sync::Arc};

use chrono::Local;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One discovered recording, identified stably for the ledger.
#[derive(Debug, Clone)]
pub(crate) struct SourceItem {
    /// Stable identity: local path or cloud file id.
    pub id: String,
    /// Name shown in logs and written into the sheet's identity column.
    pub display_name: String,
    /// Where the audio bytes can be read from.
    pub path: PathBuf,
}

/// The sequential processing pipeline over one spreadsheet backend.
pub(crate) struct Pipeline<S: SheetStore> {
    pub(crate) transcriber: Arc<dyn Transcriber>,
    pub(crate) generator: Arc<dyn GenerationClient>,
    pub(crate) store: S,
    pub(crate) ledger: ProcessedLedger,
    pub(crate) header_row: u32,
    pub(crate) template_row: u32,
    pub(crate) policy: EvaluationPolicy,
    pub(crate) transcripts_folder: PathBuf,
}

impl<S: SheetStore> Pipeline<S> {
    /// True when the ledger already records an outcome for `item_id`.
    pub(crate) fn is_processed(&self, item_id: &str) -> bool {
        self.ledger.is_processed(item_id)
    }

    /// Ledger counters for startup logging.
    pub(crate) fn ledger_stats(&self) -> call_audit_core::LedgerStats {
        self.ledger.stats()
    }

    /// Processes one item end to end and records the outcome.
    ///
    /// This is the error boundary: failures are logged and recorded in the
    /// ledger, never returned.
    #[instrument(skip(self, item), fields(item = %item.display_name, run_id = %Uuid::new_v4()))]
    pub(crate) async fn process_item(&mut self, item: &SourceItem) {
        if self.ledger.is_processed(&item.id) {
            info!("Already processed, skipping");
            return;
        }

        info!("Processing new recording");

        let Some(transcript) = self.transcriber.transcribe(&item.path).await else {
            self.record(item, false, Some("transcription returned no text".to_string()), None);
            return;
        };

        self.save_transcript(item, &transcript);

        let schema = match read_schema(&self.store, self.header_row, self.template_row).await {
            Ok(schema) => schema,
            Err(e) => {
                error!(error = ?e, "Schema read failed");
                self.record(item, false, Some(format!("schema read failed: {e}")), None);
                return;
            }
        };

        let extracted = extract(self.generator.as_ref(), &transcript, &schema).await;
        let evaluation = evaluate(self.generator.as_ref(), &transcript, self.policy).await;
        let total_score = aggregate_score(&extracted);

        let result = commit(
            &mut self.store,
            &schema,
            &extracted,
            &evaluation,
            total_score,
            None,
            &item.display_name,
        )
        .await;

        if result.success {
            info!(
                row = ?result.row_index,
                fields = result.fields_written,
                total_score,
                "Recording committed"
            );
        } else {
            error!(error = ?result.error, "Commit failed");
        }

        self.record(item, result.success, result.error.clone(), result.row_index);
    }

    /// Records the outcome; a ledger write failure is logged but does not
    /// fail the item — the commit already happened.
    fn record(&mut self, item: &SourceItem, success: bool, error: Option<String>, row: Option<u32>) {
        let entry = LedgerEntry {
            display_name: item.display_name.clone(),
            processed_at: chrono::Utc::now(),
            success,
            error,
            written_row: row,
        };
        if let Err(e) = self.ledger.mark_processed(&item.id, entry) {
            error!(error = ?e, "Failed to persist ledger entry");
        }
    }

    /// Best-effort local transcript copy next to the sheet data.
    fn save_transcript(&self, item: &SourceItem, transcript: &str) {
        if let Err(e) = self.try_save_transcript(item, transcript) {
            warn!(error = ?e, "Failed to save transcript locally");
        }
    }

    fn try_save_transcript(&self, item: &SourceItem, transcript: &str) -> AppResult<()> {
        fs::create_dir_all(&self.transcripts_folder)?;

        let base = item
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.display_name.clone());
        let path = self
            .transcripts_folder
            .join(format!("{base}_transcript.txt"));

        let contents = format!(
            "# Транскрипт\nДата створення: {}\n\n---\n\n{transcript}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        fs::write(&path, contents)?;

        info!(path = %path.display(), "Transcript saved");
        Ok(())
    }
}
