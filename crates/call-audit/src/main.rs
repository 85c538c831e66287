//! Call-audit: watches a folder of call recordings, transcribes each one,
//! extracts the review-sheet fields, scores the call, and commits a row
//! into the report spreadsheet.

mod app;
mod config;
mod drive;
mod error;
mod gemini;
mod pipeline;
#[cfg(test)]
mod tests;
mod watcher;

pub(crate) use {
    app::{App, ItemSource},
    drive::DriveFolder,
    error::{AppError, Result as AppResult},
    gemini::GeminiClient,
    pipeline::Pipeline,
    watcher::LocalFolder,
};

use crate::config::{Config, SourceMode};

use call_audit_core::{
    CloudSheet, EvaluationPolicy, GenerationClient, ProcessedLedger, Transcriber, XlsxWorkbook,
};

use std::{fs, panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tracing::error;

/// Ledger file for the local-folder source.
const LOCAL_LEDGER_FILE: &str = "processed_files.json";

/// Ledger file for the cloud-folder source; independent from the local one.
const CLOUD_LEDGER_FILE: &str = "processed_files_drive.json";

/// Application entry point.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("call_audit=debug,call_audit_core=debug")
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:?}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AppResult<()> {
    let client = Arc::new(GeminiClient::new(
        &config.gemini.api_key,
        &config.gemini.model,
    )?);

    fs::create_dir_all(&config.watch.transcripts_folder)?;

    let poll_interval = Duration::from_secs(config.watch.poll_interval_secs);
    let settle_delay = Duration::from_secs(config.watch.settle_delay_secs);
    let policy = EvaluationPolicy {
        fail_open: config.evaluation.fail_open,
    };

    match config.mode {
        SourceMode::Local => {
            fs::create_dir_all(&config.watch.folder)?;

            let workbook_path = config
                .sheet
                .workbook_path
                .clone()
                .ok_or_else(|| missing_setting("[sheet] workbook_path"))?;
            let store = XlsxWorkbook::open(&workbook_path, config.sheet.worksheet.as_deref())?;

            let app = App {
                pipeline: Pipeline {
                    transcriber: Arc::clone(&client) as Arc<dyn Transcriber>,
                    generator: client as Arc<dyn GenerationClient>,
                    store,
                    ledger: ProcessedLedger::open(LOCAL_LEDGER_FILE),
                    header_row: config.sheet.header_row,
                    template_row: config.sheet.template_row,
                    policy,
                    transcripts_folder: config.watch.transcripts_folder.clone(),
                },
                source: ItemSource::Local(LocalFolder::new(config.watch)),
                poll_interval,
                settle_delay,
            };

            app.run().await
        }
        SourceMode::Cloud => {
            let token = config
                .access_token()
                .ok_or_else(|| missing_setting("[sheet] access_token"))?;
            let spreadsheet_id = config
                .sheet
                .spreadsheet_id
                .clone()
                .ok_or_else(|| missing_setting("[sheet] spreadsheet_id"))?;
            let folder_id = config
                .watch
                .drive_folder_id
                .clone()
                .ok_or_else(|| missing_setting("[watch] drive_folder_id"))?;

            let http = reqwest::Client::builder()
                .build()
                .map_err(|e| AppError::CloudFolder {
                    reason: format!("Failed to build HTTP client: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let store = CloudSheet::connect(
                http.clone(),
                &spreadsheet_id,
                config.sheet.worksheet.as_deref(),
                &token,
            )
            .await?;

            let app = App {
                pipeline: Pipeline {
                    transcriber: Arc::clone(&client) as Arc<dyn Transcriber>,
                    generator: client as Arc<dyn GenerationClient>,
                    store,
                    ledger: ProcessedLedger::open(CLOUD_LEDGER_FILE),
                    header_row: config.sheet.header_row,
                    template_row: config.sheet.template_row,
                    policy,
                    transcripts_folder: config.watch.transcripts_folder.clone(),
                },
                source: ItemSource::Cloud(DriveFolder::new(http, token, folder_id, config.watch)),
                poll_interval,
                settle_delay,
            };

            app.run().await
        }
    }
}

#[track_caller]
fn missing_setting(name: &str) -> AppError {
    AppError::ConfigError {
        reason: format!("{name} is required but missing"),
        location: ErrorLocation::from(Location::caller()),
    }
}
