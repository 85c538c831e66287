//! Cloud folder watcher.
//!
//! Polling list of a cloud folder through its files REST API, plus media
//! download into a local temp path so the transcription client can read
//! the recording's bytes.

use crate::{AppError, AppResult, config::WatchConfig, gemini::mime_for_extension, pipeline::SourceItem};

use std::{fs, panic::Location, path::Path};

use error_location::ErrorLocation;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";

/// Watched cloud audio folder.
pub(crate) struct DriveFolder {
    http: reqwest::Client,
    access_token: String,
    folder_id: String,
    watch: WatchConfig,
}

impl DriveFolder {
    /// Creates the watcher over the configured cloud folder.
    pub(crate) fn new(
        http: reqwest::Client,
        access_token: String,
        folder_id: String,
        watch: WatchConfig,
    ) -> Self {
        Self {
            http,
            access_token,
            folder_id,
            watch,
        }
    }

    /// Lists the folder's acceptable audio files.
    ///
    /// The file id — stable across renames — is the item identity the
    /// ledger keys on; the local path is where [`DriveFolder::download`]
    /// will place the bytes.
    #[instrument(skip(self))]
    pub(crate) async fn scan(&self) -> AppResult<Vec<SourceItem>> {
        let query = format!("'{}' in parents and trashed=false", self.folder_id);
        let mime_filter = self.mime_filter();
        let query = if mime_filter.is_empty() {
            query
        } else {
            format!("{query} and ({mime_filter})")
        };

        let response = self
            .http
            .get(DRIVE_API)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                ("pageSize", "100"),
                ("fields", "nextPageToken, files(id, name, mimeType, size)"),
            ])
            .send()
            .await
            .map_err(|e| self.cloud_error(format!("list request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.cloud_error(format!("{status}: {detail}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.cloud_error(format!("malformed list response: {e}")))?;

        let mut items = Vec::new();
        for file in body["files"].as_array().into_iter().flatten() {
            let Some(id) = file["id"].as_str() else { continue };
            let Some(name) = file["name"].as_str() else { continue };

            // Drive returns size as a decimal string.
            let size: u64 = file["size"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if size > self.watch.max_file_size_bytes() {
                warn!(name, size_mb = size / 1024 / 1024, "File too large, skipping");
                continue;
            }

            items.push(SourceItem {
                id: id.to_string(),
                display_name: name.to_string(),
                path: std::env::temp_dir().join(name),
            });
        }

        items.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        debug!(count = items.len(), "Cloud folder scanned");
        Ok(items)
    }

    /// Downloads one file's media bytes to `dest`.
    #[instrument(skip(self))]
    pub(crate) async fn download(&self, file_id: &str, dest: &Path) -> AppResult<()> {
        let url = format!("{DRIVE_API}/{file_id}?alt=media");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| self.cloud_error(format!("download request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.cloud_error(format!("{status}: {detail}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.cloud_error(format!("download body failed: {e}")))?;

        fs::write(dest, &bytes)?;

        info!(file_id, dest = %dest.display(), bytes = bytes.len(), "File downloaded");
        Ok(())
    }

    /// `mimeType='…' or mimeType='…'` clause for the configured extensions.
    fn mime_filter(&self) -> String {
        let mut conditions: Vec<String> = Vec::new();
        for ext in &self.watch.supported_extensions {
            let mime = mime_for_extension(Path::new(&format!("x{ext}")));
            if mime != "application/octet-stream" {
                let condition = format!("mimeType='{mime}'");
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
        }
        conditions.join(" or ")
    }

    #[track_caller]
    fn cloud_error(&self, reason: String) -> AppError {
        AppError::CloudFolder {
            reason,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
