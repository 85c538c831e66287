use crate::config::{
    default_extensions, default_max_file_size_mb, default_poll_interval_secs,
    default_settle_delay_secs,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Watched-source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Local folder with audio recordings (local mode).
    pub folder: PathBuf,

    /// Folder where transcript text files are saved.
    pub transcripts_folder: PathBuf,

    /// Cloud folder identifier (cloud mode).
    #[serde(default)]
    pub drive_folder_id: Option<String>,

    /// Audio extensions that are picked up, with leading dots.
    #[serde(default = "default_extensions")]
    pub supported_extensions: Vec<String>,

    /// Files above this size are skipped.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Seconds between folder scans.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds to wait after first sighting a file so an in-flight copy
    /// finishes before it is read.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl WatchConfig {
    /// Maximum accepted file size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// True when `path` has one of the supported audio extensions.
    pub fn extension_supported(&self, path: &std::path::Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.supported_extensions
            .iter()
            .any(|e| e.to_lowercase() == dotted)
    }
}
