//! Configuration management for call-audit.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, lazy validation, and atomic write operations. Secrets can be
//! supplied through environment variables instead of the config file.

use crate::{
    AppError, AppResult,
    config::{EvaluationConfig, GeminiConfig, SheetConfig, WatchConfig},
};

use std::{fs, io::Write, panic::Location, path::PathBuf};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Environment variable overriding the model API key.
const API_KEY_ENV: &str = "CALL_AUDIT_API_KEY";

/// Environment variable overriding the cloud spreadsheet token.
const SHEETS_TOKEN_ENV: &str = "CALL_AUDIT_SHEETS_TOKEN";

/// Which source/backend pair the process runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Local audio folder into a local `.xlsx` workbook.
    Local,
    /// Cloud folder into a cloud spreadsheet.
    Cloud,
}

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source/backend selection.
    pub mode: SourceMode,
    /// Remote model configuration.
    pub gemini: GeminiConfig,
    /// Watched-source settings.
    pub watch: WatchConfig,
    /// Target spreadsheet settings.
    pub sheet: SheetConfig,
    /// Rubric evaluation policy.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Load configuration from disk, creating a default if not found.
    ///
    /// Note: This does NOT validate that the API key or spreadsheet are
    /// usable. Call `validate()` before processing so the process can at
    /// least start and write a template config for the operator to fill.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");

            config
        } else {
            info!("No config found, creating default");
            Self::create_default()?
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Validate that the loaded configuration can actually run.
    ///
    /// Called before component wiring, not at load time, so a fresh
    /// template config can be written for the operator first.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate(&self) -> AppResult<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(self.invalid(format!(
                "Model API key missing. Set [gemini] api_key or the {API_KEY_ENV} variable."
            )));
        }

        match self.mode {
            SourceMode::Local => {
                if self.sheet.workbook_path.is_none() {
                    return Err(self.invalid("Local mode requires [sheet] workbook_path."));
                }
            }
            SourceMode::Cloud => {
                if self.sheet.spreadsheet_id.is_none() {
                    return Err(self.invalid("Cloud mode requires [sheet] spreadsheet_id."));
                }
                if self.watch.drive_folder_id.is_none() {
                    return Err(self.invalid("Cloud mode requires [watch] drive_folder_id."));
                }
                if self.access_token().is_none() {
                    return Err(self.invalid(format!(
                        "Cloud mode requires [sheet] access_token or the {SHEETS_TOKEN_ENV} variable."
                    )));
                }
            }
        }

        Ok(())
    }

    /// The effective cloud API token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.sheet
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!("Model API key taken from environment");
                self.gemini.api_key = key;
            }
        }
        if let Ok(token) = std::env::var(SHEETS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("Sheets token taken from environment");
                self.sheet.access_token = Some(token);
            }
        }
    }

    #[track_caller]
    fn invalid<R: Into<String>>(&self, reason: R) -> AppError {
        AppError::ConfigError {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "call-audit", "Call-Audit").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get config directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let config = Config {
            mode: SourceMode::Local,
            gemini: GeminiConfig {
                api_key: String::new(),
                model: "gemini-2.0-flash".to_string(),
            },
            watch: WatchConfig {
                folder: PathBuf::from("recordings"),
                transcripts_folder: PathBuf::from("transcripts"),
                drive_folder_id: None,
                supported_extensions: crate::config::default_extensions(),
                max_file_size_mb: crate::config::DEFAULT_MAX_FILE_SIZE_MB,
                poll_interval_secs: crate::config::DEFAULT_POLL_INTERVAL_SECS,
                settle_delay_secs: crate::config::DEFAULT_SETTLE_DELAY_SECS,
            },
            sheet: SheetConfig {
                workbook_path: Some(PathBuf::from("report.xlsx")),
                spreadsheet_id: None,
                worksheet: None,
                access_token: None,
                header_row: crate::config::DEFAULT_HEADER_ROW,
                template_row: crate::config::DEFAULT_TEMPLATE_ROW,
            },
            evaluation: EvaluationConfig::default(),
        };

        config.save()?;

        warn!("Default config created. Fill in the API key and sheet settings before processing.");

        Ok(config)
    }
}
