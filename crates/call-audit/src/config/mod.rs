mod config;
mod evaluation_config;
mod gemini_config;
mod sheet_config;
mod watch_config;

pub(crate) use {
    config::{Config, SourceMode},
    evaluation_config::EvaluationConfig,
    gemini_config::GeminiConfig,
    sheet_config::SheetConfig,
    watch_config::WatchConfig,
};

pub(crate) const DEFAULT_HEADER_ROW: u32 = 2;
pub(crate) const DEFAULT_TEMPLATE_ROW: u32 = 3;
pub(crate) const DEFAULT_MAX_FILE_SIZE_MB: u64 = 20;
pub(crate) const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub(crate) const DEFAULT_SETTLE_DELAY_SECS: u64 = 2;

pub(crate) fn default_header_row() -> u32 {
    DEFAULT_HEADER_ROW
}

pub(crate) fn default_template_row() -> u32 {
    DEFAULT_TEMPLATE_ROW
}

pub(crate) fn default_max_file_size_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

pub(crate) fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

pub(crate) fn default_settle_delay_secs() -> u64 {
    DEFAULT_SETTLE_DELAY_SECS
}

pub(crate) fn default_extensions() -> Vec<String> {
    [".mp3", ".wav", ".m4a", ".aac", ".ogg"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

pub(crate) fn default_fail_open() -> bool {
    true
}
