use crate::config::{default_header_row, default_template_row};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Target spreadsheet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Path to the local workbook (local mode).
    #[serde(default)]
    pub workbook_path: Option<PathBuf>,

    /// Cloud spreadsheet identifier (cloud mode).
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Worksheet name; the first sheet when unset.
    #[serde(default)]
    pub worksheet: Option<String>,

    /// OAuth bearer token for the cloud spreadsheet and folder APIs;
    /// overridable via the `CALL_AUDIT_SHEETS_TOKEN` environment variable.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Row holding the field headers.
    #[serde(default = "default_header_row")]
    pub header_row: u32,

    /// Template/example row the dropdown domains and formatting come from.
    #[serde(default = "default_template_row")]
    pub template_row: u32,
}
