use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Engine errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Header row contained no usable field names.
    #[error("Header row {row} is empty or unreadable {location}")]
    EmptyHeaderRow {
        /// The header row that was scanned.
        row: u32,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Workbook file could not be opened, read, or saved.
    #[error("Workbook error for {path:?}: {reason} {location}")]
    Workbook {
        /// Path to the workbook file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Cloud spreadsheet API request failed.
    #[error("Spreadsheet API error: {reason} {location}")]
    SheetApi {
        /// Description of the API failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An A1-notation cell or range reference could not be parsed.
    #[error("Malformed range reference: {reference} {location}")]
    MalformedRange {
        /// The offending reference text.
        reference: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Ledger file could not be serialized or written.
    #[error("Ledger error: {reason} {location}")]
    Ledger {
        /// Description of the ledger failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Row commit failed.
    #[error("Commit failed: {reason} {location}")]
    Commit {
        /// Description of the commit failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
