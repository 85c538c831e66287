//! Abstract spreadsheet capability.
//!
//! The engine is written against [`SheetStore`]; the two concrete backends
//! (in-place `.xlsx` workbook, cloud spreadsheet REST service) implement it
//! as adapters so that schema discovery and row committing are never
//! duplicated per backend.

mod cloud;
mod xlsx;

pub use {cloud::CloudSheet, xlsx::XlsxWorkbook};

use crate::{CoreError, CoreResult};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;

/// Visual emphasis applied to a written cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// The value needs operator attention (comment fields on a poor call).
    Flagged,
    /// The value was derived automatically (the computed score).
    Computed,
}

/// A single-choice data-validation rule governing a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Raw list formula as stored by the backend: either an inline literal
    /// list (`"Low,Medium,High"`, quotes included) or a range reference
    /// (`D1:D10`).
    ListFormula(String),
    /// Domain already enumerated by the backend.
    ListValues(Vec<String>),
}

/// One rectangular cell range in a sheet, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// First column of the range.
    pub start_col: u32,
    /// First row of the range.
    pub start_row: u32,
    /// Last column of the range.
    pub end_col: u32,
    /// Last row of the range.
    pub end_row: u32,
}

impl CellRange {
    /// Parses an A1-notation reference such as `D1:D10`, `$A$1:$B$3`,
    /// `Sheet1!C2:C9`, or a single cell `D4`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedRange`] when the reference cannot be
    /// parsed.
    #[track_caller]
    pub fn parse(reference: &str) -> CoreResult<Self> {
        // A sheet-qualified reference keeps only the cell part; the engine
        // never resolves ranges across sheets.
        let cells = reference
            .rsplit('!')
            .next()
            .unwrap_or(reference)
            .trim()
            .replace('$', "");

        let mut parts = cells.splitn(2, ':');
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or(first);

        let (start_col, start_row) = parse_cell_ref(first).ok_or_else(|| malformed(reference))?;
        let (end_col, end_row) = parse_cell_ref(second).ok_or_else(|| malformed(reference))?;

        if start_col > end_col || start_row > end_row {
            return Err(malformed(reference));
        }

        Ok(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    /// True when the cell at `(row, col)` lies inside the range.
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }
}

#[track_caller]
fn malformed(reference: &str) -> CoreError {
    CoreError::MalformedRange {
        reference: reference.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Converts a 1-based column index to its letter form (1 → `A`, 27 → `AA`).
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn parse_cell_ref(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim();
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }

    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some((col, row))
}

/// The abstract spreadsheet a processing run reads from and commits into.
///
/// Rows and columns are 1-based throughout. Implementations may buffer
/// writes; [`SheetStore::save`] makes all pending changes durable.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Reads one cell; `None` when the cell is blank or absent.
    ///
    /// For a cell holding a live formula the formula text (leading `=`)
    /// is returned, so callers can recognize formula-bearing cells.
    async fn read_cell(&self, row: u32, col: u32) -> CoreResult<Option<String>>;

    /// Writes a literal value into one cell.
    async fn write_cell(&mut self, row: u32, col: u32, value: &str) -> CoreResult<()>;

    /// Writes an evaluable formula (text beginning with `=`) into one cell.
    async fn write_formula(&mut self, row: u32, col: u32, formula: &str) -> CoreResult<()>;

    /// Returns the single-choice validation rule governing a cell, if any.
    async fn validation_for_cell(&self, row: u32, col: u32) -> CoreResult<Option<ValidationRule>>;

    /// Enumerates a range's non-blank cell values in row-major order,
    /// stringified and trimmed.
    async fn read_range(&self, range: &CellRange) -> CoreResult<Vec<String>>;

    /// Finds the first empty row at or after `start_row`.
    ///
    /// Each backend decides what "empty" means (the local workbook checks
    /// every column, the cloud backend a fixed leading prefix). When every
    /// populated row is full the row after the last one is returned.
    async fn find_next_empty_row(&self, start_row: u32) -> CoreResult<u32>;

    /// Duplicates the template row's formatting, data validation, and
    /// conditional formatting onto `target_row`, clearing any literal
    /// values the duplication copied.
    ///
    /// Returns `false` when the backend preserves formatting implicitly
    /// (the in-place workbook) and no duplication was performed.
    async fn duplicate_row_formatting(&mut self, source_row: u32, target_row: u32)
    -> CoreResult<bool>;

    /// Applies a visual highlight to one cell. Backends whose highlighting
    /// comes from duplicated conditional formatting may ignore this.
    async fn apply_highlight(&mut self, row: u32, col: u32, highlight: Highlight)
    -> CoreResult<()>;

    /// True when the backend evaluates formulas entered into cells, so the
    /// committer writes the score as a live sum instead of a literal.
    fn supports_live_formulas(&self) -> bool;

    /// Persists all pending changes.
    async fn save(&mut self) -> CoreResult<()>;

    /// Human-readable identity of the backing sheet, for logs.
    fn source_name(&self) -> &str;
}
