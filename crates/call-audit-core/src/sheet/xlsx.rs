//! Local workbook adapter.
//!
//! Edits the target `.xlsx` in place: the workbook is loaded whole, cells
//! are mutated in memory, and [`SheetStore::save`] overwrites the original
//! file. Formatting survives implicitly because untouched cells are never
//! rewritten, so this backend reports `false` from
//! [`SheetStore::duplicate_row_formatting`].

use crate::{
    CoreError, CoreResult,
    sheet::{CellRange, Highlight, SheetStore, ValidationRule},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{info, instrument};
use umya_spreadsheet::{DataValidationValues, Spreadsheet, Worksheet, reader, writer};

/// Fill color for fields flagged by an unsatisfactory evaluation.
const FLAG_FILL: &str = "FFCCCC";

/// Fill color for the automatically computed score cell.
const COMPUTED_FILL: &str = "CCFFCC";

/// [`SheetStore`] over one worksheet of a local `.xlsx` file.
pub struct XlsxWorkbook {
    path: PathBuf,
    source_name: String,
    sheet_name: String,
    book: Spreadsheet,
}

impl XlsxWorkbook {
    /// Opens the workbook at `path`, targeting `worksheet` or the first
    /// sheet when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Workbook`] when the file cannot be read or the
    /// named worksheet does not exist.
    #[track_caller]
    #[instrument]
    pub fn open(path: &Path, worksheet: Option<&str>) -> CoreResult<Self> {
        let book = reader::xlsx::read(path).map_err(|e| CoreError::Workbook {
            path: path.to_path_buf(),
            reason: format!("failed to open: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let sheet_name = match worksheet {
            Some(name) => {
                if book.get_sheet_by_name(name).is_none() {
                    return Err(CoreError::Workbook {
                        path: path.to_path_buf(),
                        reason: format!("worksheet {name:?} not found"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                name.to_string()
            }
            None => book
                .get_sheet(&0)
                .map(|s| s.get_name().to_string())
                .ok_or_else(|| CoreError::Workbook {
                    path: path.to_path_buf(),
                    reason: "workbook has no sheets".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?,
        };

        info!(path = %path.display(), sheet = %sheet_name, "Workbook opened");

        Ok(Self {
            path: path.to_path_buf(),
            source_name: path.display().to_string(),
            sheet_name,
            book,
        })
    }

    #[track_caller]
    fn sheet(&self) -> CoreResult<&Worksheet> {
        self.book
            .get_sheet_by_name(&self.sheet_name)
            .ok_or_else(|| self.missing_sheet())
    }

    #[track_caller]
    fn sheet_mut(&mut self) -> CoreResult<&mut Worksheet> {
        let sheet_name = self.sheet_name.clone();
        let missing = self.missing_sheet();
        self.book
            .get_sheet_by_name_mut(&sheet_name)
            .ok_or(missing)
    }

    #[track_caller]
    fn missing_sheet(&self) -> CoreError {
        CoreError::Workbook {
            path: self.path.clone(),
            reason: format!("worksheet {:?} disappeared", self.sheet_name),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn cell_text(sheet: &Worksheet, row: u32, col: u32) -> Option<String> {
        let cell = sheet.get_cell((col, row))?;

        // Formula cells surface their formula text so callers can apply
        // the never-overwrite-a-formula rule.
        let formula = cell.get_formula();
        if !formula.is_empty() {
            return Some(format!("={}", formula.trim_start_matches('=')));
        }

        let value = cell.get_value().to_string();
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

#[async_trait]
impl SheetStore for XlsxWorkbook {
    async fn read_cell(&self, row: u32, col: u32) -> CoreResult<Option<String>> {
        Ok(Self::cell_text(self.sheet()?, row, col))
    }

    async fn write_cell(&mut self, row: u32, col: u32, value: &str) -> CoreResult<()> {
        self.sheet_mut()?.get_cell_mut((col, row)).set_value(value);
        Ok(())
    }

    async fn write_formula(&mut self, row: u32, col: u32, formula: &str) -> CoreResult<()> {
        self.sheet_mut()?
            .get_cell_mut((col, row))
            .set_formula(formula.trim_start_matches('='));
        Ok(())
    }

    async fn validation_for_cell(&self, row: u32, col: u32) -> CoreResult<Option<ValidationRule>> {
        let sheet = self.sheet()?;
        let Some(validations) = sheet.get_data_validations() else {
            return Ok(None);
        };

        for validation in validations.get_data_validation_list() {
            if *validation.get_type() != DataValidationValues::List {
                continue;
            }
            let formula = validation.get_formula1().trim();
            if formula.is_empty() {
                continue;
            }

            let governs_cell = validation
                .get_sequence_of_references()
                .get_range_collection()
                .iter()
                .any(|range| {
                    CellRange::parse(&range.get_range())
                        .map(|r| r.contains(row, col))
                        .unwrap_or(false)
                });

            if governs_cell {
                return Ok(Some(ValidationRule::ListFormula(formula.to_string())));
            }
        }

        Ok(None)
    }

    async fn read_range(&self, range: &CellRange) -> CoreResult<Vec<String>> {
        let sheet = self.sheet()?;
        let mut values = Vec::new();

        for row in range.start_row..=range.end_row {
            for col in range.start_col..=range.end_col {
                if let Some(text) = Self::cell_text(sheet, row, col) {
                    values.push(text.trim().to_string());
                }
            }
        }

        Ok(values)
    }

    /// A row is empty only when every column up to the sheet's extent is
    /// blank, mirroring how operators leave gaps in hand-maintained
    /// workbooks.
    async fn find_next_empty_row(&self, start_row: u32) -> CoreResult<u32> {
        let sheet = self.sheet()?;
        let (max_col, max_row) = sheet.get_highest_column_and_row();

        for row in start_row..=max_row {
            let empty = (1..=max_col).all(|col| Self::cell_text(sheet, row, col).is_none());
            if empty {
                return Ok(row);
            }
        }

        Ok(max_row.max(start_row - 1) + 1)
    }

    async fn duplicate_row_formatting(
        &mut self,
        _source_row: u32,
        _target_row: u32,
    ) -> CoreResult<bool> {
        // In-place editing keeps the sheet's formatting untouched.
        Ok(false)
    }

    async fn apply_highlight(&mut self, row: u32, col: u32, highlight: Highlight) -> CoreResult<()> {
        let fill = match highlight {
            Highlight::Flagged => FLAG_FILL,
            Highlight::Computed => COMPUTED_FILL,
        };
        self.sheet_mut()?
            .get_style_mut((col, row))
            .set_background_color(fill);
        Ok(())
    }

    fn supports_live_formulas(&self) -> bool {
        false
    }

    async fn save(&mut self) -> CoreResult<()> {
        writer::xlsx::write(&self.book, &self.path).map_err(|e| CoreError::Workbook {
            path: self.path.clone(),
            reason: format!("failed to save: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(path = %self.path.display(), "Workbook saved");
        Ok(())
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}
