//! Field schema discovery.
//!
//! Reads a sheet's header row and template row and produces the ordered
//! field schema the extractor and committer operate on: one descriptor per
//! column, each either free text or a fixed choice set inferred from the
//! template cell's dropdown validation.

use crate::{
    CoreError, CoreResult,
    sheet::{CellRange, SheetStore, ValidationRule},
};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Whether a field accepts free text or one value from a fixed domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form text.
    Text,
    /// One value from the `choices` domain (spreadsheet dropdown).
    Choice,
}

/// One column of the target sheet.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Unique field name (duplicate headers get `_2`, `_3`, … suffixes).
    pub name: String,
    /// 1-based column position.
    pub column_index: u32,
    /// Text or choice.
    pub kind: FieldKind,
    /// Allowed values; non-empty only for [`FieldKind::Choice`].
    pub choices: Vec<String>,
    /// Raw value observed in the template row, if any.
    pub example_value: Option<String>,
}

/// Ordered field schema of one sheet, bound to the rows it was read from.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Fields in left-to-right column order.
    pub fields: Vec<FieldDescriptor>,
    /// Row the headers were read from.
    pub header_row: u32,
    /// Template/example row the dropdown domains were inferred from; also
    /// the formatting source when the backend duplicates rows.
    pub template_row: u32,
}

impl FieldSchema {
    /// Looks a field up by its (de-duplicated) name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First row that may hold committed data.
    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }
}

/// Reads the field schema from `store`.
///
/// Columns are scanned left to right from column 1; the scan stops at the
/// first blank header cell. A repeated header name receives a numeric
/// suffix in first-seen order so no column is ever dropped. A template cell
/// governed by a parsable list validation makes the field a choice field;
/// anything else, including an unparsable rule, leaves it text.
///
/// # Errors
///
/// Returns [`CoreError::EmptyHeaderRow`] when no header cell is found in
/// column 1, and propagates backend read failures.
#[instrument(skip(store))]
pub async fn read_schema<S: SheetStore + ?Sized>(
    store: &S,
    header_row: u32,
    template_row: u32,
) -> CoreResult<FieldSchema> {
    let caller = ErrorLocation::from(Location::caller());
    let mut fields = Vec::new();
    let mut seen: Vec<(String, u32)> = Vec::new();

    for col in 1u32.. {
        let header = match store.read_cell(header_row, col).await? {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            // Header rows are contiguous; the first blank ends the scan.
            _ => break,
        };

        let name = dedup_name(&mut seen, header);
        let example_value = store
            .read_cell(template_row, col)
            .await?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let choices = match store.validation_for_cell(template_row, col).await? {
            Some(rule) => resolve_choices(store, &rule, &name).await?,
            None => Vec::new(),
        };

        let kind = if choices.is_empty() {
            FieldKind::Text
        } else {
            FieldKind::Choice
        };

        debug!(field = %name, column = col, ?kind, "Schema field read");

        fields.push(FieldDescriptor {
            name,
            column_index: col,
            kind,
            choices,
            example_value,
        });
    }

    if fields.is_empty() {
        return Err(CoreError::EmptyHeaderRow {
            row: header_row,
            location: caller,
        });
    }

    info!(
        sheet = store.source_name(),
        field_count = fields.len(),
        choice_count = fields.iter().filter(|f| f.kind == FieldKind::Choice).count(),
        "Field schema read"
    );

    Ok(FieldSchema {
        fields,
        header_row,
        template_row,
    })
}

/// Resolves a validation rule into its flat choice domain.
///
/// Unparsable rules downgrade the field to text: the warning is logged and
/// an empty domain returned, never an error.
async fn resolve_choices<S: SheetStore + ?Sized>(
    store: &S,
    rule: &ValidationRule,
    field: &str,
) -> CoreResult<Vec<String>> {
    match rule {
        ValidationRule::ListValues(values) => Ok(values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()),
        ValidationRule::ListFormula(formula) => {
            let formula = formula.trim();

            if let Some(inline) = parse_inline_list(formula) {
                return Ok(inline);
            }

            match CellRange::parse(formula) {
                Ok(range) => store.read_range(&range).await,
                Err(_) => {
                    warn!(
                        field,
                        formula, "Unparsable validation rule, treating field as text"
                    );
                    Ok(Vec::new())
                }
            }
        }
    }
}

/// Parses an inline literal list formula (`"Low,Medium,High"`), returning
/// `None` when the formula is not quote-delimited.
fn parse_inline_list(formula: &str) -> Option<Vec<String>> {
    let inner = formula.strip_prefix('"')?.strip_suffix('"')?;
    Some(
        inner
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    )
}

/// Returns a unique name for `header`, appending `_2`, `_3`, … to repeats
/// in first-seen order.
fn dedup_name(seen: &mut Vec<(String, u32)>, header: String) -> String {
    if let Some(entry) = seen.iter_mut().find(|(name, _)| *name == header) {
        entry.1 += 1;
        return format!("{}_{}", header, entry.1);
    }
    seen.push((header.clone(), 1));
    header
}
