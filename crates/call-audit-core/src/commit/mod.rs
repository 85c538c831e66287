//! Row committing.
//!
//! Takes one run's extracted values plus its evaluation and writes a single
//! sheet row: locate (or accept) the target row, duplicate the template
//! row's formatting where the backend needs it, write every non-skipped
//! field, fill the identity column, and place the score as a literal or a
//! live formula. Any failure inside the commit is caught and reported in
//! [`CommitResult`] — it never unwinds into the calling pipeline.

use crate::{
    CoreError, CoreResult,
    extract::ExtractedValue,
    schema::{FieldDescriptor, FieldSchema},
    score::EvaluationResult,
    sheet::{Highlight, SheetStore},
};

use std::{collections::HashMap, panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Header keywords marking the score column (never overwritten by field
/// values — it may carry a formula).
const SCORE_KEYWORDS: &[&str] = &["оцінка", "оценка", "score", "rating", "бал"];

/// Cell contents marking a column the operators fill by hand.
const SKIP_MARKERS: &[&str] = &["пропускаємо", "пропускаем"];

/// Header keywords for the source-item identity column.
const FILENAME_KEYWORDS: &[&str] = &["назва файлу", "название файла", "filename", "file name", "файл"];

/// Header keywords for fields highlighted on an unsatisfactory call.
const COMMENT_KEYWORDS: &[&str] = &["коментар", "comment", "примітка", "заувага"];

/// Column letters summed by the live score formula; fixed by the report
/// sheet's layout.
const SCORE_FORMULA_COLUMNS: &[&str] = &["F", "G", "H", "I", "J", "K", "M", "O"];

/// Outcome of one commit attempt.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// `true` when at least one field was written and the sheet saved.
    pub success: bool,
    /// The row that was written, when one was located.
    pub row_index: Option<u32>,
    /// Number of cells written (field values, identity, score).
    pub fields_written: u32,
    /// Failure description when `success` is `false`.
    pub error: Option<String>,
}

/// Commits one processed item into the sheet.
///
/// `target_row` pins the row when the caller already owns one; otherwise
/// the first empty row after the header is claimed. `source_label` is the
/// item's path or display name; its base name fills the identity column.
#[instrument(skip(store, schema, extracted, evaluation), fields(sheet = store.source_name()))]
pub async fn commit<S: SheetStore + ?Sized>(
    store: &mut S,
    schema: &FieldSchema,
    extracted: &HashMap<String, ExtractedValue>,
    evaluation: &EvaluationResult,
    total_score: u32,
    target_row: Option<u32>,
    source_label: &str,
) -> CommitResult {
    match try_commit(
        store,
        schema,
        extracted,
        evaluation,
        total_score,
        target_row,
        source_label,
    )
    .await
    {
        Ok((row, fields_written)) => {
            info!(row, fields_written, "Row committed");
            CommitResult {
                success: fields_written > 0,
                row_index: Some(row),
                fields_written,
                error: (fields_written == 0).then(|| "no fields were written".to_string()),
            }
        }
        Err(e) => {
            warn!(error = %e, "Commit failed");
            CommitResult {
                success: false,
                row_index: target_row,
                fields_written: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn try_commit<S: SheetStore + ?Sized>(
    store: &mut S,
    schema: &FieldSchema,
    extracted: &HashMap<String, ExtractedValue>,
    evaluation: &EvaluationResult,
    total_score: u32,
    target_row: Option<u32>,
    source_label: &str,
) -> CoreResult<(u32, u32)> {
    let row = match target_row {
        Some(row) => row,
        None => store.find_next_empty_row(schema.first_data_row()).await?,
    };

    if store
        .duplicate_row_formatting(schema.template_row, row)
        .await?
    {
        debug!(
            template = schema.template_row,
            row, "Template row formatting duplicated"
        );
    }

    let mut fields_written = 0u32;

    for field in &schema.fields {
        let Some(value) = extracted.get(&field.name) else {
            continue;
        };
        let text = value.as_str();
        if text.is_empty() {
            continue;
        }

        if should_skip(store, field, row).await? {
            debug!(field = %field.name, row, "Field skipped");
            continue;
        }

        store.write_cell(row, field.column_index, text).await?;
        fields_written += 1;

        if !evaluation.is_satisfactory && is_comment_field(&field.name) {
            store
                .apply_highlight(row, field.column_index, Highlight::Flagged)
                .await?;
        }
    }

    fields_written += write_identity(store, schema, row, source_label).await?;
    fields_written += write_score(store, schema, row, total_score).await?;

    store.save().await.map_err(|e| CoreError::Commit {
        reason: format!("save failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok((row, fields_written))
}

/// A field is skipped when its header is the score column, or its target
/// cell carries a skip marker or a formula.
async fn should_skip<S: SheetStore + ?Sized>(
    store: &S,
    field: &FieldDescriptor,
    row: u32,
) -> CoreResult<bool> {
    if contains_any(&field.name, SCORE_KEYWORDS) {
        return Ok(true);
    }
    cell_is_protected(store, row, field.column_index).await
}

/// Skip-marker and formula checks for a single destination cell.
async fn cell_is_protected<S: SheetStore + ?Sized>(
    store: &S,
    row: u32,
    col: u32,
) -> CoreResult<bool> {
    let Some(current) = store.read_cell(row, col).await? else {
        return Ok(false);
    };
    Ok(contains_any(&current, SKIP_MARKERS) || current.starts_with('='))
}

/// Writes the source item's base name into the identity column, if one
/// exists in the schema.
async fn write_identity<S: SheetStore + ?Sized>(
    store: &mut S,
    schema: &FieldSchema,
    row: u32,
    source_label: &str,
) -> CoreResult<u32> {
    let Some(field) = schema
        .fields
        .iter()
        .find(|f| contains_any(&f.name, FILENAME_KEYWORDS))
    else {
        return Ok(0);
    };

    let base = Path::new(source_label)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_label.to_string());

    store.write_cell(row, field.column_index, &base).await?;
    debug!(field = %field.name, value = %base, "Identity column written");
    Ok(1)
}

/// Writes the computed score — a live sum formula where the backend
/// evaluates formulas, a literal elsewhere.
async fn write_score<S: SheetStore + ?Sized>(
    store: &mut S,
    schema: &FieldSchema,
    row: u32,
    total_score: u32,
) -> CoreResult<u32> {
    let Some(field) = schema
        .fields
        .iter()
        .find(|f| contains_any(&f.name, SCORE_KEYWORDS))
    else {
        return Ok(0);
    };

    if cell_is_protected(store, row, field.column_index).await? {
        debug!(field = %field.name, "Score cell protected, leaving as-is");
        return Ok(0);
    }

    if store.supports_live_formulas() {
        let formula = score_formula(row);
        store
            .write_formula(row, field.column_index, &formula)
            .await?;
        debug!(field = %field.name, %formula, "Score formula written");
    } else {
        store
            .write_cell(row, field.column_index, &total_score.to_string())
            .await?;
        store
            .apply_highlight(row, field.column_index, Highlight::Computed)
            .await?;
        debug!(field = %field.name, total_score, "Score literal written");
    }

    Ok(1)
}

/// Live sum over the fixed score columns of `row`, e.g. `=F7+G7+…+O7`.
fn score_formula(row: u32) -> String {
    let terms = SCORE_FORMULA_COLUMNS
        .iter()
        .map(|col| format!("{col}{row}"))
        .collect::<Vec<_>>()
        .join("+");
    format!("={terms}")
}

fn is_comment_field(name: &str) -> bool {
    contains_any(name, COMMENT_KEYWORDS)
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}
