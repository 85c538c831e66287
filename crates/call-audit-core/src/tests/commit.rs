use crate::{
    EvaluationResult, ExtractedKind, ExtractedValue, FieldDescriptor, FieldKind, FieldSchema,
    Highlight, RubricScores, commit, tests::support::MemorySheet,
};

use std::collections::HashMap;

fn schema_of(headers: &[&str]) -> FieldSchema {
    FieldSchema {
        fields: headers
            .iter()
            .enumerate()
            .map(|(i, name)| FieldDescriptor {
                name: name.to_string(),
                column_index: i as u32 + 1,
                kind: FieldKind::Text,
                choices: Vec::new(),
                example_value: None,
            })
            .collect(),
        header_row: 2,
        template_row: 3,
    }
}

fn sheet_for(schema: &FieldSchema) -> MemorySheet {
    let mut sheet = MemorySheet::default();
    for field in &schema.fields {
        sheet.set(schema.header_row, field.column_index, &field.name);
    }
    sheet
}

fn extracted_of(pairs: &[(&str, &str)]) -> HashMap<String, ExtractedValue> {
    pairs
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                ExtractedValue {
                    value: Some(value.to_string()),
                    kind: ExtractedKind::Text,
                },
            )
        })
        .collect()
}

fn evaluation(is_satisfactory: bool) -> EvaluationResult {
    EvaluationResult {
        scores: RubricScores::default(),
        total: 0,
        narrative: String::new(),
        recommendation: String::new(),
        is_satisfactory,
    }
}

/// WHAT: A skip-marked cell is never overwritten
/// WHY: Operators reserve columns by writing the skip marker into them
#[tokio::test]
async fn given_skip_marker_cell_when_committing_then_cell_untouched() {
    // Given: The target cell for Статус carries the skip marker
    let schema = schema_of(&["Статус", "Коментар"]);
    let mut sheet = sheet_for(&schema);
    sheet.set(4, 1, "пропускаємо це поле");
    let extracted = extracted_of(&[("Статус", "Закрито"), ("Коментар", "ок")]);

    // When: Committing into row 4
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        Some(4),
        "call.mp3",
    )
    .await;

    // Then: The marked cell keeps its marker, the other field is written
    assert!(result.success);
    assert_eq!(sheet.get(4, 1).unwrap(), "пропускаємо це поле");
    assert_eq!(sheet.get(4, 2).unwrap(), "ок");
}

/// WHAT: A formula-bearing cell is never overwritten
/// WHY: Live formulas in the sheet must survive every commit
#[tokio::test]
async fn given_formula_cell_when_committing_then_cell_untouched() {
    // Given: The target cell holds a formula
    let schema = schema_of(&["Статус"]);
    let mut sheet = sheet_for(&schema);
    sheet.set(4, 1, "=SUM(F4:O4)");
    let extracted = extracted_of(&[("Статус", "Закрито")]);

    // When: Committing into row 4
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        Some(4),
        "call.mp3",
    )
    .await;

    // Then: The formula survives and nothing else was written
    assert_eq!(sheet.get(4, 1).unwrap(), "=SUM(F4:O4)");
    assert!(!result.success);
}

/// WHAT: The score column receives the computed total, not the field value
/// WHY: Extracted text must never leak into the score cell
#[tokio::test]
async fn given_score_column_when_committing_then_total_written() {
    // Given: A schema with a score column and a junk extracted value for it
    let schema = schema_of(&["Статус", "Оцінка"]);
    let mut sheet = sheet_for(&schema);
    let extracted = extracted_of(&[("Статус", "Закрито"), ("Оцінка", "junk")]);

    // When: Committing with a total of 6
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        6,
        Some(4),
        "call.mp3",
    )
    .await;

    // Then: The score cell holds the literal total with a computed highlight
    assert!(result.success);
    assert_eq!(sheet.get(4, 2).unwrap(), "6");
    assert!(
        sheet
            .highlights
            .lock()
            .unwrap()
            .contains(&(4, 2, Highlight::Computed))
    );
}

/// WHAT: A formula-capable backend gets a live sum instead of a literal
/// WHY: The sheet's score should keep recalculating after manual edits
#[tokio::test]
async fn given_live_formula_backend_when_committing_then_formula_written() {
    // Given: A backend that evaluates formulas
    let schema = schema_of(&["Статус", "Оцінка"]);
    let mut sheet = sheet_for(&schema);
    sheet.live_formulas = true;
    let extracted = extracted_of(&[("Статус", "Закрито")]);

    // When: Committing into row 7
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        6,
        Some(7),
        "call.mp3",
    )
    .await;

    // Then: The score cell holds the fixed-column sum formula
    assert!(result.success);
    assert_eq!(sheet.get(7, 2).unwrap(), "=F7+G7+H7+I7+J7+K7+M7+O7");
}

/// WHAT: Comment fields are flagged on an unsatisfactory call
/// WHY: Reviewers find problem calls by the highlighted comments
#[tokio::test]
async fn given_unsatisfactory_call_when_committing_then_comment_flagged() {
    // Given: An unsatisfactory evaluation and a comment field
    let schema = schema_of(&["Статус", "Коментар менеджера"]);
    let mut sheet = sheet_for(&schema);
    let extracted = extracted_of(&[("Статус", "Закрито"), ("Коментар менеджера", "грубість")]);

    // When: Committing
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(false),
        0,
        Some(4),
        "call.mp3",
    )
    .await;

    // Then: The comment cell carries the flag highlight
    assert!(result.success);
    assert!(
        sheet
            .highlights
            .lock()
            .unwrap()
            .contains(&(4, 2, Highlight::Flagged))
    );
}

/// WHAT: Satisfactory calls leave comment fields unhighlighted
/// WHY: Highlights must mean something; a passing call gets none
#[tokio::test]
async fn given_satisfactory_call_when_committing_then_no_flag() {
    // Given: A satisfactory evaluation
    let schema = schema_of(&["Коментар"]);
    let mut sheet = sheet_for(&schema);
    let extracted = extracted_of(&[("Коментар", "все добре")]);

    // When: Committing
    let _ = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        Some(4),
        "call.mp3",
    )
    .await;

    // Then: No highlights were applied
    assert_eq!(sheet.highlight_count(), 0);
}

/// WHAT: The identity column receives the item's base name
/// WHY: Reviewers trace a row back to its recording by file name
#[tokio::test]
async fn given_filename_column_when_committing_then_base_name_written() {
    // Given: A schema with a filename column
    let schema = schema_of(&["Назва файлу", "Статус"]);
    let mut sheet = sheet_for(&schema);
    let extracted = extracted_of(&[("Статус", "Закрито")]);

    // When: Committing an item with a full path label
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        Some(4),
        "/records/call 2024-01-05.mp3",
    )
    .await;

    // Then: The base name without path and extension is written
    assert!(result.success);
    assert_eq!(sheet.get(4, 1).unwrap(), "call 2024-01-05");
}

/// WHAT: Without a target row the first empty row is claimed
/// WHY: New items append after existing data, reusing gaps
#[tokio::test]
async fn given_no_target_row_when_committing_then_first_empty_row_used() {
    // Given: Rows 3 and 4 already populated
    let schema = schema_of(&["Статус"]);
    let mut sheet = sheet_for(&schema);
    sheet.set(3, 1, "приклад");
    sheet.set(4, 1, "Відкрито");
    let extracted = extracted_of(&[("Статус", "Закрито")]);

    // When: Committing without a target row
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        None,
        "call.mp3",
    )
    .await;

    // Then: Row 5 was claimed and written
    assert_eq!(result.row_index, Some(5));
    assert_eq!(sheet.get(5, 1).unwrap(), "Закрито");
}

/// WHAT: End-to-end commit of an extracted row reports success
/// WHY: The minimal Name/Status scenario exercises the whole write path
#[tokio::test]
async fn given_name_and_status_when_committing_then_row_populated() {
    // Given: The minimal two-field schema and extraction result
    let schema = schema_of(&["Name", "Status"]);
    let mut sheet = sheet_for(&schema);
    let extracted = extracted_of(&[("Name", "не вказано"), ("Status", "Closed")]);

    // When: Committing
    let result = commit(
        &mut sheet,
        &schema,
        &extracted,
        &evaluation(true),
        0,
        None,
        "call.mp3",
    )
    .await;

    // Then: Both cells of the new row are populated
    assert!(result.success);
    let row = result.row_index.unwrap();
    assert_eq!(sheet.get(row, 1).unwrap(), "не вказано");
    assert_eq!(sheet.get(row, 2).unwrap(), "Closed");
    assert_eq!(sheet.saves.load(std::sync::atomic::Ordering::SeqCst), 1);
}
