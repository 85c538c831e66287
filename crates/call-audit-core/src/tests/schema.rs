use crate::{
    CoreError, FieldKind, read_schema,
    sheet::ValidationRule,
    tests::support::MemorySheet,
};

fn sheet_with_headers(headers: &[&str]) -> MemorySheet {
    let mut sheet = MemorySheet::default();
    for (i, header) in headers.iter().enumerate() {
        sheet.set(2, i as u32 + 1, header);
    }
    sheet
}

/// WHAT: Duplicate header names receive numeric suffixes in first-seen order
/// WHY: No column may be silently dropped when operators repeat a header
#[tokio::test]
async fn given_duplicate_headers_when_reading_schema_then_names_suffixed() {
    // Given: A header row repeating the same name three times
    let sheet = sheet_with_headers(&["X", "X", "X"]);

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: Names are unique with suffixes in first-seen order
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["X", "X_2", "X_3"]);
    let columns: Vec<u32> = schema.fields.iter().map(|f| f.column_index).collect();
    assert_eq!(columns, [1, 2, 3]);
}

/// WHAT: The header scan stops at the first blank cell
/// WHY: Header rows are contiguous; columns past a gap belong to other data
#[tokio::test]
async fn given_blank_header_cell_when_reading_schema_then_scan_stops() {
    // Given: Headers A, B, a blank, then C
    let mut sheet = sheet_with_headers(&["A", "B"]);
    sheet.set(2, 4, "C");

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: Only A and B are retained
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
}

/// WHAT: An inline literal list validation becomes a choice domain
/// WHY: Dropdown domains steer extraction toward valid values
#[tokio::test]
async fn given_inline_list_validation_when_reading_schema_then_choice_domain_parsed() {
    // Given: A field whose template cell carries a quoted literal list
    let mut sheet = sheet_with_headers(&["Priority"]);
    sheet.set_validation(
        3,
        1,
        ValidationRule::ListFormula("\"Low, Medium,High\"".to_string()),
    );

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: The field is a choice field with the trimmed domain
    let field = &schema.fields[0];
    assert_eq!(field.kind, FieldKind::Choice);
    assert_eq!(field.choices, ["Low", "Medium", "High"]);
}

/// WHAT: A range-reference validation is resolved by reading its cells
/// WHY: Sheets often keep dropdown domains in a side column
#[tokio::test]
async fn given_range_validation_when_reading_schema_then_domain_read_from_cells() {
    // Given: A validation referencing D1:D4, with one blank cell inside
    let mut sheet = sheet_with_headers(&["Status"]);
    sheet.set(1, 4, "Open");
    sheet.set(2, 4, "  Closed ");
    sheet.set(4, 4, "Pending");
    sheet.set_validation(3, 1, ValidationRule::ListFormula("D1:D4".to_string()));

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: The domain holds the trimmed non-blank cells in row-major order
    assert_eq!(schema.fields[0].choices, ["Open", "Closed", "Pending"]);
}

/// WHAT: An unparsable validation downgrades the field to text
/// WHY: One malformed rule must not abort the whole schema read
#[tokio::test]
async fn given_malformed_validation_when_reading_schema_then_field_downgraded_to_text() {
    // Given: A validation formula that is neither a literal list nor a range
    let mut sheet = sheet_with_headers(&["Status", "Notes"]);
    sheet.set_validation(
        3,
        1,
        ValidationRule::ListFormula("INDIRECT(bad!)".to_string()),
    );

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: The field is text and the scan continued past it
    assert_eq!(schema.fields[0].kind, FieldKind::Text);
    assert!(schema.fields[0].choices.is_empty());
    assert_eq!(schema.fields.len(), 2);
}

/// WHAT: Backend-enumerated domains are used as-is
/// WHY: The cloud backend returns dropdown values directly, not a formula
#[tokio::test]
async fn given_enumerated_validation_when_reading_schema_then_values_kept() {
    // Given: A validation with an already-enumerated domain
    let mut sheet = sheet_with_headers(&["Result"]);
    sheet.set_validation(
        3,
        1,
        ValidationRule::ListValues(vec![" Так".to_string(), "Ні ".to_string()]),
    );

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: The trimmed values form the domain
    assert_eq!(schema.fields[0].choices, ["Так", "Ні"]);
}

/// WHAT: An empty header row is a fatal schema error
/// WHY: No partial schema may be used when the sheet is unreadable
#[tokio::test]
async fn given_empty_header_row_when_reading_schema_then_error() {
    // Given: A sheet with nothing in the header row
    let sheet = MemorySheet::default();

    // When: Reading the schema
    let result = read_schema(&sheet, 2, 3).await;

    // Then: The read fails with EmptyHeaderRow
    assert!(matches!(result, Err(CoreError::EmptyHeaderRow { row: 2, .. })));
}

/// WHAT: Template-row values are captured as example values
/// WHY: Some backends detect domains from the observed template value
#[tokio::test]
async fn given_template_values_when_reading_schema_then_examples_recorded() {
    // Given: A template row with an example value under one header
    let mut sheet = sheet_with_headers(&["Name", "Status"]);
    sheet.set(3, 2, " приклад ");

    // When: Reading the schema
    let schema = read_schema(&sheet, 2, 3).await.unwrap();

    // Then: The trimmed example is attached to the right field
    assert_eq!(schema.fields[0].example_value, None);
    assert_eq!(schema.fields[1].example_value.as_deref(), Some("приклад"));
}
