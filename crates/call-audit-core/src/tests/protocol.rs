use crate::parse_numbered_answers;

/// WHAT: A decorated answer line parses into ordinal → value
/// WHY: Models wrap answers in brackets and quotes the parser must shed
#[test]
fn given_decorated_response_when_parsing_then_ordinals_mapped() {
    // Given: A bracketed, quoted answer line
    let response = "[1: «Закрито»; 2: \"Високий\"; 3: не вказано]";

    // When: Parsing
    let answers = parse_numbered_answers(response);

    // Then: Every ordinal maps to its stripped value
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[&1], "Закрито");
    assert_eq!(answers[&2], "Високий");
    assert_eq!(answers[&3], "не вказано");
}

/// WHAT: Missing ordinals simply stay absent
/// WHY: The caller substitutes fallbacks per field, never per batch
#[test]
fn given_partial_response_when_parsing_then_missing_ordinals_absent() {
    // Given: A response answering only the second field
    let response = "2: Medium";

    // When: Parsing
    let answers = parse_numbered_answers(response);

    // Then: Only ordinal 2 is present
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[&2], "Medium");
    assert!(!answers.contains_key(&1));
}

/// WHAT: Garbage segments are dropped without failing the parse
/// WHY: Free-text responses routinely mix prose into the answer line
#[test]
fn given_malformed_segments_when_parsing_then_only_valid_kept() {
    // Given: Segments without ordinals, without colons, and one valid
    let response = "вибачте, ось відповідь; щось: інше; 1: Так; :порожнє";

    // When: Parsing
    let answers = parse_numbered_answers(response);

    // Then: Only the numbered segment survives
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[&1], "Так");
}

/// WHAT: The first occurrence of a duplicated ordinal wins
/// WHY: Deterministic resolution when the model repeats itself
#[test]
fn given_duplicate_ordinals_when_parsing_then_first_wins() {
    // Given: Ordinal 1 answered twice
    let response = "1: Перший; 1: Другий";

    // When: Parsing
    let answers = parse_numbered_answers(response);

    // Then: The first answer is kept
    assert_eq!(answers[&1], "Перший");
}

/// WHAT: Values keep their interior punctuation
/// WHY: Text answers may legitimately contain colons past the first
#[test]
fn given_value_with_colon_when_parsing_then_split_on_first_colon_only() {
    // Given: A value containing a colon
    let response = "1: час дзвінка: 14:30";

    // When: Parsing
    let answers = parse_numbered_answers(response);

    // Then: Everything after the first colon is the value
    assert_eq!(answers[&1], "час дзвінка: 14:30");
}

/// WHAT: An empty response parses to an empty table
/// WHY: Empty tables trigger the full fallback path downstream
#[test]
fn given_empty_response_when_parsing_then_no_answers() {
    // Given/When: Parsing an empty string
    let answers = parse_numbered_answers("");

    // Then: No answers
    assert!(answers.is_empty());
}
