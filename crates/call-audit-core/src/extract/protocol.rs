//! Wire format of the batched extraction prompts.
//!
//! Both batches ask the model for a single line of numbered answers:
//!
//! ```text
//! [1: Закрито; 2: Високий; 3: не вказано]
//! ```
//!
//! The parser is deliberately strict about structure (`;`-separated
//! segments, one leading ordinal and one `:` each) and lenient about
//! decoration: surrounding brackets, quotes, and stray whitespace are
//! stripped. Unparsable segments are dropped — the caller substitutes the
//! per-field fallback for anything missing.

use std::collections::HashMap;

/// Splits a numbered-answer response into `ordinal → value`.
///
/// Segments without a leading integer ordinal, duplicated ordinals (first
/// one wins), and empty values are ignored.
pub fn parse_numbered_answers(response: &str) -> HashMap<usize, String> {
    let mut answers = HashMap::new();

    for segment in response.split(';') {
        let Some((ordinal, value)) = parse_segment(segment) else {
            continue;
        };
        answers.entry(ordinal).or_insert(value);
    }

    answers
}

fn parse_segment(segment: &str) -> Option<(usize, String)> {
    let (head, tail) = segment.split_once(':')?;

    let ordinal: usize = strip_decoration(head).parse().ok()?;
    let value = strip_decoration(tail);
    if value.is_empty() {
        return None;
    }

    Some((ordinal, value.to_string()))
}

/// Trims whitespace plus the bracket/quote characters models like to wrap
/// answers in.
fn strip_decoration(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '(' | ')' | '"' | '\'' | '«' | '»'))
        .trim()
}

/// Renders the numbered answer line the prompts request, used verbatim in
/// the prompt so the model mirrors the exact shape the parser accepts.
pub fn answer_line_example(count: usize) -> String {
    let body = (1..=count)
        .map(|i| format!("{i}: значення"))
        .collect::<Vec<_>>()
        .join("; ");
    format!("[{body}]")
}
