//! Transcript → field values.
//!
//! The extractor turns one transcript into a validated value for every
//! schema field using at most two generation calls: one batched prompt for
//! all choice fields, one for all text fields. Field count never changes
//! the call count — that bound is the engine's main cost control.
//!
//! Extraction never fails once a transcript exists. A failed or partial
//! model response degrades field by field to deterministic fallbacks.

mod protocol;

pub use protocol::parse_numbered_answers;

use crate::{
    llm::GenerationClient,
    schema::{FieldDescriptor, FieldKind, FieldSchema},
};

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

/// Fallback for a text field the model gave no usable answer for.
pub const TEXT_FALLBACK: &str = "не вказано";

/// Fallback for a choice field whose domain is unexpectedly empty.
pub const CHOICE_FALLBACK: &str = "не визначено";

/// Provenance of an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedKind {
    /// Free-text answer produced by the model.
    Text,
    /// Value validated against a choice field's domain.
    Choice,
    /// Fallback substituted because the model gave no usable answer.
    Empty,
}

/// One field's extracted value, produced once per run and consumed once by
/// the committer.
#[derive(Debug, Clone)]
pub struct ExtractedValue {
    /// The value to commit; always present after fallback substitution.
    pub value: Option<String>,
    /// How the value was obtained.
    pub kind: ExtractedKind,
}

impl ExtractedValue {
    /// The value as a string slice, empty when absent.
    pub fn as_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// Extracts a value for every schema field from `transcript`.
///
/// Issues at most one generation call for the choice fields and one for the
/// text fields, regardless of how many fields the schema has. Fields the
/// model fails to answer — or whole batches whose call fails — receive
/// their deterministic fallback instead of aborting the extraction.
#[instrument(skip_all, fields(field_count = schema.fields.len()))]
pub async fn extract<C: GenerationClient + ?Sized>(
    client: &C,
    transcript: &str,
    schema: &FieldSchema,
) -> HashMap<String, ExtractedValue> {
    let (choice_fields, text_fields): (Vec<&FieldDescriptor>, Vec<&FieldDescriptor>) = schema
        .fields
        .iter()
        .partition(|f| f.kind == FieldKind::Choice);

    let mut extracted = HashMap::with_capacity(schema.fields.len());

    if !choice_fields.is_empty() {
        let prompt = choice_prompt(&choice_fields, transcript);
        let answers = request_answers(client, &prompt, "choice").await;

        for (position, field) in choice_fields.iter().enumerate() {
            let value = resolve_choice(field, answers.get(&(position + 1)));
            extracted.insert(field.name.clone(), value);
        }
    }

    if !text_fields.is_empty() {
        let prompt = text_prompt(&text_fields, transcript);
        let answers = request_answers(client, &prompt, "text").await;

        for (position, field) in text_fields.iter().enumerate() {
            let value = resolve_text(field, answers.get(&(position + 1)));
            extracted.insert(field.name.clone(), value);
        }
    }

    debug!(
        extracted = extracted.len(),
        fallbacks = extracted
            .values()
            .filter(|v| v.kind == ExtractedKind::Empty)
            .count(),
        "Extraction complete"
    );

    extracted
}

/// Runs one batch call and parses its numbered answers; a failed call
/// yields an empty answer table so every field in the batch falls back.
async fn request_answers<C: GenerationClient + ?Sized>(
    client: &C,
    prompt: &str,
    batch: &str,
) -> HashMap<usize, String> {
    match client.generate(prompt).await {
        Some(response) => {
            let answers = parse_numbered_answers(&response);
            if answers.is_empty() {
                warn!(batch, "Unparsable batch response, falling back per field");
            }
            answers
        }
        None => {
            warn!(batch, "Generation call failed, falling back per field");
            HashMap::new()
        }
    }
}

/// Validates a choice answer against the field's domain.
///
/// Exact match wins; a case-insensitive match is canonicalized to the
/// domain's spelling; anything else falls back to the first domain entry.
fn resolve_choice(field: &FieldDescriptor, answer: Option<&String>) -> ExtractedValue {
    let fallback = || {
        field
            .choices
            .first()
            .cloned()
            .unwrap_or_else(|| CHOICE_FALLBACK.to_string())
    };

    let Some(answer) = answer else {
        return ExtractedValue {
            value: Some(fallback()),
            kind: ExtractedKind::Empty,
        };
    };

    if field.choices.iter().any(|c| c == answer) {
        return ExtractedValue {
            value: Some(answer.clone()),
            kind: ExtractedKind::Choice,
        };
    }

    if let Some(matched) = field
        .choices
        .iter()
        .find(|c| c.eq_ignore_ascii_case(answer) || c.to_lowercase() == answer.to_lowercase())
    {
        return ExtractedValue {
            value: Some(matched.clone()),
            kind: ExtractedKind::Choice,
        };
    }

    warn!(
        field = %field.name,
        answer = %answer,
        "Answer outside choice domain, using first domain entry"
    );

    ExtractedValue {
        value: Some(fallback()),
        kind: ExtractedKind::Empty,
    }
}

fn resolve_text(field: &FieldDescriptor, answer: Option<&String>) -> ExtractedValue {
    match answer {
        Some(text) => ExtractedValue {
            value: Some(text.trim().to_string()),
            kind: ExtractedKind::Text,
        },
        None => {
            debug!(field = %field.name, "No text answer, using fallback");
            ExtractedValue {
                value: Some(TEXT_FALLBACK.to_string()),
                kind: ExtractedKind::Empty,
            }
        }
    }
}

fn choice_prompt(fields: &[&FieldDescriptor], transcript: &str) -> String {
    let mut lines = Vec::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        lines.push(format!(
            "{}. «{}» — варіанти: [{}]",
            position + 1,
            field.name,
            field.choices.join(" | ")
        ));
    }

    format!(
        "Ти аналізуєш транскрипт телефонної розмови менеджера з клієнтом.\n\
         Для кожного поля нижче обери РІВНО ОДНЕ значення зі списку варіантів.\n\n\
         Поля:\n{fields}\n\n\
         Транскрипт розмови:\n{transcript}\n\n\
         Відповідь дай одним рядком у форматі {example}, без пояснень.\n\
         Для кожного номера вкажи лише одне значення з його списку варіантів.",
        fields = lines.join("\n"),
        example = protocol::answer_line_example(fields.len()),
    )
}

fn text_prompt(fields: &[&FieldDescriptor], transcript: &str) -> String {
    let mut lines = Vec::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        lines.push(format!("{}. «{}»", position + 1, field.name));
    }

    format!(
        "Ти аналізуєш транскрипт телефонної розмови менеджера з клієнтом.\n\
         Для кожного поля нижче дай коротку відповідь (1–3 речення) на основі\n\
         транскрипту. Якщо в розмові немає відповідної інформації, напиши\n\
         «{fallback}».\n\n\
         Поля:\n{fields}\n\n\
         Транскрипт розмови:\n{transcript}\n\n\
         Відповідь дай одним рядком у форматі {example}, сегменти розділяй\n\
         крапкою з комою, без додаткових пояснень.",
        fallback = TEXT_FALLBACK,
        fields = lines.join("\n"),
        example = protocol::answer_line_example(fields.len()),
    )
}
