//! Call-audit Core Library
//!
//! Field-extraction and spreadsheet-synchronization engine: discovers a
//! report sheet's field schema from its header and template rows, converts
//! a call transcript into validated per-field values in at most two
//! generation calls, scores the call against a fixed rubric, and commits
//! one row into the sheet without disturbing its formatting, dropdowns, or
//! score formula. A persistent ledger keeps reprocessing idempotent.
//!
//! # Example
//!
//! ```no_run
//! use call_audit_core::{
//!     EvaluationPolicy, XlsxWorkbook, aggregate_score, commit, evaluate, extract, read_schema,
//! };
//!
//! # async fn run(client: &dyn call_audit_core::GenerationClient) -> call_audit_core::CoreResult<()> {
//! let mut store = XlsxWorkbook::open("report.xlsx".as_ref(), None)?;
//! let schema = read_schema(&store, 2, 3).await?;
//!
//! let transcript = "…";
//! let extracted = extract(client, transcript, &schema).await;
//! let evaluation = evaluate(client, transcript, EvaluationPolicy::default()).await;
//! let total = aggregate_score(&extracted);
//!
//! let result = commit(&mut store, &schema, &extracted, &evaluation, total, None, "call.mp3").await;
//! println!("written row: {:?}", result.row_index);
//! # Ok(())
//! # }
//! ```

mod commit;
mod error;
mod extract;
mod ledger;
mod llm;
mod schema;
mod score;
mod sheet;

pub use {
    commit::{CommitResult, commit},
    error::{CoreError, Result as CoreResult},
    extract::{
        CHOICE_FALLBACK, ExtractedKind, ExtractedValue, TEXT_FALLBACK, extract,
        parse_numbered_answers,
    },
    ledger::{LedgerEntry, LedgerStats, ProcessedLedger},
    llm::{GenerationClient, Transcriber},
    schema::{FieldDescriptor, FieldKind, FieldSchema, read_schema},
    score::{
        EvaluationPolicy, EvaluationResult, NEGATIVE_MARKER, RubricScores, aggregate_score,
        evaluate, parse_rubric_response,
    },
    sheet::{
        CellRange, CloudSheet, Highlight, SheetStore, ValidationRule, XlsxWorkbook, column_letter,
    },
};

#[cfg(test)]
mod tests;
