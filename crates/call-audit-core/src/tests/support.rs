//! Shared test doubles: an in-memory [`SheetStore`] and a scripted
//! [`GenerationClient`] that counts its calls.

use crate::{
    CoreResult,
    llm::GenerationClient,
    sheet::{CellRange, Highlight, SheetStore, ValidationRule},
};

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

/// In-memory sheet with recorded side effects.
#[derive(Default)]
pub struct MemorySheet {
    pub cells: HashMap<(u32, u32), String>,
    pub validations: HashMap<(u32, u32), ValidationRule>,
    pub highlights: Mutex<Vec<(u32, u32, Highlight)>>,
    pub duplicated: Mutex<Vec<(u32, u32)>>,
    pub live_formulas: bool,
    pub saves: AtomicUsize,
}

impl MemorySheet {
    pub fn set(&mut self, row: u32, col: u32, value: &str) {
        self.cells.insert((row, col), value.to_string());
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&String> {
        self.cells.get(&(row, col))
    }

    pub fn set_validation(&mut self, row: u32, col: u32, rule: ValidationRule) {
        self.validations.insert((row, col), rule);
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.lock().unwrap().len()
    }

    fn extent(&self) -> (u32, u32) {
        self.cells.keys().fold((0, 0), |(max_row, max_col), (r, c)| {
            (max_row.max(*r), max_col.max(*c))
        })
    }
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn read_cell(&self, row: u32, col: u32) -> CoreResult<Option<String>> {
        Ok(self
            .cells
            .get(&(row, col))
            .filter(|v| !v.trim().is_empty())
            .cloned())
    }

    async fn write_cell(&mut self, row: u32, col: u32, value: &str) -> CoreResult<()> {
        self.cells.insert((row, col), value.to_string());
        Ok(())
    }

    async fn write_formula(&mut self, row: u32, col: u32, formula: &str) -> CoreResult<()> {
        self.cells.insert((row, col), formula.to_string());
        Ok(())
    }

    async fn validation_for_cell(&self, row: u32, col: u32) -> CoreResult<Option<ValidationRule>> {
        Ok(self.validations.get(&(row, col)).cloned())
    }

    async fn read_range(&self, range: &CellRange) -> CoreResult<Vec<String>> {
        let mut values = Vec::new();
        for row in range.start_row..=range.end_row {
            for col in range.start_col..=range.end_col {
                if let Some(v) = self.cells.get(&(row, col)) {
                    let v = v.trim();
                    if !v.is_empty() {
                        values.push(v.to_string());
                    }
                }
            }
        }
        Ok(values)
    }

    async fn find_next_empty_row(&self, start_row: u32) -> CoreResult<u32> {
        let (max_row, max_col) = self.extent();
        for row in start_row..=max_row {
            let empty = (1..=max_col).all(|col| {
                self.cells
                    .get(&(row, col))
                    .is_none_or(|v| v.trim().is_empty())
            });
            if empty {
                return Ok(row);
            }
        }
        Ok(max_row.max(start_row - 1) + 1)
    }

    async fn duplicate_row_formatting(
        &mut self,
        source_row: u32,
        target_row: u32,
    ) -> CoreResult<bool> {
        self.duplicated
            .lock()
            .unwrap()
            .push((source_row, target_row));
        Ok(false)
    }

    async fn apply_highlight(&mut self, row: u32, col: u32, highlight: Highlight) -> CoreResult<()> {
        self.highlights.lock().unwrap().push((row, col, highlight));
        Ok(())
    }

    fn supports_live_formulas(&self) -> bool {
        self.live_formulas
    }

    async fn save(&mut self) -> CoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}

/// Generation client that replays scripted responses and counts calls.
pub struct ScriptedClient {
    responses: Mutex<Vec<Option<String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedClient {
    /// `responses` are consumed front to back; exhausting the script
    /// yields `None` (a failed call).
    pub fn new(responses: Vec<Option<&str>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, _prompt: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            None
        } else {
            responses.remove(0)
        }
    }
}
