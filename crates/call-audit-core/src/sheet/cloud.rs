//! Cloud spreadsheet adapter.
//!
//! [`SheetStore`] over the spreadsheet REST API (v4). Values are buffered
//! and flushed as one RAW batch on save (formulas separately, entered as
//! USER_ENTERED so they evaluate); template-row duplication is three
//! copyPaste requests — format, data validation, conditional formatting —
//! followed by a value clear, so a fresh row inherits everything except
//! the template's literals.
//!
//! Authentication uses a pre-issued OAuth bearer token; token minting from
//! service-account keys lives outside this crate.

use crate::{
    CoreError, CoreResult,
    sheet::{CellRange, Highlight, SheetStore, ValidationRule, column_letter},
};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// How many leading cells must be blank for a row to count as empty; the
/// report sheets keep their identifying columns at the front.
const EMPTY_PREFIX_COLUMNS: usize = 5;

/// [`SheetStore`] over one worksheet of a cloud spreadsheet.
pub struct CloudSheet {
    http: reqwest::Client,
    spreadsheet_id: String,
    access_token: String,
    worksheet: String,
    grid_id: i64,
    source_name: String,
    pending_values: Vec<(u32, u32, String)>,
    pending_formulas: Vec<(u32, u32, String)>,
}

impl CloudSheet {
    /// Connects to `spreadsheet_id`, targeting `worksheet` or the first
    /// sheet when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SheetApi`] when the spreadsheet metadata cannot
    /// be fetched or the named worksheet does not exist.
    #[instrument(skip(http, access_token))]
    pub async fn connect(
        http: reqwest::Client,
        spreadsheet_id: &str,
        worksheet: Option<&str>,
        access_token: &str,
    ) -> CoreResult<Self> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}?fields=sheets(properties(sheetId,title))");
        let metadata = api_get(&http, access_token, &url).await?;

        let sheets = metadata["sheets"].as_array().cloned().unwrap_or_default();
        let properties = sheets
            .iter()
            .map(|s| &s["properties"])
            .find(|p| match worksheet {
                Some(name) => p["title"].as_str() == Some(name),
                None => true,
            })
            .ok_or_else(|| sheet_api_error(format!("worksheet {worksheet:?} not found")))?;

        let title = properties["title"].as_str().unwrap_or_default().to_string();
        let grid_id = properties["sheetId"].as_i64().unwrap_or_default();

        info!(spreadsheet_id, sheet = %title, "Cloud spreadsheet connected");

        Ok(Self {
            http,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
            source_name: format!("spreadsheet {spreadsheet_id}"),
            worksheet: title,
            grid_id,
            pending_values: Vec::new(),
            pending_formulas: Vec::new(),
        })
    }

    /// Worksheet title as an A1 prefix, quoted when the title needs it.
    fn sheet_ref(&self) -> String {
        let simple = self
            .worksheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if simple {
            self.worksheet.clone()
        } else {
            format!("'{}'", self.worksheet.replace('\'', "''"))
        }
    }

    fn cell_ref(&self, row: u32, col: u32) -> String {
        format!("{}!{}{}", self.sheet_ref(), column_letter(col), row)
    }

    /// Percent-encodes an A1 range for use inside a request URL. Quoted
    /// worksheet titles may contain spaces and apostrophes, which are not
    /// valid in a URI.
    fn encode_range(range: &str) -> String {
        range.replace('%', "%25").replace(' ', "%20").replace('\'', "%27")
    }

    async fn get(&self, url: &str) -> CoreResult<Value> {
        api_get(&self.http, &self.access_token, url).await
    }

    async fn post(&self, url: &str, body: Value) -> CoreResult<Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| sheet_api_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(sheet_api_error(format!("{status}: {detail}")));
        }

        response
            .json()
            .await
            .map_err(|e| sheet_api_error(format!("malformed response: {e}")))
    }

    /// Flushes one buffered write group through `values:batchUpdate`.
    async fn flush_group(&self, writes: &[(u32, u32, String)], input_option: &str) -> CoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = writes
            .iter()
            .map(|(row, col, value)| {
                json!({
                    "range": self.cell_ref(*row, *col),
                    "values": [[value]],
                })
            })
            .collect();

        let url = format!(
            "{SHEETS_API}/{}/values:batchUpdate",
            self.spreadsheet_id
        );
        self.post(
            &url,
            json!({
                "valueInputOption": input_option,
                "data": data,
            }),
        )
        .await?;

        debug!(count = writes.len(), input_option, "Cell batch flushed");
        Ok(())
    }

    fn copy_paste_request(&self, source_row: u32, target_row: u32, paste_type: &str) -> Value {
        json!({
            "copyPaste": {
                "source": {
                    "sheetId": self.grid_id,
                    "startRowIndex": source_row - 1,
                    "endRowIndex": source_row,
                },
                "destination": {
                    "sheetId": self.grid_id,
                    "startRowIndex": target_row - 1,
                    "endRowIndex": target_row,
                },
                "pasteType": paste_type,
            }
        })
    }
}

#[async_trait]
impl SheetStore for CloudSheet {
    async fn read_cell(&self, row: u32, col: u32) -> CoreResult<Option<String>> {
        // FORMULA rendering keeps `=`-prefixed text visible so the
        // committer's formula-cell rule works against this backend too.
        let url = format!(
            "{SHEETS_API}/{}/values/{}?valueRenderOption=FORMULA",
            self.spreadsheet_id,
            Self::encode_range(&self.cell_ref(row, col)),
        );
        let body = self.get(&url).await?;

        let text = scalar_to_string(&body["values"][0][0]);
        Ok(text.filter(|t| !t.trim().is_empty()))
    }

    async fn write_cell(&mut self, row: u32, col: u32, value: &str) -> CoreResult<()> {
        self.pending_values.push((row, col, value.to_string()));
        Ok(())
    }

    async fn write_formula(&mut self, row: u32, col: u32, formula: &str) -> CoreResult<()> {
        self.pending_formulas.push((row, col, formula.to_string()));
        Ok(())
    }

    async fn validation_for_cell(&self, row: u32, col: u32) -> CoreResult<Option<ValidationRule>> {
        let url = format!(
            "{SHEETS_API}/{}?ranges={}&fields=sheets(data(rowData(values(dataValidation))))",
            self.spreadsheet_id,
            Self::encode_range(&self.cell_ref(row, col)),
        );
        let body = self.get(&url).await?;

        let condition = &body["sheets"][0]["data"][0]["rowData"][0]["values"][0]
            ["dataValidation"]["condition"];

        match condition["type"].as_str() {
            Some("ONE_OF_LIST") => {
                let values = condition["values"]
                    .as_array()
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|e| e["userEnteredValue"].as_str())
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                Ok((!values.is_empty()).then_some(ValidationRule::ListValues(values)))
            }
            Some("ONE_OF_RANGE") => {
                let reference = condition["values"][0]["userEnteredValue"]
                    .as_str()
                    .unwrap_or_default()
                    .trim_start_matches('=')
                    .to_string();
                Ok((!reference.is_empty()).then_some(ValidationRule::ListFormula(reference)))
            }
            _ => Ok(None),
        }
    }

    async fn read_range(&self, range: &CellRange) -> CoreResult<Vec<String>> {
        let reference = format!(
            "{}!{}{}:{}{}",
            self.sheet_ref(),
            column_letter(range.start_col),
            range.start_row,
            column_letter(range.end_col),
            range.end_row,
        );
        let url = format!(
            "{SHEETS_API}/{}/values/{}",
            self.spreadsheet_id,
            Self::encode_range(&reference),
        );
        let body = self.get(&url).await?;

        let mut values = Vec::new();
        if let Some(rows) = body["values"].as_array() {
            for row in rows {
                if let Some(cells) = row.as_array() {
                    for cell in cells {
                        if let Some(text) = scalar_to_string(cell) {
                            let text = text.trim().to_string();
                            if !text.is_empty() {
                                values.push(text);
                            }
                        }
                    }
                }
            }
        }

        Ok(values)
    }

    /// A row counts as empty when its first five cells are blank; rows past
    /// the populated area are empty by definition.
    async fn find_next_empty_row(&self, start_row: u32) -> CoreResult<u32> {
        let reference = format!(
            "{}!A1:{}",
            self.sheet_ref(),
            column_letter(EMPTY_PREFIX_COLUMNS as u32),
        );
        let url = format!(
            "{SHEETS_API}/{}/values/{}",
            self.spreadsheet_id,
            Self::encode_range(&reference),
        );
        let body = self.get(&url).await?;

        let rows = body["values"].as_array().cloned().unwrap_or_default();

        let mut row_index = start_row.max(1) as usize - 1;
        loop {
            if row_index >= rows.len() {
                return Ok(row_index as u32 + 1);
            }

            let empty = rows[row_index]
                .as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .take(EMPTY_PREFIX_COLUMNS)
                        .all(|c| scalar_to_string(c).map_or(true, |t| t.trim().is_empty()))
                })
                .unwrap_or(true);

            if empty {
                return Ok(row_index as u32 + 1);
            }
            row_index += 1;
        }
    }

    async fn duplicate_row_formatting(
        &mut self,
        source_row: u32,
        target_row: u32,
    ) -> CoreResult<bool> {
        let requests = json!({
            "requests": [
                self.copy_paste_request(source_row, target_row, "PASTE_FORMAT"),
                self.copy_paste_request(source_row, target_row, "PASTE_DATA_VALIDATION"),
                self.copy_paste_request(source_row, target_row, "PASTE_CONDITIONAL_FORMATTING"),
                // The pastes above may carry the template's literal values;
                // clearing userEnteredValue keeps formatting only.
                {
                    "updateCells": {
                        "range": {
                            "sheetId": self.grid_id,
                            "startRowIndex": target_row - 1,
                            "endRowIndex": target_row,
                        },
                        "fields": "userEnteredValue",
                    }
                },
            ]
        });

        let url = format!("{SHEETS_API}/{}:batchUpdate", self.spreadsheet_id);
        self.post(&url, requests).await?;

        info!(source_row, target_row, "Template row duplicated");
        Ok(true)
    }

    async fn apply_highlight(
        &mut self,
        _row: u32,
        _col: u32,
        _highlight: Highlight,
    ) -> CoreResult<()> {
        // Highlighting comes from the duplicated conditional formatting.
        Ok(())
    }

    fn supports_live_formulas(&self) -> bool {
        true
    }

    async fn save(&mut self) -> CoreResult<()> {
        let values = std::mem::take(&mut self.pending_values);
        let formulas = std::mem::take(&mut self.pending_formulas);

        self.flush_group(&values, "RAW").await?;
        self.flush_group(&formulas, "USER_ENTERED").await?;

        Ok(())
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

async fn api_get(http: &reqwest::Client, token: &str, url: &str) -> CoreResult<Value> {
    let response = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| sheet_api_error(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(sheet_api_error(format!("{status}: {detail}")));
    }

    response
        .json()
        .await
        .map_err(|e| sheet_api_error(format!("malformed response: {e}")))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[track_caller]
fn sheet_api_error(reason: String) -> CoreError {
    CoreError::SheetApi {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}
