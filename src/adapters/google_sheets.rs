//! Google Sheets REST v4 backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::google_auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::error::SheetsError;
use crate::sheets::{GridSize, SheetsBackend};

pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    auth: ServiceAccountAuth,
}

/// Properties of one worksheet needed for structural updates
#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetProperties {
    sheet_id: i64,
    size: GridSize,
}

impl GoogleSheetsClient {
    pub fn new(
        base_url: &str,
        spreadsheet_id: &str,
        key: ServiceAccountKey,
    ) -> Result<Self, SheetsError> {
        let http = Client::builder()
            .user_agent("delivery-watch/0.1")
            .build()
            .map_err(|e| SheetsError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            auth: ServiceAccountAuth::new(key, http.clone()),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    pub fn service_account(&self) -> &str {
        self.auth.client_email()
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| SheetsError::Decode(e.to_string()))
    }

    /// Map "unknown range" API errors onto a missing worksheet
    fn worksheet_error(sheet: &str, err: SheetsError) -> SheetsError {
        match err {
            SheetsError::Api { status: 400, message }
                if message.contains("Unable to parse range") =>
            {
                SheetsError::WorksheetNotFound(sheet.to_string())
            }
            other => other,
        }
    }

    async fn sheet_properties(&self, sheet: &str) -> Result<SheetProperties, SheetsError> {
        let body = self
            .send(self.http.get(self.spreadsheet_url()).query(&[(
                "fields",
                "sheets.properties(sheetId,title,gridProperties(rowCount,columnCount))",
            )]))
            .await?;

        find_sheet(&body, sheet)
    }

    async fn batch_update(&self, requests: Value) -> Result<(), SheetsError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        self.send(self.http.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }
}

/// Quote a sheet title for A1 notation ('It''s' style escaping)
pub fn a1_range(sheet: &str, cell: Option<&str>) -> String {
    let quoted = format!("'{}'", sheet.replace('\'', "''"));
    match cell {
        Some(cell) => format!("{quoted}!{cell}"),
        None => quoted,
    }
}

fn find_sheet(body: &Value, sheet: &str) -> Result<SheetProperties, SheetsError> {
    let sheets = body["sheets"]
        .as_array()
        .ok_or_else(|| SheetsError::Decode("spreadsheet has no sheets array".to_string()))?;

    let props = sheets
        .iter()
        .map(|s| &s["properties"])
        .find(|p| p["title"].as_str() == Some(sheet))
        .ok_or_else(|| SheetsError::WorksheetNotFound(sheet.to_string()))?;

    let sheet_id = props["sheetId"].as_i64().unwrap_or(0);
    let grid = &props["gridProperties"];
    Ok(SheetProperties {
        sheet_id,
        size: GridSize {
            rows: grid["rowCount"].as_u64().unwrap_or(0) as usize,
            cols: grid["columnCount"].as_u64().unwrap_or(0) as usize,
        },
    })
}

#[async_trait]
impl SheetsBackend for GoogleSheetsClient {
    async fn title(&self) -> Result<String, SheetsError> {
        let body = self
            .send(
                self.http
                    .get(self.spreadsheet_url())
                    .query(&[("fields", "properties.title")]),
            )
            .await?;

        body["properties"]["title"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SheetsError::Decode("missing properties.title".to_string()))
    }

    async fn read_cell(&self, sheet: &str, cell: &str) -> Result<Option<String>, SheetsError> {
        let url = self.values_url(&a1_range(sheet, Some(cell)));
        let body = self
            .send(self.http.get(url))
            .await
            .map_err(|e| Self::worksheet_error(sheet, e))?;

        let value = &body["values"][0][0];
        Ok(match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    async fn clear(&self, sheet: &str) -> Result<(), SheetsError> {
        let url = format!("{}:clear", self.values_url(&a1_range(sheet, None)));
        self.send(self.http.post(url).json(&json!({})))
            .await
            .map_err(|e| Self::worksheet_error(sheet, e))?;
        Ok(())
    }

    async fn write_values(
        &self,
        sheet: &str,
        start_cell: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<(), SheetsError> {
        let range = a1_range(sheet, Some(start_cell));
        debug!("Writing {} row(s) to {}", values.len(), range);

        let request = self
            .http
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": values,
            }));

        self.send(request)
            .await
            .map_err(|e| Self::worksheet_error(sheet, e))?;
        Ok(())
    }

    async fn grid_size(&self, sheet: &str) -> Result<GridSize, SheetsError> {
        Ok(self.sheet_properties(sheet).await?.size)
    }

    async fn resize(&self, sheet: &str, size: GridSize) -> Result<(), SheetsError> {
        let props = self.sheet_properties(sheet).await?;
        self.batch_update(json!([{
            "updateSheetProperties": {
                "properties": {
                    "sheetId": props.sheet_id,
                    "gridProperties": { "rowCount": size.rows, "columnCount": size.cols },
                },
                "fields": "gridProperties(rowCount,columnCount)",
            }
        }]))
        .await
    }

    async fn bold_row(&self, sheet: &str, row: usize) -> Result<(), SheetsError> {
        let props = self.sheet_properties(sheet).await?;
        let start = row.saturating_sub(1);
        self.batch_update(json!([{
            "repeatCell": {
                "range": {
                    "sheetId": props.sheet_id,
                    "startRowIndex": start,
                    "endRowIndex": start + 1,
                },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold",
            }
        }]))
        .await
    }

    async fn freeze_rows(&self, sheet: &str, rows: usize) -> Result<(), SheetsError> {
        let props = self.sheet_properties(sheet).await?;
        self.batch_update(json!([{
            "updateSheetProperties": {
                "properties": {
                    "sheetId": props.sheet_id,
                    "gridProperties": { "frozenRowCount": rows },
                },
                "fields": "gridProperties.frozenRowCount",
            }
        }]))
        .await
    }
}
