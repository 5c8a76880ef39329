#![allow(dead_code)]

use async_trait::async_trait;
use delivery_watch::error::SheetsError;
use delivery_watch::sheets::{GridSize, SheetsBackend};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub const RELIANCE_CSV: &str = "Symbol,Series,Date,Prev Close,Close Price,Total Traded Quantity,Deliverable Qty,% Dly Qt to Traded Qty\n\
RELIANCE,EQ,01-Jan-2025,1215.00,1220.50,7760000,3500000,45.10\n\
RELIANCE,EQ,02-Jan-2025,1220.50,1235.00,8151000,4100000,50.30\n\
RELIANCE,EQ,03-Jan-2025,1235.00,1251.20,8083000,3900000,48.25\n";

#[derive(Default)]
struct Worksheet {
    cells: BTreeMap<(usize, usize), String>,
    size: GridSize,
    bold_rows: Vec<usize>,
    frozen_rows: usize,
}

#[derive(Default)]
struct Inner {
    sheets: HashMap<String, Worksheet>,
    resizes: usize,
    clears: usize,
}

/// In-memory spreadsheet with the three worksheets the poller expects
pub struct MemorySheets {
    inner: Mutex<Inner>,
}

impl Default for MemorySheets {
    fn default() -> Self {
        Self::with_grid(GridSize { rows: 1000, cols: 26 })
    }
}

/// Zero-based (row, col) of an A1 reference like `B4`
pub fn parse_a1(cell: &str) -> (usize, usize) {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &cell[letters.len()..];
    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    let row: usize = digits.parse().expect("A1 row number");
    (row - 1, col - 1)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl MemorySheets {
    pub fn with_grid(size: GridSize) -> Self {
        let mut inner = Inner::default();
        for name in ["CUSTOM_VIEW", "RAW_DATA", "SYSTEM_STATUS"] {
            inner.sheets.insert(
                name.to_string(),
                Worksheet {
                    size,
                    ..Worksheet::default()
                },
            );
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn set_cell(&self, sheet: &str, cell: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        let ws = inner.sheets.get_mut(sheet).expect("known worksheet");
        ws.cells.insert(parse_a1(cell), value.to_string());
    }

    pub fn cell(&self, sheet: &str, cell: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sheets[sheet].cells.get(&parse_a1(cell)).cloned()
    }

    /// Arm the control sheet with a request
    pub fn arm(&self, symbol: &str, from: &str, to: &str, trigger: &str) {
        self.set_cell("CUSTOM_VIEW", "B1", symbol);
        self.set_cell("CUSTOM_VIEW", "B2", from);
        self.set_cell("CUSTOM_VIEW", "B3", to);
        self.set_cell("CUSTOM_VIEW", "B4", trigger);
    }

    /// Non-empty rows, each trimmed to its last written column
    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let ws = &inner.sheets[sheet];
        let Some(max_row) = ws.cells.keys().map(|(r, _)| *r).max() else {
            return Vec::new();
        };

        (0..=max_row)
            .map(|r| {
                let max_col = ws
                    .cells
                    .range((r, 0)..=(r, usize::MAX))
                    .map(|((_, c), _)| *c)
                    .max();
                match max_col {
                    Some(max_col) => (0..=max_col)
                        .map(|c| ws.cells.get(&(r, c)).cloned().unwrap_or_default())
                        .collect(),
                    None => Vec::new(),
                }
            })
            .collect()
    }

    /// Value next to a label in the two-column status block
    pub fn status(&self, label: &str) -> Option<String> {
        self.rows("SYSTEM_STATUS")
            .into_iter()
            .find(|row| row.first().map(String::as_str) == Some(label))
            .and_then(|row| row.get(1).cloned())
    }

    pub fn size(&self, sheet: &str) -> GridSize {
        self.inner.lock().unwrap().sheets[sheet].size
    }

    pub fn resizes(&self) -> usize {
        self.inner.lock().unwrap().resizes
    }

    pub fn bold_rows(&self, sheet: &str) -> Vec<usize> {
        self.inner.lock().unwrap().sheets[sheet].bold_rows.clone()
    }

    pub fn frozen_rows(&self, sheet: &str) -> usize {
        self.inner.lock().unwrap().sheets[sheet].frozen_rows
    }

    fn with_sheet<T>(
        &self,
        sheet: &str,
        f: impl FnOnce(&mut Worksheet) -> Result<T, SheetsError>,
    ) -> Result<T, SheetsError> {
        let mut inner = self.inner.lock().unwrap();
        let ws = inner
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| SheetsError::WorksheetNotFound(sheet.to_string()))?;
        f(ws)
    }
}

#[async_trait]
impl SheetsBackend for MemorySheets {
    async fn title(&self) -> Result<String, SheetsError> {
        Ok("Delivery Dashboard".to_string())
    }

    async fn read_cell(&self, sheet: &str, cell: &str) -> Result<Option<String>, SheetsError> {
        self.with_sheet(sheet, |ws| {
            Ok(ws.cells.get(&parse_a1(cell)).filter(|v| !v.is_empty()).cloned())
        })
    }

    async fn clear(&self, sheet: &str) -> Result<(), SheetsError> {
        self.with_sheet(sheet, |ws| {
            ws.cells.clear();
            Ok(())
        })?;
        self.inner.lock().unwrap().clears += 1;
        Ok(())
    }

    async fn write_values(
        &self,
        sheet: &str,
        start_cell: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<(), SheetsError> {
        let (row0, col0) = parse_a1(start_cell);
        self.with_sheet(sheet, |ws| {
            let rows = row0 + values.len();
            let cols = col0 + values.iter().map(Vec::len).max().unwrap_or(0);
            if rows > ws.size.rows || cols > ws.size.cols {
                return Err(SheetsError::Api {
                    status: 400,
                    message: format!("Range exceeds grid limits of {sheet}"),
                });
            }

            for (r, row) in values.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    ws.cells.insert((row0 + r, col0 + c), cell_text(value));
                }
            }
            Ok(())
        })
    }

    async fn grid_size(&self, sheet: &str) -> Result<GridSize, SheetsError> {
        self.with_sheet(sheet, |ws| Ok(ws.size))
    }

    async fn resize(&self, sheet: &str, size: GridSize) -> Result<(), SheetsError> {
        self.with_sheet(sheet, |ws| {
            ws.size = size;
            Ok(())
        })?;
        self.inner.lock().unwrap().resizes += 1;
        Ok(())
    }

    async fn bold_row(&self, sheet: &str, row: usize) -> Result<(), SheetsError> {
        self.with_sheet(sheet, |ws| {
            ws.bold_rows.push(row);
            Ok(())
        })
    }

    async fn freeze_rows(&self, sheet: &str, rows: usize) -> Result<(), SheetsError> {
        self.with_sheet(sheet, |ws| {
            ws.frozen_rows = rows;
            Ok(())
        })
    }
}

/// Parse a CSV body the way a reader of the sheet would see it
pub fn csv_rows(body: &str) -> Vec<Vec<String>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(|c| c.trim().to_string()).collect())
        .collect()
}
