use async_trait::async_trait;
use serde_json::Value;

use crate::error::SheetsError;

/// Declared grid size of one worksheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    /// Smallest grid covering both `self` and `needed`; never smaller than `self`.
    pub fn grown_to(&self, needed: GridSize) -> GridSize {
        GridSize {
            rows: self.rows.max(needed.rows),
            cols: self.cols.max(needed.cols),
        }
    }

    pub fn covers(&self, needed: GridSize) -> bool {
        self.rows >= needed.rows && self.cols >= needed.cols
    }
}

/// The spreadsheet operations the poller needs.
///
/// Every call addresses a worksheet by title. Implementations must never
/// delete rows or columns; `clear` only erases values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Title of the spreadsheet (used as a connectivity check)
    async fn title(&self) -> Result<String, SheetsError>;

    /// Formatted value of one cell, `None` when blank
    async fn read_cell(&self, sheet: &str, cell: &str) -> Result<Option<String>, SheetsError>;

    /// Erase all values, keeping the grid and formatting
    async fn clear(&self, sheet: &str) -> Result<(), SheetsError>;

    /// Write a block of rows starting at `start_cell`, parsed as user input
    async fn write_values(
        &self,
        sheet: &str,
        start_cell: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<(), SheetsError>;

    async fn grid_size(&self, sheet: &str) -> Result<GridSize, SheetsError>;

    async fn resize(&self, sheet: &str, size: GridSize) -> Result<(), SheetsError>;

    /// Bold the given 1-based row
    async fn bold_row(&self, sheet: &str, row: usize) -> Result<(), SheetsError>;

    async fn freeze_rows(&self, sheet: &str, rows: usize) -> Result<(), SheetsError>;
}
