use chrono::Local;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::traits::{GridSize, SheetsBackend};
use crate::config::{ControlCells, SheetNames, SheetsConfig};
use crate::domain::Transaction;
use crate::error::SheetsError;

pub const TRIGGER_RESET_VALUE: &str = "FALSE";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes cycle results to the raw-data and status sheets and re-arms the trigger
pub struct SheetsWriter {
    backend: Arc<dyn SheetsBackend>,
    sheet_names: SheetNames,
    control_cells: ControlCells,
}

impl SheetsWriter {
    pub fn new(backend: Arc<dyn SheetsBackend>, config: &SheetsConfig) -> Self {
        Self {
            backend,
            sheet_names: config.sheet_names.clone(),
            control_cells: config.control_cells.clone(),
        }
    }

    /// Overwrite RAW_DATA, then the status block, then reset the trigger.
    pub async fn write_results(&self, txn: &Transaction) -> Result<(), SheetsError> {
        if txn.raw_rows.is_empty() {
            warn!("No raw data to write");
        } else {
            self.overwrite_raw_data(&txn.raw_rows).await?;
        }

        // The trigger is reset even when the status block could not be written
        let status = self.update_system_status(txn, true).await;
        let reset = self.reset_trigger().await;
        status?;
        reset?;

        info!("All sheets updated successfully");
        Ok(())
    }

    /// Report a failed cycle. Never fails: errors here are only logged.
    pub async fn write_error(&self, txn: &Transaction) {
        if let Err(e) = self.update_system_status(txn, false).await {
            error!("Failed to write error status: {}", e);
        }
        if let Err(e) = self.reset_trigger().await {
            error!("Failed to reset trigger: {}", e);
        }
    }

    async fn overwrite_raw_data(&self, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        let sheet = &self.sheet_names.raw_data;

        // Values only; rows and columns are never deleted
        self.backend.clear(sheet).await?;

        let needed = GridSize {
            rows: rows.len(),
            cols: rows.iter().map(Vec::len).max().unwrap_or(0),
        };
        let current = self.backend.grid_size(sheet).await?;
        if !current.covers(needed) {
            self.backend.resize(sheet, current.grown_to(needed)).await?;
        }

        let values = rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::String(cell.clone())).collect())
            .collect();
        self.backend.write_values(sheet, "A1", values).await?;

        self.backend.bold_row(sheet, 1).await?;
        self.backend.freeze_rows(sheet, 1).await?;

        info!("{} overwritten: {} rows", sheet, rows.len().saturating_sub(1));
        Ok(())
    }

    async fn update_system_status(&self, txn: &Transaction, success: bool) -> Result<(), SheetsError> {
        let sheet = &self.sheet_names.system_status;
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        self.backend.clear(sheet).await?;
        self.backend
            .write_values(sheet, "A1", status_block(txn, success, &timestamp))
            .await
    }

    async fn reset_trigger(&self) -> Result<(), SheetsError> {
        self.backend
            .write_values(
                &self.sheet_names.custom_view,
                &self.control_cells.trigger,
                vec![vec![json!(TRIGGER_RESET_VALUE)]],
            )
            .await
    }
}

fn decimal_cell(value: Decimal) -> Value {
    if value.fract().is_zero() {
        value.to_i64().map(Value::from).unwrap_or(Value::Null)
    } else {
        value.to_f64().map(Value::from).unwrap_or(Value::Null)
    }
}

/// Two-column status block written to SYSTEM_STATUS!A1
pub fn status_block(txn: &Transaction, success: bool, timestamp: &str) -> Vec<Vec<Value>> {
    let symbol = if txn.symbol.is_empty() {
        "N/A"
    } else {
        txn.symbol.as_str()
    };
    let metrics = &txn.metrics;

    vec![
        vec![json!("Last Update Time"), json!(timestamp)],
        vec![json!("Symbol"), json!(symbol)],
        vec![json!("Date Range"), json!(txn.date_range())],
        vec![
            json!("Status"),
            json!(if success { "SUCCESS" } else { "ERROR" }),
        ],
        vec![json!("Total Rows"), json!(metrics.total_rows)],
        vec![json!("Avg Delivery %"), decimal_cell(metrics.avg_delivery_pct)],
        vec![json!("Max Delivery %"), decimal_cell(metrics.max_delivery_pct)],
        vec![json!("Min Delivery %"), decimal_cell(metrics.min_delivery_pct)],
        vec![json!("Error"), json!(txn.error.as_deref().unwrap_or("None"))],
    ]
}
