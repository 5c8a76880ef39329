use std::sync::Arc;

use crate::config::AppConfig;
use crate::coordination::{Lifecycle, RetryPolicy};
use crate::domain::Transaction;
use crate::error::SheetsError;
use crate::sheets::SheetsBackend;

/// Long-lived handles shared across cycles
#[derive(Clone)]
pub struct Resources {
    /// Unset until the spreadsheet connection succeeds
    pub sheets: Option<Arc<dyn SheetsBackend>>,
    pub lifecycle: Lifecycle,
}

/// The single mutable aggregate owned by the poll loop
pub struct ProcessState {
    pub config: Arc<AppConfig>,
    pub resources: Resources,
    pub transaction: Transaction,
}

impl ProcessState {
    pub fn new(config: AppConfig, lifecycle: Lifecycle) -> Self {
        Self {
            config: Arc::new(config),
            resources: Resources {
                sheets: None,
                lifecycle,
            },
            transaction: Transaction::default(),
        }
    }

    pub fn with_sheets(mut self, sheets: Arc<dyn SheetsBackend>) -> Self {
        self.resources.sheets = Some(sheets);
        self
    }

    pub fn sheets(&self) -> Result<Arc<dyn SheetsBackend>, SheetsError> {
        self.resources
            .sheets
            .clone()
            .ok_or(SheetsError::NotConnected)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.resources.lifecycle
    }

    /// Retry policy for spreadsheet connect and trigger reads
    pub fn sheets_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.sheets.retry_attempts,
            self.config.sheets.retry_delay(),
        )
    }
}
