//! Trigger polling against the control sheet.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::adapters::{load_service_account, GoogleSheetsClient};
use crate::config::{AppConfig, ControlCells};
use crate::coordination::RetryPolicy;
use crate::domain::{CycleOutcome, Transaction, TriggerCells, TriggerRequest, TriggerStatus};
use crate::error::{Result, SheetsError};
use crate::services::pipeline;
use crate::sheets::SheetsBackend;
use crate::state::ProcessState;

/// Validate credentials, open the spreadsheet and confirm it is reachable.
pub async fn connect_sheets(config: &AppConfig) -> Result<Arc<dyn SheetsBackend>> {
    let key = load_service_account(&config.sheets.credentials_file)?;
    let client = GoogleSheetsClient::new(
        &config.sheets.api_base_url,
        &config.sheets.spreadsheet_id,
        key,
    )?;
    info!("Credentials validated for {}", client.service_account());
    let backend: Arc<dyn SheetsBackend> = Arc::new(client);

    let title = verify_connection(backend.as_ref(), config).await?;
    info!("Connected to spreadsheet: {}", title);
    Ok(backend)
}

/// Fetch the spreadsheet title under the configured retry policy
pub async fn verify_connection(sheets: &dyn SheetsBackend, config: &AppConfig) -> Result<String> {
    let retry = RetryPolicy::new(
        config.sheets.retry_attempts,
        config.sheets.retry_delay(),
    );
    let title = retry
        .run("Spreadsheet connect", SheetsError::is_transient, || sheets.title())
        .await?;
    Ok(title)
}

/// Read the four control cells of the custom view
pub async fn read_trigger_cells(
    sheets: &dyn SheetsBackend,
    sheet: &str,
    cells: &ControlCells,
) -> std::result::Result<TriggerCells, SheetsError> {
    Ok(TriggerCells {
        symbol: sheets.read_cell(sheet, &cells.symbol).await?,
        from_date: sheets.read_cell(sheet, &cells.from_date).await?,
        to_date: sheets.read_cell(sheet, &cells.to_date).await?,
        trigger: sheets.read_cell(sheet, &cells.trigger).await?,
    })
}

/// Return the armed request, if any. Incomplete triggers are left in place.
pub async fn check_trigger(
    state: &ProcessState,
) -> std::result::Result<Option<TriggerRequest>, SheetsError> {
    let sheets = state.sheets()?;
    let backend = sheets.as_ref();
    let sheet = &state.config.sheets.sheet_names.custom_view;
    let cells = &state.config.sheets.control_cells;

    let observed = state
        .sheets_retry()
        .run("Trigger read", SheetsError::is_transient, || {
            read_trigger_cells(backend, sheet, cells)
        })
        .await?;

    match observed.evaluate() {
        TriggerStatus::Armed(request) => Ok(Some(request)),
        TriggerStatus::Incomplete => {
            warn!("Trigger set but symbol or date range is missing");
            Ok(None)
        }
        TriggerStatus::NotArmed => {
            debug!("Trigger not armed");
            Ok(None)
        }
    }
}

/// One poll: check the trigger and run the pipeline when it is armed.
pub async fn poll_once(
    state: &mut ProcessState,
) -> std::result::Result<Option<CycleOutcome>, SheetsError> {
    let Some(request) = check_trigger(state).await? else {
        return Ok(None);
    };

    info!(
        "Trigger detected: {} ({} → {})",
        request.symbol, request.from_date, request.to_date
    );
    state.transaction = Transaction::from_request(&request);
    Ok(Some(pipeline::run(state).await))
}

/// Poll until shutdown is requested
pub async fn poll_loop(state: &mut ProcessState) {
    let interval = state.config.sheets.poll_interval();
    info!("Monitoring for triggers every {}s", interval.as_secs());

    while state.lifecycle().is_running() {
        match poll_once(state).await {
            Ok(Some(outcome)) if !outcome.is_success() => {
                warn!("Cycle finished with errors; waiting for next trigger")
            }
            Ok(_) => {}
            Err(e) => error!("Monitor loop error: {}", e),
        }

        if !state.lifecycle().sleep_or_shutdown(interval).await {
            break;
        }
    }

    info!("Monitor stopped");
}

/// Write a probe value and read it back to confirm write access.
pub async fn probe(
    sheets: &dyn SheetsBackend,
    sheet: &str,
    cell: &str,
    value: &str,
) -> std::result::Result<Option<String>, SheetsError> {
    sheets
        .write_values(sheet, cell, vec![vec![serde_json::Value::from(value)]])
        .await?;
    sheets.read_cell(sheet, cell).await
}
