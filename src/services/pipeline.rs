//! One fetch -> process -> write cycle for a consumed trigger.

use tracing::{error, info};

use crate::adapters::NseFetcher;
use crate::config::AppConfig;
use crate::domain::{CycleOutcome, Stage, Transaction};
use crate::error::{AppError, Result};
use crate::services::processor::RecordProcessor;
use crate::services::retention;
use crate::sheets::SheetsWriter;
use crate::state::ProcessState;

/// Run the cycle for `state.transaction`.
///
/// Failures never escape: they are reported to the status sheet and
/// returned as `CycleOutcome::Failed`. The transaction is always reset.
pub async fn run(state: &mut ProcessState) -> CycleOutcome {
    let config = state.config.clone();

    let outcome = match execute(state, &config).await {
        Ok(()) => {
            info!(
                "Pipeline completed: {} ({})",
                state.transaction.symbol,
                state.transaction.date_range()
            );
            CycleOutcome::Success
        }
        Err(e) => {
            let message = failure_message(&e);
            error!("{}", message);
            state.transaction.fail(message.clone());
            report_failure(state).await;
            CycleOutcome::Failed(message)
        }
    };

    state.transaction = Transaction::default();

    if config.data.cleanup_enabled {
        let removed = retention::cleanup_old_files(
            &config.data.folder,
            config.data.max_age(),
            &config.data.master_list_filename,
        );
        if removed > 0 {
            info!(
                "Cleaned up {} file(s) older than {}h",
                removed, config.data.max_age_hours
            );
        }
    }

    outcome
}

pub fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Fetch(e) => format!("NSE fetch failed: {e}"),
        other => format!("Pipeline error: {other}"),
    }
}

async fn execute(state: &mut ProcessState, config: &AppConfig) -> Result<()> {
    let sheets = state.sheets()?;

    fetch_and_process(config, &mut state.transaction).await?;

    state.transaction.advance(Stage::Writing)?;
    SheetsWriter::new(sheets, &config.sheets)
        .write_results(&state.transaction)
        .await?;

    state.transaction.advance(Stage::Idle)
}

/// The fetch and processing stages; leaves the transaction in PROCESSING.
pub async fn fetch_and_process(config: &AppConfig, txn: &mut Transaction) -> Result<()> {
    txn.advance(Stage::Fetching)?;
    let fetcher = NseFetcher::new(config.provider.clone(), config.data.clone());
    let path = fetcher.fetch(&txn.request()).await?;
    txn.payload_path = Some(path);

    txn.advance(Stage::Processing)?;
    RecordProcessor::new(&config.data).process(txn)?;
    Ok(())
}

async fn report_failure(state: &ProcessState) {
    match state.sheets() {
        Ok(sheets) => {
            SheetsWriter::new(sheets, &state.config.sheets)
                .write_error(&state.transaction)
                .await
        }
        Err(e) => error!("Cannot report failure to spreadsheet: {}", e),
    }
}
