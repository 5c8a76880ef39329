use delivery_watch::adapters::load_service_account;
use delivery_watch::cli::Commands;
use delivery_watch::config::AppConfig;
use delivery_watch::coordination::Lifecycle;
use delivery_watch::domain::{format_date_for_display, Transaction, TriggerRequest};
use delivery_watch::error::{AppError, Result};
use delivery_watch::services::{monitor, pipeline};
use delivery_watch::state::ProcessState;
use tracing::info;

pub(crate) async fn run(command: &Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Run => run_monitor(config).await,
        Commands::Fetch { symbol, from, to } => {
            run_fetch(config, symbol.as_deref(), from.as_deref(), to.as_deref()).await
        }
        Commands::Probe { sheet, cell, value } => run_probe(&config, sheet, cell, value).await,
        Commands::CheckConfig => run_check_config(&config),
    }
}

async fn run_monitor(config: AppConfig) -> Result<()> {
    info!("delivery-watch {} starting", env!("CARGO_PKG_VERSION"));

    let lifecycle = Lifecycle::new();
    lifecycle.register()?;

    std::fs::create_dir_all(&config.data.folder)?;
    let sheets = monitor::connect_sheets(&config).await?;

    let mut state = ProcessState::new(config, lifecycle).with_sheets(sheets);
    monitor::poll_loop(&mut state).await;

    info!("Shutdown complete");
    Ok(())
}

async fn run_fetch(
    mut config: AppConfig,
    symbol: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let project = config.project.clone();
    let pick = |arg: Option<&str>, fallback: Option<String>, name: &str| {
        arg.map(str::to_string).or(fallback).ok_or_else(|| {
            AppError::InvalidConfig(format!("no {name} given and [project] does not set one"))
        })
    };

    let request = TriggerRequest::new(
        pick(symbol, project.as_ref().map(|p| p.symbol.clone()), "symbol")?,
        pick(from, project.as_ref().map(|p| p.from_date.clone()), "from date")?,
        pick(to, project.as_ref().map(|p| p.to_date.clone()), "to date")?,
    );
    if let Some(series) = project.and_then(|p| p.series) {
        config.provider.series = series;
    }

    let mut txn = Transaction::from_request(&request);
    pipeline::fetch_and_process(&config, &mut txn).await?;

    println!(
        "{} {} to {}",
        txn.symbol,
        format_date_for_display(&txn.from_date),
        format_date_for_display(&txn.to_date)
    );
    if let Some(path) = &txn.payload_path {
        println!("  File:           {}", path.display());
    }
    println!("  Rows:           {}", txn.metrics.total_rows);
    println!("  Avg Delivery %: {}", txn.metrics.avg_delivery_pct);
    println!("  Max Delivery %: {}", txn.metrics.max_delivery_pct);
    println!("  Min Delivery %: {}", txn.metrics.min_delivery_pct);
    Ok(())
}

async fn run_probe(config: &AppConfig, sheet: &str, cell: &str, value: &str) -> Result<()> {
    let sheets = monitor::connect_sheets(config).await?;
    let read_back = monitor::probe(sheets.as_ref(), sheet, cell, value).await?;

    match read_back.as_deref() {
        Some(v) if v == value => {
            println!("\x1b[32m✓ Wrote {value} to {sheet}!{cell}\x1b[0m");
            Ok(())
        }
        other => Err(AppError::Other(anyhow::anyhow!(
            "probe wrote {value} to {sheet}!{cell} but read back {other:?}"
        ))),
    }
}

fn run_check_config(config: &AppConfig) -> Result<()> {
    let key = load_service_account(&config.sheets.credentials_file)?;

    println!("\x1b[32m✓ Configuration valid\x1b[0m");
    println!("  Spreadsheet:     {}", config.sheets.spreadsheet_id);
    println!("  Service account: {}", key.client_email);
    println!(
        "  Control sheet:   {} ({}, {}, {}, trigger {})",
        config.sheets.sheet_names.custom_view,
        config.sheets.control_cells.symbol,
        config.sheets.control_cells.from_date,
        config.sheets.control_cells.to_date,
        config.sheets.control_cells.trigger
    );
    println!("  Poll interval:   {}s", config.sheets.poll_interval_seconds);
    println!("  Data folder:     {}", config.data.folder.display());
    println!("  Provider API:    {}", config.provider.api_url());
    Ok(())
}
