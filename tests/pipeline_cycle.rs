mod common;

use common::{csv_rows, MemorySheets, RELIANCE_CSV};
use delivery_watch::config::AppConfig;
use delivery_watch::coordination::Lifecycle;
use delivery_watch::domain::{CycleOutcome, Transaction};
use delivery_watch::services::poll_once;
use delivery_watch::sheets::GridSize;
use delivery_watch::state::ProcessState;
use mockito::{Matcher, Mock, ServerGuard};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const API_PATH: &str = "/api/historicalOR/generateSecurityWiseHistoricalData";

fn config_for(server: &ServerGuard, data_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default_config("test-sheet", data_dir);
    config.provider.homepage_url = server.url();
    config.provider.base_url = server.url();
    config.provider.timeout_seconds = 5;
    config.sheets.retry_delay_ms = 10;
    config
}

async fn homepage_with_cookie(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_header("set-cookie", "nsit=abc123; Path=/")
        .with_body("<html><body>NSE</body></html>")
        .create_async()
        .await
}

fn state_for(config: AppConfig, sheets: &Arc<MemorySheets>) -> ProcessState {
    ProcessState::new(config, Lifecycle::new()).with_sheets(sheets.clone())
}

fn csv_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// An armed RELIANCE trigger produces SUCCESS, the mean to 2 dp, the raw
/// rows on RAW_DATA and a cleared trigger; the next poll does nothing.
#[tokio::test]
async fn armed_trigger_runs_one_successful_cycle() {
    let mut server = mockito::Server::new_async().await;
    let home = homepage_with_cookie(&mut server).await;
    let api = server
        .mock("GET", API_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("from".into(), "01-01-2025".into()),
            Matcher::UrlEncoded("to".into(), "31-01-2025".into()),
            Matcher::UrlEncoded("symbol".into(), "RELIANCE".into()),
            Matcher::UrlEncoded("type".into(), "priceVolumeDeliverable".into()),
            Matcher::UrlEncoded("series".into(), "ALL".into()),
            Matcher::UrlEncoded("csv".into(), "true".into()),
        ]))
        .match_header("cookie", Matcher::Regex("nsit=abc123".into()))
        .match_header("x-requested-with", "XMLHttpRequest")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(RELIANCE_CSV)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("reliance", "01-01-2025", "31-01-2025", "TRUE");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap();
    assert_eq!(outcome, Some(CycleOutcome::Success));

    assert_eq!(sheets.status("Status").as_deref(), Some("SUCCESS"));
    assert_eq!(sheets.status("Symbol").as_deref(), Some("RELIANCE"));
    assert_eq!(
        sheets.status("Date Range").as_deref(),
        Some("01-01-2025 → 31-01-2025")
    );
    assert_eq!(sheets.status("Total Rows").as_deref(), Some("3"));
    assert_eq!(sheets.status("Avg Delivery %").as_deref(), Some("47.88"));
    assert_eq!(sheets.status("Max Delivery %").as_deref(), Some("50.3"));
    assert_eq!(sheets.status("Min Delivery %").as_deref(), Some("45.1"));
    assert_eq!(sheets.status("Error").as_deref(), Some("None"));

    // Round trip: what was downloaded is what the sheet shows
    assert_eq!(sheets.rows("RAW_DATA"), csv_rows(RELIANCE_CSV));
    assert_eq!(sheets.bold_rows("RAW_DATA"), vec![1]);
    assert_eq!(sheets.frozen_rows("RAW_DATA"), 1);

    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
    assert_eq!(state.transaction, Transaction::default());
    assert_eq!(csv_files(dir.path()), vec!["RELIANCE_01012025_31012025.csv"]);

    // Trigger was consumed: nothing more happens
    assert_eq!(poll_once(&mut state).await.unwrap(), None);

    home.assert_async().await;
    api.assert_async().await;
}

/// A 403 from the data endpoint reports ERROR and still clears the trigger.
#[tokio::test]
async fn forbidden_response_reports_error_and_clears_trigger() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("Access Denied")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.set_cell("RAW_DATA", "A1", "previous");
    sheets.arm("TCS", "01-01-2025", "31-01-2025", "yes");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    let CycleOutcome::Failed(message) = outcome else {
        panic!("expected a failed cycle");
    };
    assert!(message.starts_with("NSE fetch failed"), "got: {message}");
    assert!(message.contains("403") && message.contains("Forbidden"));

    assert_eq!(sheets.status("Status").as_deref(), Some("ERROR"));
    assert_eq!(sheets.status("Error").as_deref(), Some(message.as_str()));
    assert_eq!(sheets.status("Total Rows").as_deref(), Some("0"));
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));

    // Raw data is left alone on failure
    assert_eq!(sheets.cell("RAW_DATA", "A1").as_deref(), Some("previous"));
}

/// An unknown symbol (404) is reported as Not Found and the trigger is reset.
#[tokio::test]
async fn not_found_response_reports_invalid_symbol() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("{}")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("NOSUCHCO", "01-01-2025", "31-01-2025", "TRUE");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    let CycleOutcome::Failed(message) = outcome else {
        panic!("expected a failed cycle");
    };
    assert!(message.contains("404 Not Found"), "got: {message}");
    assert_eq!(sheets.status("Status").as_deref(), Some("ERROR"));
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
    assert!(csv_files(dir.path()).is_empty());
}

/// Any other non-2xx status is reported with its code.
#[tokio::test]
async fn server_error_reports_http_status() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("WIPRO", "01-01-2025", "31-01-2025", "TRUE");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    assert!(
        matches!(outcome, CycleOutcome::Failed(ref m) if m.starts_with("NSE fetch failed: HTTP 500")),
        "got: {outcome:?}"
    );
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
}

/// A response slower than the configured timeout fails the cycle as a timeout.
#[tokio::test]
async fn slow_response_times_out() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(RELIANCE_CSV.as_bytes())
        })
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("ITC", "01-01-2025", "31-01-2025", "TRUE");
    let mut config = config_for(&server, dir.path());
    config.provider.timeout_seconds = 1;
    let mut state = state_for(config, &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Failed("NSE fetch failed: Request timed out after 1s".to_string())
    );
    assert_eq!(sheets.status("Status").as_deref(), Some("ERROR"));
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
    assert!(csv_files(dir.path()).is_empty());
}

/// A symbol that looks like a path is refused before any request or file write.
#[tokio::test]
async fn path_like_symbol_is_rejected_before_fetching() {
    let mut server = mockito::Server::new_async().await;
    let api = server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let root = tempfile::tempdir().unwrap();
    let data_dir = root.path().join("data");
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("../../escape", "01-01-2025", "31-01-2025", "TRUE");
    let mut state = state_for(config_for(&server, &data_dir), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    assert!(
        matches!(outcome, CycleOutcome::Failed(ref m) if m.contains("invalid characters")),
        "got: {outcome:?}"
    );
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
    let escaped = data_dir.join("../../ESCAPE_01012025_31012025.csv");
    assert!(!escaped.exists());
    assert!(!data_dir.exists() || csv_files(&data_dir).is_empty());
    api.assert_async().await;
}

/// An HTML page served with 200 is rejected and nothing is saved.
#[tokio::test]
async fn html_payload_is_rejected_without_saving() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<!DOCTYPE html><html><head><title>Resource not found</title></head></html>")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("INFY", "01-01-2025", "31-01-2025", "X");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    assert!(matches!(outcome, CycleOutcome::Failed(ref m) if m.contains("HTML instead of CSV")));
    assert!(csv_files(dir.path()).is_empty());
    assert_eq!(sheets.cell("CUSTOM_VIEW", "B4").as_deref(), Some("FALSE"));
}

/// Without a session cookie the data endpoint is never called.
#[tokio::test]
async fn missing_session_cookie_stops_the_fetch() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;
    let api = server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    sheets.arm("SBIN", "01-01-2025", "31-01-2025", "1");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap().unwrap();
    assert!(matches!(outcome, CycleOutcome::Failed(ref m) if m.contains("No cookies")));
    assert_eq!(sheets.status("Status").as_deref(), Some("ERROR"));
    api.assert_async().await;
}

/// A payload larger than the sheet grows the grid instead of failing.
#[tokio::test]
async fn large_payload_grows_raw_data_grid() {
    let mut body = String::from("Date,Deliverable Qty,% Dly Qt to Traded Qty\n");
    for day in 0..150 {
        body.push_str(&format!("D{day},1000,{}.00\n", 40 + day % 20));
    }

    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.clone())
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::with_grid(GridSize { rows: 100, cols: 2 }));
    sheets.arm("HDFCBANK", "01-01-2024", "31-12-2024", "TRUE");
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let outcome = poll_once(&mut state).await.unwrap();
    assert_eq!(outcome, Some(CycleOutcome::Success));
    assert_eq!(sheets.size("RAW_DATA"), GridSize { rows: 151, cols: 3 });
    assert_eq!(sheets.rows("RAW_DATA").len(), 151);
    assert_eq!(sheets.status("Total Rows").as_deref(), Some("150"));
}

/// Fetching the same payload twice gives the same published statistics.
#[tokio::test]
async fn repeated_cycles_publish_identical_metrics() {
    let mut server = mockito::Server::new_async().await;
    homepage_with_cookie(&mut server).await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(RELIANCE_CSV)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::default());
    let mut state = state_for(config_for(&server, dir.path()), &sheets);

    let mut published = Vec::new();
    for _ in 0..2 {
        sheets.arm("RELIANCE", "01-01-2025", "31-01-2025", "TRUE");
        assert_eq!(
            poll_once(&mut state).await.unwrap(),
            Some(CycleOutcome::Success)
        );
        published.push(
            ["Total Rows", "Avg Delivery %", "Max Delivery %", "Min Delivery %"]
                .map(|label| sheets.status(label)),
        );
    }

    assert_eq!(published[0], published[1]);
}
