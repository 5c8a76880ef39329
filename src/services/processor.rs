//! Payload parsing and delivery statistics

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::DataConfig;
use crate::domain::{DeliveryMetrics, Transaction};
use crate::error::ProcessError;
use crate::services::retention;

const BOM: char = '\u{feff}';
const METRIC_DP: u32 = 2;

pub struct RecordProcessor<'a> {
    data: &'a DataConfig,
}

impl<'a> RecordProcessor<'a> {
    pub fn new(data: &'a DataConfig) -> Self {
        Self { data }
    }

    /// Load the transaction's payload into raw rows and metrics, then drop
    /// older payloads from the data folder.
    pub fn process(&self, txn: &mut Transaction) -> Result<(), ProcessError> {
        let path = txn
            .payload_path
            .clone()
            .ok_or_else(|| ProcessError::MissingPayload("no payload path recorded".to_string()))?;

        if !path.is_file() {
            return Err(ProcessError::MissingPayload(path.display().to_string()));
        }

        let (header, body) = read_payload(&path)?;
        if body.is_empty() {
            warn!("CSV is empty: {}", path.display());
        }

        txn.metrics = compute_metrics(&header, &body);
        txn.raw_rows = std::iter::once(header).chain(body).collect();

        info!(
            "Processed {} rows: avg {}%, max {}%, min {}%",
            txn.metrics.total_rows,
            txn.metrics.avg_delivery_pct,
            txn.metrics.max_delivery_pct,
            txn.metrics.min_delivery_pct
        );

        let removed =
            retention::remove_stale_payloads(&self.data.folder, &path, &self.data.master_list_filename);
        if removed > 0 {
            info!("Removed {} old CSV file(s)", removed);
        }

        Ok(())
    }
}

/// Header row and body rows of a delimited file
pub fn read_payload(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), ProcessError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if let Some(first) = header.first_mut() {
        *first = first.trim_start_matches(BOM).trim().to_string();
    }
    if header.iter().all(String::is_empty) {
        return Err(ProcessError::Parse(format!(
            "{} has no header row",
            path.display()
        )));
    }

    let mut body = Vec::new();
    for record in reader.records() {
        let record = record?;
        body.push(record.iter().map(str::to_string).collect());
    }

    debug!("Read {} body row(s) from {}", body.len(), path.display());
    Ok((header, body))
}

/// Index of the first column named like a delivery percentage
pub fn find_delivery_column(header: &[String]) -> Option<usize> {
    header.iter().position(|name| {
        let name = name.to_lowercase();
        name.contains('%') && (name.contains("dly") || name.contains("delivery"))
    })
}

/// A delivery percentage in `0..=100`; anything else is skipped
fn parse_pct(cell: &str) -> Option<Decimal> {
    let value = Decimal::from_str(cell.trim()).ok()?;
    if (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&value) {
        Some(value)
    } else {
        debug!("Skipping out-of-range delivery value: {}", cell.trim());
        None
    }
}

pub fn compute_metrics(header: &[String], body: &[Vec<String>]) -> DeliveryMetrics {
    let mut metrics = DeliveryMetrics {
        total_rows: body.len(),
        ..DeliveryMetrics::default()
    };

    let Some(column) = find_delivery_column(header) else {
        warn!("No delivery % column found in header");
        return metrics;
    };
    debug!("Delivery column: {}", header[column]);

    let values: Vec<Decimal> = body
        .iter()
        .filter_map(|row| row.get(column))
        .filter_map(|cell| parse_pct(cell))
        .collect();

    if values.is_empty() {
        return metrics;
    }

    let count = Decimal::from(values.len());
    let Some(avg) = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .and_then(|sum| sum.checked_div(count))
    else {
        warn!("Delivery % sum overflowed; statistics left at zero");
        return metrics;
    };
    metrics.avg_delivery_pct = avg.round_dp(METRIC_DP);
    metrics.max_delivery_pct = values.iter().copied().max().unwrap_or_default().round_dp(METRIC_DP);
    metrics.min_delivery_pct = values.iter().copied().min().unwrap_or_default().round_dp(METRIC_DP);
    metrics
}
