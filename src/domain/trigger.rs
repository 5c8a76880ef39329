use chrono::NaiveDate;

use crate::error::FetchError;

/// Date format used by the control sheet and the provider API
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Trigger values that arm a cycle (compared after trim + upper-case)
pub const ARMED_VALUES: [&str; 4] = ["TRUE", "YES", "1", "X"];

/// Raw contents of the four control cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerCells {
    pub symbol: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub trigger: Option<String>,
}

/// What a poll observed in the control cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerStatus {
    NotArmed,
    /// Armed, but one of symbol / from / to is blank
    Incomplete,
    Armed(TriggerRequest),
}

/// A consumed trigger: one symbol and date range to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub symbol: String,
    pub from_date: String,
    pub to_date: String,
}

pub fn is_armed_value(value: &str) -> bool {
    let normalized = value.trim().to_uppercase();
    ARMED_VALUES.contains(&normalized.as_str())
}

fn non_empty(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TriggerCells {
    pub fn evaluate(&self) -> TriggerStatus {
        let armed = self.trigger.as_deref().map(is_armed_value).unwrap_or(false);
        if !armed {
            return TriggerStatus::NotArmed;
        }

        match (
            non_empty(&self.symbol),
            non_empty(&self.from_date),
            non_empty(&self.to_date),
        ) {
            (Some(symbol), Some(from_date), Some(to_date)) => {
                TriggerStatus::Armed(TriggerRequest {
                    symbol: symbol.to_uppercase(),
                    from_date: from_date.to_string(),
                    to_date: to_date.to_string(),
                })
            }
            _ => TriggerStatus::Incomplete,
        }
    }
}

impl TriggerRequest {
    pub fn new(
        symbol: impl Into<String>,
        from_date: impl Into<String>,
        to_date: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            from_date: from_date.into().trim().to_string(),
            to_date: to_date.into().trim().to_string(),
        }
    }

    /// Check symbol and dates before any request goes out
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.symbol.is_empty() {
            return Err(FetchError::InvalidRequest("symbol is empty".to_string()));
        }
        // The symbol names the payload file, so no separators or dots
        if !self.symbol.chars().all(is_symbol_char) {
            return Err(FetchError::InvalidRequest(format!(
                "symbol '{}' contains invalid characters",
                self.symbol
            )));
        }

        let from = parse_date(&self.from_date).ok_or_else(|| {
            FetchError::InvalidRequest(format!(
                "from date '{}' is not DD-MM-YYYY",
                self.from_date
            ))
        })?;
        let to = parse_date(&self.to_date).ok_or_else(|| {
            FetchError::InvalidRequest(format!("to date '{}' is not DD-MM-YYYY", self.to_date))
        })?;

        if from > to {
            return Err(FetchError::InvalidRequest(format!(
                "from date {} is after to date {}",
                self.from_date, self.to_date
            )));
        }

        Ok(())
    }
}

/// NSE tickers: letters, digits and `&`, `-`, `_` (e.g. `M&M`, `BAJAJ-AUTO`)
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '&' | '-' | '_')
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn validate_date_format(value: &str) -> bool {
    parse_date(value).is_some()
}

/// "08-02-2025" -> "08 Feb 2025"; unparseable input is returned unchanged.
pub fn format_date_for_display(value: &str) -> String {
    parse_date(value)
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| value.to_string())
}
