use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::debug;

use super::state::Stage;
use super::trigger::TriggerRequest;
use crate::error::{AppError, Result};

/// Summary statistics over the delivery-percentage column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryMetrics {
    /// Body rows in the payload (header excluded)
    pub total_rows: usize,
    pub avg_delivery_pct: Decimal,
    pub max_delivery_pct: Decimal,
    pub min_delivery_pct: Decimal,
}

/// Working record for exactly one pipeline cycle.
///
/// A new value replaces the old one at the end of every cycle, so nothing
/// carries over between polls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub symbol: String,
    pub from_date: String,
    pub to_date: String,
    pub payload_path: Option<PathBuf>,
    /// Header row first
    pub raw_rows: Vec<Vec<String>>,
    pub metrics: DeliveryMetrics,
    pub error: Option<String>,
    stage: Stage,
}

impl Transaction {
    pub fn from_request(request: &TriggerRequest) -> Self {
        Self {
            symbol: request.symbol.clone(),
            from_date: request.from_date.clone(),
            to_date: request.to_date.clone(),
            ..Self::default()
        }
    }

    pub fn request(&self) -> TriggerRequest {
        TriggerRequest {
            symbol: self.symbol.clone(),
            from_date: self.from_date.clone(),
            to_date: self.to_date.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to the next stage, rejecting out-of-order transitions
    pub fn advance(&mut self, to: Stage) -> Result<()> {
        if !self.stage.can_transition_to(to) {
            return Err(AppError::InvalidStateTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
            });
        }
        debug!("Stage: {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Record a failure and park the cycle in ERROR
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.stage = Stage::Error;
    }

    pub fn date_range(&self) -> String {
        format!("{} → {}", self.from_date, self.to_date)
    }
}
