pub mod adapters;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod services;
pub mod sheets;
pub mod state;

pub use config::AppConfig;
pub use coordination::{Lifecycle, RetryPolicy};
pub use domain::{CycleOutcome, Stage, Transaction, TriggerRequest};
pub use error::{AppError, Result};
pub use sheets::{SheetsBackend, SheetsWriter};
pub use state::ProcessState;
