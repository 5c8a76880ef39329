//! delivery-watch CLI
//!
//! Commands:
//! - `delivery-watch run` - poll the control sheet (default)
//! - `delivery-watch fetch` - one-shot download to the data folder
//! - `delivery-watch probe` - spreadsheet write check
//! - `delivery-watch check-config` - validate configuration

pub mod runtime;

pub use runtime::{Cli, Commands};
