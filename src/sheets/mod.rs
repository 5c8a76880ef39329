//! Spreadsheet access: the backend seam and the result writer

pub mod traits;
pub mod writer;

pub use traits::{GridSize, SheetsBackend};
pub use writer::{status_block, SheetsWriter, TRIGGER_RESET_VALUE};

#[cfg(test)]
pub use traits::MockSheetsBackend;
