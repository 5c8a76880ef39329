pub mod monitor;
pub mod pipeline;
pub mod processor;
pub mod retention;

pub use monitor::{check_trigger, connect_sheets, poll_loop, poll_once};
pub use processor::RecordProcessor;
