//! Coordination for the polling process
//!
//! - Lifecycle: signal handling and the shutdown flag
//! - Retry policy for the few calls that are retried

pub mod lifecycle;
pub mod retry;

pub use lifecycle::Lifecycle;
pub use retry::RetryPolicy;
