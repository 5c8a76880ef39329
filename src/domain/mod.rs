pub mod state;
pub mod transaction;
pub mod trigger;

pub use state::*;
pub use transaction::*;
pub use trigger::*;
