pub mod google_auth;
pub mod google_sheets;
pub mod nse;

pub use google_auth::{load_service_account, ServiceAccountAuth, ServiceAccountKey};
pub use google_sheets::GoogleSheetsClient;
pub use nse::NseFetcher;
