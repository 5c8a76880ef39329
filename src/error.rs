use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the delivery poller
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid credentials file: {0}")]
    Credentials(String),

    // Pipeline stage errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Sheets(#[from] SheetsError),

    // State machine errors
    #[error("Invalid stage transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the two-step market data download
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("403 Forbidden - {0}")]
    AccessDenied(String),

    #[error("404 Not Found - {0}")]
    NotFound(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("No cookies received from {0}")]
    NoCookies(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to store payload {path}: {reason}")]
    Storage { path: PathBuf, reason: String },
}

impl FetchError {
    /// Classify a transport-level reqwest failure.
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout_secs)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Failures while turning a stored payload into rows and metrics
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("CSV file not found: {0}")]
    MissingPayload(String),

    #[error("Failed to process CSV: {0}")]
    Parse(String),

    #[error("Failed to read CSV: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ProcessError {
    fn from(err: csv::Error) -> Self {
        ProcessError::Parse(err.to_string())
    }
}

/// Failures talking to the spreadsheet backend
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Sheets authentication failed: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Sheets transport error: {0}")]
    Transport(String),

    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("Unexpected Sheets response: {0}")]
    Decode(String),

    #[error("Spreadsheet client not connected")]
    NotConnected,
}

impl SheetsError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SheetsError::Transport(_) => true,
            SheetsError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SheetsError::Decode(err.to_string())
        } else {
            SheetsError::Transport(err.to_string())
        }
    }
}
