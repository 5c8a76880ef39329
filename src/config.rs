use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub sheets: SheetsConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Defaults for the manual `fetch` command
    #[serde(default)]
    pub project: Option<ProjectConfig>,
}

/// Market data provider (NSE) endpoints and headers
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Landing page visited first to obtain session cookies
    pub homepage_url: String,
    /// Base URL for the API endpoint
    pub base_url: String,
    /// Historical data endpoint path
    pub api_endpoint: String,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default = "default_series")]
    pub series: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Headers sent with the data request (XHR-style)
    #[serde(default = "default_api_headers")]
    pub headers: HashMap<String, String>,
}

fn default_report_type() -> String {
    "priceVolumeDeliverable".to_string()
}

fn default_series() -> String {
    "ALL".to_string()
}

fn default_timeout_seconds() -> u64 {
    20
}

fn default_api_headers() -> HashMap<String, String> {
    HashMap::from([
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        ("Accept".to_string(), "*/*".to_string()),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        (
            "Referer".to_string(),
            "https://www.nseindia.com/report-detail/eq_security".to_string(),
        ),
        ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
    ])
}

impl ProviderConfig {
    /// Full URL of the historical data endpoint
    pub fn api_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_endpoint
        )
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn accept_language(&self) -> &str {
        self.header("accept-language").unwrap_or("en-US,en;q=0.9")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Google Sheets connection, layout and polling
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// Service-account key file (`~` is expanded)
    pub credentials_file: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts for retried calls (connect, trigger reads)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub sheet_names: SheetNames,
    #[serde(default)]
    pub control_cells: ControlCells,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

impl SheetsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetNames {
    /// Control sheet holding the trigger cells
    pub custom_view: String,
    pub raw_data: String,
    pub system_status: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            custom_view: "CUSTOM_VIEW".to_string(),
            raw_data: "RAW_DATA".to_string(),
            system_status: "SYSTEM_STATUS".to_string(),
        }
    }
}

/// A1 addresses of the trigger record on the control sheet
#[derive(Debug, Clone, Deserialize)]
pub struct ControlCells {
    pub symbol: String,
    pub from_date: String,
    pub to_date: String,
    pub trigger: String,
}

impl Default for ControlCells {
    fn default() -> Self {
        Self {
            symbol: "B1".to_string(),
            from_date: "B2".to_string(),
            to_date: "B3".to_string(),
            trigger: "B4".to_string(),
        }
    }
}

/// Local payload storage and retention
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub folder: PathBuf,
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,
    /// Reference file that per-run cleanup never deletes
    #[serde(default = "default_master_list")]
    pub master_list_filename: String,
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_filename_pattern() -> String {
    "{symbol}_{from_date}_{to_date}.csv".to_string()
}

fn default_master_list() -> String {
    "nse_equity_list.csv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_age_hours() -> u64 {
    24
}

impl DataConfig {
    /// Payload filename for one request; dates lose their separators.
    pub fn payload_filename(&self, symbol: &str, from_date: &str, to_date: &str) -> String {
        self.filename_pattern
            .replace("{symbol}", symbol)
            .replace("{from_date}", &from_date.replace('-', ""))
            .replace("{to_date}", &to_date.replace('-', ""))
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Persistent log file
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Mirror log lines to the console
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/app.log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            console: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub symbol: String,
    #[serde(default)]
    pub series: Option<String>,
    pub from_date: String,
    pub to_date: String,
}

impl AppConfig {
    /// Load configuration from a file, with `DELIVERY_` environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.console", true)?
            .set_default("data.cleanup_enabled", true)?
            .add_source(File::from(path).required(true))
            // Override with environment variables (DELIVERY_SHEETS__SPREADSHEET_ID, etc.)
            .add_source(
                Environment::with_prefix("DELIVERY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration with production endpoints, rooted at `data_folder`
    pub fn default_config(spreadsheet_id: &str, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            provider: ProviderConfig {
                homepage_url: "https://www.nseindia.com".to_string(),
                base_url: "https://www.nseindia.com".to_string(),
                api_endpoint: "/api/historicalOR/generateSecurityWiseHistoricalData".to_string(),
                report_type: default_report_type(),
                series: default_series(),
                timeout_seconds: default_timeout_seconds(),
                headers: default_api_headers(),
            },
            sheets: SheetsConfig {
                spreadsheet_id: spreadsheet_id.to_string(),
                credentials_file: PathBuf::from("config/credentials.json"),
                poll_interval_seconds: default_poll_interval(),
                retry_attempts: default_retry_attempts(),
                retry_delay_ms: default_retry_delay_ms(),
                api_base_url: default_api_base_url(),
                sheet_names: SheetNames::default(),
                control_cells: ControlCells::default(),
            },
            data: DataConfig {
                folder: data_folder.into(),
                filename_pattern: default_filename_pattern(),
                master_list_filename: default_master_list(),
                cleanup_enabled: true,
                max_age_hours: default_max_age_hours(),
            },
            logging: LoggingConfig::default(),
            project: None,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sheets.spreadsheet_id.trim().is_empty() {
            errors.push("sheets.spreadsheet_id must not be empty".to_string());
        }

        if self.sheets.poll_interval_seconds == 0 {
            errors.push("sheets.poll_interval_seconds must be positive".to_string());
        }

        if self.sheets.retry_attempts == 0 {
            errors.push("sheets.retry_attempts must be at least 1".to_string());
        }

        if self.provider.timeout_seconds == 0 {
            errors.push("provider.timeout_seconds must be positive".to_string());
        }

        for (name, value) in [
            ("provider.homepage_url", &self.provider.homepage_url),
            ("provider.base_url", &self.provider.base_url),
            ("sheets.api_base_url", &self.sheets.api_base_url),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{name} is not a valid URL: {value}"));
            }
        }

        if !self.provider.api_endpoint.starts_with('/') {
            errors.push("provider.api_endpoint must start with '/'".to_string());
        }

        if !self.data.filename_pattern.contains("{symbol}") {
            errors.push("data.filename_pattern must contain {symbol}".to_string());
        }

        if !self
            .data
            .filename_pattern
            .to_ascii_lowercase()
            .ends_with(".csv")
        {
            errors.push("data.filename_pattern must end with .csv".to_string());
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!("logging.level is not a valid level: {}", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
