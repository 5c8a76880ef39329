use clap::{Parser, Subcommand};

/// Command line for the delivery poller
#[derive(Parser, Debug)]
#[command(name = "delivery-watch")]
#[command(version)]
#[command(
    about = "Watches a Google Sheets trigger and publishes NSE delivery statistics",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Connect to the spreadsheet and poll for triggers (default)
    Run,

    /// Fetch and process one date range to disk without touching the sheet
    Fetch {
        /// Equity symbol (default: project.symbol)
        #[arg(short, long)]
        symbol: Option<String>,
        /// Start date, DD-MM-YYYY (default: project.from_date)
        #[arg(long)]
        from: Option<String>,
        /// End date, DD-MM-YYYY (default: project.to_date)
        #[arg(long)]
        to: Option<String>,
    },

    /// Write a test value to the spreadsheet to verify access
    Probe {
        #[arg(long, default_value = "SYSTEM_STATUS")]
        sheet: String,
        #[arg(long, default_value = "B12")]
        cell: String,
        #[arg(long, default_value = "TEST_OK")]
        value: String,
    },

    /// Load and validate configuration and credentials
    CheckConfig,
}

impl Cli {
    /// The subcommand to run; no subcommand means `run`
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Run)
    }
}
