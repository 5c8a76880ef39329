use std::fmt;
use std::str::FromStr;

/// Pipeline stage of the in-flight transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    /// No cycle running
    #[default]
    Idle,
    /// Downloading the payload from the provider
    Fetching,
    /// Parsing the payload and computing metrics
    Processing,
    /// Writing results back to the spreadsheet
    Writing,
    /// A stage failed; the cycle is being reported
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "IDLE",
            Stage::Fetching => "FETCHING",
            Stage::Processing => "PROCESSING",
            Stage::Writing => "WRITING",
            Stage::Error => "ERROR",
        }
    }

    /// Check if this stage can transition to another stage
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;

        match (self, target) {
            (Idle, Fetching) => true,
            (Fetching, Processing) => true,
            (Processing, Writing) => true,
            (Writing, Idle) => true, // Cycle succeeded

            // Any running stage may fail
            (Fetching, Error) | (Processing, Error) | (Writing, Error) => true,

            _ => false,
        }
    }

    /// Get valid next stages from the current stage
    pub fn valid_transitions(&self) -> Vec<Stage> {
        use Stage::*;

        match self {
            Idle => vec![Fetching],
            Fetching => vec![Processing, Error],
            Processing => vec![Writing, Error],
            Writing => vec![Idle, Error],
            Error => vec![],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IDLE" => Ok(Stage::Idle),
            "FETCHING" => Ok(Stage::Fetching),
            "PROCESSING" => Ok(Stage::Processing),
            "WRITING" => Ok(Stage::Writing),
            "ERROR" => Ok(Stage::Error),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Final result of one pipeline cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failed(String),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success)
    }
}
