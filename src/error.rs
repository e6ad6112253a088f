use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalanceSheetError {
    #[error("Balance sheet for year {year} already exists")]
    DuplicateYear { year: i32, sheet_id: Option<u32> },

    #[error("Maximum of {max} balance sheets allowed for company '{company}'")]
    SheetCapacityExceeded { company: String, max: usize },

    #[error("Maximum of {max} companies allowed")]
    CompanyCapacityExceeded { max: usize },

    #[error("Company {0} not found")]
    CompanyNotFound(u32),

    #[error("Balance sheet {0} not found")]
    SheetNotFound(u32),

    #[error("Invalid amount '{0}': expected a number")]
    InvalidAmount(String),

    #[error("Invalid year '{0}': expected a whole number")]
    InvalidYear(String),

    #[error("Year {0} has no adjacent year")]
    YearOutOfRange(i32),

    #[error("Balance sheet equation not satisfied: Assets ({assets}) != Liabilities ({liabilities}) + Equity ({equity}), difference {difference}")]
    EquationImbalance {
        assets: f64,
        liabilities: f64,
        equity: f64,
        difference: f64,
    },

    #[error("Stale analysis for sheet {sheet_id}: expected revision {expected}, found {actual}")]
    StaleAnalysis {
        sheet_id: u32,
        expected: u64,
        actual: u64,
    },

    #[error("External call failed: {0}")]
    ExternalCall(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BalanceSheetError {
    /// Conflicts reject a single operation and leave state unchanged.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateYear { .. }
                | Self::SheetCapacityExceeded { .. }
                | Self::CompanyCapacityExceeded { .. }
                | Self::StaleAnalysis { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BalanceSheetError>;
