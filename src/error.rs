//! Error taxonomy for reference loading, lookups, validation and scenario pricing

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, PricingError>;

/// How far a failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Reference data cannot be trusted; nothing downstream may run
    Session,
    /// Only the current calculation attempt fails; the user corrects the input
    Calculation,
}

/// Errors raised by the pricing engines
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingReferenceColumn { table: String, column: String },

    #[error("reference table '{table}' is not loaded")]
    MissingTable { table: String },

    #[error("table '{table}' has no row where {column} = '{key}'")]
    LookupNotFound {
        table: String,
        column: String,
        key: String,
    },

    #[error("rate not found: {coverage} - {subcover}")]
    RateNotFound { coverage: String, subcover: String },

    #[error("table '{table}' row {row}, column '{column}': invalid value '{value}' ({reason})")]
    InvalidReferenceValue {
        table: String,
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("acquisition {acquisition:.4} leaves a non-positive loading denominator ({denominator:.4})")]
    InvalidScenario { acquisition: f64, denominator: f64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read table '{table}': {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PricingError {
    /// Classify the failure per the propagation policy:
    /// table-load and column errors halt the session, everything else only the attempt.
    pub fn scope(&self) -> ErrorScope {
        match self {
            PricingError::MissingReferenceColumn { .. }
            | PricingError::MissingTable { .. }
            | PricingError::InvalidReferenceValue { .. }
            | PricingError::Csv { .. }
            | PricingError::Io { .. } => ErrorScope::Session,
            PricingError::LookupNotFound { .. }
            | PricingError::RateNotFound { .. }
            | PricingError::InvalidScenario { .. }
            | PricingError::Validation(_) => ErrorScope::Calculation,
        }
    }

    pub fn is_session_fatal(&self) -> bool {
        self.scope() == ErrorScope::Session
    }
}

/// Input problems that block a calculation before any lookup runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no products configured")]
    NoProducts,

    #[error("product {product}: {field} not selected")]
    MissingSelection { product: usize, field: String },

    #[error("product {product}: risk factors incomplete (missing {missing:?})")]
    IncompleteFactors { product: usize, missing: Vec<String> },

    #[error("unknown factor column '{column}'")]
    UnknownFactorColumn { column: String },

    #[error("product {product}: acquisition {acquisition:.4} exceeds the maximum of {maximum:.4}")]
    AcquisitionAboveMaximum {
        product: usize,
        acquisition: f64,
        maximum: f64,
    },

    #[error("{field} must not be empty")]
    MissingInput { field: String },

    #[error("{field} = {value} is out of range ({min} to {max})")]
    OutOfBounds {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{terms} sum to {sum:.4}, which must stay below 100%")]
    AssumptionSumTooHigh { terms: String, sum: f64 },

    #[error("loading denominator for acquisition {acquisition:.4} is {denominator:.4}, must be positive")]
    NonPositiveDenominator { acquisition: f64, denominator: f64 },
}
