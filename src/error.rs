use chrono::NaiveDate;
use thiserror::Error;

/// Runtime failure while evaluating a rule against quote data.
///
/// These are expected and frequent during evolution: a candidate whose rule
/// reaches outside the loaded history simply dies off. They never abort the
/// generational loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("quote {0} day(s) in the future requested")]
    FutureDate(i64),

    #[error("quote {0} day(s) before loaded history requested")]
    PastDate(i64),

    #[error("invalid range argument: {0}")]
    InvalidRange(i64),

    #[error("no quotes loaded for symbol {0}")]
    MissingSymbol(String),

    #[error("missing quote for {symbol} on {date}")]
    MissingQuote { symbol: String, date: NaiveDate },

    #[error("undefined variable {0}")]
    UndefinedVariable(String),
}

/// Structurally ill-typed expression tree.
///
/// For trees built by the mutator or by breeding this indicates a programming
/// error and is asserted on; for externally supplied trees it is an ordinary
/// recoverable error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("type mismatch: expected {expected}, got {actual}")]
pub struct TypeError {
    pub expected: String,
    pub actual: String,
}

impl TypeError {
    pub fn new(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TradevolveError {
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("{0}")]
    Type(#[from] TypeError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data loading error: {0}")]
    DataLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TradevolveError>;
