use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of an expression node.
///
/// `Value` is the numeric wildcard: it unifies with `Price` and `Volume` in
/// type-equivalence checks, so a plain number can stand anywhere a
/// quote-derived figure is expected. `Quote` is the type of the raw OHLCV
/// field references and is only legal inside lag/min/max/avg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprType {
    Boolean,
    Value,
    Volume,
    Price,
    Quote,
}

impl ExprType {
    /// Two types are equivalent iff identical, or one is `Value` and the
    /// other is `Price` or `Volume`.
    pub fn equivalent(self, other: ExprType) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (ExprType::Value, ExprType::Price)
                | (ExprType::Value, ExprType::Volume)
                | (ExprType::Price, ExprType::Value)
                | (ExprType::Volume, ExprType::Value)
        )
    }

    /// Numeric types may appear as arithmetic/comparison operands.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ExprType::Boolean | ExprType::Quote)
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprType::Boolean => "boolean",
            ExprType::Value => "value",
            ExprType::Volume => "volume",
            ExprType::Price => "price",
            ExprType::Quote => "quote",
        };
        f.write_str(name)
    }
}

/// One of the raw OHLCV fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteKind {
    Open,
    High,
    Low,
    Close,
    Volume,
}

pub const QUOTE_KINDS: [QuoteKind; 5] = [
    QuoteKind::Open,
    QuoteKind::High,
    QuoteKind::Low,
    QuoteKind::Close,
    QuoteKind::Volume,
];

impl QuoteKind {
    /// The numeric type a lag/min/max/avg over this field produces.
    pub fn value_type(self) -> ExprType {
        match self {
            QuoteKind::Volume => ExprType::Volume,
            _ => ExprType::Price,
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuoteKind::Open => "day_open",
            QuoteKind::High => "day_high",
            QuoteKind::Low => "day_low",
            QuoteKind::Close => "day_close",
            QuoteKind::Volume => "day_volume",
        };
        f.write_str(name)
    }
}

/// Completed round trip recorded by the paper trader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub profit: f64,
    pub fees: f64,
}
