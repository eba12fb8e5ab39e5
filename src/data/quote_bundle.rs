use crate::error::EvaluationError;
use crate::types::QuoteKind;
use chrono::NaiveDate;
use std::collections::HashMap;

/// One day of OHLCV data for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn field(&self, kind: QuoteKind) -> f64 {
        match kind {
            QuoteKind::Open => self.open,
            QuoteKind::High => self.high,
            QuoteKind::Low => self.low,
            QuoteKind::Close => self.close,
            QuoteKind::Volume => self.volume,
        }
    }
}

/// In-memory quote store shared by every fitness evaluation in a run.
///
/// All symbols are aligned on one trading calendar; a symbol may have holes
/// (no bar on a given date). Lookups are by day index plus a non-positive
/// offset, with out-of-range reads reported as future/past date errors.
/// Immutable after load, so it is safe to share read-only across runs.
#[derive(Debug, Clone, Default)]
pub struct QuoteBundle {
    dates: Vec<NaiveDate>,
    series: HashMap<String, Vec<Option<Bar>>>,
}

impl QuoteBundle {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            series: HashMap::new(),
        }
    }

    /// Add a symbol's bars, aligned to the calendar passed to `new`.
    ///
    /// Panics if the series length does not match the calendar; misaligned
    /// data is a loader bug, not a runtime condition.
    pub fn add_series(&mut self, symbol: impl Into<String>, bars: Vec<Option<Bar>>) {
        assert_eq!(
            bars.len(),
            self.dates.len(),
            "series length must match the trading calendar"
        );
        self.series.insert(symbol.into(), bars);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }

    pub fn days(&self) -> usize {
        self.dates.len()
    }

    pub fn date_of(&self, day: usize) -> Option<NaiveDate> {
        self.dates.get(day).copied()
    }

    pub fn day_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Read one OHLCV field for `symbol` at `day + offset`.
    ///
    /// A positive offset is a look-ahead and always fails; an offset reaching
    /// before the loaded history fails as a past-date error. Both are the
    /// ordinary way over-reaching evolved rules die.
    pub fn quote(
        &self,
        symbol: &str,
        kind: QuoteKind,
        day: usize,
        offset: i64,
    ) -> Result<f64, EvaluationError> {
        if offset > 0 {
            return Err(EvaluationError::FutureDate(offset));
        }
        let target = day as i64 + offset;
        if target < 0 {
            return Err(EvaluationError::PastDate(-target));
        }
        let target = target as usize;
        if target >= self.dates.len() {
            return Err(EvaluationError::FutureDate(
                target as i64 - self.dates.len() as i64 + 1,
            ));
        }
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| EvaluationError::MissingSymbol(symbol.to_string()))?;
        match bars[target] {
            Some(bar) => Ok(bar.field(kind)),
            None => Err(EvaluationError::MissingQuote {
                symbol: symbol.to_string(),
                date: self.dates[target],
            }),
        }
    }
}
