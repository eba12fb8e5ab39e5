use crate::data::{OrderCache, QuoteBundle};
use crate::error::EvaluationError;
use crate::expr::{EvalContext, Expression, Variables, TRUE_LEVEL};
use crate::trading::portfolio::Portfolio;
use crate::types::QuoteKind;
use serde::{Deserialize, Serialize};

/// How much of a stock one buy signal acquires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StockSizing {
    /// Spend this many dollars per trade (share count derived from price).
    FixedValue(f64),
    /// Buy this many shares per trade.
    FixedCount(f64),
}

impl StockSizing {
    fn shares_at(&self, price: f64) -> f64 {
        match *self {
            StockSizing::FixedValue(value) => {
                if price > 0.0 {
                    (value / price).floor()
                } else {
                    0.0
                }
            }
            StockSizing::FixedCount(count) => count,
        }
    }
}

/// Simulate one buy/sell rule pair over `[start_day, end_day]`.
///
/// Each day, for each symbol: if the symbol is held, the sell rule decides
/// whether to exit; otherwise the buy rule decides whether to enter. Rules
/// see the `held` and `order` variables. Trades execute at that day's close
/// with `trade_cost` charged per side. Any rule evaluation failure aborts
/// the whole simulation — the candidate dies, the caller discards it.
#[allow(clippy::too_many_arguments)]
pub fn paper_trade(
    buy_rule: &Expression,
    sell_rule: &Expression,
    quotes: &QuoteBundle,
    orders: &OrderCache,
    start_day: usize,
    end_day: usize,
    initial_capital: f64,
    sizing: StockSizing,
    trade_cost: f64,
) -> Result<Portfolio, EvaluationError> {
    let mut portfolio = Portfolio::new(initial_capital);
    let mut symbols: Vec<String> = quotes.symbols().map(str::to_string).collect();
    symbols.sort();

    for day in start_day..=end_day {
        let date = match quotes.date_of(day) {
            Some(date) => date,
            None => break,
        };

        for symbol in &symbols {
            // Symbols with a hole on this day are skipped, not fatal; a rule
            // that *reads* the hole still fails as usual.
            let close = match quotes.quote(symbol, QuoteKind::Close, day, 0) {
                Ok(close) => close,
                Err(EvaluationError::MissingQuote { .. }) => continue,
                Err(err) => return Err(err),
            };

            let mut variables = Variables::new();
            variables.set("held", portfolio.days_held(symbol, day) as f64);
            variables.set("order", orders.rank(symbol).unwrap_or(0) as f64);

            let ctx = EvalContext {
                quotes,
                symbol,
                day,
                variables: &variables,
            };

            if portfolio.holds(symbol) {
                if sell_rule.evaluate(&ctx)? >= TRUE_LEVEL {
                    portfolio.close_position(symbol, date, close, trade_cost);
                }
            } else if buy_rule.evaluate(&ctx)? >= TRUE_LEVEL {
                let shares = sizing.shares_at(close);
                portfolio.open_position(symbol, day, date, close, shares, trade_cost);
            }
        }
    }

    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use crate::expr::node::ComparisonOp;
    use chrono::NaiveDate;

    fn bundle(closes: &[f64]) -> QuoteBundle {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        let mut bundle = QuoteBundle::new(dates);
        bundle.add_series(
            "XYZ",
            closes
                .iter()
                .map(|&c| {
                    Some(Bar {
                        open: c,
                        high: c + 1.0,
                        low: c - 1.0,
                        close: c,
                        volume: 800.0,
                    })
                })
                .collect(),
        );
        bundle
    }

    fn num(n: f64) -> Box<Expression> {
        Box::new(Expression::Number(n))
    }

    fn close_below(threshold: f64) -> Expression {
        Expression::Comparison {
            op: ComparisonOp::LessThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(crate::types::QuoteKind::Close)),
                days: num(0.0),
            }),
            right: num(threshold),
        }
    }

    fn close_above(threshold: f64) -> Expression {
        Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(crate::types::QuoteKind::Close)),
                days: num(0.0),
            }),
            right: num(threshold),
        }
    }

    #[test]
    fn buys_low_sells_high() {
        let quotes = bundle(&[10.0, 9.0, 12.0, 15.0, 14.0]);
        let orders = OrderCache::from_ordered_symbols(["XYZ"]);
        // Buy under 9.5, sell over 14.5.
        let portfolio = paper_trade(
            &close_below(9.5),
            &close_above(14.5),
            &quotes,
            &orders,
            0,
            4,
            10_000.0,
            StockSizing::FixedCount(100.0),
            20.0,
        )
        .unwrap();

        assert_eq!(portfolio.trades.len(), 1);
        let trade = &portfolio.trades[0];
        assert_eq!(trade.entry_price, 9.0);
        assert_eq!(trade.exit_price, 15.0);
        // 100 shares, $6 gain, minus the exit fee.
        assert_eq!(trade.profit, 600.0 - 20.0);

        let final_value = portfolio.value_on(&quotes, 4).unwrap();
        assert_eq!(final_value, 10_000.0 + 600.0 - 40.0);
    }

    #[test]
    fn never_buying_keeps_capital() {
        let quotes = bundle(&[10.0, 11.0, 12.0]);
        let orders = OrderCache::from_ordered_symbols(["XYZ"]);
        let portfolio = paper_trade(
            &close_below(1.0),
            &close_above(1.0),
            &quotes,
            &orders,
            0,
            2,
            5_000.0,
            StockSizing::FixedValue(1_000.0),
            20.0,
        )
        .unwrap();
        assert!(portfolio.trades.is_empty());
        assert_eq!(portfolio.value_on(&quotes, 2).unwrap(), 5_000.0);
    }

    #[test]
    fn rule_error_aborts_simulation() {
        let quotes = bundle(&[10.0, 11.0]);
        let orders = OrderCache::from_ordered_symbols(["XYZ"]);
        // Buy rule reaches 30 days back on day 0.
        let over_reaching = Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(crate::types::QuoteKind::Close)),
                days: num(-30.0),
            }),
            right: num(5.0),
        };
        let result = paper_trade(
            &over_reaching,
            &close_above(100.0),
            &quotes,
            &orders,
            0,
            1,
            5_000.0,
            StockSizing::FixedCount(10.0),
            0.0,
        );
        assert!(matches!(result, Err(EvaluationError::PastDate(_))));
    }

    #[test]
    fn held_variable_is_bound_while_holding() {
        let quotes = bundle(&[10.0, 10.0, 10.0, 10.0]);
        let orders = OrderCache::from_ordered_symbols(["XYZ"]);
        // Always buy; sell after held >= 2 days.
        let sell_after_two = Expression::Comparison {
            op: ComparisonOp::GreaterOrEqual,
            left: Box::new(Expression::Variable("held".to_string())),
            right: num(2.0),
        };
        let portfolio = paper_trade(
            &Expression::Bool(true),
            &sell_after_two,
            &quotes,
            &orders,
            0,
            3,
            10_000.0,
            StockSizing::FixedCount(10.0),
            0.0,
        )
        .unwrap();
        assert_eq!(portfolio.trades.len(), 1);
        let trade = &portfolio.trades[0];
        // Bought day 0, sold day 2 when held reached 2; re-bought day 3.
        assert_eq!(
            (trade.exit_date - trade.entry_date).num_days(),
            2
        );
        assert!(portfolio.holds("XYZ"));
    }
}
