use crate::data::QuoteBundle;
use crate::error::EvaluationError;
use crate::expr::node::{ArithmeticOp, ComparisonOp, Expression, LogicOp, WindowOp, TRUE_LEVEL};
use crate::types::QuoteKind;
use std::collections::HashMap;

/// Variable bindings supplied by the paper trader (`held`, `order`).
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, f64>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Everything a rule needs to evaluate itself for one symbol on one day.
pub struct EvalContext<'a> {
    pub quotes: &'a QuoteBundle,
    pub symbol: &'a str,
    pub day: usize,
    pub variables: &'a Variables,
}

fn truthy(value: f64) -> bool {
    value >= TRUE_LEVEL
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// The quote field under a lag/window node. Evaluation is only defined for
/// type-checked trees, so anything else here is a bug in tree construction.
fn quote_kind(expr: &Expression) -> QuoteKind {
    match expr {
        Expression::Quote(kind) => *kind,
        other => unreachable!("quote operand is not a quote terminal: {}", other),
    }
}

impl Expression {
    /// Evaluate this tree for one symbol on one day.
    ///
    /// Boolean results are encoded as floats; callers test them against
    /// [`TRUE_LEVEL`]. Division by zero yields 0.0. Out-of-history
    /// quote reads and non-positive window lengths fail with
    /// [`EvaluationError`], which kills the candidate, not the run.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<f64, EvaluationError> {
        match self {
            Expression::Number(n) => Ok(*n),
            Expression::Bool(b) => Ok(bool_value(*b)),
            Expression::Variable(name) => ctx
                .variables
                .get(name)
                .ok_or_else(|| EvaluationError::UndefinedVariable(name.clone())),
            Expression::Quote(kind) => ctx.quotes.quote(ctx.symbol, *kind, ctx.day, 0),
            Expression::Arithmetic { op, left, right } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                Ok(match op {
                    ArithmeticOp::Add => l + r,
                    ArithmeticOp::Subtract => l - r,
                    ArithmeticOp::Multiply => l * r,
                    // A zero divisor yields zero, never an error; evolved
                    // rules divide by zero all the time.
                    ArithmeticOp::Divide => {
                        if r == 0.0 {
                            0.0
                        } else {
                            l / r
                        }
                    }
                })
            }
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                Ok(bool_value(match op {
                    ComparisonOp::LessThan => l < r,
                    ComparisonOp::GreaterThan => l > r,
                    ComparisonOp::Equal => l == r,
                    ComparisonOp::NotEqual => l != r,
                    ComparisonOp::LessOrEqual => l <= r,
                    ComparisonOp::GreaterOrEqual => l >= r,
                }))
            }
            Expression::Logic { op, left, right } => {
                let l = truthy(left.evaluate(ctx)?);
                let r = truthy(right.evaluate(ctx)?);
                Ok(bool_value(match op {
                    LogicOp::And => l && r,
                    LogicOp::Or => l || r,
                }))
            }
            Expression::Not(child) => Ok(bool_value(!truthy(child.evaluate(ctx)?))),
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => {
                // Exactly one branch runs; the untaken branch may reference
                // out-of-range days and must not be touched.
                if truthy(condition.evaluate(ctx)?) {
                    then_branch.evaluate(ctx)
                } else {
                    else_branch.evaluate(ctx)
                }
            }
            Expression::Percent { left, right } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                Ok(l * r / 100.0)
            }
            Expression::Lag { quote, days } => {
                let offset = days.evaluate(ctx)? as i64;
                ctx.quotes
                    .quote(ctx.symbol, quote_kind(quote), ctx.day, offset)
            }
            Expression::Window {
                op,
                quote,
                days,
                lag,
            } => {
                let length = days.evaluate(ctx)? as i64;
                if length <= 0 {
                    return Err(EvaluationError::InvalidRange(length));
                }
                let lag_offset = lag.evaluate(ctx)? as i64;
                if lag_offset > 0 {
                    return Err(EvaluationError::FutureDate(lag_offset));
                }
                let kind = quote_kind(quote);
                let mut min = f64::MAX;
                let mut max = f64::MIN;
                let mut sum = 0.0;
                for offset in (lag_offset - length + 1)..=lag_offset {
                    let value = ctx.quotes.quote(ctx.symbol, kind, ctx.day, offset)?;
                    min = min.min(value);
                    max = max.max(value);
                    sum += value;
                }
                Ok(match op {
                    WindowOp::Min => min,
                    WindowOp::Max => max,
                    WindowOp::Avg => sum / length as f64,
                })
            }
            Expression::Rsi { days, lag } => {
                let period = days.evaluate(ctx)? as i64;
                if period <= 0 {
                    return Err(EvaluationError::InvalidRange(period));
                }
                let lag_offset = lag.evaluate(ctx)? as i64;
                if lag_offset > 0 {
                    return Err(EvaluationError::FutureDate(lag_offset));
                }
                let mut up = 0.0;
                let mut down = 0.0;
                let mut prev =
                    ctx.quotes
                        .quote(ctx.symbol, QuoteKind::Close, ctx.day, lag_offset - period)?;
                for offset in (lag_offset - period + 1)..=lag_offset {
                    let close = ctx.quotes.quote(ctx.symbol, QuoteKind::Close, ctx.day, offset)?;
                    let change = close - prev;
                    if change > 0.0 {
                        up += change;
                    } else {
                        down -= change;
                    }
                    prev = close;
                }
                if down == 0.0 {
                    Ok(100.0)
                } else {
                    Ok(100.0 - 100.0 / (1.0 + up / down))
                }
            }
        }
    }
}
