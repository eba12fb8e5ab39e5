use crate::error::TypeError;
use crate::expr::node::Expression;
use crate::types::ExprType;

fn expect_numeric(ty: ExprType) -> Result<ExprType, TypeError> {
    if ty.is_numeric() {
        Ok(ty)
    } else {
        Err(TypeError::new("numeric type", ty.to_string()))
    }
}

fn expect_equivalent(left: ExprType, right: ExprType) -> Result<(), TypeError> {
    if left.equivalent(right) {
        Ok(())
    } else {
        Err(TypeError::new(left.to_string(), right.to_string()))
    }
}

fn expect_boolean(ty: ExprType) -> Result<(), TypeError> {
    if ty == ExprType::Boolean {
        Ok(())
    } else {
        Err(TypeError::new("boolean", ty.to_string()))
    }
}

/// A slot where `Value` is required; `Price`/`Volume` satisfy it through the
/// numeric-wildcard equivalence.
fn expect_value(ty: ExprType) -> Result<(), TypeError> {
    if ty.equivalent(ExprType::Value) {
        Ok(())
    } else {
        Err(TypeError::new("value", ty.to_string()))
    }
}

impl Expression {
    /// Bottom-up type inference.
    ///
    /// Succeeds for every tree the mutator and breeding can construct;
    /// failure on such a tree is a bug in the construction logic.
    /// Idempotent: checking twice yields the same type.
    pub fn check_type(&self) -> Result<ExprType, TypeError> {
        match self {
            Expression::Number(_) | Expression::Variable(_) => Ok(ExprType::Value),
            Expression::Bool(_) => Ok(ExprType::Boolean),
            Expression::Quote(_) => Ok(ExprType::Quote),
            Expression::Arithmetic { left, right, .. } => {
                let l = expect_numeric(left.check_type()?)?;
                let r = expect_numeric(right.check_type()?)?;
                expect_equivalent(l, r)?;
                Ok(l)
            }
            Expression::Comparison { left, right, .. } => {
                let l = expect_numeric(left.check_type()?)?;
                let r = expect_numeric(right.check_type()?)?;
                expect_equivalent(l, r)?;
                Ok(ExprType::Boolean)
            }
            Expression::Logic { left, right, .. } => {
                expect_boolean(left.check_type()?)?;
                expect_boolean(right.check_type()?)?;
                Ok(ExprType::Boolean)
            }
            Expression::Not(child) => {
                expect_boolean(child.check_type()?)?;
                Ok(ExprType::Boolean)
            }
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => {
                expect_boolean(condition.check_type()?)?;
                let then_ty = then_branch.check_type()?;
                let else_ty = else_branch.check_type()?;
                // Branch types must be equal, not merely equivalent.
                if then_ty != else_ty {
                    return Err(TypeError::new(then_ty.to_string(), else_ty.to_string()));
                }
                Ok(then_ty)
            }
            Expression::Percent { left, right } => {
                let l = expect_numeric(left.check_type()?)?;
                expect_value(right.check_type()?)?;
                Ok(l)
            }
            Expression::Lag { quote, days } => {
                let quote_ty = check_quote_operand(quote)?;
                expect_value(days.check_type()?)?;
                Ok(quote_ty)
            }
            Expression::Window {
                quote, days, lag, ..
            } => {
                let quote_ty = check_quote_operand(quote)?;
                expect_value(days.check_type()?)?;
                expect_value(lag.check_type()?)?;
                Ok(quote_ty)
            }
            Expression::Rsi { days, lag } => {
                expect_value(days.check_type()?)?;
                expect_value(lag.check_type()?)?;
                Ok(ExprType::Price)
            }
        }
    }
}

/// The first operand of lag/min/max/avg must be a quote reference; the node
/// then takes on the quote's underlying numeric type.
fn check_quote_operand(quote: &Expression) -> Result<ExprType, TypeError> {
    match quote {
        Expression::Quote(kind) => Ok(kind.value_type()),
        other => Err(TypeError::new("quote", other.check_type()?.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::node::{ArithmeticOp, ComparisonOp, LogicOp, WindowOp};
    use crate::types::QuoteKind;

    fn num(n: f64) -> Box<Expression> {
        Box::new(Expression::Number(n))
    }

    fn lag_close() -> Expression {
        Expression::Lag {
            quote: Box::new(Expression::Quote(QuoteKind::Close)),
            days: num(0.0),
        }
    }

    #[test]
    fn arithmetic_takes_left_type() {
        // price + value resolves to price; value + price to value.
        let price_left = Expression::Arithmetic {
            op: ArithmeticOp::Add,
            left: Box::new(lag_close()),
            right: num(1.0),
        };
        assert_eq!(price_left.check_type(), Ok(ExprType::Price));

        let value_left = Expression::Arithmetic {
            op: ArithmeticOp::Add,
            left: num(1.0),
            right: Box::new(lag_close()),
        };
        assert_eq!(value_left.check_type(), Ok(ExprType::Value));
    }

    #[test]
    fn price_and_volume_do_not_unify() {
        let expr = Expression::Arithmetic {
            op: ArithmeticOp::Add,
            left: Box::new(lag_close()),
            right: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Volume)),
                days: num(0.0),
            }),
        };
        assert!(expr.check_type().is_err());
    }

    #[test]
    fn comparison_is_boolean() {
        let expr = Expression::Comparison {
            op: ComparisonOp::LessThan,
            left: Box::new(lag_close()),
            right: num(100.0),
        };
        assert_eq!(expr.check_type(), Ok(ExprType::Boolean));
    }

    #[test]
    fn boolean_operands_rejected_in_arithmetic() {
        let expr = Expression::Arithmetic {
            op: ArithmeticOp::Add,
            left: Box::new(Expression::Bool(true)),
            right: num(1.0),
        };
        assert!(expr.check_type().is_err());
    }

    #[test]
    fn bare_quote_rejected_in_comparison() {
        let expr = Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Quote(QuoteKind::Close)),
            right: num(1.0),
        };
        assert!(expr.check_type().is_err());
    }

    #[test]
    fn logic_requires_boolean_children() {
        let good = Expression::Logic {
            op: LogicOp::And,
            left: Box::new(Expression::Bool(true)),
            right: Box::new(Expression::Not(Box::new(Expression::Bool(false)))),
        };
        assert_eq!(good.check_type(), Ok(ExprType::Boolean));

        let bad = Expression::Logic {
            op: LogicOp::Or,
            left: num(1.0),
            right: Box::new(Expression::Bool(true)),
        };
        assert!(bad.check_type().is_err());
    }

    #[test]
    fn if_branches_must_match_exactly() {
        let mismatched = Expression::If {
            condition: Box::new(Expression::Bool(true)),
            then_branch: Box::new(lag_close()),
            else_branch: num(5.0),
        };
        assert!(mismatched.check_type().is_err());

        let matched = Expression::If {
            condition: Box::new(Expression::Bool(true)),
            then_branch: num(1.0),
            else_branch: num(2.0),
        };
        assert_eq!(matched.check_type(), Ok(ExprType::Value));
    }

    #[test]
    fn window_type_follows_quote_field() {
        let volume_window = Expression::Window {
            op: WindowOp::Max,
            quote: Box::new(Expression::Quote(QuoteKind::Volume)),
            days: num(5.0),
            lag: num(0.0),
        };
        assert_eq!(volume_window.check_type(), Ok(ExprType::Volume));
    }

    #[test]
    fn lag_requires_quote_operand() {
        let expr = Expression::Lag {
            quote: num(1.0),
            days: num(0.0),
        };
        assert!(expr.check_type().is_err());
    }

    #[test]
    fn check_type_is_idempotent() {
        let expr = Expression::Comparison {
            op: ComparisonOp::GreaterOrEqual,
            left: Box::new(lag_close()),
            right: num(10.0),
        };
        assert_eq!(expr.check_type(), expr.check_type());
    }
}
