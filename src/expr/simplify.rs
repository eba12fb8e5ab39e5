use crate::expr::node::{ArithmeticOp, ComparisonOp, Expression, LogicOp};

impl Expression {
    /// Constant-fold and apply boolean/If identities, bottom-up.
    ///
    /// Breeding and mutation leave dead weight behind (constant comparisons,
    /// double negation, branches on literal conditions); folding it keeps
    /// rule sizes honest against the size bounds. The result always has the
    /// same type as the input.
    pub fn simplify(self) -> Expression {
        match self {
            Expression::Arithmetic { op, left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expression::Number(l), Expression::Number(r)) = (&left, &right) {
                    return Expression::Number(fold_arithmetic(op, *l, *r));
                }
                Expression::Arithmetic {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Expression::Comparison { op, left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expression::Number(l), Expression::Number(r)) = (&left, &right) {
                    return Expression::Bool(fold_comparison(op, *l, *r));
                }
                Expression::Comparison {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Expression::Logic { op, left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                match (op, left, right) {
                    (LogicOp::And, Expression::Bool(false), _)
                    | (LogicOp::And, _, Expression::Bool(false)) => Expression::Bool(false),
                    (LogicOp::Or, Expression::Bool(true), _)
                    | (LogicOp::Or, _, Expression::Bool(true)) => Expression::Bool(true),
                    (LogicOp::And, Expression::Bool(true), live)
                    | (LogicOp::And, live, Expression::Bool(true))
                    | (LogicOp::Or, Expression::Bool(false), live)
                    | (LogicOp::Or, live, Expression::Bool(false)) => live,
                    (op, left, right) => Expression::Logic {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                }
            }
            Expression::Not(child) => match child.simplify() {
                Expression::Bool(b) => Expression::Bool(!b),
                Expression::Not(inner) => *inner,
                other => Expression::Not(Box::new(other)),
            },
            Expression::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = condition.simplify();
                match condition {
                    Expression::Bool(true) => then_branch.simplify(),
                    Expression::Bool(false) => else_branch.simplify(),
                    condition => Expression::If {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch.simplify()),
                        else_branch: Box::new(else_branch.simplify()),
                    },
                }
            }
            Expression::Percent { left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expression::Number(l), Expression::Number(r)) = (&left, &right) {
                    return Expression::Number(l * r / 100.0);
                }
                Expression::Percent {
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Expression::Lag { quote, days } => Expression::Lag {
                quote,
                days: Box::new(days.simplify()),
            },
            Expression::Window {
                op,
                quote,
                days,
                lag,
            } => Expression::Window {
                op,
                quote,
                days: Box::new(days.simplify()),
                lag: Box::new(lag.simplify()),
            },
            Expression::Rsi { days, lag } => Expression::Rsi {
                days: Box::new(days.simplify()),
                lag: Box::new(lag.simplify()),
            },
            terminal => terminal,
        }
    }
}

fn fold_arithmetic(op: ArithmeticOp, l: f64, r: f64) -> f64 {
    match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Subtract => l - r,
        ArithmeticOp::Multiply => l * r,
        ArithmeticOp::Divide => {
            if r == 0.0 {
                0.0
            } else {
                l / r
            }
        }
    }
}

fn fold_comparison(op: ComparisonOp, l: f64, r: f64) -> bool {
    match op {
        ComparisonOp::LessThan => l < r,
        ComparisonOp::GreaterThan => l > r,
        ComparisonOp::Equal => l == r,
        ComparisonOp::NotEqual => l != r,
        ComparisonOp::LessOrEqual => l <= r,
        ComparisonOp::GreaterOrEqual => l >= r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuoteKind;

    fn num(n: f64) -> Box<Expression> {
        Box::new(Expression::Number(n))
    }

    #[test]
    fn folds_constant_arithmetic() {
        let expr = Expression::Arithmetic {
            op: ArithmeticOp::Multiply,
            left: num(6.0),
            right: num(7.0),
        };
        assert_eq!(expr.simplify(), Expression::Number(42.0));
    }

    #[test]
    fn folds_division_by_zero_to_zero() {
        let expr = Expression::Arithmetic {
            op: ArithmeticOp::Divide,
            left: num(5.0),
            right: num(0.0),
        };
        assert_eq!(expr.simplify(), Expression::Number(0.0));
    }

    #[test]
    fn folds_constant_comparison_to_bool() {
        let expr = Expression::Comparison {
            op: ComparisonOp::LessThan,
            left: num(1.0),
            right: num(2.0),
        };
        assert_eq!(expr.simplify(), Expression::Bool(true));
    }

    #[test]
    fn collapses_if_on_literal_condition() {
        let expr = Expression::If {
            condition: Box::new(Expression::Bool(false)),
            then_branch: num(1.0),
            else_branch: num(2.0),
        };
        assert_eq!(expr.simplify(), Expression::Number(2.0));
    }

    #[test]
    fn removes_double_negation() {
        let inner = Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Close)),
                days: num(0.0),
            }),
            right: num(10.0),
        };
        let expr = Expression::Not(Box::new(Expression::Not(Box::new(inner.clone()))));
        assert_eq!(expr.simplify(), inner);
    }

    #[test]
    fn short_circuits_literal_logic() {
        let live = Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Close)),
                days: num(0.0),
            }),
            right: num(10.0),
        };
        let and_true = Expression::Logic {
            op: LogicOp::And,
            left: Box::new(Expression::Bool(true)),
            right: Box::new(live.clone()),
        };
        assert_eq!(and_true.simplify(), live);

        let or_true = Expression::Logic {
            op: LogicOp::Or,
            left: Box::new(live.clone()),
            right: Box::new(Expression::Bool(true)),
        };
        assert_eq!(or_true.simplify(), Expression::Bool(true));
    }

    #[test]
    fn leaves_live_subtrees_alone() {
        let expr = Expression::Comparison {
            op: ComparisonOp::GreaterThan,
            left: Box::new(Expression::Lag {
                quote: Box::new(Expression::Quote(QuoteKind::Close)),
                days: num(-3.0),
            }),
            right: num(10.0),
        };
        assert_eq!(expr.clone().simplify(), expr);
    }

    #[test]
    fn simplify_preserves_type() {
        let expr = Expression::If {
            condition: Box::new(Expression::Comparison {
                op: ComparisonOp::LessThan,
                left: num(1.0),
                right: num(2.0),
            }),
            then_branch: Box::new(Expression::Bool(true)),
            else_branch: Box::new(Expression::Bool(false)),
        };
        let before = expr.check_type().unwrap();
        let after = expr.simplify().check_type().unwrap();
        assert_eq!(before, after);
    }
}
